#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::routing::post;
    use httpmock::Method::POST;
    use httpmock::MockServer;

    use crate::api::invoker::ApiInvoker;
    use crate::api::request::Request;
    use crate::cache::token_cache::TokenCache;
    use crate::config::settings::{ApiEndpointConfig, HttpConfig, TokenEndpointConfig};
    use crate::tests::common::{credential, json, spawn_axum, Router, INVALID_TOKEN_BODY};
    use crate::transport::http::HttpTransport;

    fn transport() -> HttpTransport {
        HttpTransport::from_config(&HttpConfig { timeout_ms: 2000 }).expect("http transport")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn token_and_api_call_over_http() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/oauth/2.0/token")
                    .header("content-type", "application/x-www-form-urlencoded");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({"access_token": "http-abc", "expires_in": 2592000}));
            })
            .await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/2.0/lightservice/goods");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(json!({"error_code": 0, "error_msg": "", "data": [{"shop_id": 9}], "request_id": "req-1"}));
            })
            .await;

        let cache = TokenCache::new(
            credential(),
            TokenEndpointConfig::new(format!("{}/oauth/2.0/token", server.base_url())),
            transport(),
        );
        let invoker = ApiInvoker::new(
            Arc::new(cache),
            ApiEndpointConfig::new(format!("{}/rest/2.0/lightservice/goods", server.base_url())),
        );

        let response = invoker.execute(Request::new("shop.list.get")).await.unwrap();

        assert!(response.is_success());
        assert_eq!(response.data, vec![json!({"shop_id": 9})]);
        assert_eq!(response.request_id.as_deref(), Some("req-1"));
        token_mock.assert_async().await;
        api_mock.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn rejected_token_recovers_over_http() {
        let token_counter = Arc::new(AtomicUsize::new(0));
        let api_counter = Arc::new(AtomicUsize::new(0));

        let tokens = token_counter.clone();
        let calls = api_counter.clone();
        let router = Router::new()
            .route(
                "/token",
                post(move |body: String| {
                    let tokens = tokens.clone();
                    async move {
                        assert!(body.contains("grant_type=client_credentials"));
                        let n = tokens.fetch_add(1, Ordering::SeqCst) + 1;
                        json!({"access_token": format!("tok-{}", n), "expires_in": 3600}).to_string()
                    }
                }),
            )
            .route(
                "/api",
                post(move |body: String| {
                    let calls = calls.clone();
                    async move {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        if n == 0 {
                            assert!(body.ends_with("access_token=tok-1"));
                            INVALID_TOKEN_BODY.to_owned()
                        } else {
                            assert!(body.ends_with("access_token=tok-2"));
                            json!({"error_code": 0, "error_msg": "", "data": []}).to_string()
                        }
                    }
                }),
            );
        let (handle, addr) = spawn_axum(router).await;

        let cache = TokenCache::new(
            credential(),
            TokenEndpointConfig::new(format!("http://{}/token", addr)),
            transport(),
        );
        let invoker = ApiInvoker::new(
            Arc::new(cache),
            ApiEndpointConfig::new(format!("http://{}/api", addr)),
        );

        let response = invoker.execute(Request::new("tag.list.get")).await.unwrap();

        assert!(response.is_success());
        assert!(response.data.is_empty());
        assert_eq!(token_counter.load(Ordering::SeqCst), 2);
        assert_eq!(api_counter.load(Ordering::SeqCst), 2);

        handle.abort();
    }

    #[tokio::test]
    async fn unreachable_token_endpoint_is_a_transport_error() {
        // nothing listens on port 9 of the loopback interface
        let cache = TokenCache::new(
            credential(),
            TokenEndpointConfig::new("http://127.0.0.1:9/token"),
            transport(),
        );
        let err = cache.get_token().await.unwrap_err();
        assert!(matches!(err, crate::error::Error::Transport { .. }), "{err:?}");
    }
}
