use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub static OUTCOME_SUCCESS: &str = "success";
pub static OUTCOME_ERROR: &str = "error";
pub static OUTCOME_REJECTED: &str = "token_rejected";

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token exchange metrics
    pub token_exchanges: IntCounterVec,
    pub token_exchange_duration: HistogramVec,
    pub token_invalidations: IntCounter,
    pub token_expiry_unix: IntGauge,
    pub persist_failures: IntCounter,

    // Api metrics
    pub api_calls: IntCounterVec,
    pub api_call_duration: HistogramVec,
    pub api_retries: IntCounterVec,

    // Config
    pub parse_failures: IntCounter,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("tokeninvoker".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Token
            token_exchanges: IntCounterVec::new(Opts::new("token_exchanges_total","Token endpoint exchanges by outcome",),&["outcome"],).unwrap(),
            token_exchange_duration: HistogramVec::new(HistogramOpts::new("token_exchange_duration_seconds", "Token exchange duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),&["outcome"],).unwrap(),
            token_invalidations: IntCounter::new("token_invalidations_total","Cached tokens dropped after rejection",).unwrap(),
            token_expiry_unix: IntGauge::new("token_expiry_unix_seconds", "Expiry timestamp of the cached token").unwrap(),
            persist_failures: IntCounter::new("credential_persist_failures_total","Failed credential file writes",).unwrap(),

            // Api
            api_calls: IntCounterVec::new(Opts::new("api_calls_total", "Api calls by method and outcome"),&["method", "outcome"],).unwrap(),
            api_call_duration: HistogramVec::new(HistogramOpts::new("api_call_duration_seconds", "Api call duration including retry").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),&["method"],).unwrap(),
            api_retries: IntCounterVec::new(Opts::new("api_retries_total", "Resends after a rejected token"),&["method"],).unwrap(),

            parse_failures: IntCounter::new("config_parse_failures_total","Config parse failures",).unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_exchanges.clone())).unwrap();
        reg.register(Box::new(metrics.token_exchange_duration.clone())).unwrap();
        reg.register(Box::new(metrics.token_invalidations.clone())).unwrap();
        reg.register(Box::new(metrics.token_expiry_unix.clone())).unwrap();
        reg.register(Box::new(metrics.persist_failures.clone())).unwrap();
        reg.register(Box::new(metrics.api_calls.clone())).unwrap();
        reg.register(Box::new(metrics.api_call_duration.clone())).unwrap();
        reg.register(Box::new(metrics.api_retries.clone())).unwrap();
        reg.register(Box::new(metrics.parse_failures.clone())).unwrap();

        metrics
    }

    /// Prometheus text exposition of every registered metric.
    pub fn encode_text(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
