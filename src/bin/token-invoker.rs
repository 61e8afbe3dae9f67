use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use token_invoker::observability::metrics::get_metrics;
use token_invoker::utils::bootstrap::build_invoker;
use token_invoker::utils::config_loader;
use token_invoker::utils::logging::{self, LogLevel};
use token_invoker::{HttpTransport, Request};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "token-invoker.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// Print prometheus metrics to stderr when done
    #[arg(long)]
    print_metrics: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current access token, exchanging a new one when stale
    Token {
        #[arg(long)]
        force: bool,
    },
    /// Drop the cached access token
    Invalidate,
    /// Call an api method
    Call {
        #[arg(short, long)]
        method: String,
        #[arg(short = 't', long = "type")]
        request_type: Option<String>,
        /// JSON array of data items
        #[arg(short, long, default_value = "[]")]
        data: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level);

    // -------------------------------
    // 2. Build transport, token cache and invoker
    // -------------------------------

    let transport = HttpTransport::from_config(&service_config.settings.http)?;
    let invoker = build_invoker(&service_config, transport).await?;
    let cache = invoker.token_cache();

    // -------------------------------
    // 3. Run command
    // -------------------------------

    let output: Value = match args.command {
        Command::Token { force } => {
            let token = if force {
                cache.force_refresh().await
            } else {
                cache.get_token().await
            };
            serde_json::to_value(token.or_else(|err| err.into_cached_token())?)?
        }
        Command::Invalidate => {
            cache.invalidate().await;
            serde_json::json!({ "invalidated": true })
        }
        Command::Call { method, request_type, data } => {
            let items: Vec<Value> = serde_json::from_str(&data)
                .with_context(|| format!("--data must be a JSON array, got '{}'", data))?;
            let mut request = Request::new(method);
            request.set_data(items);
            if let Some(request_type) = request_type {
                request.set_type(request_type);
            }
            serde_json::to_value(invoker.execute(request).await?)?
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    if args.print_metrics {
        eprintln!("{}", get_metrics().await.encode_text()?);
    }
    info!("done");
    Ok(())
}
