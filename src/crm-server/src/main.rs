//! CRM server — customer, order and campaign management with a recursive
//! audience segmentation rule engine behind the campaign builder.
//!
//! Main entry point that loads configuration and serves the REST API.

use clap::Parser;
use crm_core::AppConfig;
use crm_management::crm_router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "crm-server")]
#[command(about = "Marketing CRM backend with an audience segmentation rule engine")]
#[command(version)]
struct Cli {
    /// Bind host (overrides config)
    #[arg(long, env = "CRM_SERVER__API__HOST")]
    host: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "CRM_SERVER__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Audience preview debounce window in milliseconds (overrides config)
    #[arg(long, env = "CRM_SERVER__PREVIEW__DEBOUNCE_MS")]
    debounce_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crm_server=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("CRM server starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(debounce_ms) = cli.debounce_ms {
        config.preview.debounce_ms = debounce_ms;
    }

    info!(
        host = %config.api.host,
        http_port = config.api.http_port,
        debounce_ms = config.preview.debounce_ms,
        sample_cap = config.preview.sample_cap,
        "Configuration loaded"
    );

    let app = crm_router(&config)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.api.host, config.api.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "CRM server is ready to serve traffic");

    axum::serve(listener, app).await?;

    Ok(())
}
