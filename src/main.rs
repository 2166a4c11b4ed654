use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use laeproxy::{build_router, AppState};
use laeproxy_core::config::Environment;
use laeproxy_core::{Config, ReqwestFetcher};
use tracing::info;

/// HTTP forward proxy that relays censored-network clients' requests to the open
/// Internet, built to run within a quota-constrained hosting platform.
#[derive(Parser)]
#[command(name = "laeproxy")]
struct Cli {
    /// Port to bind the proxy's HTTP listener on.
    #[arg(short, long, env = "PROXY_PORT", default_value_t = 8080)]
    port: u16,

    /// Distinguishes a production deployment from a development one; affects
    /// only logging verbosity.
    #[arg(long, value_enum, env = "PROXY_ENV", default_value = "development")]
    environment: Environment,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.environment.is_dev() {
        "laeproxy=debug,laeproxy_core=debug,tower_http=debug"
    } else {
        "laeproxy=info,laeproxy_core=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_ansi(cli.environment.is_dev())
        .init();

    let mut config = Config::default();
    config.environment = cli.environment;

    let state = Arc::new(AppState {
        fetcher: Arc::new(ReqwestFetcher::new(
            config.urlfetch_res_maxbytes,
            config.max_concurrent_fetches,
        )),
        config,
    });

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    info!("laeproxy listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
