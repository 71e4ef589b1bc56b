use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pitwall_schema::Layout;
use pitwall_server::config::{Args, Settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::from_args(&args)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .with_context(|| format!("Invalid log filter `{}`", settings.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let layout = Layout::standard();
    if args.check_schema {
        return match layout.validate() {
            Ok(()) => {
                println!("cell layout OK: {} cells", layout.entries().len());
                Ok(())
            }
            Err(err) => {
                for issue in err.issues() {
                    eprintln!("{issue}");
                }
                Err(err.into())
            }
        };
    }
    layout.validate().context("Cell layout is inconsistent")?;

    let bridge = Arc::new(settings.bridge(layout));
    let app = pitwall_server::router(bridge, &settings.prefix);

    let listener = tokio::net::TcpListener::bind(settings.bind)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind))?;
    tracing::info!(
        "listening on http://{}{}",
        settings.bind,
        settings.prefix
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .context("HTTP server failed")?;
    Ok(())
}
