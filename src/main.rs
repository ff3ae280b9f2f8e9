/// Screendiff - visual screenshot comparison service
///
/// Binary entry point: logging, configuration, then the HTTP server.
use screendiff::{config::ServerConfig, context::AppContext, error::ServiceResult, metrics, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ServiceResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "screendiff=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Print banner
    print_banner();

    metrics::init();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    screendiff
    ----------
    Image comparison service v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
