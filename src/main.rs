/// File Relay - minimal HTTP file sharing server

use file_relay::{config::ServerConfig, context::AppContext, error::RelayResult, metrics, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> RelayResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "file_relay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Print banner
    print_banner();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    metrics::start_uptime_tracker();

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
     __ _ _                    _
    / _(_) | ___    _ __ ___| | __ _ _   _
   | |_| | |/ _ \  | '__/ _ \ |/ _` | | | |
   |  _| | |  __/  | | |  __/ | (_| | |_| |
   |_| |_|_|\___|  |_|  \___|_|\__,_|\__, |
                                     |___/
        File Relay v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
