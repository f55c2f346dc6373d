// Business Profile Dashboard - Web Server
// JSON API + Google sign-in + browser pages with Axum

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use business_dashboard::api::{self, AppState};
use business_dashboard::{source, AppConfig, VERSION};

const DEFAULT_LOG_FILTER: &str = "business_dashboard=info,dashboard_server=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env().context("Invalid configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    println!("🌐 Business Profile Dashboard v{} - Web Server", VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let data_source = source::from_config(&config).context("Failed to build data source")?;
    println!("✓ Data source: {}", data_source.name());
    if config.oauth.is_some() {
        println!("✓ Google sign-in enabled (redirect: {})", config.redirect_uri());
    } else {
        println!("✓ Demo sign-in (no Google OAuth client configured)");
    }

    let bind_addr = config.bind_addr;
    let public_url = config.public_url.clone();
    let state = AppState::new(config, data_source).context("Failed to set up Google sign-in")?;
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!(%bind_addr, "Server listening");
    println!("\n🚀 Server running on {}", public_url);
    println!("   API: {}/api/business/accounts", public_url);
    println!("   UI:  {}", public_url);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
