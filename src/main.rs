// Business Profile Dashboard - Terminal UI
// Same locations / reviews / insights views as the web dashboard, in-process

mod ui;

use anyhow::{Context, Result};

use business_dashboard::source::{self, mock::MOCK_ACCESS_TOKEN};
use business_dashboard::{AppConfig, Credential, DataSourceKind};

fn main() -> Result<()> {
    let config = AppConfig::from_env().context("Invalid configuration")?;

    let credential = match config.data_source {
        DataSourceKind::Mock => Credential::new(MOCK_ACCESS_TOKEN),
        DataSourceKind::Google => config.access_token.clone(),
    }
    .context("GOOGLE_ACCESS_TOKEN is required when DATA_SOURCE=google")?;

    println!("🖥️  Loading Business Profile Dashboard...\n");

    let data_source = source::from_config(&config).context("Failed to build data source")?;
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    let mut app = ui::App::new(
        data_source,
        credential,
        config.fetch_concurrency,
        runtime.handle().clone(),
    );

    println!("📊 Fetching businesses from {}...", app.source_name());
    app.load_locations();
    println!("✓ Loaded {} businesses\n", app.locations.cards().len());
    println!("Starting UI... (Press 'q' to quit)\n");

    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}
