use anyhow::Result;
use clap::Parser;
use markdown_json::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    tracing::info!("CLI arguments parsed, invoking run");
    let result = run(cli).await.and_then(|report| {
        if report.is_clean() {
            Ok(())
        } else {
            for item in &report.invalid {
                eprintln!("{item}");
            }
            Err(anyhow::anyhow!(
                "{} document(s) could not be converted",
                report.invalid.len()
            ))
        }
    });
    match &result {
        Ok(_) => tracing::info!("CLI completed successfully"),
        Err(e) => tracing::error!(error = %e, "CLI exited with error"),
    }
    result
}
