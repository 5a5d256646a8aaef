mod config;
mod error;
mod handlers;
mod models;
#[cfg(feature = "http-server")]
mod server; // POST /analyze
mod services;

use anyhow::Result;
use dotenv::dotenv;
use std::sync::Arc;
use tokio::io::BufReader;

use config::Config;
use handlers::Terminal;
use services::{GeminiService, NutritionEstimator};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables (RUST_LOG may come from .env)
    dotenv().ok();

    // Initialize logger
    env_logger::init();

    log::info!("🚀 Starting NutriScan AI...");

    let config = Config::from_env()?;

    let gemini = GeminiService::new(config.gemini.clone())?;
    log::info!("✅ Gemini service initialized with model: {}", gemini.model());
    let estimator: Arc<dyn NutritionEstimator> = Arc::new(gemini);

    let mode = std::env::args().nth(1);
    match mode.as_deref() {
        #[cfg(feature = "http-server")]
        Some("serve") => {
            server::serve(&config.server_addr, estimator).await?;
        }
        None | Some("terminal") => {
            let stdin = BufReader::new(tokio::io::stdin());
            let mut terminal = Terminal::new(stdin, tokio::io::stdout(), estimator);
            terminal.run().await?;
        }
        Some(other) => {
            anyhow::bail!("Unknown mode '{}'. Usage: nutriscan [terminal|serve]", other);
        }
    }

    log::info!("🛑 Shutting down...");
    Ok(())
}
