use std::sync::Arc;

use gtb_gemini::GeminiClient;

use gtb_core::{
    config::Config,
    session::{SessionLimits, SessionRegistry},
};

#[tokio::main]
async fn main() -> Result<(), gtb_core::Error> {
    gtb_core::logging::init("gtb")?;

    let cfg = Arc::new(Config::load()?);
    tracing::debug!(config = ?cfg, "configuration loaded");

    let model = Arc::new(GeminiClient::new(
        cfg.gemini_api_key.clone(),
        cfg.gemini_model.clone(),
        cfg.request_timeout,
    )?);

    let sessions = Arc::new(SessionRegistry::new(model, SessionLimits::from_config(&cfg)));

    gtb_telegram::router::run_polling(cfg, sessions)
        .await
        .map_err(|e| gtb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
