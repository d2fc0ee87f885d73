use std::sync::Arc;

use teloxide::{
    dispatching::{Dispatcher, UpdateHandler},
    dptree,
    prelude::*,
};

use gtb_core::{
    config::Config,
    messaging::{port::MessagingPort, types::IncomingUpdate},
    relay::Relay,
    session::SessionRegistry,
};

use crate::handlers;
use crate::TelegramMessenger;

pub struct AppState {
    pub relay: Arc<Relay>,
}

/// Update routing: messages are classified once, then exactly one endpoint runs.
/// Everything else (edits, callbacks, ignored kinds) falls through to the no-op default.
pub fn schema() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .filter_map(handlers::classify_update)
        .branch(dptree::case![IncomingUpdate::Command(cmd)].endpoint(handlers::handle_command))
        .branch(dptree::case![IncomingUpdate::Text(msg)].endpoint(handlers::handle_text))
}

/// Long-poll Telegram until Ctrl-C.
///
/// On shutdown the dispatcher stops fetching updates and waits for in-flight handlers, so a
/// model reply that arrives mid-shutdown is still delivered.
pub async fn run_polling(cfg: Arc<Config>, sessions: Arc<SessionRegistry>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(
            username = %me.username(),
            model = sessions.model_name(),
            "bot started"
        ),
        Err(e) => tracing::warn!(error = %e, "get_me failed"),
    }

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let state = Arc::new(AppState {
        relay: Arc::new(Relay::new(&cfg, sessions, messenger)),
    });

    tracing::info!("polling for updates");
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .default_handler(|_update| async {})
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("dispatcher stopped");
    Ok(())
}
