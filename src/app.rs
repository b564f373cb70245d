use crate::config::Config;
use crate::dispatcher::{ContextMode, Dispatcher};
use crate::events::AppEvent;
use crate::llm::LlmClient;
use crate::tui::{self, EventHandler, Tui};
use crate::ui::conversation::{ConversationAction, ConversationManager};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Build a dispatcher for the configured endpoint
pub fn dispatcher_from_config(config: &Config) -> Result<Dispatcher> {
    let client = LlmClient::from_config(config).context("Failed to create HTTP client")?;
    let context = if config.send_history {
        ContextMode::FullHistory
    } else {
        ContextMode::LatestOnly
    };
    Ok(Dispatcher::new(Arc::new(client), context))
}

/// Run the interactive chat until the user quits
pub async fn run(config: Config) -> Result<()> {
    if !config.has_api_key() {
        warn!("no API key configured; every request will fail until one is set");
    }
    let dispatcher = dispatcher_from_config(&config)?;

    tui::install_panic_hook();
    let mut terminal = tui::init().context("Failed to initialise terminal")?;

    let mut events = EventHandler::new(Duration::from_millis(config.ui.tick_rate_ms.max(16)));
    let mut manager = ConversationManager::new(
        dispatcher,
        events.sender(),
        config.ui.title.clone(),
        config.model.clone(),
    );

    info!(model = %config.model, "chat session started");
    let result = event_loop(&mut terminal, &mut events, &mut manager).await;

    manager.teardown();
    tui::restore().context("Failed to restore terminal")?;
    info!(messages = manager.state().len(), "chat session ended");
    result
}

async fn event_loop(
    terminal: &mut Tui,
    events: &mut EventHandler,
    manager: &mut ConversationManager,
) -> Result<()> {
    loop {
        terminal.draw(|frame| manager.draw(frame))?;

        let Some(event) = events.next().await else {
            return Ok(());
        };

        match event {
            AppEvent::Key(key) => {
                if manager.handle_key(key) == ConversationAction::Exit {
                    return Ok(());
                }
            }
            AppEvent::Tick => manager.on_tick(),
            AppEvent::Reply(reply) => manager.apply_reply(reply),
            AppEvent::Resize(_, _) => {}
        }
    }
}
