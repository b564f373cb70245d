use crate::dispatcher::{Dispatcher, Reply};
use crate::events::AppEvent;
use crate::store::ConversationState;
use crate::ui::conversation::{ComposerResult, ConversationComposer, ConversationHistory};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
};
use tokio::sync::mpsc;
use tracing::debug;

const SCROLL_STEP: usize = 5;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Owns the conversation state and wires the composer, history and
/// dispatcher together
pub struct ConversationManager {
    state: ConversationState,
    composer: ConversationComposer,
    dispatcher: Dispatcher,
    events: mpsc::UnboundedSender<AppEvent>,
    title: String,
    model: String,
    tick: usize,
    scroll_back: usize,
}

impl ConversationManager {
    pub fn new(
        dispatcher: Dispatcher,
        events: mpsc::UnboundedSender<AppEvent>,
        title: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            state: ConversationState::new(),
            composer: ConversationComposer::new("Type your question..."),
            dispatcher,
            events,
            title: title.into(),
            model: model.into(),
            tick: 0,
            scroll_back: 0,
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        match key.code {
            KeyCode::Esc => return ConversationAction::Exit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return ConversationAction::Exit;
            }
            KeyCode::PageUp => {
                self.scroll_back = self.scroll_back.saturating_add(SCROLL_STEP);
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.scroll_back = self.scroll_back.saturating_sub(SCROLL_STEP);
                return ConversationAction::None;
            }
            _ => {}
        }

        if self.composer.handle_key(key, self.state.draft_mut()) == ComposerResult::Submit {
            self.submit();
        }
        ConversationAction::None
    }

    /// Accept the draft and start the request on a background task
    fn submit(&mut self) {
        let Some(pending) = self.dispatcher.begin(&mut self.state) else {
            return;
        };
        self.composer.reset();
        self.scroll_back = 0;

        let backend = self.dispatcher.backend();
        let events = self.events.clone();
        tokio::spawn(async move {
            let reply = pending.dispatch(backend.as_ref()).await;
            if events.send(AppEvent::Reply(reply)).is_err() {
                debug!("chat view closed before the reply arrived");
            }
        });
    }

    /// Fold a settled request into the conversation
    pub fn apply_reply(&mut self, reply: Reply) {
        if self.dispatcher.settle(&mut self.state, reply) {
            self.scroll_back = 0;
        }
    }

    /// Advance the typing animation
    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    /// Called when the view goes away; any reply still in flight is ignored
    pub fn teardown(&mut self) {
        if self.state.is_awaiting() {
            debug!("abandoning in-flight request");
        }
        self.dispatcher.invalidate();
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Render the conversation UI components
    pub fn draw(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // History area
                Constraint::Length(3), // Composer area
            ])
            .split(frame.size());

        let history = ConversationHistory::new(self.state.messages(), &self.title, &self.model)
            .awaiting(self.state.is_awaiting(), self.tick)
            .scroll_back(self.scroll_back);
        frame.render_widget(history, chunks[0]);

        frame.render_widget(
            self.composer.view(self.state.draft(), self.state.can_send()),
            chunks[1],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{ContextMode, FAILURE_NOTICE};
    use crate::error::CompletionError;
    use crate::events::{Message, Sender};
    use crate::llm::{CompletionBackend, LlmMessage};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use ratatui::{Terminal, backend::TestBackend};
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl CompletionBackend for Echo {
        async fn complete(&self, messages: &[LlmMessage]) -> Result<String, CompletionError> {
            match messages.last() {
                Some(m) if m.content == "fail" => Err(CompletionError::MissingCredential),
                Some(m) => Ok(format!("echo: {}", m.content)),
                None => Ok(String::new()),
            }
        }
    }

    fn manager() -> (ConversationManager, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(Arc::new(Echo), ContextMode::LatestOnly);
        (ConversationManager::new(dispatcher, tx, "Chat", "echo-model"), rx)
    }

    fn type_text(manager: &mut ConversationManager, text: &str) {
        for c in text.chars() {
            manager.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
    }

    fn enter(manager: &mut ConversationManager) {
        manager.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
    }

    async fn next_reply(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Reply {
        match rx.recv().await {
            Some(AppEvent::Reply(reply)) => reply,
            other => panic!("expected a reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn enter_sends_and_reply_is_applied() {
        let (mut manager, mut rx) = manager();
        type_text(&mut manager, "hi");
        enter(&mut manager);

        assert_eq!(manager.state().draft(), "");
        assert!(manager.state().is_awaiting());
        assert_eq!(manager.state().messages(), &[Message::user("hi")]);

        let reply = next_reply(&mut rx).await;
        manager.apply_reply(reply);

        assert!(!manager.state().is_awaiting());
        assert_eq!(manager.state().messages()[1], Message::bot("echo: hi"));
    }

    #[tokio::test]
    async fn enter_is_ignored_while_awaiting() {
        let (mut manager, mut rx) = manager();
        type_text(&mut manager, "first");
        enter(&mut manager);

        type_text(&mut manager, "second");
        enter(&mut manager);
        assert_eq!(manager.state().len(), 1);
        assert_eq!(manager.state().draft(), "second");

        manager.apply_reply(next_reply(&mut rx).await);
        assert_eq!(manager.state().len(), 2);

        enter(&mut manager);
        assert_eq!(manager.state().len(), 3);
        manager.apply_reply(next_reply(&mut rx).await);
        assert_eq!(manager.state().messages()[3], Message::bot("echo: second"));
    }

    #[tokio::test]
    async fn failure_is_shown_as_notice() {
        let (mut manager, mut rx) = manager();
        type_text(&mut manager, "fail");
        enter(&mut manager);
        manager.apply_reply(next_reply(&mut rx).await);

        let last = manager.state().messages().last().unwrap();
        assert_eq!(last.sender(), Sender::Bot);
        assert_eq!(last.text(), FAILURE_NOTICE);
    }

    #[tokio::test]
    async fn reply_after_teardown_is_dropped() {
        let (mut manager, mut rx) = manager();
        type_text(&mut manager, "bye");
        enter(&mut manager);
        manager.teardown();

        manager.apply_reply(next_reply(&mut rx).await);
        assert_eq!(manager.state().len(), 1);
    }

    #[test]
    fn escape_and_ctrl_c_exit() {
        let (mut manager, _rx) = manager();
        assert_eq!(
            manager.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
            ConversationAction::Exit
        );
        assert_eq!(
            manager.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            ConversationAction::Exit
        );
        assert_eq!(manager.state().draft(), "");
    }

    #[tokio::test]
    async fn draw_shows_typing_indicator_while_awaiting() {
        let (mut manager, _rx) = manager();
        type_text(&mut manager, "question");
        enter(&mut manager);

        let mut terminal = Terminal::new(TestBackend::new(50, 12)).unwrap();
        terminal.draw(|frame| manager.draw(frame)).unwrap();

        let buffer = terminal.backend().buffer();
        let screen: String = buffer.content.iter().map(|cell| cell.symbol()).collect();
        assert!(screen.contains("Assistant is typing"));
        assert!(screen.contains("Sending..."));
        assert!(screen.contains("question"));
    }
}
