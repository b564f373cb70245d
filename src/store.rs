//! In-memory conversation state

use crate::error::ConversationError;
use crate::events::{Message, Sender};

/// Everything the chat view knows about the current session.
///
/// Lives only as long as the view that owns it; nothing here is persisted.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    draft: String,
    awaiting: bool,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the end of the conversation.
    ///
    /// User messages must contain something other than whitespace. Bot
    /// messages are accepted as-is, including empty completions.
    pub fn append_message(&mut self, message: Message) -> Result<(), ConversationError> {
        if message.sender() == Sender::User && message.text().trim().is_empty() {
            return Err(ConversationError::EmptyUserMessage);
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn set_draft_input(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn set_awaiting(&mut self, awaiting: bool) {
        self.awaiting = awaiting;
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Mutable access for in-place editing by the composer
    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.draft
    }

    pub fn is_awaiting(&self) -> bool {
        self.awaiting
    }

    /// Whether the send control is enabled
    pub fn can_send(&self) -> bool {
        !self.awaiting
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn messages_keep_insertion_order() {
        let mut state = ConversationState::new();
        state.append_message(Message::user("first")).unwrap();
        state.append_message(Message::bot("second")).unwrap();
        state.append_message(Message::user("third")).unwrap();

        let texts: Vec<&str> = state.messages().iter().map(|m| m.text()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn blank_user_message_is_rejected() {
        let mut state = ConversationState::new();
        assert_eq!(
            state.append_message(Message::user("  \n\t")),
            Err(ConversationError::EmptyUserMessage)
        );
        assert!(state.is_empty());
    }

    #[test]
    fn empty_bot_message_is_accepted() {
        let mut state = ConversationState::new();
        state.append_message(Message::bot("")).unwrap();
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn awaiting_disables_send() {
        let mut state = ConversationState::new();
        assert!(state.can_send());
        state.set_awaiting(true);
        assert!(state.is_awaiting());
        assert!(!state.can_send());
        state.set_awaiting(false);
        assert!(state.can_send());
    }

    #[test]
    fn draft_is_replaced_not_appended() {
        let mut state = ConversationState::new();
        state.set_draft_input("hello");
        state.set_draft_input("bye");
        assert_eq!(state.draft(), "bye");
        state.draft_mut().push('!');
        assert_eq!(state.draft(), "bye!");
    }
}
