//! Conversation UI components for the chat view

pub mod composer;
pub mod history;
pub mod indicator;
pub mod manager;

pub use composer::{ComposerResult, ConversationComposer};
pub use history::ConversationHistory;
pub use indicator::TypingIndicator;
pub use manager::{ConversationAction, ConversationManager};
