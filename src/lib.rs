//! Parley: a terminal chat client for OpenAI-compatible completion endpoints.
//!
//! One in-memory conversation, one request per user turn. The
//! [`dispatcher`] owns the send/settle rules, [`llm`] the single network
//! call, and [`ui`] the ratatui view.

pub mod app;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod llm;
pub mod logging;
pub mod store;
pub mod tui;
pub mod ui;

pub use config::Config;
pub use dispatcher::{ContextMode, Dispatcher, FAILURE_NOTICE, PendingRequest, Reply};
pub use error::{CompletionError, ConversationError};
pub use events::{Message, Sender};
pub use llm::{CompletionBackend, LlmClient, LlmMessage};
pub use store::ConversationState;
