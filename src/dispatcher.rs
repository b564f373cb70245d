//! Turns a draft into a completion request and folds the reply back into the
//! conversation.
//!
//! Sending is split in three so the UI never blocks: [`Dispatcher::begin`]
//! mutates state synchronously, [`PendingRequest::dispatch`] runs on its own
//! task without touching state, and [`Dispatcher::settle`] applies the
//! result. Each request carries the generation it was issued under; replies
//! from an older generation are dropped.

use crate::error::CompletionError;
use crate::events::{Message, Sender};
use crate::llm::{CompletionBackend, LlmMessage};
use crate::store::ConversationState;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bot text shown for any failed request
pub const FAILURE_NOTICE: &str =
    "⚠️ Something went wrong. Please check that your API key is correct and that you are online.";

/// Which turns go upstream with each request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextMode {
    /// Only the text just submitted
    #[default]
    LatestOnly,
    /// Every earlier turn followed by the new one, minus failure notices
    FullHistory,
}

/// A request that has been accepted but not yet sent
#[derive(Debug, Clone)]
pub struct PendingRequest {
    generation: u64,
    messages: Vec<LlmMessage>,
}

impl PendingRequest {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn messages(&self) -> &[LlmMessage] {
        &self.messages
    }

    /// Perform the network call. Safe to run on a spawned task.
    pub async fn dispatch(self, backend: &dyn CompletionBackend) -> Reply {
        let outcome = backend.complete(&self.messages).await;
        Reply {
            generation: self.generation,
            outcome,
        }
    }
}

/// The settled result of a [`PendingRequest`]
#[derive(Debug)]
pub struct Reply {
    generation: u64,
    outcome: Result<String, CompletionError>,
}

impl Reply {
    pub fn new(generation: u64, outcome: Result<String, CompletionError>) -> Self {
        Self { generation, outcome }
    }
}

/// Sends user turns to a completion backend, one at a time
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn CompletionBackend>,
    context: ContextMode,
    generation: u64,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn CompletionBackend>, context: ContextMode) -> Self {
        Self {
            backend,
            context,
            generation: 0,
        }
    }

    /// Shared handle to the backend, for spawning [`PendingRequest::dispatch`]
    pub fn backend(&self) -> Arc<dyn CompletionBackend> {
        Arc::clone(&self.backend)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Accept the current draft.
    ///
    /// Returns `None` without touching state when the draft is blank or a
    /// request is already in flight. Otherwise appends the user message,
    /// clears the draft and marks the conversation as awaiting.
    pub fn begin(&mut self, state: &mut ConversationState) -> Option<PendingRequest> {
        if !state.can_send() {
            debug!("send ignored while a reply is pending");
            return None;
        }

        let text = state.draft().to_string();
        if state.append_message(Message::user(text)).is_err() {
            return None;
        }
        state.set_draft_input(String::new());
        state.set_awaiting(true);

        let messages = self.outgoing_messages(state);
        debug!(generation = self.generation, turns = messages.len(), "request accepted");

        Some(PendingRequest {
            generation: self.generation,
            messages,
        })
    }

    /// Apply a reply to the conversation.
    ///
    /// Returns false if the reply was issued before the last
    /// [`invalidate`](Self::invalidate) and has been discarded.
    pub fn settle(&self, state: &mut ConversationState, reply: Reply) -> bool {
        if reply.generation != self.generation {
            debug!(
                reply_generation = reply.generation,
                current = self.generation,
                "discarding reply from a stale request"
            );
            return false;
        }

        let message = match reply.outcome {
            Ok(text) => {
                info!(chars = text.chars().count(), "completion received");
                Message::bot(text)
            }
            Err(err) => {
                warn!(error = %err, "completion request failed");
                Message::bot(FAILURE_NOTICE)
            }
        };

        // Bot messages are never rejected by the store.
        let _ = state.append_message(message);
        state.set_awaiting(false);
        true
    }

    /// Begin, dispatch and settle in one go. Returns whether a request was sent.
    pub async fn send(&mut self, state: &mut ConversationState) -> bool {
        let Some(pending) = self.begin(state) else {
            return false;
        };
        let backend = self.backend();
        let reply = pending.dispatch(backend.as_ref()).await;
        self.settle(state, reply);
        true
    }

    /// Orphan every request issued so far. Their replies will be ignored.
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    fn outgoing_messages(&self, state: &ConversationState) -> Vec<LlmMessage> {
        match self.context {
            ContextMode::LatestOnly => state
                .messages()
                .last()
                .map(|m| vec![LlmMessage::user(m.text())])
                .unwrap_or_default(),
            ContextMode::FullHistory => state
                .messages()
                .iter()
                .filter(|m| !(m.sender() == Sender::Bot && m.text() == FAILURE_NOTICE))
                .map(|m| LlmMessage {
                    role: m.sender().role().to_string(),
                    content: m.text().to_string(),
                })
                .collect(),
        }
    }
}
