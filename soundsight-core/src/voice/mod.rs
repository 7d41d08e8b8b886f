//! Voice command dispatch and conversation history.
//!
//! `VoiceDispatcher` owns the session's conversation. `dispatch()` is the only
//! mutator and always appends a `user` + `assistant` pair under one `&mut`
//! borrow, so a half-written exchange is never observable.
//!
//! ## Listening
//!
//! ```text
//! Idle ──begin_listening()──► Listening ──complete(ticket)──► Idle
//!                                 │
//!                                 └──cancel()──► Idle   (pending completion is dropped)
//! ```
//!
//! Every `begin_listening()` hands out a fresh `ListenTicket`. A completion
//! carrying anything other than the current ticket is stale and discarded.

pub mod commands;
pub mod driver;

#[cfg(feature = "simulated")]
pub mod simulated;

pub use commands::{CommandTable, VoiceCommand, COMMANDS, FALLBACK_RESPONSE};
pub use driver::ListeningDriver;

#[cfg(feature = "simulated")]
pub use simulated::SimulatedRecognizer;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SoundSightError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One side of an exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    /// Position in the session history, starting at 0.
    pub seq: u64,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// The most recent command and the answer it got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub command: String,
    pub response: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListeningState {
    Idle,
    Listening,
}

/// Identifies one listening window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenTicket(u64);

/// Contract for speech recognition backends.
pub trait Recognizer: Send + 'static {
    /// Produce the utterance heard during the listening window, or `None` if
    /// nothing intelligible was captured.
    fn recognize_utterance(&mut self) -> Option<String>;
}

/// Shared handle to any `Recognizer` implementor.
#[derive(Clone)]
pub struct RecognizerHandle(pub Arc<Mutex<dyn Recognizer>>);

impl RecognizerHandle {
    pub fn new<R: Recognizer>(recognizer: R) -> Self {
        Self(Arc::new(Mutex::new(recognizer)))
    }
}

impl std::fmt::Debug for RecognizerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognizerHandle").finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct VoiceDispatcher {
    table: CommandTable,
    history: Vec<ConversationTurn>,
    listening: Option<ListenTicket>,
    next_ticket: u64,
}

impl Default for VoiceDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceDispatcher {
    pub fn new() -> Self {
        Self::with_table(CommandTable::default())
    }

    pub fn with_table(table: CommandTable) -> Self {
        Self {
            table,
            history: Vec::new(),
            listening: None,
            next_ticket: 0,
        }
    }

    /// Response for `utterance`; unknown input gets the fallback, never an error.
    pub fn recognize(&self, utterance: &str) -> &str {
        self.table.respond(utterance)
    }

    /// Answer `utterance` and append the exchange to history.
    ///
    /// Returns the two appended turns, user first.
    pub fn dispatch(&mut self, utterance: &str) -> [ConversationTurn; 2] {
        let response = self.recognize(utterance).to_string();
        let now = Utc::now();
        let base = self.history.len() as u64;
        let pair = [
            ConversationTurn {
                seq: base,
                role: Role::User,
                text: utterance.to_string(),
                timestamp: now,
            },
            ConversationTurn {
                seq: base + 1,
                role: Role::Assistant,
                text: response,
                timestamp: now,
            },
        ];
        self.history.extend(pair.iter().cloned());
        debug!(utterance, turns = self.history.len(), "voice command dispatched");
        pair
    }

    /// Full session history, oldest first.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// At most the last `n` turns. A view only; history is untouched.
    pub fn recent(&self, n: usize) -> &[ConversationTurn] {
        let from = self.history.len().saturating_sub(n);
        &self.history[from..]
    }

    pub fn last_exchange(&self) -> Option<Exchange> {
        match self.history.as_slice() {
            [.., user, assistant]
                if user.role == Role::User && assistant.role == Role::Assistant =>
            {
                Some(Exchange {
                    command: user.text.clone(),
                    response: assistant.text.clone(),
                })
            }
            _ => None,
        }
    }

    pub fn listening_state(&self) -> ListeningState {
        if self.listening.is_some() {
            ListeningState::Listening
        } else {
            ListeningState::Idle
        }
    }

    /// Open a listening window.
    ///
    /// # Errors
    /// `AlreadyListening` if a window is already open.
    pub fn begin_listening(&mut self) -> Result<ListenTicket> {
        if self.listening.is_some() {
            return Err(SoundSightError::AlreadyListening);
        }
        self.next_ticket += 1;
        let ticket = ListenTicket(self.next_ticket);
        self.listening = Some(ticket);
        info!("listening");
        Ok(ticket)
    }

    /// Whether `ticket` still identifies the open listening window.
    pub fn is_current(&self, ticket: ListenTicket) -> bool {
        self.listening == Some(ticket)
    }

    /// Apply a recognition result for `ticket`.
    ///
    /// Returns the appended pair, or `None` when the ticket is stale (the
    /// window was cancelled or superseded) or nothing was heard. Only a
    /// current ticket closes the window.
    pub fn complete_listening(
        &mut self,
        ticket: ListenTicket,
        utterance: Option<&str>,
    ) -> Option<[ConversationTurn; 2]> {
        if !self.is_current(ticket) {
            debug!(?ticket, "discarding stale recognition result");
            return None;
        }
        self.listening = None;
        match utterance {
            Some(text) => Some(self.dispatch(text)),
            None => {
                info!("listening ended without an utterance");
                None
            }
        }
    }

    /// Close the listening window without dispatching.
    ///
    /// Returns `false` if nothing was listening.
    pub fn cancel(&mut self) -> bool {
        let was_listening = self.listening.take().is_some();
        if was_listening {
            info!("listening cancelled");
        }
        was_listening
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }
}
