//! Single-shot recognition task.
//!
//! `ListeningDriver::spawn` opens a listening window, waits out the
//! recognition delay, asks the recognizer for an utterance and dispatches it,
//! but only if the window is still the one it opened.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info_span, Instrument};

use super::{ListeningState, RecognizerHandle, VoiceDispatcher};
use crate::engine::{SessionChannels, SessionDiagnostics};
use crate::error::Result;

pub struct ListeningDriver {
    handle: JoinHandle<()>,
}

impl ListeningDriver {
    /// Open a window on `dispatcher` and schedule its completion.
    ///
    /// # Errors
    /// `AlreadyListening` if `dispatcher` already has an open window.
    pub fn spawn(
        dispatcher: Arc<Mutex<VoiceDispatcher>>,
        recognizer: RecognizerHandle,
        delay: Duration,
        channels: SessionChannels,
    ) -> Result<Self> {
        let ticket = dispatcher.lock().begin_listening()?;
        channels.emit_listening(ListeningState::Listening);

        let handle = tokio::spawn(
            async move {
                tokio::time::sleep(delay).await;

                if !dispatcher.lock().is_current(ticket) {
                    SessionDiagnostics::bump(&channels.diagnostics.recognitions_discarded, 1);
                    debug!("listening window closed before recognition finished");
                    return;
                }

                let heard = recognizer.0.lock().recognize_utterance();

                // Re-checked under the same lock that applies the result.
                let outcome = {
                    let mut voice = dispatcher.lock();
                    if voice.is_current(ticket) {
                        Some(voice.complete_listening(ticket, heard.as_deref()))
                    } else {
                        None
                    }
                };

                match outcome {
                    Some(turns) => {
                        if let Some(turns) = turns {
                            channels.emit_conversation(&turns);
                        }
                        channels.emit_listening(ListeningState::Idle);
                    }
                    None => {
                        SessionDiagnostics::bump(&channels.diagnostics.recognitions_discarded, 1);
                    }
                }
            }
            .instrument(info_span!("listening")),
        );

        Ok(Self { handle })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    pub async fn join(mut self) {
        let _ = (&mut self.handle).await;
    }
}

impl Drop for ListeningDriver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
