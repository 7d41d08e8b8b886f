//! Fixed-cadence step driver.
//!
//! Calls `advance()` once per `interval` until the route reaches a terminal
//! state. Each tick takes the engine lock, checks that the route it was
//! spawned for is still the current one, and only then applies. A tick that
//! fires after `stop()` or a restart therefore changes nothing.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info_span, Instrument};

use super::{NavStatus, NavigationEngine};
use crate::engine::{SessionChannels, SessionDiagnostics};

enum Tick {
    Stale,
    Held,
    Applied(NavStatus),
}

pub struct NavigationDriver {
    handle: JoinHandle<()>,
    generation: u64,
}

impl NavigationDriver {
    /// Spawn the driver for the route currently loaded in `engine`.
    pub fn spawn(
        engine: Arc<Mutex<NavigationEngine>>,
        interval: Duration,
        upcoming: usize,
        channels: SessionChannels,
    ) -> Self {
        let generation = engine.lock().generation();
        let interval = interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(
            async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                // The first tick completes immediately; step 0 gets a full interval.
                ticker.tick().await;

                loop {
                    ticker.tick().await;
                    let (tick, snapshot) = {
                        let mut nav = engine.lock();
                        if nav.generation() != generation {
                            (Tick::Stale, None)
                        } else if nav.is_held() {
                            (Tick::Held, None)
                        } else {
                            let status = nav.advance();
                            (Tick::Applied(status), Some(nav.snapshot(upcoming)))
                        }
                    };

                    let diag = &channels.diagnostics;
                    match tick {
                        Tick::Stale => {
                            SessionDiagnostics::bump(&diag.nav_ticks_discarded, 1);
                            debug!("route replaced or stopped; driver exiting");
                            break;
                        }
                        Tick::Held => {
                            SessionDiagnostics::bump(&diag.nav_ticks_held, 1);
                        }
                        Tick::Applied(status) => {
                            SessionDiagnostics::bump(&diag.nav_ticks, 1);
                            if let Some(snapshot) = snapshot {
                                channels.emit_navigation(snapshot);
                            }
                            if !matches!(status, NavStatus::Active(_)) {
                                break;
                            }
                        }
                    }
                }
            }
            .instrument(info_span!("navigation_driver", generation)),
        );

        Self { handle, generation }
    }

    /// Generation of the route this driver advances.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Wait for the driver to reach a terminal state or notice it is stale.
    pub async fn join(mut self) {
        let _ = (&mut self.handle).await;
    }
}

impl Drop for NavigationDriver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
