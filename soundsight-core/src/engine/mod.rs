//! `SoundSightSession`: one screen's worth of core state and drivers.
//!
//! ## Lifecycle
//!
//! ```text
//! SoundSightSession::new()
//!     ├─► start_detection()      → frame loop spawned, status = Detecting
//!     │       └─► stop_detection() → loop ends, status = Stopped
//!     ├─► start_navigation(dest) → engine Active(0), step driver spawned
//!     │       └─► stop_navigation() → engine Idle, driver aborted
//!     └─► start_listening()      → one delayed recognition scheduled
//!             └─► cancel_listening() → window closed, result discarded
//! ```
//!
//! ## Threading
//!
//! The navigation engine and voice dispatcher sit behind `parking_lot::Mutex`
//! so every writer (command handlers, step driver, recognition task) is
//! serialised. Timer effects re-check a generation/ticket under the lock
//! before applying, which makes `stop()`/`cancel()` safe at any moment.
//!
//! Drivers are spawned with `tokio::spawn`, so the start methods must be
//! called from inside a Tokio runtime.

pub mod diagnostics;

pub use diagnostics::{DiagnosticsSnapshot, SessionDiagnostics};

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use crate::{
    detection::{DetectionFilter, SourceHandle},
    error::{Result, SoundSightError},
    ipc::events::{
        ConversationEvent, ListeningEvent, NavigationEvent, SceneEvent, SessionStatus,
        SessionStatusEvent,
    },
    navigation::{
        catalog, ContinueOnHazard, HazardHook, HoldOnHazard, NavStatus, NavigationDriver,
        NavigationEngine, NavigationSnapshot, NavigationStep,
    },
    spatial::{self, PulsePhase},
    voice::{
        ConversationTurn, Exchange, ListeningDriver, ListeningState, RecognizerHandle,
        VoiceDispatcher,
    },
};

/// Broadcast channel capacity per event type.
const BROADCAST_CAP: usize = 256;

/// What the step driver does when the route reaches a hazardous step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HazardPolicy {
    /// Surface hazards only; keep auto-advancing.
    #[default]
    Continue,
    /// Pause auto-advance until `resume_navigation()`.
    Hold,
}

/// Configuration for `SoundSightSession`.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Cadence of the detection loop. Default: 1 s.
    pub frame_interval: Duration,
    /// Length of one cue pulse phase. Default: 800 ms.
    pub pulse_period: Duration,
    /// Auto-advance cadence for navigation steps. Default: 4 s.
    pub step_interval: Duration,
    /// Whether `start_navigation` spawns the step driver. Default: true.
    pub auto_advance: bool,
    pub hazard_policy: HazardPolicy,
    /// Simulated recognition latency after `start_listening`. Default: 3 s.
    pub recognition_delay: Duration,
    /// Turns shown by `conversation_view()`. Default: 6.
    pub history_view_len: usize,
    /// Upcoming steps included in navigation snapshots. Default: 2.
    pub upcoming_preview: usize,
    /// Pre-mapping filter built from user settings.
    pub filter: DetectionFilter,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(1_000),
            pulse_period: Duration::from_millis(800),
            step_interval: Duration::from_millis(4_000),
            auto_advance: true,
            hazard_policy: HazardPolicy::Continue,
            recognition_delay: Duration::from_millis(3_000),
            history_view_len: 6,
            upcoming_preview: 2,
            filter: DetectionFilter::default(),
        }
    }
}

/// Senders and counters shared with every driver task.
#[derive(Clone)]
pub struct SessionChannels {
    pub scene_tx: broadcast::Sender<SceneEvent>,
    pub navigation_tx: broadcast::Sender<NavigationEvent>,
    pub conversation_tx: broadcast::Sender<ConversationEvent>,
    pub listening_tx: broadcast::Sender<ListeningEvent>,
    pub status_tx: broadcast::Sender<SessionStatusEvent>,
    /// Monotonically increasing event sequence counter.
    pub seq: Arc<AtomicU64>,
    pub diagnostics: Arc<SessionDiagnostics>,
}

impl Default for SessionChannels {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionChannels {
    pub fn new() -> Self {
        let (scene_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (navigation_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (conversation_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (listening_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        Self {
            scene_tx,
            navigation_tx,
            conversation_tx,
            listening_tx,
            status_tx,
            seq: Arc::new(AtomicU64::new(0)),
            diagnostics: Arc::new(SessionDiagnostics::default()),
        }
    }

    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    // Send errors only mean nobody is subscribed right now.

    pub fn emit_navigation(&self, snapshot: NavigationSnapshot) {
        let _ = self.navigation_tx.send(NavigationEvent {
            seq: self.next_seq(),
            snapshot,
        });
    }

    pub fn emit_conversation(&self, turns: &[ConversationTurn]) {
        SessionDiagnostics::bump(&self.diagnostics.voice_dispatches, 1);
        let _ = self.conversation_tx.send(ConversationEvent {
            seq: self.next_seq(),
            turns: turns.to_vec(),
        });
    }

    pub fn emit_listening(&self, state: ListeningState) {
        let _ = self.listening_tx.send(ListeningEvent {
            seq: self.next_seq(),
            state,
        });
    }
}

/// The top-level session handle.
///
/// `SoundSightSession` is `Send + Sync`; wrap it in `Arc` to share between
/// command handlers and event-forwarding tasks.
pub struct SoundSightSession {
    config: SessionConfig,
    source: SourceHandle,
    recognizer: RecognizerHandle,
    navigation: Arc<Mutex<NavigationEngine>>,
    voice: Arc<Mutex<VoiceDispatcher>>,
    /// `true` while the detection loop is active.
    running: Arc<AtomicBool>,
    status: Arc<Mutex<SessionStatus>>,
    channels: SessionChannels,
    /// Origin for the cue pulse clock.
    started_at: Instant,
    detection_task: Mutex<Option<JoinHandle<()>>>,
    step_driver: Mutex<Option<NavigationDriver>>,
    listening_driver: Mutex<Option<ListeningDriver>>,
}

impl SoundSightSession {
    pub fn new(config: SessionConfig, source: SourceHandle, recognizer: RecognizerHandle) -> Self {
        let navigation = match config.hazard_policy {
            HazardPolicy::Continue => NavigationEngine::with_hook(ContinueOnHazard),
            HazardPolicy::Hold => NavigationEngine::with_hook(HoldOnHazard),
        };
        Self {
            config,
            source,
            recognizer,
            navigation: Arc::new(Mutex::new(navigation)),
            voice: Arc::new(Mutex::new(VoiceDispatcher::new())),
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(SessionStatus::Idle)),
            channels: SessionChannels::new(),
            started_at: Instant::now(),
            detection_task: Mutex::new(None),
            step_driver: Mutex::new(None),
            listening_driver: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replace the navigation hazard hook (overrides `hazard_policy`).
    pub fn set_hazard_hook<H: HazardHook>(&self, hook: H) {
        self.navigation.lock().set_hazard_hook(hook);
    }

    // ── Detection ────────────────────────────────────────────────────────

    /// Start polling the detection source and broadcasting mapped scenes.
    ///
    /// # Errors
    /// - `SoundSightError::AlreadyRunning` if the loop is already active.
    pub fn start_detection(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SoundSightError::AlreadyRunning);
        }

        self.channels.diagnostics.reset_detection();
        self.source.0.lock().reset();
        self.set_status(SessionStatus::Detecting, None);

        let source = self.source.clone();
        let running = Arc::clone(&self.running);
        let channels = self.channels.clone();
        let filter = self.config.filter.clone();
        let frame_interval = self.config.frame_interval.max(Duration::from_millis(1));
        let pulse_period = self.config.pulse_period;
        let started_at = self.started_at;

        let task = tokio::spawn(
            async move {
                let mut ticker = tokio::time::interval(frame_interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if !running.load(Ordering::Relaxed) {
                        break;
                    }
                    let phase = PulsePhase::at(started_at.elapsed(), pulse_period);
                    process_frame(&source, &filter, phase, &channels);
                }
                debug!("detection loop exited");
            }
            .instrument(tracing::info_span!("detection_loop")),
        );

        if let Some(previous) = self.detection_task.lock().replace(task) {
            previous.abort();
        }
        info!("detection started");
        Ok(())
    }

    /// Stop the detection loop.
    ///
    /// # Errors
    /// - `SoundSightError::NotRunning` if the loop is not active.
    pub fn stop_detection(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(SoundSightError::NotRunning);
        }
        if let Some(task) = self.detection_task.lock().take() {
            task.abort();
        }
        self.set_status(SessionStatus::Stopped, None);
        let diag = self.channels.diagnostics.snapshot();
        info!(
            frames_in = diag.frames_in,
            cues_emitted = diag.cues_emitted,
            mapping_issues = diag.mapping_issues,
            "detection stopped"
        );
        Ok(())
    }

    pub fn is_detecting(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Current session status (snapshot).
    pub fn status(&self) -> SessionStatus {
        *self.status.lock()
    }

    // ── Navigation ───────────────────────────────────────────────────────

    /// Start guidance to a catalog destination.
    ///
    /// # Errors
    /// `UnknownDestination` if `destination` is not in the catalog.
    pub fn start_navigation(&self, destination: &str) -> Result<NavigationSnapshot> {
        let (entry, route) = catalog::route_for(destination)?;
        self.start_route(entry.name, route)
    }

    /// Start guidance along an explicit route.
    ///
    /// # Errors
    /// `EmptyRoute` if `route` has no steps.
    pub fn start_route(
        &self,
        destination: &str,
        route: Vec<NavigationStep>,
    ) -> Result<NavigationSnapshot> {
        let snapshot = {
            let mut nav = self.navigation.lock();
            nav.start(destination, route)?;
            nav.snapshot(self.config.upcoming_preview)
        };
        self.channels.emit_navigation(snapshot.clone());

        let driver = if self.config.auto_advance && matches!(snapshot.status, NavStatus::Active(_))
        {
            Some(NavigationDriver::spawn(
                Arc::clone(&self.navigation),
                self.config.step_interval,
                self.config.upcoming_preview,
                self.channels.clone(),
            ))
        } else {
            None
        };
        if let Some(previous) = std::mem::replace(&mut *self.step_driver.lock(), driver) {
            previous.abort();
        }
        Ok(snapshot)
    }

    /// Advance one step by hand (e.g. a sensor-confirmed step completion).
    pub fn advance_navigation(&self) -> NavStatus {
        let (status, snapshot) = {
            let mut nav = self.navigation.lock();
            let status = nav.advance();
            (status, nav.snapshot(self.config.upcoming_preview))
        };
        self.channels.emit_navigation(snapshot);
        status
    }

    pub fn stop_navigation(&self) {
        let snapshot = {
            let mut nav = self.navigation.lock();
            nav.stop();
            nav.snapshot(self.config.upcoming_preview)
        };
        if let Some(driver) = self.step_driver.lock().take() {
            driver.abort();
        }
        self.channels.emit_navigation(snapshot);
    }

    /// Clear a hazard hold so auto-advance continues.
    pub fn resume_navigation(&self) {
        let snapshot = {
            let mut nav = self.navigation.lock();
            nav.resume();
            nav.snapshot(self.config.upcoming_preview)
        };
        self.channels.emit_navigation(snapshot);
    }

    pub fn navigation_snapshot(&self) -> NavigationSnapshot {
        self.navigation.lock().snapshot(self.config.upcoming_preview)
    }

    pub fn current_step(&self) -> Result<NavigationStep> {
        self.navigation.lock().current_step().cloned()
    }

    // ── Voice ────────────────────────────────────────────────────────────

    /// Answer a typed or tapped command immediately.
    pub fn dispatch_voice(&self, utterance: &str) -> [ConversationTurn; 2] {
        let pair = self.voice.lock().dispatch(utterance);
        self.channels.emit_conversation(&pair);
        pair
    }

    /// Open a listening window; one recognition completes after
    /// `recognition_delay`.
    ///
    /// # Errors
    /// `AlreadyListening` if a window is already open.
    pub fn start_listening(&self) -> Result<()> {
        let driver = ListeningDriver::spawn(
            Arc::clone(&self.voice),
            self.recognizer.clone(),
            self.config.recognition_delay,
            self.channels.clone(),
        )?;
        if let Some(previous) = self.listening_driver.lock().replace(driver) {
            previous.abort();
        }
        Ok(())
    }

    /// Close the listening window without dispatching.
    ///
    /// Returns `false` if nothing was listening.
    pub fn cancel_listening(&self) -> bool {
        let cancelled = self.voice.lock().cancel();
        if let Some(driver) = self.listening_driver.lock().take() {
            driver.abort();
        }
        if cancelled {
            SessionDiagnostics::bump(&self.channels.diagnostics.recognitions_discarded, 1);
            self.channels.emit_listening(ListeningState::Idle);
        }
        cancelled
    }

    pub fn listening_state(&self) -> ListeningState {
        self.voice.lock().listening_state()
    }

    /// The bounded suffix of the conversation shown on screen.
    pub fn conversation_view(&self) -> Vec<ConversationTurn> {
        self.voice.lock().recent(self.config.history_view_len).to_vec()
    }

    /// Full conversation history.
    pub fn conversation_history(&self) -> Vec<ConversationTurn> {
        self.voice.lock().history().to_vec()
    }

    pub fn last_exchange(&self) -> Option<Exchange> {
        self.voice.lock().last_exchange()
    }

    // ── Subscriptions ────────────────────────────────────────────────────

    pub fn subscribe_scene(&self) -> broadcast::Receiver<SceneEvent> {
        self.channels.scene_tx.subscribe()
    }

    pub fn subscribe_navigation(&self) -> broadcast::Receiver<NavigationEvent> {
        self.channels.navigation_tx.subscribe()
    }

    pub fn subscribe_conversation(&self) -> broadcast::Receiver<ConversationEvent> {
        self.channels.conversation_tx.subscribe()
    }

    pub fn subscribe_listening(&self) -> broadcast::Receiver<ListeningEvent> {
        self.channels.listening_tx.subscribe()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<SessionStatusEvent> {
        self.channels.status_tx.subscribe()
    }

    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.channels.diagnostics.snapshot()
    }

    /// Stop every driver and reset navigation and listening. Safe to call
    /// repeatedly.
    pub fn shutdown(&self) {
        if self.is_detecting() {
            let _ = self.stop_detection();
        }
        self.cancel_listening();
        self.stop_navigation();
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    fn set_status(&self, new_status: SessionStatus, detail: Option<String>) {
        *self.status.lock() = new_status;
        let _ = self.channels.status_tx.send(SessionStatusEvent {
            status: new_status,
            detail,
        });
    }
}

impl Drop for SoundSightSession {
    fn drop(&mut self) {
        if let Some(task) = self.detection_task.get_mut().take() {
            task.abort();
        }
    }
}

/// Pull one frame, map it, and broadcast the scene.
fn process_frame(
    source: &SourceHandle,
    filter: &DetectionFilter,
    phase: PulsePhase,
    channels: &SessionChannels,
) {
    let diag = &channels.diagnostics;
    let frame = match source.0.lock().next_frame() {
        Ok(frame) => frame,
        Err(e) => {
            SessionDiagnostics::bump(&diag.source_errors, 1);
            warn!("detection source failed: {e}");
            return;
        }
    };
    SessionDiagnostics::bump(&diag.frames_in, 1);
    SessionDiagnostics::bump(&diag.objects_in, frame.objects.len());

    let kept = filter.apply(&frame);
    SessionDiagnostics::bump(&diag.objects_filtered, frame.objects.len() - kept.objects.len());

    let mapping = spatial::map_frame(&kept, phase);
    let summary = spatial::summarize(&kept);
    for issue in &mapping.issues {
        warn!(source_id = issue.source_id, kind = ?issue.kind, "{}", issue.detail);
    }
    SessionDiagnostics::bump(&diag.cues_emitted, mapping.cues.len());
    SessionDiagnostics::bump(&diag.mapping_issues, mapping.issues.len());

    let _ = channels.scene_tx.send(SceneEvent {
        seq: channels.next_seq(),
        frame_seq: kept.seq,
        cues: mapping.cues,
        summary,
        issues: mapping.issues,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{DetectedObject, DetectionFrame, DetectionSource, FramePoint, ObjectKind};
    use crate::spatial::IssueKind;

    struct FixedSource {
        frames: Vec<DetectionFrame>,
    }

    impl DetectionSource for FixedSource {
        fn next_frame(&mut self) -> Result<DetectionFrame> {
            if self.frames.is_empty() {
                return Err(SoundSightError::Source("exhausted".into()));
            }
            Ok(self.frames.remove(0))
        }

        fn reset(&mut self) {}
    }

    fn object(id: u64, kind: ObjectKind, confidence: f32, direction: &str) -> DetectedObject {
        DetectedObject {
            id,
            kind,
            confidence,
            position: FramePoint { x: 0.5, y: 0.5 },
            distance: 3.0,
            direction: direction.into(),
        }
    }

    #[test]
    fn process_frame_filters_maps_and_counts() {
        let channels = SessionChannels::new();
        let mut rx = channels.scene_tx.subscribe();
        let source = SourceHandle::new(FixedSource {
            frames: vec![DetectionFrame::new(
                5,
                vec![
                    object(1, ObjectKind::Person, 0.9, "front-left"),
                    object(2, ObjectKind::Vehicle, 0.9, "left"),
                    object(3, ObjectKind::Door, 0.4, "front-right"),
                    object(4, ObjectKind::Stairs, 0.8, "upstairs"),
                ],
                30.0,
            )],
        });
        let filter = DetectionFilter {
            min_confidence: 0.7,
            disabled_kinds: vec![ObjectKind::Vehicle],
        };

        process_frame(&source, &filter, PulsePhase::default(), &channels);

        let event = rx.try_recv().expect("scene event");
        assert_eq!(event.frame_seq, 5);
        assert_eq!(event.summary.count, 2);
        let ids: Vec<u64> = event.cues.iter().map(|c| c.source_id).collect();
        assert_eq!(ids, vec![1, 4]);
        assert_eq!(event.issues.len(), 1);

        let diag = channels.diagnostics.snapshot();
        assert_eq!(diag.frames_in, 1);
        assert_eq!(diag.objects_in, 4);
        assert_eq!(diag.objects_filtered, 2);
        assert_eq!(diag.cues_emitted, 2);
        assert_eq!(diag.mapping_issues, 1);
    }

    #[test]
    fn process_frame_reports_malformed_confidences() {
        let channels = SessionChannels::new();
        let mut rx = channels.scene_tx.subscribe();
        let source = SourceHandle::new(FixedSource {
            frames: vec![DetectionFrame::new(
                9,
                vec![
                    object(1, ObjectKind::Person, f32::NAN, "front"),
                    object(2, ObjectKind::Door, -0.5, "left"),
                    object(3, ObjectKind::Stairs, 0.9, "right"),
                ],
                30.0,
            )],
        });

        process_frame(
            &source,
            &DetectionFilter::default(),
            PulsePhase::default(),
            &channels,
        );

        let event = rx.try_recv().expect("scene event");
        let ids: Vec<u64> = event.cues.iter().map(|c| c.source_id).collect();
        assert_eq!(ids, vec![3]);
        let issues: Vec<u64> = event
            .issues
            .iter()
            .filter(|i| i.kind == IssueKind::InvalidDetection)
            .map(|i| i.source_id)
            .collect();
        assert_eq!(issues, vec![1, 2]);

        let diag = channels.diagnostics.snapshot();
        assert_eq!(diag.objects_filtered, 0);
        assert_eq!(diag.mapping_issues, 2);
    }

    #[test]
    fn process_frame_survives_source_errors() {
        let channels = SessionChannels::new();
        let mut rx = channels.scene_tx.subscribe();
        let source = SourceHandle::new(FixedSource { frames: Vec::new() });

        process_frame(
            &source,
            &DetectionFilter::default(),
            PulsePhase::default(),
            &channels,
        );

        assert!(rx.try_recv().is_err());
        assert_eq!(channels.diagnostics.snapshot().source_errors, 1);
    }

    #[test]
    fn default_config_matches_product_timings() {
        let config = SessionConfig::default();
        assert_eq!(config.frame_interval, Duration::from_secs(1));
        assert_eq!(config.pulse_period, Duration::from_millis(800));
        assert_eq!(config.step_interval, Duration::from_secs(4));
        assert_eq!(config.recognition_delay, Duration::from_secs(3));
        assert_eq!(config.history_view_len, 6);
        assert_eq!(config.hazard_policy, HazardPolicy::Continue);
    }
}
