//! Console presentation of session events.
//!
//! One forwarder task per broadcast channel, each rendering events either as
//! human-readable lines or as `{"channel", "payload"}` JSON lines for a
//! frontend process reading stdout.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use soundsight_core::ipc::events::{
    CONVERSATION_CHANNEL, LISTENING_CHANNEL, NAVIGATION_CHANNEL, SCENE_CHANNEL, STATUS_CHANNEL,
};
use soundsight_core::{
    ConversationEvent, ListeningEvent, ListeningState, NavStatus, NavigationEvent, Role,
    SceneEvent, SessionStatusEvent,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::settings::AppSettings;
use crate::state::{AppState, PerfMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct Presenter {
    mode: OutputMode,
    settings: Arc<Mutex<AppSettings>>,
}

impl Presenter {
    pub fn new(mode: OutputMode, settings: Arc<Mutex<AppSettings>>) -> Self {
        Self { mode, settings }
    }

    pub fn scene(&self, event: &SceneEvent) -> String {
        if self.mode == OutputMode::Json {
            return json_line(SCENE_CHANNEL, event);
        }
        let settings = self.settings.lock();
        let mut line = format!(
            "[scene #{}] {} objects, confidence {:.0}%, {:.1} fps",
            event.frame_seq,
            event.summary.count,
            event.summary.mean_confidence * 100.0,
            event.summary.throughput_fps,
        );
        for cue in &event.cues {
            line.push_str(&format!(
                "\n  {} {:<8} {:<11} az {:>5.1} gain {:.2}",
                cue.kind.marker(),
                cue.kind.as_str(),
                cue.direction.map_or("centre", |d| d.as_str()),
                cue.pan_position.azimuth_deg,
                settings.cue_gain(cue.intensity),
            ));
        }
        for issue in &event.issues {
            line.push_str(&format!("\n  ! object {}: {}", issue.source_id, issue.detail));
        }
        line
    }

    pub fn navigation(&self, event: &NavigationEvent) -> String {
        if self.mode == OutputMode::Json {
            return json_line(NAVIGATION_CHANNEL, event);
        }
        let snap = &event.snapshot;
        let destination = snap.state.destination_label.as_deref().unwrap_or("-");
        match snap.status {
            NavStatus::Idle => "[nav] guidance stopped".to_string(),
            NavStatus::Arrived => format!("[nav] arrived at {destination}"),
            NavStatus::Active(index) => {
                let Some(step) = snap.current_step.as_ref() else {
                    return format!("[nav] {destination}: step {}", index + 1);
                };
                let mut line = format!(
                    "[nav] {destination} {}/{}: {} ({})",
                    index + 1,
                    snap.total_steps,
                    step.instruction,
                    step.distance,
                );
                if step.has_hazards() {
                    line.push_str(&format!(" caution: {}", step.hazards.join(", ")));
                }
                if snap.held {
                    line.push_str(" [held]");
                }
                line
            }
        }
    }

    pub fn conversation(&self, event: &ConversationEvent) -> String {
        if self.mode == OutputMode::Json {
            return json_line(CONVERSATION_CHANNEL, event);
        }
        event
            .turns
            .iter()
            .map(|turn| {
                let who = match turn.role {
                    Role::User => "you",
                    Role::Assistant => "soundsight",
                };
                format!("[voice] {who}: {}", turn.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn listening(&self, event: &ListeningEvent) -> String {
        if self.mode == OutputMode::Json {
            return json_line(LISTENING_CHANNEL, event);
        }
        match event.state {
            ListeningState::Listening => "[voice] listening...".to_string(),
            ListeningState::Idle => "[voice] microphone idle".to_string(),
        }
    }

    pub fn status(&self, event: &SessionStatusEvent) -> String {
        if self.mode == OutputMode::Json {
            return json_line(STATUS_CHANNEL, event);
        }
        match &event.detail {
            Some(detail) => format!("[status] {:?}: {detail}", event.status),
            None => format!("[status] {:?}", event.status),
        }
    }
}

fn json_line<T: Serialize>(channel: &str, payload: &T) -> String {
    serde_json::json!({ "channel": channel, "payload": payload }).to_string()
}

/// Spawn one printing task per session channel.
pub fn spawn_forwarders(state: &AppState, presenter: Arc<Presenter>) -> Vec<JoinHandle<()>> {
    let session = &state.session;
    let perf = Arc::clone(&state.perf_metrics);

    let scene_presenter = Arc::clone(&presenter);
    let nav_presenter = Arc::clone(&presenter);
    let convo_presenter = Arc::clone(&presenter);
    let listen_presenter = Arc::clone(&presenter);

    vec![
        forward(session.subscribe_scene(), SCENE_CHANNEL, move |event| {
            render_timed(&perf, || scene_presenter.scene(event))
        }),
        forward(session.subscribe_navigation(), NAVIGATION_CHANNEL, move |event| {
            nav_presenter.navigation(event)
        }),
        forward(session.subscribe_conversation(), CONVERSATION_CHANNEL, move |event| {
            convo_presenter.conversation(event)
        }),
        forward(session.subscribe_listening(), LISTENING_CHANNEL, move |event| {
            listen_presenter.listening(event)
        }),
        forward(session.subscribe_status(), STATUS_CHANNEL, move |event| {
            presenter.status(event)
        }),
    ]
}

fn render_timed(perf: &Mutex<PerfMetrics>, render: impl FnOnce() -> String) -> String {
    let started = Instant::now();
    let line = render();
    perf.lock()
        .record_scene_render(started.elapsed().as_secs_f64() * 1_000.0);
    line
}

fn forward<T, F>(mut rx: broadcast::Receiver<T>, channel: &'static str, render: F) -> JoinHandle<()>
where
    T: Clone + Send + 'static,
    F: Fn(&T) -> String + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => println!("{}", render(&event)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(channel, "receiver lagged by {n} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundsight_core::navigation::catalog;
    use soundsight_core::spatial::{self, PulsePhase};
    use soundsight_core::{DetectedObject, DetectionFrame, NavigationEngine};

    fn presenter(mode: OutputMode) -> Presenter {
        Presenter::new(mode, Arc::new(Mutex::new(AppSettings::default())))
    }

    fn scene_event() -> SceneEvent {
        let frame = DetectionFrame::new(
            7,
            vec![DetectedObject {
                id: 2,
                kind: "door".into(),
                confidence: 0.88,
                position: soundsight_core::detection::FramePoint { x: 0.65, y: 0.35 },
                distance: 1.8,
                direction: "front-right".into(),
            }],
            30.0,
        );
        let mapping = spatial::map_frame(&frame, PulsePhase::default());
        SceneEvent {
            seq: 1,
            frame_seq: frame.seq,
            cues: mapping.cues,
            summary: spatial::summarize(&frame),
            issues: mapping.issues,
        }
    }

    #[test]
    fn scene_text_lists_each_cue_with_gain() {
        let text = presenter(OutputMode::Text).scene(&scene_event());
        assert!(text.starts_with("[scene #7] 1 objects, confidence 88%"), "{text}");
        assert!(text.contains("door"));
        assert!(text.contains("front-right"));
        // 0.82 intensity * 0.7 spatial * 0.8 master
        assert!(text.contains("gain 0.46"), "{text}");
    }

    #[test]
    fn json_mode_wraps_payload_with_channel() {
        let line = presenter(OutputMode::Json).scene(&scene_event());
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["channel"], SCENE_CHANNEL);
        assert_eq!(value["payload"]["frameSeq"], 7);
        assert_eq!(value["payload"]["cues"][0]["type"], "door");
    }

    #[test]
    fn navigation_text_shows_step_and_hazards() {
        let mut engine = NavigationEngine::new();
        engine.start("Café", catalog::demo_route()).unwrap();
        engine.advance();
        let event = NavigationEvent {
            seq: 3,
            snapshot: engine.snapshot(2),
        };
        let text = presenter(OutputMode::Text).navigation(&event);
        assert_eq!(
            text,
            "[nav] Café 2/6: Turn right at the door (2m) caution: door frame"
        );
    }

    #[test]
    fn listening_text_reflects_state() {
        let p = presenter(OutputMode::Text);
        let event = ListeningEvent {
            seq: 1,
            state: ListeningState::Listening,
        };
        assert_eq!(p.listening(&event), "[voice] listening...");
    }
}
