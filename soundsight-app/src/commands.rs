//! Command handlers.
//!
//! Each handler is what a frontend action maps to: it takes the shared
//! `AppState`, calls into the session and returns a serialisable payload or
//! an error string for display. Handlers that spawn drivers must run inside
//! the Tokio runtime.

use std::time::Instant;

use soundsight_core::navigation::catalog::{self, Destination};
use soundsight_core::navigation::{ContinueOnHazard, HoldOnHazard};
use soundsight_core::voice::commands::{VoiceCommand, COMMANDS};
use soundsight_core::{
    ConversationTurn, ListeningState, NavigationSnapshot, NavigationStep, SessionStatus,
};
use tracing::info;

use crate::settings::{save_settings, AppSettings};
use crate::state::{AppState, PerfSnapshot};

/// Start the camera detection loop.
pub fn start_camera(state: &AppState) -> Result<(), String> {
    if !state.settings.lock().detection.object_detection {
        return Err("object detection is disabled in settings".into());
    }
    state.session.start_detection().map_err(|e| e.to_string())
}

/// Stop the camera detection loop.
pub fn stop_camera(state: &AppState) -> Result<(), String> {
    state.session.stop_detection().map_err(|e| e.to_string())?;
    let diag = state.session.diagnostics_snapshot();
    info!(
        frames_in = diag.frames_in,
        cues_emitted = diag.cues_emitted,
        mapping_issues = diag.mapping_issues,
        "detection diagnostics on stop"
    );
    Ok(())
}

pub fn get_status(state: &AppState) -> SessionStatus {
    state.session.status()
}

pub fn list_destinations() -> &'static [Destination] {
    &catalog::DESTINATIONS
}

/// Start guidance to one of the quick destinations.
pub fn start_navigation(state: &AppState, destination: &str) -> Result<NavigationSnapshot, String> {
    let destination = destination.trim();
    if destination.is_empty() {
        return Err("destination is required".into());
    }
    state
        .session
        .start_navigation(destination)
        .map_err(|e| e.to_string())
}

pub fn stop_navigation(state: &AppState) -> NavigationSnapshot {
    state.session.stop_navigation();
    state.session.navigation_snapshot()
}

/// Skip to the next step without waiting for the driver.
pub fn advance_navigation(state: &AppState) -> NavigationSnapshot {
    state.session.advance_navigation();
    state.session.navigation_snapshot()
}

/// Release a hazard hold.
pub fn resume_navigation(state: &AppState) -> NavigationSnapshot {
    state.session.resume_navigation();
    state.session.navigation_snapshot()
}

pub fn navigation_status(state: &AppState) -> NavigationSnapshot {
    state.session.navigation_snapshot()
}

pub fn current_step(state: &AppState) -> Result<NavigationStep, String> {
    state.session.current_step().map_err(|e| e.to_string())
}

pub fn list_voice_commands() -> &'static [VoiceCommand] {
    &COMMANDS
}

/// Dispatch a typed or tapped command as if it had been spoken.
pub fn send_voice_command(
    state: &AppState,
    utterance: &str,
) -> Result<Vec<ConversationTurn>, String> {
    let utterance = utterance.trim();
    if utterance.is_empty() {
        return Err("command text is empty".into());
    }
    let started = Instant::now();
    let turns = state.session.dispatch_voice(utterance);
    state
        .perf_metrics
        .lock()
        .record_voice_dispatch(started.elapsed().as_secs_f64() * 1_000.0);
    Ok(turns.to_vec())
}

/// Microphone button: open a listening window, or cancel the open one.
pub fn toggle_listening(state: &AppState) -> Result<ListeningState, String> {
    match state.session.listening_state() {
        ListeningState::Listening => {
            state.session.cancel_listening();
        }
        ListeningState::Idle => {
            state.session.start_listening().map_err(|e| e.to_string())?;
        }
    }
    Ok(state.session.listening_state())
}

/// The most recent turns, as shown in the conversation panel.
pub fn conversation(state: &AppState) -> Vec<ConversationTurn> {
    state.session.conversation_view()
}

pub fn get_settings(state: &AppState) -> AppSettings {
    state.settings.lock().clone()
}

/// Persist new settings. The hazard policy applies immediately; session
/// timing and filters apply on next start.
pub fn update_settings(state: &AppState, mut settings: AppSettings) -> Result<AppSettings, String> {
    settings.normalize();
    let started = Instant::now();
    save_settings(&state.settings_path, &settings).map_err(|e| e.to_string())?;
    state
        .perf_metrics
        .lock()
        .record_persist(started.elapsed().as_secs_f64() * 1_000.0);

    let previous = std::mem::replace(&mut *state.settings.lock(), settings.clone());
    if previous.hold_on_hazard != settings.hold_on_hazard {
        apply_hazard_policy(state, settings.hold_on_hazard);
    }
    info!(
        confidence_threshold = settings.detection.confidence_threshold,
        hold_on_hazard = settings.hold_on_hazard,
        "settings saved"
    );
    Ok(settings)
}

fn apply_hazard_policy(state: &AppState, hold_on_hazard: bool) {
    if hold_on_hazard {
        state.session.set_hazard_hook(HoldOnHazard);
    } else {
        state.session.set_hazard_hook(ContinueOnHazard);
        if state.session.navigation_snapshot().held {
            state.session.resume_navigation();
        }
    }
}

pub fn get_diagnostics(state: &AppState) -> PerfSnapshot {
    state.perf_snapshot()
}
