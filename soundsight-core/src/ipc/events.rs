//! Event types emitted to the presentation layer.
//!
//! ## Channel names
//!
//! | Event | Channel |
//! |-------|---------|
//! | `SceneEvent` | `"soundsight://scene"` |
//! | `NavigationEvent` | `"soundsight://navigation"` |
//! | `ConversationEvent` | `"soundsight://conversation"` |
//! | `ListeningEvent` | `"soundsight://listening"` |
//! | `SessionStatusEvent` | `"soundsight://status"` |
//!
//! Every event carries `seq`, one counter shared across channels for the
//! lifetime of a session.

use serde::{Deserialize, Serialize};

use crate::navigation::NavigationSnapshot;
use crate::spatial::{AudioCue, MappingIssue, SceneSummary};
use crate::voice::{ConversationTurn, ListeningState};

pub const SCENE_CHANNEL: &str = "soundsight://scene";
pub const NAVIGATION_CHANNEL: &str = "soundsight://navigation";
pub const CONVERSATION_CHANNEL: &str = "soundsight://conversation";
pub const LISTENING_CHANNEL: &str = "soundsight://listening";
pub const STATUS_CHANNEL: &str = "soundsight://status";

// ---------------------------------------------------------------------------
// Scene events
// ---------------------------------------------------------------------------

/// One mapped detection frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneEvent {
    pub seq: u64,
    /// Source frame counter, for correlating with the overlay.
    pub frame_seq: u64,
    pub cues: Vec<AudioCue>,
    pub summary: SceneSummary,
    /// Objects that mapped with a problem; empty on a clean frame.
    pub issues: Vec<MappingIssue>,
}

// ---------------------------------------------------------------------------
// Navigation events
// ---------------------------------------------------------------------------

/// Emitted after every navigation state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEvent {
    pub seq: u64,
    pub snapshot: NavigationSnapshot,
}

// ---------------------------------------------------------------------------
// Voice events
// ---------------------------------------------------------------------------

/// Emitted once per dispatched exchange with exactly the two appended turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEvent {
    pub seq: u64,
    pub turns: Vec<ConversationTurn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListeningEvent {
    pub seq: u64,
    pub state: ListeningState,
}

// ---------------------------------------------------------------------------
// Session status events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusEvent {
    pub status: SessionStatus,
    pub detail: Option<String>,
}

/// Lifecycle of the detection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Session created, camera loop not started.
    Idle,
    /// Detection loop running.
    Detecting,
    /// Detection loop stopped; may be restarted.
    Stopped,
}
