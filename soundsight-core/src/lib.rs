//! # soundsight-core
//!
//! Core state and event pipelines for the SoundSight assistive-navigation app.
//!
//! ## Architecture
//!
//! ```text
//! DetectionSource ──► DetectionFilter ──► spatial::map_frame / summarize
//!                                                 │
//!                                   broadcast::Sender<SceneEvent>
//!
//! destination ──► NavigationEngine ◄── NavigationDriver (tick every step_interval)
//!                        │
//!              broadcast::Sender<NavigationEvent>
//!
//! utterance ──► VoiceDispatcher ◄── ListeningDriver (one recognition per window)
//!                        │
//!              broadcast::Sender<ConversationEvent>
//! ```
//!
//! The spatial mapper is pure. The navigation engine and voice dispatcher are
//! plain state machines; the drivers and `SoundSightSession` add timing and
//! fan-out around them.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod detection;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod navigation;
pub mod spatial;
pub mod voice;

// Convenience re-exports for downstream crates
pub use detection::{
    DetectedObject, DetectionFilter, DetectionFrame, DetectionSource, Direction, ObjectKind,
    SourceHandle,
};
pub use engine::{HazardPolicy, SessionConfig, SoundSightSession};
pub use error::SoundSightError;
pub use ipc::events::{
    ConversationEvent, ListeningEvent, NavigationEvent, SceneEvent, SessionStatus,
    SessionStatusEvent,
};
pub use navigation::{
    NavStatus, NavigationEngine, NavigationSnapshot, NavigationStep, StepDirection,
};
pub use spatial::{AudioCue, FrameMapping, PanPosition, PulsePhase, SceneSummary};
pub use voice::{
    ConversationTurn, ListeningState, Recognizer, RecognizerHandle, Role, VoiceDispatcher,
};

#[cfg(feature = "simulated")]
pub use detection::SimulatedDetectionSource;

#[cfg(feature = "simulated")]
pub use voice::SimulatedRecognizer;
