//! Spatial audio mapping.
//!
//! Turns a detection frame into one `AudioCue` per object plus a scene
//! summary. Everything in this module is a pure function of its inputs, so it
//! can run on any frame-processing thread without synchronisation.
//!
//! ## Per-object mapping
//!
//! ```text
//! distance  ──► intensity = clamp(1 − d/10, 0.2, 1.0)
//! direction ──► placement table (8-way) ──► PanPosition   (unknown → centre)
//! phase     ──► emphasis  = 0.8 + 0.4·intensity + 0.1·phase
//! ```
//!
//! A bad object never drops the frame: invalid detections produce a
//! `MappingIssue` and no cue, unknown directions produce both a centred cue
//! and an issue.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::detection::{DetectedObject, DetectionFrame, Direction, ObjectKind};
use crate::error::{Result, SoundSightError};

/// Objects are never fully silent once detected.
pub const MIN_INTENSITY: f32 = 0.2;
/// Distance (metres) at which the linear falloff would reach zero.
pub const FALLOFF_DISTANCE_M: f32 = 10.0;
/// Number of discrete pulse phases.
pub const PULSE_PHASES: u8 = 3;

/// Cue loudness for an object `distance` metres away.
///
/// Non-increasing in `distance` and always within `[MIN_INTENSITY, 1.0]`.
/// Callers validate `distance` first; a NaN input maps to the floor.
pub fn intensity(distance: f32) -> f32 {
    let raw = 1.0 - distance / FALLOFF_DISTANCE_M;
    if raw.is_nan() {
        return MIN_INTENSITY;
    }
    raw.clamp(MIN_INTENSITY, 1.0)
}

/// Where a cue sits in the listener's sound field.
///
/// `x`/`y` use the compass visualisation's unit square (x left→right,
/// y front→back); `azimuth_deg` is clockwise from straight ahead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanPosition {
    pub x: f32,
    pub y: f32,
    pub azimuth_deg: f32,
}

impl PanPosition {
    /// Placement used when the direction label is not recognised.
    pub const CENTER: PanPosition = PanPosition {
        x: 0.5,
        y: 0.5,
        azimuth_deg: 0.0,
    };

    pub fn for_direction(direction: Direction) -> Self {
        let (x, y, azimuth_deg) = match direction {
            Direction::Front => (0.50, 0.20, 0.0),
            Direction::FrontRight => (0.75, 0.30, 45.0),
            Direction::Right => (0.90, 0.50, 90.0),
            Direction::BackRight => (0.75, 0.70, 135.0),
            Direction::Back => (0.50, 0.80, 180.0),
            Direction::BackLeft => (0.25, 0.70, 225.0),
            Direction::Left => (0.10, 0.50, 270.0),
            Direction::FrontLeft => (0.25, 0.30, 315.0),
        };
        Self { x, y, azimuth_deg }
    }
}

/// Resolve the placement for `object`.
///
/// # Errors
/// `UnknownDirection` when the label is outside the eight-way vocabulary.
/// The caller may fall back to [`PanPosition::CENTER`].
pub fn pan_position(object: &DetectedObject) -> Result<PanPosition> {
    Direction::parse(&object.direction)
        .map(PanPosition::for_direction)
        .ok_or_else(|| SoundSightError::UnknownDirection {
            id: object.id,
            label: object.direction.clone(),
        })
}

/// Check the numeric input contract of a detection.
///
/// # Errors
/// `InvalidDetection` for a negative or non-finite distance, or a confidence
/// outside `[0, 1]`.
pub fn validate(object: &DetectedObject) -> Result<()> {
    if !object.distance.is_finite() || object.distance < 0.0 {
        return Err(SoundSightError::InvalidDetection {
            id: object.id,
            reason: format!("distance {} is not a non-negative number", object.distance),
        });
    }
    if !(0.0..=1.0).contains(&object.confidence) {
        return Err(SoundSightError::InvalidDetection {
            id: object.id,
            reason: format!("confidence {} is outside [0, 1]", object.confidence),
        });
    }
    Ok(())
}

/// Discrete oscillation phase used to animate cue emphasis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PulsePhase(u8);

impl PulsePhase {
    pub fn new(phase: u8) -> Self {
        Self(phase % PULSE_PHASES)
    }

    /// Phase reached after `elapsed` with one step per `period`.
    pub fn at(elapsed: Duration, period: Duration) -> Self {
        if period.is_zero() {
            return Self(0);
        }
        let steps = elapsed.as_millis() / period.as_millis().max(1);
        Self((steps % PULSE_PHASES as u128) as u8)
    }

    pub fn next(self) -> Self {
        Self::new(self.0 + 1)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Mapper output for one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioCue {
    /// Back-reference to `DetectedObject::id`.
    pub source_id: u64,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    /// `None` when the detector label was not recognised and the cue was centred.
    pub direction: Option<Direction>,
    pub pan_position: PanPosition,
    pub intensity: f32,
    pub pulse_phase: PulsePhase,
    /// Render scale combining intensity and pulse.
    pub emphasis: f32,
}

/// Why an object did not map cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    InvalidDetection,
    UnknownDirection,
}

/// Per-object mapping problem, reported alongside the cues of the same frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingIssue {
    pub source_id: u64,
    pub kind: IssueKind,
    pub detail: String,
}

impl MappingIssue {
    fn from_error(source_id: u64, err: &SoundSightError) -> Self {
        let kind = match err {
            SoundSightError::UnknownDirection { .. } => IssueKind::UnknownDirection,
            _ => IssueKind::InvalidDetection,
        };
        Self {
            source_id,
            kind,
            detail: err.to_string(),
        }
    }

    /// Whether a (centred) cue was still produced for this object.
    pub fn is_recoverable(&self) -> bool {
        self.kind == IssueKind::UnknownDirection
    }
}

/// Result of mapping one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMapping {
    pub cues: Vec<AudioCue>,
    pub issues: Vec<MappingIssue>,
}

/// Map a single object.
///
/// Returns the cue (if any) and the issue (if any). An unknown direction
/// yields both.
pub fn map_object(
    object: &DetectedObject,
    phase: PulsePhase,
) -> (Option<AudioCue>, Option<MappingIssue>) {
    if let Err(err) = validate(object) {
        return (None, Some(MappingIssue::from_error(object.id, &err)));
    }

    let (direction, pan_position, issue) = match pan_position(object) {
        Ok(pan) => (Direction::parse(&object.direction), pan, None),
        Err(err) => (
            None,
            PanPosition::CENTER,
            Some(MappingIssue::from_error(object.id, &err)),
        ),
    };

    let level = intensity(object.distance);
    let cue = AudioCue {
        source_id: object.id,
        kind: object.kind.clone(),
        direction,
        pan_position,
        intensity: level,
        pulse_phase: phase,
        emphasis: 0.8 + level * 0.4 + f32::from(phase.value()) * 0.1,
    };
    (Some(cue), issue)
}

/// Map every object in `frame`, in frame order.
pub fn map_frame(frame: &DetectionFrame, phase: PulsePhase) -> FrameMapping {
    let mut mapping = FrameMapping {
        cues: Vec::with_capacity(frame.objects.len()),
        issues: Vec::new(),
    };
    for object in &frame.objects {
        let (cue, issue) = map_object(object, phase);
        if let Some(cue) = cue {
            mapping.cues.push(cue);
        }
        if let Some(issue) = issue {
            mapping.issues.push(issue);
        }
    }
    mapping
}

/// Aggregate scene statistics for the camera overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSummary {
    pub count: usize,
    /// Mean of the valid confidences; 0 when there are none.
    pub mean_confidence: f32,
    pub throughput_fps: f32,
}

pub fn summarize(frame: &DetectionFrame) -> SceneSummary {
    let (sum, valid) = frame
        .objects
        .iter()
        .map(|o| o.confidence)
        .filter(|c| (0.0..=1.0).contains(c))
        .fold((0.0f32, 0usize), |(sum, n), c| (sum + c, n + 1));

    SceneSummary {
        count: frame.objects.len(),
        mean_confidence: if valid == 0 { 0.0 } else { sum / valid as f32 },
        throughput_fps: if frame.processing_fps.is_finite() {
            frame.processing_fps.max(0.0)
        } else {
            0.0
        },
    }
}
