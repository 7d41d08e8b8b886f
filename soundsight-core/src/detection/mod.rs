//! Detection frame contract.
//!
//! A vision pipeline (or the simulated source during development) produces one
//! `DetectionFrame` per tick. Objects are immutable once emitted and are
//! consumed by the spatial mapper; nothing here keeps cross-frame identity.
//!
//! The `DetectionSource` trait is the pluggable seam: the session loop only
//! ever talks to a `SourceHandle`.

#[cfg(feature = "simulated")]
pub mod simulated;

#[cfg(feature = "simulated")]
pub use simulated::SimulatedDetectionSource;

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Object category reported by the detector.
///
/// The built-in vocabulary covers what the overlay knows how to draw; anything
/// else travels as `Other` and renders with the fallback colour and marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectKind {
    Person,
    Door,
    Stairs,
    Vehicle,
    Obstacle,
    Other(String),
}

impl ObjectKind {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectKind::Person => "person",
            ObjectKind::Door => "door",
            ObjectKind::Stairs => "stairs",
            ObjectKind::Vehicle => "vehicle",
            ObjectKind::Obstacle => "obstacle",
            ObjectKind::Other(label) => label,
        }
    }

    /// Overlay colour as a `#rrggbb` string.
    pub fn overlay_color(&self) -> &'static str {
        match self {
            ObjectKind::Person => "#ff6b6b",
            ObjectKind::Door => "#4ecdc4",
            ObjectKind::Stairs => "#ffe66d",
            ObjectKind::Vehicle => "#ff8b94",
            ObjectKind::Obstacle => "#95e1d3",
            ObjectKind::Other(_) => "#ffffff",
        }
    }

    /// Marker glyph drawn next to the label.
    pub fn marker(&self) -> &'static str {
        match self {
            ObjectKind::Person => "\u{1F464}",
            ObjectKind::Door => "\u{1F6AA}",
            ObjectKind::Stairs => "\u{1F4F6}",
            ObjectKind::Vehicle => "\u{1F697}",
            ObjectKind::Obstacle => "\u{26A0}\u{FE0F}",
            ObjectKind::Other(_) => "\u{1F4CD}",
        }
    }
}

impl From<String> for ObjectKind {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "person" => ObjectKind::Person,
            "door" => ObjectKind::Door,
            "stairs" => ObjectKind::Stairs,
            "vehicle" => ObjectKind::Vehicle,
            "obstacle" => ObjectKind::Obstacle,
            _ => ObjectKind::Other(raw),
        }
    }
}

impl From<&str> for ObjectKind {
    fn from(raw: &str) -> Self {
        ObjectKind::from(raw.to_string())
    }
}

impl From<ObjectKind> for String {
    fn from(kind: ObjectKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Eight-way placement of an object relative to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Front,
    FrontLeft,
    FrontRight,
    Left,
    Right,
    Back,
    BackLeft,
    BackRight,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Front,
        Direction::FrontRight,
        Direction::Right,
        Direction::BackRight,
        Direction::Back,
        Direction::BackLeft,
        Direction::Left,
        Direction::FrontLeft,
    ];

    /// Parse a detector label. Returns `None` for anything outside the
    /// eight-way vocabulary.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "front" => Some(Direction::Front),
            "front-left" => Some(Direction::FrontLeft),
            "front-right" => Some(Direction::FrontRight),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            "back" => Some(Direction::Back),
            "back-left" => Some(Direction::BackLeft),
            "back-right" => Some(Direction::BackRight),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Front => "front",
            Direction::FrontLeft => "front-left",
            Direction::FrontRight => "front-right",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Back => "back",
            Direction::BackLeft => "back-left",
            Direction::BackRight => "back-right",
        }
    }
}

/// Normalised camera-frame coordinate: x left→right, y top→bottom, both in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FramePoint {
    pub x: f32,
    pub y: f32,
}

/// One recognised entity in a single frame.
///
/// `direction` is kept as the raw detector label so that an out-of-vocabulary
/// value reaches the mapper and can be reported rather than rejected at parse
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedObject {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    /// Detector confidence in [0.0, 1.0].
    pub confidence: f32,
    pub position: FramePoint,
    /// Estimated distance in metres.
    pub distance: f32,
    pub direction: String,
}

/// One batch of detections produced at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionFrame {
    /// Source-assigned frame counter.
    pub seq: u64,
    pub objects: Vec<DetectedObject>,
    /// Frames per second the source reports for its own processing.
    pub processing_fps: f32,
}

impl DetectionFrame {
    pub fn new(seq: u64, objects: Vec<DetectedObject>, processing_fps: f32) -> Self {
        Self {
            seq,
            objects,
            processing_fps,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Settings-driven pre-filter applied before mapping.
///
/// Values come from user settings and are applied as given; out-of-range
/// thresholds simply keep or drop everything. Malformed detections always
/// pass so the mapper can report them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionFilter {
    pub min_confidence: f32,
    pub disabled_kinds: Vec<ObjectKind>,
}

impl DetectionFilter {
    pub fn retains(&self, object: &DetectedObject) -> bool {
        if crate::spatial::validate(object).is_err() {
            return true;
        }
        object.confidence >= self.min_confidence && !self.disabled_kinds.contains(&object.kind)
    }

    /// Return a copy of `frame` holding only the retained objects.
    pub fn apply(&self, frame: &DetectionFrame) -> DetectionFrame {
        DetectionFrame {
            seq: frame.seq,
            objects: frame
                .objects
                .iter()
                .filter(|o| self.retains(o))
                .cloned()
                .collect(),
            processing_fps: frame.processing_fps,
        }
    }
}

/// Contract for anything that produces detection frames.
pub trait DetectionSource: Send + 'static {
    /// Produce the next frame. An empty frame is a valid answer.
    ///
    /// # Errors
    /// Returns an error if the underlying pipeline failed for this tick; the
    /// session loop logs it and keeps polling.
    fn next_frame(&mut self) -> Result<DetectionFrame>;

    /// Drop any internal state (tracking tables, frame counters).
    fn reset(&mut self);
}

/// Shared handle to any `DetectionSource` implementor.
#[derive(Clone)]
pub struct SourceHandle(pub Arc<Mutex<dyn DetectionSource>>);

impl SourceHandle {
    pub fn new<S: DetectionSource>(source: S) -> Self {
        Self(Arc::new(Mutex::new(source)))
    }
}

impl fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(id: u64, kind: &str, confidence: f32) -> DetectedObject {
        DetectedObject {
            id,
            kind: ObjectKind::from(kind),
            confidence,
            position: FramePoint { x: 0.5, y: 0.5 },
            distance: 2.0,
            direction: "front".into(),
        }
    }

    #[test]
    fn object_kind_round_trips_known_and_unknown_labels() {
        assert_eq!(ObjectKind::from("Door"), ObjectKind::Door);
        let bench = ObjectKind::from("bench");
        assert_eq!(bench, ObjectKind::Other("bench".into()));
        assert_eq!(bench.overlay_color(), "#ffffff");
        assert_eq!(ObjectKind::Stairs.overlay_color(), "#ffe66d");
    }

    #[test]
    fn detected_object_uses_type_key_on_the_wire() {
        let json = serde_json::to_value(object(2, "door", 0.92)).expect("serialize object");
        assert_eq!(json["type"], "door");
        assert_eq!(json["direction"], "front");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn direction_parse_covers_vocabulary_and_rejects_others() {
        for direction in Direction::ALL {
            assert_eq!(Direction::parse(direction.as_str()), Some(direction));
        }
        assert_eq!(Direction::parse(" Front-Right "), Some(Direction::FrontRight));
        assert_eq!(Direction::parse("up"), None);
        assert_eq!(Direction::parse(""), None);
    }

    #[test]
    fn filter_drops_low_confidence_and_disabled_kinds() {
        let filter = DetectionFilter {
            min_confidence: 0.7,
            disabled_kinds: vec![ObjectKind::Vehicle],
        };
        let frame = DetectionFrame::new(
            1,
            vec![
                object(1, "person", 0.9),
                object(2, "door", 0.5),
                object(3, "vehicle", 0.95),
            ],
            30.0,
        );

        let kept = filter.apply(&frame);
        assert_eq!(kept.seq, 1);
        assert_eq!(kept.objects.len(), 1);
        assert_eq!(kept.objects[0].id, 1);
    }

    #[test]
    fn filter_keeps_malformed_detections_for_the_mapper() {
        let filter = DetectionFilter {
            min_confidence: 0.7,
            disabled_kinds: vec![ObjectKind::Vehicle],
        };
        let frame = DetectionFrame::new(
            2,
            vec![
                object(1, "person", f32::NAN),
                object(2, "door", -0.5),
                object(3, "vehicle", 1.5),
                object(4, "door", 0.2),
            ],
            30.0,
        );

        let ids: Vec<u64> = filter.apply(&frame).objects.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
