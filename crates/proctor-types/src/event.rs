// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — Observation, Detection and Violation Types
// ─────────────────────────────────────────────────────────────────────

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Axis-aligned face bounding box in source-frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl FaceBox {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Non-finite coordinates or a non-positive area.
    pub fn is_degenerate(&self) -> bool {
        let finite = [self.left, self.top, self.right, self.bottom]
            .iter()
            .all(|v| v.is_finite());
        !finite || self.width() <= 0.0 || self.height() <= 0.0
    }
}

/// Result of one detection cycle. Degenerate boxes are dropped on
/// construction, so `count()` only reflects usable detections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    faces: Vec<FaceBox>,
}

impl FaceObservation {
    pub fn new(faces: Vec<FaceBox>) -> Self {
        let total = faces.len();
        let faces: Vec<FaceBox> = faces.into_iter().filter(|f| !f.is_degenerate()).collect();
        if faces.len() != total {
            log::debug!(
                "dropped {} degenerate face box(es) from observation",
                total - faces.len()
            );
        }
        Self { faces }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Synthetic observation of `n` identical faces.
    pub fn with_count(n: usize) -> Self {
        Self::new(vec![FaceBox::new(0.0, 0.0, 100.0, 100.0); n])
    }

    pub fn count(&self) -> usize {
        self.faces.len()
    }

    pub fn faces(&self) -> &[FaceBox] {
        &self.faces
    }

    /// The box the overlay tracks: the first detection, if any.
    pub fn primary(&self) -> Option<FaceBox> {
        self.faces.first().copied()
    }
}

/// Smoothed presence derived from consecutive observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresenceState {
    Present,
    Searching,
    Absent,
}

impl PresenceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceState::Present => "present",
            PresenceState::Searching => "searching",
            PresenceState::Absent => "absent",
        }
    }
}

/// Category of integrity condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    MultiFace,
    NoFace,
    TabSwitch,
    FullscreenExit,
}

impl ConditionKind {
    pub const ALL: [ConditionKind; 4] = [
        ConditionKind::MultiFace,
        ConditionKind::NoFace,
        ConditionKind::TabSwitch,
        ConditionKind::FullscreenExit,
    ];

    /// Stable identifier used in logs and audit records.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::MultiFace => "multi_face",
            ConditionKind::NoFace => "no_face",
            ConditionKind::TabSwitch => "tab_switch",
            ConditionKind::FullscreenExit => "fullscreen_exit",
        }
    }

    /// Human-readable alert text.
    pub fn label(&self) -> &'static str {
        match self {
            ConditionKind::MultiFace => "Multiple People Detected",
            ConditionKind::NoFace => "No Face Detected",
            ConditionKind::TabSwitch => "Tab Switch",
            ConditionKind::FullscreenExit => "Fullscreen Exit",
        }
    }

    /// Dense index for per-kind tables.
    pub fn index(&self) -> usize {
        match self {
            ConditionKind::MultiFace => 0,
            ConditionKind::NoFace => 1,
            ConditionKind::TabSwitch => 2,
            ConditionKind::FullscreenExit => 3,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s || k.label() == s)
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw condition, before deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDetection {
    pub kind: ConditionKind,
    /// Milliseconds on the monitor clock.
    pub timestamp_ms: u64,
}

impl ConditionDetection {
    pub fn new(kind: ConditionKind, timestamp_ms: u64) -> Self {
        Self { kind, timestamp_ms }
    }
}

/// An accepted, immutable violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationEvent {
    pub id: Uuid,
    pub kind: ConditionKind,
    pub timestamp_ms: u64,
    pub session_id: String,
    pub subject_id: String,
}

/// One durable audit row per accepted violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event_id: Uuid,
    pub subject_id: String,
    pub session_id: String,
    pub kind: ConditionKind,
    pub detected_at_ms: u64,
    pub server_timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn from_event(event: &ViolationEvent, server_timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id: event.id,
            subject_id: event.subject_id.clone(),
            session_id: event.session_id.clone(),
            kind: event.kind,
            detected_at_ms: event.timestamp_ms,
            server_timestamp,
        }
    }
}
