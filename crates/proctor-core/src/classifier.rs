// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — Violation Classifier
// ─────────────────────────────────────────────────────────────────────
//! Per-kind debouncing of condition detections into violation events.
//!
//! Each kind keeps the timestamp of its last *accepted* detection. A
//! detection arriving less than `debounce_ms` after it is discarded
//! without side effects. Kinds never suppress each other.

use proctor_types::{
    ConditionDetection, ConditionKind, MonitorConfig, SessionIdentity, ViolationEvent,
};
use uuid::Uuid;

pub struct ViolationClassifier {
    debounce_ms: u64,
    identity: SessionIdentity,
    last_accepted: [Option<u64>; 4],
}

impl ViolationClassifier {
    pub fn new(debounce_ms: u64, identity: SessionIdentity) -> Self {
        Self {
            debounce_ms,
            identity,
            last_accepted: [None; 4],
        }
    }

    pub fn from_config(config: &MonitorConfig, identity: SessionIdentity) -> Self {
        Self::new(config.debounce_ms, identity)
    }

    /// Accept or discard one detection.
    ///
    /// A timestamp earlier than the last accepted one (clock stepped
    /// backwards) counts as zero elapsed time and is discarded.
    pub fn classify(&mut self, detection: ConditionDetection) -> Option<ViolationEvent> {
        let slot = &mut self.last_accepted[detection.kind.index()];
        if let Some(last) = *slot {
            let elapsed = detection.timestamp_ms.saturating_sub(last);
            if elapsed < self.debounce_ms {
                log::debug!(
                    "discarding duplicate {} ({elapsed}ms < {}ms)",
                    detection.kind,
                    self.debounce_ms
                );
                return None;
            }
        }
        *slot = Some(detection.timestamp_ms);

        Some(ViolationEvent {
            id: Uuid::new_v4(),
            kind: detection.kind,
            timestamp_ms: detection.timestamp_ms,
            session_id: self.identity.session_id.clone(),
            subject_id: self.identity.subject_id.clone(),
        })
    }

    pub fn last_accepted(&self, kind: ConditionKind) -> Option<u64> {
        self.last_accepted[kind.index()]
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ViolationClassifier {
        ViolationClassifier::new(2000, SessionIdentity::new("user-1", "quiz-1").unwrap())
    }

    fn det(kind: ConditionKind, t: u64) -> ConditionDetection {
        ConditionDetection::new(kind, t)
    }

    #[test]
    fn test_first_detection_accepted_at_time_zero() {
        let mut c = classifier();
        let ev = c.classify(det(ConditionKind::TabSwitch, 0)).unwrap();
        assert_eq!(ev.kind, ConditionKind::TabSwitch);
        assert_eq!(ev.subject_id, "user-1");
        assert_eq!(ev.session_id, "quiz-1");
        assert_eq!(c.last_accepted(ConditionKind::TabSwitch), Some(0));
    }

    #[test]
    fn test_duplicate_inside_window_discarded() {
        let mut c = classifier();
        assert!(c.classify(det(ConditionKind::TabSwitch, 1000)).is_some());
        assert!(c.classify(det(ConditionKind::TabSwitch, 1500)).is_none());
        assert!(c.classify(det(ConditionKind::TabSwitch, 2999)).is_none());
        // Discards do not move the window.
        assert_eq!(c.last_accepted(ConditionKind::TabSwitch), Some(1000));
        assert!(c.classify(det(ConditionKind::TabSwitch, 3000)).is_some());
    }

    #[test]
    fn test_kinds_debounce_independently() {
        let mut c = classifier();
        assert!(c.classify(det(ConditionKind::TabSwitch, 5000)).is_some());
        assert!(c.classify(det(ConditionKind::NoFace, 5010)).is_some());
        assert!(c.classify(det(ConditionKind::FullscreenExit, 5010)).is_some());
        assert!(c.classify(det(ConditionKind::MultiFace, 5010)).is_some());
        assert!(c.classify(det(ConditionKind::NoFace, 5020)).is_none());
    }

    #[test]
    fn test_at_most_one_per_window_under_burst() {
        let mut c = classifier();
        let accepted = (0..100u64)
            .filter(|i| c.classify(det(ConditionKind::MultiFace, i * 100)).is_some())
            .count();
        // 0..9900ms in 100ms steps → accepted at 0, 2000, 4000, 6000, 8000.
        assert_eq!(accepted, 5);
    }

    #[test]
    fn test_backwards_clock_discarded() {
        let mut c = classifier();
        assert!(c.classify(det(ConditionKind::NoFace, 10_000)).is_some());
        assert!(c.classify(det(ConditionKind::NoFace, 1_000)).is_none());
    }

    #[test]
    fn test_event_ids_unique() {
        let mut c = classifier();
        let a = c.classify(det(ConditionKind::TabSwitch, 0)).unwrap();
        let b = c.classify(det(ConditionKind::TabSwitch, 5000)).unwrap();
        assert_ne!(a.id, b.id);
    }
}
