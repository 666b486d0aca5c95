// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — Presence Tracker
// ─────────────────────────────────────────────────────────────────────
//! Frame-count hysteresis over face-detector output.
//!
//! A single dropped frame or a brief occlusion must not register as a
//! violation. Two independent run counters are kept:
//!
//!   - multi-face run: consecutive ticks with more than one face
//!   - no-face run:    consecutive ticks with zero faces
//!
//! A multi-face run fires when it reaches its threshold; the no-face
//! run moves to `Searching` and then fires once it exceeds the lower
//! and higher thresholds respectively. Each condition fires once per
//! run and re-arms only after the run is broken. The counters keep counting
//! past the threshold; repeat suppression beyond the run is left to
//! the classifier's debounce window.

use proctor_types::{ConditionKind, FaceBox, FaceObservation, MonitorConfig, PresenceState};

/// Outcome of one observed tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresenceUpdate {
    pub state: PresenceState,
    /// True when `state` differs from the previous tick.
    pub changed: bool,
    pub detection: Option<ConditionKind>,
    /// First detected face, for overlays.
    pub primary_face: Option<FaceBox>,
}

/// Turns per-tick face counts into smoothed presence and detections.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    multi_face_threshold: u32,
    searching_threshold: u32,
    no_face_threshold: u32,
    multi_face_streak: u32,
    no_face_streak: u32,
    multi_face_fired: bool,
    no_face_fired: bool,
    state: PresenceState,
}

impl PresenceTracker {
    pub fn new(multi_face_threshold: u32, searching_threshold: u32, no_face_threshold: u32) -> Self {
        Self {
            multi_face_threshold,
            searching_threshold,
            no_face_threshold,
            multi_face_streak: 0,
            no_face_streak: 0,
            multi_face_fired: false,
            no_face_fired: false,
            state: PresenceState::Present,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(
            config.multi_face_threshold,
            config.searching_threshold,
            config.no_face_threshold,
        )
    }

    pub fn observe(&mut self, observation: &FaceObservation) -> PresenceUpdate {
        let previous = self.state;
        let mut detection = None;

        match observation.count() {
            0 => {
                self.break_multi_face_run();
                self.no_face_streak = self.no_face_streak.saturating_add(1);
                if self.no_face_streak > self.no_face_threshold {
                    self.state = PresenceState::Absent;
                    if !self.no_face_fired {
                        self.no_face_fired = true;
                        detection = Some(ConditionKind::NoFace);
                        log::debug!("no face for {} ticks", self.no_face_streak);
                    }
                } else if self.no_face_streak > self.searching_threshold {
                    self.state = PresenceState::Searching;
                }
            }
            1 => {
                self.break_multi_face_run();
                self.break_no_face_run();
                self.state = PresenceState::Present;
            }
            _ => {
                self.break_no_face_run();
                self.state = PresenceState::Present;
                self.multi_face_streak = self.multi_face_streak.saturating_add(1);
                if self.multi_face_streak >= self.multi_face_threshold && !self.multi_face_fired {
                    self.multi_face_fired = true;
                    detection = Some(ConditionKind::MultiFace);
                    log::debug!("multiple faces for {} ticks", self.multi_face_streak);
                }
            }
        }

        if self.state != previous {
            log::debug!("presence {} -> {}", previous.as_str(), self.state.as_str());
        }

        PresenceUpdate {
            state: self.state,
            changed: self.state != previous,
            detection,
            primary_face: observation.primary(),
        }
    }

    fn break_multi_face_run(&mut self) {
        self.multi_face_streak = 0;
        self.multi_face_fired = false;
    }

    fn break_no_face_run(&mut self) {
        self.no_face_streak = 0;
        self.no_face_fired = false;
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    pub fn multi_face_streak(&self) -> u32 {
        self.multi_face_streak
    }

    pub fn no_face_streak(&self) -> u32 {
        self.no_face_streak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> PresenceTracker {
        PresenceTracker::from_config(&MonitorConfig::default())
    }

    fn run(tracker: &mut PresenceTracker, faces: usize, ticks: usize) -> Vec<ConditionKind> {
        let obs = FaceObservation::with_count(faces);
        (0..ticks)
            .filter_map(|_| tracker.observe(&obs).detection)
            .collect()
    }

    #[test]
    fn test_multi_face_below_threshold_is_silent() {
        let mut t = tracker();
        assert!(run(&mut t, 2, 19).is_empty());
        assert_eq!(t.multi_face_streak(), 19);
    }

    #[test]
    fn test_multi_face_fires_once_per_run() {
        let mut t = tracker();
        let fired = run(&mut t, 3, 100);
        assert_eq!(fired, vec![ConditionKind::MultiFace]);
        assert_eq!(t.multi_face_streak(), 100);
    }

    #[test]
    fn test_multi_face_fires_at_exact_threshold() {
        let mut t = tracker();
        assert!(run(&mut t, 2, 19).is_empty());
        assert_eq!(run(&mut t, 2, 1), vec![ConditionKind::MultiFace]);
    }

    #[test]
    fn test_multi_face_rearms_after_break() {
        let mut t = tracker();
        assert_eq!(run(&mut t, 2, 25).len(), 1);
        run(&mut t, 1, 1);
        assert_eq!(t.multi_face_streak(), 0);
        assert_eq!(run(&mut t, 2, 25), vec![ConditionKind::MultiFace]);
    }

    #[test]
    fn test_no_face_searching_then_absent() {
        let mut t = tracker();
        let empty = FaceObservation::empty();
        for _ in 0..15 {
            t.observe(&empty);
        }
        assert_eq!(t.state(), PresenceState::Present);
        let update = t.observe(&empty);
        assert_eq!(update.state, PresenceState::Searching);
        assert!(update.changed);
        assert!(update.detection.is_none());

        let fired: Vec<_> = (0..45).filter_map(|_| t.observe(&empty).detection).collect();
        assert_eq!(fired, vec![ConditionKind::NoFace]);
        assert_eq!(t.state(), PresenceState::Absent);
        assert_eq!(t.no_face_streak(), 61);
    }

    #[test]
    fn test_no_face_at_threshold_is_still_searching() {
        let mut t = tracker();
        let empty = FaceObservation::empty();
        let mut first_searching = None;
        let mut first_detection = None;
        for tick in 1..=80u32 {
            let update = t.observe(&empty);
            if first_searching.is_none() && update.state == PresenceState::Searching {
                first_searching = Some(tick);
            }
            if first_detection.is_none() && update.detection.is_some() {
                first_detection = Some(tick);
            }
        }
        assert_eq!(first_searching, Some(16));
        assert_eq!(first_detection, Some(61));
    }

    #[test]
    fn test_single_face_resets_everything() {
        let mut t = tracker();
        run(&mut t, 0, 30);
        let update = t.observe(&FaceObservation::with_count(1));
        assert_eq!(update.state, PresenceState::Present);
        assert!(update.changed);
        assert_eq!(t.no_face_streak(), 0);
        assert_eq!(t.multi_face_streak(), 0);
    }

    #[test]
    fn test_alternating_frames_never_fire() {
        let mut t = tracker();
        let one = FaceObservation::with_count(1);
        let none = FaceObservation::empty();
        for i in 0..100 {
            let obs = if i % 2 == 0 { &one } else { &none };
            assert!(t.observe(obs).detection.is_none());
        }
    }

    #[test]
    fn test_zero_face_tick_breaks_multi_face_run() {
        let mut t = tracker();
        run(&mut t, 2, 15);
        run(&mut t, 0, 1);
        assert!(run(&mut t, 2, 19).is_empty());
    }

    #[test]
    fn test_multi_face_tick_breaks_no_face_run() {
        let mut t = tracker();
        run(&mut t, 0, 50);
        run(&mut t, 2, 1);
        assert_eq!(t.no_face_streak(), 0);
        assert!(run(&mut t, 0, 59).is_empty());
    }

    #[test]
    fn test_primary_face_reported() {
        let mut t = tracker();
        let b = FaceBox::new(1.0, 2.0, 3.0, 4.0);
        let update = t.observe(&FaceObservation::new(vec![b]));
        assert_eq!(update.primary_face, Some(b));
        assert_eq!(t.observe(&FaceObservation::empty()).primary_face, None);
    }
}
