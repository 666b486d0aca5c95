// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — Signal Aggregator
// ─────────────────────────────────────────────────────────────────────
//! Funnels presence and focus detections into one ordered queue.
//!
//! Arrival order is preserved across kinds; nothing is coalesced here.
//! Deduplication is the classifier's job.

use std::collections::VecDeque;

use proctor_types::{ConditionDetection, FaceObservation, MonitorConfig};

use crate::focus::{FocusSignal, FocusTracker};
use crate::presence::{PresenceTracker, PresenceUpdate};

#[derive(Debug, Clone)]
pub struct SignalAggregator {
    presence: PresenceTracker,
    focus: FocusTracker,
    queue: VecDeque<ConditionDetection>,
}

impl SignalAggregator {
    pub fn new(presence: PresenceTracker, focus: FocusTracker) -> Self {
        Self {
            presence,
            focus,
            queue: VecDeque::new(),
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(PresenceTracker::from_config(config), FocusTracker::new())
    }

    /// Feed one sensing tick. Any resulting detection is queued.
    pub fn ingest_observation(&mut self, observation: &FaceObservation, now_ms: u64) -> PresenceUpdate {
        let update = self.presence.observe(observation);
        if let Some(kind) = update.detection {
            self.queue.push_back(ConditionDetection::new(kind, now_ms));
        }
        update
    }

    /// Feed one focus change. Returns true if a detection was queued.
    pub fn ingest_focus(&mut self, signal: FocusSignal, now_ms: u64) -> bool {
        match self.focus.apply(signal) {
            Some(kind) => {
                self.queue.push_back(ConditionDetection::new(kind, now_ms));
                true
            }
            None => false,
        }
    }

    /// Take the oldest pending detection.
    pub fn next_detection(&mut self) -> Option<ConditionDetection> {
        self.queue.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drop everything still queued. Used on teardown.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn focus(&self) -> &FocusTracker {
        &self.focus
    }
}
