// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — Detection Pipeline
// ─────────────────────────────────────────────────────────────────────
//! Single-owner composition of aggregator, classifier and engine.
//!
//! Every input is processed to completion within one call, so the
//! pipeline itself needs no locking. The monitor serializes access to
//! it behind one mutex; host notifications are returned as a list and
//! delivered after the lock is released.

use std::time::Duration;

use serde::Serialize;

use proctor_observers::{FocusSignal, SignalAggregator};
use proctor_types::{
    ConditionKind, FaceBox, FaceObservation, LifecycleState, MonitorConfig, PresenceState,
    SessionIdentity, SessionState, TerminationReason, ViolationEvent,
};

use crate::audit::{AuditSink, AuditStats};
use crate::classifier::ViolationClassifier;
use crate::escalation::EscalationEngine;

/// A notification for the host, in the order it must be delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    Presence(PresenceState),
    FaceBox(Option<FaceBox>),
    Violation(ViolationEvent),
    Feedback(Duration),
    ThresholdBreach,
}

/// Read-only view of the monitor for the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorSnapshot {
    pub lifecycle: LifecycleState,
    pub termination: Option<TerminationReason>,
    pub severity_score: u32,
    pub violation_count: usize,
    pub presence: PresenceState,
    pub recent: Vec<ConditionKind>,
    pub degraded: bool,
    pub audit: AuditStats,
}

/// Entries shown in the host's recent-violations banner.
pub const RECENT_VIOLATIONS: usize = 3;

pub struct Pipeline {
    aggregator: SignalAggregator,
    classifier: ViolationClassifier,
    engine: EscalationEngine,
}

impl Pipeline {
    pub fn new(config: &MonitorConfig, identity: SessionIdentity, audit: AuditSink) -> Self {
        Self {
            aggregator: SignalAggregator::from_config(config),
            classifier: ViolationClassifier::from_config(config, identity),
            engine: EscalationEngine::new(config, audit),
        }
    }

    pub fn start(&mut self) -> bool {
        self.engine.start()
    }

    /// Process one sensing tick.
    pub fn on_observation(&mut self, observation: &FaceObservation, now_ms: u64) -> Vec<MonitorEvent> {
        let mut out = Vec::new();
        if !self.engine.is_active() {
            return out;
        }
        let update = self.aggregator.ingest_observation(observation, now_ms);
        out.push(MonitorEvent::FaceBox(update.primary_face));
        if update.changed {
            out.push(MonitorEvent::Presence(update.state));
        }
        self.drain(&mut out);
        out
    }

    /// Process one focus change.
    pub fn on_focus(&mut self, signal: FocusSignal, now_ms: u64) -> Vec<MonitorEvent> {
        let mut out = Vec::new();
        if !self.engine.is_active() {
            return out;
        }
        if self.aggregator.ingest_focus(signal, now_ms) {
            self.drain(&mut out);
        }
        out
    }

    fn drain(&mut self, out: &mut Vec<MonitorEvent>) {
        while let Some(detection) = self.aggregator.next_detection() {
            if !self.engine.is_active() {
                self.aggregator.clear();
                break;
            }
            let Some(event) = self.classifier.classify(detection) else {
                continue;
            };
            let escalation = self.engine.escalate(event.clone());
            if !escalation.recorded {
                continue;
            }
            out.push(MonitorEvent::Violation(event));
            if let Some(duration) = escalation.feedback {
                out.push(MonitorEvent::Feedback(duration));
            }
            if escalation.breach {
                out.push(MonitorEvent::ThresholdBreach);
            }
        }
    }

    /// Host-requested stop. Returns false if already terminated.
    pub fn stop(&mut self) -> bool {
        self.aggregator.clear();
        self.engine.terminate(TerminationReason::ExternalStop)
    }

    /// Detach the audit sink so it can be drained without holding the
    /// pipeline. Later violations (if any) are not persisted.
    pub fn take_audit(&mut self) -> AuditSink {
        self.engine.take_audit()
    }

    pub fn snapshot(&self, degraded: bool) -> MonitorSnapshot {
        let session = self.engine.session();
        MonitorSnapshot {
            lifecycle: self.engine.lifecycle(),
            termination: self.engine.termination(),
            severity_score: session.severity_score(),
            violation_count: session.violation_count(),
            presence: self.aggregator.presence().state(),
            recent: session.recent(RECENT_VIOLATIONS),
            degraded,
            audit: self.engine.audit_stats(),
        }
    }

    pub fn session(&self) -> &SessionState {
        self.engine.session()
    }

    pub fn engine(&self) -> &EscalationEngine {
        &self.engine
    }

    pub fn is_active(&self) -> bool {
        self.engine.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> Pipeline {
        let identity = SessionIdentity::new("user", "quiz").unwrap();
        let mut p = Pipeline::new(&MonitorConfig::default(), identity, AuditSink::disabled());
        assert!(p.start());
        p
    }

    fn violations(events: &[MonitorEvent]) -> Vec<ConditionKind> {
        events
            .iter()
            .filter_map(|e| match e {
                MonitorEvent::Violation(v) => Some(v.kind),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_tab_switch_produces_violation_and_feedback() {
        let mut p = pipeline();
        let events = p.on_focus(FocusSignal::Visibility { hidden: true }, 0);
        assert_eq!(violations(&events), vec![ConditionKind::TabSwitch]);
        assert!(events.contains(&MonitorEvent::Feedback(Duration::from_millis(200))));
        assert_eq!(p.session().severity_score(), 10);
    }

    #[test]
    fn test_presence_change_reported_once() {
        let mut p = pipeline();
        let empty = FaceObservation::empty();
        let changes: Vec<_> = (0..30u64)
            .flat_map(|t| p.on_observation(&empty, t * 16))
            .filter(|e| matches!(e, MonitorEvent::Presence(_)))
            .collect();
        assert_eq!(changes, vec![MonitorEvent::Presence(PresenceState::Searching)]);
    }

    #[test]
    fn test_face_box_emitted_every_tick() {
        let mut p = pipeline();
        let events = p.on_observation(&FaceObservation::with_count(1), 0);
        assert!(matches!(events[0], MonitorEvent::FaceBox(Some(_))));
    }

    #[test]
    fn test_breach_event_follows_fifth_violation() {
        let mut p = pipeline();
        let mut all = Vec::new();
        for i in 0..5u64 {
            all.extend(p.on_focus(FocusSignal::Visibility { hidden: true }, i * 3000));
            all.extend(p.on_focus(FocusSignal::Visibility { hidden: false }, i * 3000 + 1));
        }
        assert_eq!(all.last(), Some(&MonitorEvent::ThresholdBreach));
        assert_eq!(violations(&all).len(), 5);
        assert!(!p.is_active());
    }

    #[test]
    fn test_terminated_pipeline_absorbs_input() {
        let mut p = pipeline();
        assert!(p.stop());
        assert!(!p.stop());
        assert!(p.on_focus(FocusSignal::Fullscreen { active: false }, 0).is_empty());
        assert!(p.on_observation(&FaceObservation::empty(), 0).is_empty());
        assert_eq!(p.snapshot(false).lifecycle, LifecycleState::Terminated);
    }

    #[test]
    fn test_snapshot_reports_recent_three() {
        let mut p = pipeline();
        p.on_focus(FocusSignal::Visibility { hidden: true }, 0);
        p.on_focus(FocusSignal::Fullscreen { active: false }, 1);
        p.on_focus(FocusSignal::Visibility { hidden: false }, 2);
        p.on_focus(FocusSignal::Visibility { hidden: true }, 5000);
        p.on_focus(FocusSignal::Fullscreen { active: true }, 5001);
        p.on_focus(FocusSignal::Fullscreen { active: false }, 5002);
        let snap = p.snapshot(false);
        assert_eq!(snap.violation_count, 4);
        assert_eq!(
            snap.recent,
            vec![
                ConditionKind::FullscreenExit,
                ConditionKind::TabSwitch,
                ConditionKind::FullscreenExit
            ]
        );
        assert_eq!(snap.severity_score, 40);
    }
}
