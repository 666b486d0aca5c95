// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — End-to-End Session Scenarios
// ─────────────────────────────────────────────────────────────────────

use std::sync::Arc;

use parking_lot::Mutex;

use proctor_core::{
    AuditStore, ExamMonitor, FocusSource, HostCallbacks, InMemoryAudit, ManualClock,
    MonitorHandle,
};
use proctor_types::{
    AuditRecord, ConditionKind, FaceObservation, LifecycleState, MonitorConfig, ProctorError,
    ProctorResult, SessionIdentity, TerminationReason, ViolationEvent,
};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Violation(ConditionKind),
    Breach,
}

#[derive(Default)]
struct RecordingHost {
    calls: Mutex<Vec<Call>>,
}

impl RecordingHost {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn violations(&self) -> Vec<ConditionKind> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Violation(k) => Some(k),
                Call::Breach => None,
            })
            .collect()
    }

    fn breaches(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::Breach).count()
    }
}

impl HostCallbacks for RecordingHost {
    fn on_violation(&self, event: &ViolationEvent) {
        self.calls.lock().push(Call::Violation(event.kind));
    }

    fn on_threshold_breach(&self) {
        self.calls.lock().push(Call::Breach);
    }
}

struct Harness {
    handle: MonitorHandle,
    host: Arc<RecordingHost>,
    clock: ManualClock,
}

fn harness_with(audit: Option<Box<dyn AuditStore>>) -> Harness {
    let host = Arc::new(RecordingHost::default());
    let clock = ManualClock::new(1_700_000_000_000);
    let mut monitor = ExamMonitor::new(SessionIdentity::new("student-42", "quiz-7").unwrap())
        .config(MonitorConfig::default())
        .host(host.clone())
        .clock(Arc::new(clock.clone()));
    if let Some(store) = audit {
        monitor = monitor.audit_store(store);
    }
    Harness {
        handle: monitor.start().unwrap(),
        host,
        clock,
    }
}

fn harness() -> Harness {
    harness_with(None)
}

impl Harness {
    fn tick(&self, faces: usize) {
        self.handle
            .report_observation(&FaceObservation::with_count(faces));
        self.clock.advance(16);
    }

    fn tab_switch(&self) {
        self.handle.report_visibility(true);
        self.handle.report_visibility(false);
    }
}

#[test]
fn scenario_a_sustained_second_face_is_one_violation() {
    let h = harness();
    for _ in 0..25 {
        h.tick(2);
    }
    assert_eq!(h.host.violations(), vec![ConditionKind::MultiFace]);
    assert_eq!(h.handle.snapshot().severity_score, 10);
    h.handle.stop();
}

#[test]
fn scenario_a_short_second_face_run_is_ignored() {
    let h = harness();
    for _ in 0..19 {
        h.tick(2);
    }
    h.tick(1);
    for _ in 0..19 {
        h.tick(2);
    }
    assert!(h.host.violations().is_empty());
    h.handle.stop();
}

#[test]
fn scenario_b_flicker_never_reports_missing_face() {
    let h = harness();
    for i in 0..100 {
        h.tick(if i % 2 == 0 { 1 } else { 0 });
    }
    assert!(h.host.violations().is_empty());
    assert_eq!(h.handle.snapshot().severity_score, 0);
    h.handle.stop();
}

#[test]
fn scenario_b_sustained_absence_reports_once() {
    let h = harness();
    for _ in 0..400 {
        h.tick(0);
    }
    assert_eq!(h.host.violations(), vec![ConditionKind::NoFace]);
    h.handle.stop();
}

#[test]
fn scenario_c_five_tab_switches_terminate_session() {
    let h = harness();
    for _ in 0..5 {
        h.tab_switch();
        h.clock.advance(3_000);
    }

    let mut expected = vec![Call::Violation(ConditionKind::TabSwitch); 5];
    expected.push(Call::Breach);
    assert_eq!(h.host.calls(), expected);

    let snap = h.handle.snapshot();
    assert_eq!(snap.severity_score, 50);
    assert_eq!(snap.violation_count, 5);
    assert_eq!(snap.lifecycle, LifecycleState::Terminated);
    assert_eq!(snap.termination, Some(TerminationReason::ThresholdBreach));
    assert!(!h.handle.is_active());

    // Absorbing: further input changes nothing and breach never repeats.
    h.tab_switch();
    h.handle.report_fullscreen(false);
    for _ in 0..100 {
        h.tick(3);
    }
    h.handle.stop();
    assert_eq!(h.host.breaches(), 1);
    assert_eq!(h.handle.snapshot().violation_count, 5);
    assert_eq!(h.handle.snapshot().severity_score, 50);
}

#[test]
fn scenario_d_rapid_repeat_tab_switch_counts_once() {
    let h = harness();
    h.tab_switch();
    h.clock.advance(500);
    h.tab_switch();
    assert_eq!(h.host.violations(), vec![ConditionKind::TabSwitch]);
    assert_eq!(h.handle.snapshot().severity_score, 10);
    h.handle.stop();
}

#[test]
fn scenario_d_other_kinds_are_not_suppressed() {
    let h = harness();
    h.tab_switch();
    h.clock.advance(10);
    h.handle.report_fullscreen(false);
    assert_eq!(
        h.host.violations(),
        vec![ConditionKind::TabSwitch, ConditionKind::FullscreenExit]
    );
    h.handle.stop();
}

struct UnreachableStore;

impl AuditStore for UnreachableStore {
    fn append(&mut self, _record: &AuditRecord) -> ProctorResult<()> {
        Err(ProctorError::Audit("backend unavailable".into()))
    }
}

#[test]
fn scenario_e_audit_outage_does_not_affect_escalation() {
    let h = harness_with(Some(Box::new(UnreachableStore)));
    for _ in 0..5 {
        h.tab_switch();
        h.clock.advance(3_000);
    }

    assert_eq!(h.host.violations().len(), 5);
    assert_eq!(h.host.breaches(), 1);
    assert_eq!(h.handle.violations().len(), 5);
    assert_eq!(h.handle.snapshot().severity_score, 50);
    assert!(!h.handle.is_active());

    let stats = h.handle.drain_audit();
    assert_eq!(stats.failed, 5);
    assert_eq!(stats.written, 0);
}

#[test]
fn audit_records_carry_identity_and_kind() {
    let store = InMemoryAudit::new();
    let h = harness_with(Some(Box::new(store.clone())));
    h.tab_switch();
    h.handle.report_fullscreen(false);
    h.handle.stop();
    h.handle.drain_audit();

    let records = store.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].kind, ConditionKind::TabSwitch);
    assert_eq!(records[1].kind, ConditionKind::FullscreenExit);
    for record in &records {
        assert_eq!(record.subject_id, "student-42");
        assert_eq!(record.session_id, "quiz-7");
    }
    let ids: Vec<_> = h.handle.violations().iter().map(|v| v.id).collect();
    assert_eq!(records[0].event_id, ids[0]);
}

#[test]
fn external_stop_does_not_signal_breach() {
    let h = harness();
    h.tab_switch();
    h.handle.stop();
    h.handle.stop();
    let snap = h.handle.snapshot();
    assert_eq!(snap.termination, Some(TerminationReason::ExternalStop));
    assert_eq!(h.host.breaches(), 0);
}

#[derive(Clone, Default)]
struct ScriptedFocus {
    listener: Arc<Mutex<Option<MonitorHandle>>>,
    detached: Arc<Mutex<u32>>,
}

impl ScriptedFocus {
    fn page_hidden(&self) {
        let listener = self.listener.lock().clone();
        if let Some(handle) = listener {
            handle.report_visibility(true);
            handle.report_visibility(false);
        }
    }
}

impl FocusSource for ScriptedFocus {
    fn attach(&mut self, listener: MonitorHandle) -> ProctorResult<()> {
        *self.listener.lock() = Some(listener);
        Ok(())
    }

    fn detach(&mut self) -> ProctorResult<()> {
        *self.detached.lock() += 1;
        self.listener.lock().take();
        Ok(())
    }
}

#[test]
fn focus_listeners_detached_on_breach() {
    let focus = ScriptedFocus::default();
    let host = Arc::new(RecordingHost::default());
    let clock = ManualClock::new(0);
    let handle = ExamMonitor::new(SessionIdentity::new("student-1", "quiz-1").unwrap())
        .host(host.clone())
        .clock(Arc::new(clock.clone()))
        .focus_source(focus.clone())
        .start()
        .unwrap();

    for _ in 0..5 {
        focus.page_hidden();
        clock.advance(2_500);
    }
    assert_eq!(host.breaches(), 1);
    assert_eq!(*focus.detached.lock(), 1);
    assert!(focus.listener.lock().is_none());

    handle.stop();
    assert_eq!(*focus.detached.lock(), 1);
}
