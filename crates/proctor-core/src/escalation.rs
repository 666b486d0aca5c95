// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — Escalation Engine
// ─────────────────────────────────────────────────────────────────────
//! Severity accounting and session termination.
//!
//! Lifecycle: `Idle → Monitoring → Terminated`. Termination is
//! absorbing and happens either when the violation count reaches the
//! limit or when the host stops monitoring. The sensing flag is shared
//! with the sensing loop and cleared with `SeqCst` ordering at the
//! moment of termination, so no tick started afterwards is processed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use proctor_types::{
    LifecycleState, MonitorConfig, SessionState, TerminationReason, ViolationEvent,
    ViolationWeights,
};

use crate::audit::{AuditSink, AuditStats};

/// Side effects the host must see for one escalated violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Escalation {
    /// False when the event arrived after termination and was ignored.
    pub recorded: bool,
    /// Transient feedback to show, if any.
    pub feedback: Option<Duration>,
    /// True exactly once per session: on the violation that hit the limit.
    pub breach: bool,
}

impl Escalation {
    fn ignored() -> Self {
        Self {
            recorded: false,
            feedback: None,
            breach: false,
        }
    }
}

pub struct EscalationEngine {
    weights: ViolationWeights,
    max_severity: u32,
    violation_limit: usize,
    feedback: Duration,
    session: SessionState,
    lifecycle: LifecycleState,
    termination: Option<TerminationReason>,
    sensing_enabled: Arc<AtomicBool>,
    audit: AuditSink,
}

impl EscalationEngine {
    pub fn new(config: &MonitorConfig, audit: AuditSink) -> Self {
        Self {
            weights: config.weights,
            max_severity: config.max_severity,
            violation_limit: config.violation_limit,
            feedback: Duration::from_millis(config.feedback_ms),
            session: SessionState::new(),
            lifecycle: LifecycleState::Idle,
            termination: None,
            sensing_enabled: Arc::new(AtomicBool::new(false)),
            audit,
        }
    }

    /// `Idle → Monitoring`. Returns false in any other state.
    pub fn start(&mut self) -> bool {
        if self.lifecycle != LifecycleState::Idle {
            return false;
        }
        self.lifecycle = LifecycleState::Monitoring;
        self.sensing_enabled.store(true, Ordering::SeqCst);
        true
    }

    /// Record one accepted violation and decide what follows.
    pub fn escalate(&mut self, event: ViolationEvent) -> Escalation {
        if self.lifecycle != LifecycleState::Monitoring {
            log::debug!("ignoring {} violation: monitor is {:?}", event.kind, self.lifecycle);
            return Escalation::ignored();
        }

        let weight = self.weights.weight(event.kind);
        if !self.session.record(event, weight, self.max_severity) {
            return Escalation::ignored();
        }

        if let Some(recorded) = self.session.violation_log().last() {
            log::debug!(
                "violation #{} {} accepted, severity {}",
                self.session.violation_count(),
                recorded.kind,
                self.session.severity_score()
            );
            self.audit.submit(recorded);
        }

        let breach = self.session.violation_count() >= self.violation_limit
            && self.halt(TerminationReason::ThresholdBreach);

        Escalation {
            recorded: true,
            feedback: Some(self.feedback),
            breach,
        }
    }

    /// Stop on behalf of the host. Returns false if already terminated.
    pub fn terminate(&mut self, reason: TerminationReason) -> bool {
        self.halt(reason)
    }

    fn halt(&mut self, reason: TerminationReason) -> bool {
        if self.lifecycle == LifecycleState::Terminated {
            return false;
        }
        self.sensing_enabled.store(false, Ordering::SeqCst);
        self.session.deactivate();
        self.lifecycle = LifecycleState::Terminated;
        self.termination = Some(reason);
        match reason {
            TerminationReason::ThresholdBreach => log::error!(
                ">>> INTEGRITY THRESHOLD BREACHED: {} violations, severity {}, SESSION TERMINATED <<<",
                self.session.violation_count(),
                self.session.severity_score()
            ),
            TerminationReason::ExternalStop => log::info!(
                "Monitoring stopped by host after {} violation(s)",
                self.session.violation_count()
            ),
        }
        true
    }

    /// Detach the audit worker so it can be drained elsewhere. Counters
    /// stay visible through `audit_stats`.
    pub fn take_audit(&mut self) -> AuditSink {
        self.audit.take()
    }

    /// Drain outstanding audit writes. Call after termination.
    pub fn flush_audit(&mut self) {
        self.audit.shutdown();
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn termination(&self) -> Option<TerminationReason> {
        self.termination
    }

    pub fn is_active(&self) -> bool {
        self.session.is_active() && self.lifecycle == LifecycleState::Monitoring
    }

    /// Flag the sensing loop polls before each tick.
    pub fn sensing_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.sensing_enabled)
    }

    pub fn audit_stats(&self) -> AuditStats {
        self.audit.stats()
    }
}
