// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — Session State
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{ProctorError, ProctorResult};
use crate::event::{ConditionKind, ViolationEvent};

/// Who is being monitored, and in which exam session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub subject_id: String,
    pub session_id: String,
}

impl SessionIdentity {
    pub fn new(subject_id: impl Into<String>, session_id: impl Into<String>) -> ProctorResult<Self> {
        let subject_id = subject_id.into();
        let session_id = session_id.into();
        if subject_id.trim().is_empty() {
            return Err(ProctorError::Validation(
                "subject_id must not be empty".to_string(),
            ));
        }
        if session_id.trim().is_empty() {
            return Err(ProctorError::Validation(
                "session_id must not be empty".to_string(),
            ));
        }
        Ok(Self {
            subject_id,
            session_id,
        })
    }
}

/// Monitor lifecycle. `Terminated` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Idle,
    Monitoring,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// The violation count reached the configured limit.
    ThresholdBreach,
    /// The host stopped monitoring (e.g. normal submission).
    ExternalStop,
}

/// Violation log and severity for one exam session.
///
/// `severity_score` never decreases, and once `is_active` is false
/// neither the log nor the score changes again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    violation_log: Vec<ViolationEvent>,
    severity_score: u32,
    is_active: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            violation_log: Vec::new(),
            severity_score: 0,
            is_active: true,
        }
    }

    /// Append an accepted violation and raise the score by `weight`,
    /// capped at `max_severity`. Returns false (and changes nothing) once
    /// the session is inactive.
    pub fn record(&mut self, event: ViolationEvent, weight: u32, max_severity: u32) -> bool {
        if !self.is_active {
            return false;
        }
        self.violation_log.push(event);
        self.severity_score = self
            .severity_score
            .saturating_add(weight)
            .min(max_severity)
            .max(self.severity_score);
        true
    }

    /// Freeze the session. Returns true only on the first call.
    pub fn deactivate(&mut self) -> bool {
        std::mem::replace(&mut self.is_active, false)
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn severity_score(&self) -> u32 {
        self.severity_score
    }

    pub fn violation_log(&self) -> &[ViolationEvent] {
        &self.violation_log
    }

    pub fn violation_count(&self) -> usize {
        self.violation_log.len()
    }

    /// Kinds of the last `n` violations, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ConditionKind> {
        let start = self.violation_log.len().saturating_sub(n);
        self.violation_log[start..].iter().map(|v| v.kind).collect()
    }

    pub fn count_of(&self, kind: ConditionKind) -> usize {
        self.violation_log.iter().filter(|v| v.kind == kind).count()
    }
}
