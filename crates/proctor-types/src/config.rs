// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — Monitor Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{ProctorError, ProctorResult};
use crate::event::ConditionKind;

/// Per-kind severity weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViolationWeights {
    pub multi_face: u32,
    pub no_face: u32,
    pub tab_switch: u32,
    pub fullscreen_exit: u32,
}

impl Default for ViolationWeights {
    fn default() -> Self {
        Self {
            multi_face: 10,
            no_face: 10,
            tab_switch: 10,
            fullscreen_exit: 10,
        }
    }
}

impl ViolationWeights {
    pub fn weight(&self, kind: ConditionKind) -> u32 {
        match kind {
            ConditionKind::MultiFace => self.multi_face,
            ConditionKind::NoFace => self.no_face,
            ConditionKind::TabSwitch => self.tab_switch,
            ConditionKind::FullscreenExit => self.fullscreen_exit,
        }
    }
}

/// Runtime configuration for the exam-integrity monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Consecutive multi-face ticks before a MultiFace detection fires.
    /// Default: 20.
    pub multi_face_threshold: u32,

    /// Presence becomes `Searching` once the zero-face run exceeds this.
    /// Default: 15.
    pub searching_threshold: u32,

    /// A NoFace detection fires once the zero-face run exceeds this.
    /// Default: 60 (~1–2 s at camera frame rates).
    pub no_face_threshold: u32,

    /// Minimum time between two accepted violations of the same kind.
    /// Default: 2000 ms.
    pub debounce_ms: u64,

    /// Severity added per accepted violation, by kind.
    pub weights: ViolationWeights,

    /// Severity score cap. Default: 100.
    pub max_severity: u32,

    /// Accepted violations that terminate the session. Default: 5.
    pub violation_limit: usize,

    /// Duration of the transient host feedback signal. Default: 200 ms.
    pub feedback_ms: u64,

    /// Pause between sensing ticks. Default: 16 ms (one animation frame).
    pub tick_interval_ms: u64,

    /// Consecutive failed frame captures before the camera is treated as
    /// lost and the monitor degrades to focus-only. Default: 30.
    pub max_capture_failures: u32,

    /// Bounded depth of the audit queue. Default: 256.
    pub audit_queue_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            multi_face_threshold: 20,
            searching_threshold: 15,
            no_face_threshold: 60,
            debounce_ms: 2000,
            weights: ViolationWeights::default(),
            max_severity: 100,
            violation_limit: 5,
            feedback_ms: 200,
            tick_interval_ms: 16,
            max_capture_failures: 30,
            audit_queue_capacity: 256,
        }
    }
}

impl MonitorConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> ProctorResult<()> {
        if self.multi_face_threshold == 0 {
            return Err(ProctorError::Config(
                "multi_face_threshold must be >= 1".to_string(),
            ));
        }
        if self.searching_threshold == 0 || self.no_face_threshold == 0 {
            return Err(ProctorError::Config(format!(
                "face-absence thresholds must be >= 1, got searching={} no_face={}",
                self.searching_threshold, self.no_face_threshold
            )));
        }
        if self.searching_threshold > self.no_face_threshold {
            return Err(ProctorError::Config(format!(
                "searching_threshold must be <= no_face_threshold, got {} > {}",
                self.searching_threshold, self.no_face_threshold
            )));
        }
        if self.debounce_ms == 0 {
            return Err(ProctorError::Config("debounce_ms must be > 0".to_string()));
        }
        if !(1..=100).contains(&self.max_severity) {
            return Err(ProctorError::Config(format!(
                "max_severity must be in [1, 100], got {}",
                self.max_severity
            )));
        }
        for kind in ConditionKind::ALL {
            if self.weights.weight(kind) == 0 {
                return Err(ProctorError::Config(format!(
                    "weight for {kind} must be > 0"
                )));
            }
        }
        if self.violation_limit == 0 {
            return Err(ProctorError::Config(
                "violation_limit must be >= 1".to_string(),
            ));
        }
        if self.max_capture_failures == 0 {
            return Err(ProctorError::Config(
                "max_capture_failures must be >= 1".to_string(),
            ));
        }
        if self.audit_queue_capacity == 0 {
            return Err(ProctorError::Config(
                "audit_queue_capacity must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ProctorResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ProctorError::Config(format!("JSON parse error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(MonitorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.multi_face_threshold, 20);
        assert_eq!(cfg.searching_threshold, 15);
        assert_eq!(cfg.no_face_threshold, 60);
        assert_eq!(cfg.debounce_ms, 2000);
        assert_eq!(cfg.violation_limit, 5);
        assert_eq!(cfg.max_severity, 100);
        for kind in ConditionKind::ALL {
            assert_eq!(cfg.weights.weight(kind), 10);
        }
    }

    #[test]
    fn test_searching_above_no_face_rejected() {
        let cfg = MonitorConfig {
            searching_threshold: 80,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("searching_threshold"));
    }

    #[test]
    fn test_zero_capture_failures_rejected() {
        let cfg = MonitorConfig {
            max_capture_failures: 0,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("max_capture_failures"));
    }

    #[test]
    fn test_zero_debounce_rejected() {
        let cfg = MonitorConfig {
            debounce_ms: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_max_severity_out_of_range() {
        let cfg = MonitorConfig {
            max_severity: 150,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_weight_rejected() {
        let mut cfg = MonitorConfig::default();
        cfg.weights.tab_switch = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("tab_switch"));
    }

    #[test]
    fn test_from_json_partial() {
        let cfg = MonitorConfig::from_json(r#"{"debounce_ms": 500, "violation_limit": 3}"#)
            .unwrap();
        assert_eq!(cfg.debounce_ms, 500);
        assert_eq!(cfg.violation_limit, 3);
        assert_eq!(cfg.multi_face_threshold, 20);
    }

    #[test]
    fn test_from_json_invalid() {
        let err = MonitorConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ProctorError::Config(_)));
    }
}
