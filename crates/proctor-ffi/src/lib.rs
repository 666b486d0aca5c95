// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — PyO3 FFI Bindings
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
// Note: #[deny(unsafe_code)] not applied — PyO3 proc macros generate
// unsafe blocks internally. All hand-written code in this crate is safe.
//! Python-callable wrapper around the exam monitor.
//!
//! The Python host owns the camera and the face-detection model and
//! feeds per-frame results in through `report_faces`; focus changes
//! arrive through `report_visibility` / `report_fullscreen`.
//!
//! # FFI Safety
//!
//! - GIL acquired via `Python::with_gil` before every Python callback.
//! - Python exceptions raised by callbacks are logged and swallowed;
//!   they never reach the monitor or abort the exam.
//! - The GIL is released while waiting on the audit worker, which may
//!   itself be blocked on a Python audit callback.
//!
//! Install: `cd crates/proctor-ffi && pip install -e .` (requires maturin).
//!
//! Usage from Python:
//! ```python
//! from proctor_kernel import RustExamMonitor
//!
//! monitor = RustExamMonitor("user-1", "quiz-1",
//!                           on_violation=lambda kind: print(kind),
//!                           on_threshold_breach=submit_exam)
//! monitor.report_faces([(10, 10, 90, 90)])
//! monitor.report_visibility(hidden=True)
//! ```

use std::sync::Arc;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use proctor_core::{ExamMonitor, ExternalAudit, HostCallbacks, MonitorHandle};
use proctor_types::{
    AuditRecord, FaceBox, FaceObservation, MonitorConfig, PresenceState, ProctorError,
    SessionIdentity, ViolationEvent,
};

// ─── PyMonitorConfig ────────────────────────────────────────────────

/// Python-visible monitor configuration.
#[pyclass(name = "MonitorConfig")]
#[derive(Clone)]
struct PyMonitorConfig {
    inner: MonitorConfig,
}

#[pymethods]
impl PyMonitorConfig {
    #[new]
    #[pyo3(signature = (
        multi_face_threshold = 20,
        searching_threshold = 15,
        no_face_threshold = 60,
        debounce_ms = 2000,
        violation_limit = 5,
        max_severity = 100,
        weight = 10,
        feedback_ms = 200,
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        multi_face_threshold: u32,
        searching_threshold: u32,
        no_face_threshold: u32,
        debounce_ms: u64,
        violation_limit: usize,
        max_severity: u32,
        weight: u32,
        feedback_ms: u64,
    ) -> PyResult<Self> {
        let mut config = MonitorConfig {
            multi_face_threshold,
            searching_threshold,
            no_face_threshold,
            debounce_ms,
            violation_limit,
            max_severity,
            feedback_ms,
            ..Default::default()
        };
        config.weights.multi_face = weight;
        config.weights.no_face = weight;
        config.weights.tab_switch = weight;
        config.weights.fullscreen_exit = weight;
        config
            .validate()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(Self { inner: config })
    }

    /// Construct from JSON string.
    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        let config =
            MonitorConfig::from_json(json).map_err(|e| PyValueError::new_err(e.to_string()))?;
        config
            .validate()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(Self { inner: config })
    }

    fn __repr__(&self) -> String {
        format!(
            "MonitorConfig(debounce_ms={}, violation_limit={}, multi_face_threshold={}, no_face_threshold={})",
            self.inner.debounce_ms,
            self.inner.violation_limit,
            self.inner.multi_face_threshold,
            self.inner.no_face_threshold
        )
    }
}

// ─── Python host bridge ─────────────────────────────────────────────

struct PyHost {
    on_violation: PyObject,
    on_threshold_breach: Option<PyObject>,
    on_presence_change: Option<PyObject>,
}

fn log_raised(name: &str, result: PyResult<PyObject>) {
    if let Err(e) = result {
        log::error!("Python {name} callback raised: {e}");
    }
}

impl HostCallbacks for PyHost {
    fn on_violation(&self, event: &ViolationEvent) {
        Python::with_gil(|py| {
            log_raised(
                "on_violation",
                self.on_violation.call1(py, (event.kind.as_str(),)),
            );
        });
    }

    fn on_threshold_breach(&self) {
        if let Some(cb) = &self.on_threshold_breach {
            Python::with_gil(|py| log_raised("on_threshold_breach", cb.call0(py)));
        }
    }

    fn on_presence_change(&self, state: PresenceState) {
        if let Some(cb) = &self.on_presence_change {
            Python::with_gil(|py| {
                log_raised("on_presence_change", cb.call1(py, (state.as_str(),)));
            });
        }
    }
}

fn record_to_dict<'py>(py: Python<'py>, record: &AuditRecord) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("event_id", record.event_id.to_string())?;
    dict.set_item("subject_id", &record.subject_id)?;
    dict.set_item("session_id", &record.session_id)?;
    dict.set_item("kind", record.kind.as_str())?;
    dict.set_item("detected_at_ms", record.detected_at_ms)?;
    dict.set_item("server_timestamp", record.server_timestamp.to_rfc3339())?;
    Ok(dict)
}

// ─── RustExamMonitor ────────────────────────────────────────────────

/// Exam-integrity monitor exposed to Python.
///
/// Monitoring starts on construction and ends on `stop()` or when the
/// violation limit is reached.
#[pyclass(name = "RustExamMonitor")]
struct PyExamMonitor {
    inner: MonitorHandle,
}

#[pymethods]
impl PyExamMonitor {
    /// Start monitoring.
    ///
    /// Args:
    ///     subject_id: Who is taking the exam.
    ///     session_id: Which exam session.
    ///     on_violation: Callable[[str], None], called with the violation kind.
    ///     on_threshold_breach: Optional Callable[[], None], called once.
    ///     config: Optional MonitorConfig (uses defaults if None).
    ///     audit_callback: Optional Callable[[dict], None] persisting one
    ///                     audit record. Exceptions are logged and dropped.
    ///     on_presence_change: Optional Callable[[str], None].
    #[new]
    #[pyo3(signature = (
        subject_id,
        session_id,
        on_violation,
        on_threshold_breach = None,
        config = None,
        audit_callback = None,
        on_presence_change = None,
    ))]
    fn new(
        subject_id: &str,
        session_id: &str,
        on_violation: PyObject,
        on_threshold_breach: Option<PyObject>,
        config: Option<PyMonitorConfig>,
        audit_callback: Option<PyObject>,
        on_presence_change: Option<PyObject>,
    ) -> PyResult<Self> {
        let identity = SessionIdentity::new(subject_id, session_id)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        let cfg = config.map(|c| c.inner).unwrap_or_default();

        let host = PyHost {
            on_violation,
            on_threshold_breach,
            on_presence_change,
        };
        let mut monitor = ExamMonitor::new(identity)
            .config(cfg)
            .host(Arc::new(host));

        if let Some(cb) = audit_callback {
            monitor = monitor.audit_store(ExternalAudit::new(move |record: &AuditRecord| {
                Python::with_gil(|py| {
                    let dict = record_to_dict(py, record)
                        .map_err(|e| ProctorError::Audit(e.to_string()))?;
                    cb.call1(py, (dict,))
                        .map(|_| ())
                        .map_err(|e| ProctorError::Audit(e.to_string()))
                })
            }));
        }

        let inner = monitor
            .start()
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Feed one detector result as a list of (left, top, right, bottom).
    fn report_faces(&self, boxes: Vec<(f64, f64, f64, f64)>) {
        let faces = boxes
            .into_iter()
            .map(|(l, t, r, b)| FaceBox::new(l, t, r, b))
            .collect();
        self.inner.report_observation(&FaceObservation::new(faces));
    }

    /// Feed one detector result as a bare face count.
    fn report_face_count(&self, count: usize) {
        self.inner
            .report_observation(&FaceObservation::with_count(count));
    }

    fn report_visibility(&self, hidden: bool) {
        self.inner.report_visibility(hidden);
    }

    fn report_fullscreen(&self, active: bool) {
        self.inner.report_fullscreen(active);
    }

    /// Stop monitoring. Safe to call repeatedly.
    fn stop(&self) {
        self.inner.stop();
    }

    /// Wait for pending audit writes. Returns (written, failed, dropped).
    fn drain_audit(&self, py: Python<'_>) -> (u64, u64, u64) {
        let stats = py.allow_threads(|| self.inner.drain_audit());
        (stats.written, stats.failed, stats.dropped)
    }

    #[getter]
    fn severity_score(&self) -> u32 {
        self.inner.snapshot().severity_score
    }

    #[getter]
    fn violation_count(&self) -> usize {
        self.inner.snapshot().violation_count
    }

    #[getter]
    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    #[getter]
    fn presence(&self) -> &'static str {
        self.inner.snapshot().presence.as_str()
    }

    /// Kinds of the last three violations, oldest first.
    #[getter]
    fn recent_violations(&self) -> Vec<&'static str> {
        self.inner
            .snapshot()
            .recent
            .iter()
            .map(|k| k.as_str())
            .collect()
    }

    fn __repr__(&self) -> String {
        let snap = self.inner.snapshot();
        format!(
            "RustExamMonitor(lifecycle={:?}, violations={}, severity={})",
            snap.lifecycle, snap.violation_count, snap.severity_score
        )
    }
}

// ─── Module ─────────────────────────────────────────────────────────

#[pymodule]
fn proctor_kernel(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyMonitorConfig>()?;
    m.add_class::<PyExamMonitor>()?;
    Ok(())
}
