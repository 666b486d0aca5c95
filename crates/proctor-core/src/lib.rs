// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — Core Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Violation classification, escalation, audit forwarding, and the
//! exam monitor runtime.
//!
//! Data flows one way: sensing tick → presence tracker → aggregator
//! (← focus reports) → classifier → escalation engine → {host, audit}.
//!
//! # Session Invariants
//!
//! 1. **Termination is absorbing**: once the engine leaves `Monitoring`
//!    the session is frozen. No violation is appended and the severity
//!    score never changes again. The check happens at append time, so
//!    a detection already in flight is dropped, never double-counted.
//!
//! 2. **Breach fires once**: `on_threshold_breach` is delivered on the
//!    violation that reaches the limit and never again, whatever races
//!    in afterwards.
//!
//! 3. **Monitoring I/O never blocks or aborts the exam**: audit writes
//!    run on a bounded background queue, detector and host-callback
//!    panics are caught, and sensing failures degrade to focus-only
//!    monitoring.
//!
//! 4. **Teardown is idempotent**: stopping twice, or stopping after an
//!    automatic termination, is a no-op.

pub mod audit;
pub mod classifier;
pub mod clock;
pub mod escalation;
pub mod host;
pub mod monitor;
pub mod pipeline;
pub mod sensing;

pub use audit::{AuditSink, AuditStats, AuditStore, ExternalAudit, InMemoryAudit, JsonLinesAudit};
pub use classifier::ViolationClassifier;
pub use clock::{Clock, ManualClock, SystemClock};
pub use escalation::{Escalation, EscalationEngine};
pub use host::{FocusSource, HostCallbacks, NoopHost};
pub use monitor::{ExamMonitor, MonitorHandle};
pub use pipeline::{MonitorEvent, MonitorSnapshot, Pipeline};
pub use proctor_observers::FocusSignal;
pub use sensing::{BlankFrameSource, ExternalDetector, FaceDetector, Frame, FrameSource};
