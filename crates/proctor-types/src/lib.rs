// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — Shared Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy for the
//! Proctor Kernel — the exam-integrity monitor that turns camera and
//! browser-focus signals into violation events.

pub mod config;
pub mod error;
pub mod event;
pub mod session;

pub use config::{MonitorConfig, ViolationWeights};
pub use error::{ProctorError, ProctorResult};
pub use event::{
    AuditRecord, ConditionDetection, ConditionKind, FaceBox, FaceObservation, PresenceState,
    ViolationEvent,
};
pub use session::{LifecycleState, SessionIdentity, SessionState, TerminationReason};
