// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — Signal Observers
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Observers that turn raw signals into condition detections.
//!
//! - Presence: frame-count hysteresis over per-frame face counts
//! - Focus: edge detection over browser visibility/fullscreen changes
//! - Aggregator: one ordered detection queue fed by both

pub mod aggregator;
pub mod focus;
pub mod presence;

pub use aggregator::SignalAggregator;
pub use focus::{FocusSignal, FocusTracker};
pub use presence::{PresenceTracker, PresenceUpdate};
