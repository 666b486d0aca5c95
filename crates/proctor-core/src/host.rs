// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — Host Surface
// ─────────────────────────────────────────────────────────────────────
//! Callbacks into the exam host, and the focus-listener capability.

use std::time::Duration;

use proctor_types::{FaceBox, PresenceState, ProctorResult, ViolationEvent};

use crate::monitor::MonitorHandle;

/// Notifications delivered to the exam host.
///
/// Called outside the monitor's state lock, so implementations may
/// call back into the `MonitorHandle` (e.g. `stop()`).
pub trait HostCallbacks: Send + Sync {
    /// Once per accepted violation.
    fn on_violation(&self, event: &ViolationEvent);

    /// Exactly once, when the violation limit is reached.
    fn on_threshold_breach(&self);

    /// Presence changed (e.g. "searching for face").
    fn on_presence_change(&self, _state: PresenceState) {}

    /// Show transient feedback for `duration`. Fire-and-forget.
    fn on_feedback(&self, _duration: Duration) {}

    /// First detected face of the latest tick, for the overlay.
    fn on_face_box(&self, _face: Option<FaceBox>) {}
}

/// Host that ignores every notification.
pub struct NoopHost;

impl HostCallbacks for NoopHost {
    fn on_violation(&self, _event: &ViolationEvent) {}
    fn on_threshold_breach(&self) {}
}

/// Source of visibility and fullscreen changes.
///
/// `attach` hands the source a handle to report through; `detach`
/// must stop further reports and tolerate repeated calls.
pub trait FocusSource: Send {
    fn attach(&mut self, listener: MonitorHandle) -> ProctorResult<()>;
    fn detach(&mut self) -> ProctorResult<()>;
}
