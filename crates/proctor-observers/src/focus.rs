// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — Browser Focus Edge Detection
// ─────────────────────────────────────────────────────────────────────

use proctor_types::ConditionKind;
use serde::{Deserialize, Serialize};

/// A change reported by the host's visibility or fullscreen listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusSignal {
    Visibility { hidden: bool },
    Fullscreen { active: bool },
}

/// Edge-triggered focus tracking.
///
/// Entering a bad state (page hidden, fullscreen lost) yields exactly
/// one detection; repeated reports of the same state and returns to the
/// good state yield none. Starts visible and fullscreen.
#[derive(Debug, Clone, Default)]
pub struct FocusTracker {
    hidden: bool,
    fullscreen_lost: bool,
}

impl FocusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, signal: FocusSignal) -> Option<ConditionKind> {
        match signal {
            FocusSignal::Visibility { hidden } => {
                let edge = hidden && !self.hidden;
                self.hidden = hidden;
                edge.then_some(ConditionKind::TabSwitch)
            }
            FocusSignal::Fullscreen { active } => {
                let lost = !active;
                let edge = lost && !self.fullscreen_lost;
                self.fullscreen_lost = lost;
                edge.then_some(ConditionKind::FullscreenExit)
            }
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_fullscreen(&self) -> bool {
        !self.fullscreen_lost
    }
}
