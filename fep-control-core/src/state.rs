//! Lifecycle state vocabulary shared by systems and participants.

use serde::{Deserialize, Serialize};

/// Aggregated lifecycle state of a system (also used for single participants).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemState {
    Undefined = 0,
    Unreachable = 1,
    Unloaded = 2,
    Loaded = 3,
    Initialized = 4,
    Paused = 5,
    Running = 6,
}

/// State names accepted by `setSystemState` / `setParticipantState`, in
/// completion order.
pub const SETTABLE_STATE_NAMES: &[&str] = &[
    "shutdowned",
    "unloaded",
    "loaded",
    "initialized",
    "paused",
    "running",
];

impl SystemState {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            SystemState::Undefined => "undefined",
            SystemState::Unreachable => "unreachable",
            SystemState::Unloaded => "unloaded",
            SystemState::Loaded => "loaded",
            SystemState::Initialized => "initialized",
            SystemState::Paused => "paused",
            SystemState::Running => "running",
        }
    }

    /// Map user text to a state. `shutdowned` means unreachable; anything
    /// unknown maps to `Undefined`.
    pub fn from_user_text(text: &str) -> Self {
        match text {
            "shutdowned" => SystemState::Unreachable,
            "unloaded" => SystemState::Unloaded,
            "loaded" => SystemState::Loaded,
            "initialized" => SystemState::Initialized,
            "paused" => SystemState::Paused,
            "running" => SystemState::Running,
            _ => SystemState::Undefined,
        }
    }
}

impl std::fmt::Display for SystemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a system state query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatedState {
    pub state: SystemState,
    /// Every participant is in `state`.
    pub homogeneous: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_stable() {
        assert_eq!(SystemState::Undefined.id(), 0);
        assert_eq!(SystemState::Unreachable.id(), 1);
        assert_eq!(SystemState::Running.id(), 6);
    }

    #[test]
    fn test_user_text_mapping() {
        assert_eq!(SystemState::from_user_text("shutdowned"), SystemState::Unreachable);
        assert_eq!(SystemState::from_user_text("running"), SystemState::Running);
        assert_eq!(SystemState::from_user_text("bogus"), SystemState::Undefined);
        assert_eq!(SystemState::from_user_text("Running"), SystemState::Undefined);
    }

    #[test]
    fn test_settable_names_roundtrip() {
        for name in SETTABLE_STATE_NAMES.iter().skip(1) {
            assert_eq!(SystemState::from_user_text(name).name(), *name);
        }
    }
}
