use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Describing,
    Generating,
    Editing,
    Ready,
    Failed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Describing => "describing",
            Phase::Generating => "generating",
            Phase::Editing => "editing",
            Phase::Ready => "ready",
            Phase::Failed => "failed",
        }
    }

    /// True while a gateway request is outstanding.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Phase::Describing | Phase::Generating | Phase::Editing)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
