use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ControllerState {
    #[default]
    Idle,
    Scanning,
    Capturing,
    Actuating,
}

impl ControllerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerState::Idle => "Idle",
            ControllerState::Scanning => "Scanning",
            ControllerState::Capturing => "Capturing",
            ControllerState::Actuating => "Actuating",
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
