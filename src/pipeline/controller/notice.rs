use std::collections::HashSet;
use std::fmt;

/// Operator-facing notices that are reported once per streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notice {
    NoObject,
    NoColor,
    NoDominantColor,
    FrameUnavailable,
    PresenceUnavailable,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::NoObject => "No object detected",
            Notice::NoColor => "No color detected",
            Notice::NoDominantColor => "No dominant color detected",
            Notice::FrameUnavailable => "Failed to capture frame, retrying",
            Notice::PresenceUnavailable => "Presence input unavailable",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Suppresses repeats of a notice until it is cleared.
#[derive(Debug, Default)]
pub struct NoticeLatch {
    raised: HashSet<Notice>,
}

impl NoticeLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true only when the notice was not already raised.
    pub fn raise(&mut self, notice: Notice) -> bool {
        self.raised.insert(notice)
    }

    pub fn clear(&mut self, notice: Notice) {
        self.raised.remove(&notice);
    }
}
