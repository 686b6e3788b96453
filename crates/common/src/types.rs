use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Evaluation persona selected per conversation.
///
/// The mode only changes the prompt handed to the evaluator; the submission
/// flow is identical for every variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Basic,
    Stylized,
    Critical,
}

impl Mode {
    pub const ALL: [Self; 3] = [Self::Basic, Self::Stylized, Self::Critical];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Stylized => "stylized",
            Self::Critical => "critical",
        }
    }

    /// Human-readable label shown on mode selection buttons.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Basic => "🟢 Basic",
            Self::Stylized => "🎨 Stylized",
            Self::Critical => "🔥 Critical",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::unknown("mode", wanted))
    }
}
