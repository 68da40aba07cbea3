// src/anim/ease.rs

use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigError;

/// Named easing curve passed through to the animation collaborator.
///
/// The curve itself is evaluated by the collaborator; `jobflow` only names
/// it. Default is `CubicInOut`, matching the historical transition default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ease {
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    #[default]
    CubicInOut,
}

impl Ease {
    /// The collaborator-facing name of the curve.
    pub fn name(&self) -> &'static str {
        match self {
            Ease::Linear => "linear",
            Ease::QuadIn => "quad-in",
            Ease::QuadOut => "quad-out",
            Ease::QuadInOut => "quad-in-out",
            Ease::CubicIn => "cubic-in",
            Ease::CubicOut => "cubic-out",
            Ease::CubicInOut => "cubic-in-out",
        }
    }
}

impl fmt::Display for Ease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Ease {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(Ease::Linear),
            "quad-in" => Ok(Ease::QuadIn),
            "quad-out" => Ok(Ease::QuadOut),
            "quad-in-out" => Ok(Ease::QuadInOut),
            "cubic-in" => Ok(Ease::CubicIn),
            "cubic-out" => Ok(Ease::CubicOut),
            "cubic-in-out" => Ok(Ease::CubicInOut),
            other => Err(ConfigError::UnknownEase(other.to_string())),
        }
    }
}
