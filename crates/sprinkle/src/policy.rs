//! Claim and visibility windows.
//!
//! Both windows are configured as a unit and a magnitude (for example `10m`
//! or `7d`) and turned into absolute deadlines at creation time.

use crate::{DEFAULT_DAMPENING, MAX_TOKEN_ATTEMPTS};
use core::{fmt, str::FromStr};

const SECOND: u64 = 1_000;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Unit of a [`Window`].
///
/// Months and years are fixed-length (30 and 365 days).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WindowUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Months,
    Years,
}

impl WindowUnit {
    pub const fn millis(self) -> u64 {
        match self {
            Self::Seconds => SECOND,
            Self::Minutes => MINUTE,
            Self::Hours => HOUR,
            Self::Days => DAY,
            Self::Months => 30 * DAY,
            Self::Years => 365 * DAY,
        }
    }

    /// The single-letter suffix used in window strings.
    pub const fn suffix(self) -> char {
        match self {
            Self::Seconds => 's',
            Self::Minutes => 'm',
            Self::Hours => 'h',
            Self::Days => 'd',
            Self::Months => 'M',
            Self::Years => 'y',
        }
    }

    const fn from_suffix(suffix: char) -> Option<Self> {
        match suffix {
            's' => Some(Self::Seconds),
            'm' => Some(Self::Minutes),
            'h' => Some(Self::Hours),
            'd' => Some(Self::Days),
            'M' => Some(Self::Months),
            'y' => Some(Self::Years),
            _ => None,
        }
    }
}

/// A duration expressed as `magnitude` × `unit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Window {
    pub unit: WindowUnit,
    pub magnitude: u32,
}

impl Window {
    pub const fn new(unit: WindowUnit, magnitude: u32) -> Self {
        Self { unit, magnitude }
    }

    pub const fn minutes(magnitude: u32) -> Self {
        Self::new(WindowUnit::Minutes, magnitude)
    }

    pub const fn days(magnitude: u32) -> Self {
        Self::new(WindowUnit::Days, magnitude)
    }

    /// Length of the window in milliseconds, saturating at `u64::MAX`.
    pub const fn as_millis(self) -> u64 {
        (self.magnitude as u64).saturating_mul(self.unit.millis())
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit.suffix())
    }
}

/// Why a window string could not be parsed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseWindowError {
    #[error("window is empty")]
    Empty,
    #[error("unknown window unit {0:?}, expected one of s, m, h, d, M, y")]
    UnknownUnit(char),
    #[error("invalid window magnitude {0:?}")]
    InvalidMagnitude(String),
    #[error("window magnitude must be greater than zero")]
    Zero,
}

impl FromStr for Window {
    type Err = ParseWindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let suffix = s.chars().last().ok_or(ParseWindowError::Empty)?;
        let unit = WindowUnit::from_suffix(suffix).ok_or(ParseWindowError::UnknownUnit(suffix))?;
        let digits = &s[..s.len() - suffix.len_utf8()];
        let magnitude: u32 = digits
            .parse()
            .map_err(|_| ParseWindowError::InvalidMagnitude(digits.to_owned()))?;
        if magnitude == 0 {
            return Err(ParseWindowError::Zero);
        }
        Ok(Self { unit, magnitude })
    }
}

/// The absolute timestamps fixed when an allocation is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadlines {
    pub created_at: u64,
    pub claim_deadline: u64,
    pub visibility_deadline: u64,
}

/// Engine-wide settings.
///
/// `claim_window` is expected to be no longer than `visibility_window`, but the
/// engine does not enforce it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Policy {
    pub claim_window: Window,
    pub visibility_window: Window,
    /// See [`crate::Partitioner::with_dampening`]. `None` disables dampening.
    pub dampening: Option<f64>,
    pub max_token_attempts: usize,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            claim_window: Window::minutes(10),
            visibility_window: Window::days(7),
            dampening: Some(DEFAULT_DAMPENING),
            max_token_attempts: MAX_TOKEN_ATTEMPTS,
        }
    }
}

impl Policy {
    pub fn deadlines(&self, created_at: u64) -> Deadlines {
        Deadlines {
            created_at,
            claim_deadline: created_at.saturating_add(self.claim_window.as_millis()),
            visibility_deadline: created_at.saturating_add(self.visibility_window.as_millis()),
        }
    }

    /// Returns `true` when the claim window outlasts the visibility window,
    /// which leaves part of the claim window unusable.
    pub fn has_inverted_windows(&self) -> bool {
        self.claim_window.as_millis() > self.visibility_window.as_millis()
    }
}
