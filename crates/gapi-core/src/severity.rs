//! Syslog-style severity levels attached to errors.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Severity of an error or log entry.
///
/// Levels follow syslog. [`Severity::Default`] means "unset" and is reported
/// as [`Severity::Error`] by [`Severity::effective`].
///
/// Ordering goes from least to most severe:
/// `Default < Debug < Info < Warn < Error < Critical < Alert < Emergency`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// No severity has been set.
    #[default]
    Default,
    /// Highest level of severity.
    Emergency,
    /// Should be corrected as soon as possible.
    Alert,
    /// Failure in a primary system.
    Critical,
    /// Errors that should definitely be noted.
    Error,
    /// Non-critical entries that deserve eyes.
    #[serde(rename = "warning")]
    Warn,
    /// Normal behavior of the application.
    Info,
    /// Debugging only.
    Debug,
}

impl Severity {
    /// All severities, unset first.
    pub const ALL: [Severity; 8] = [
        Self::Default,
        Self::Emergency,
        Self::Alert,
        Self::Critical,
        Self::Error,
        Self::Warn,
        Self::Info,
        Self::Debug,
    ];

    const fn rank(self) -> u8 {
        match self {
            Self::Default => 0,
            Self::Debug => 1,
            Self::Info => 2,
            Self::Warn => 3,
            Self::Error => 4,
            Self::Critical => 5,
            Self::Alert => 6,
            Self::Emergency => 7,
        }
    }

    /// Resolves [`Severity::Default`] to [`Severity::Error`].
    #[must_use]
    pub const fn effective(self) -> Self {
        match self {
            Self::Default => Self::Error,
            other => other,
        }
    }

    /// Returns `true` when no severity was set.
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }

    /// Returns the lowercase name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Emergency => "emergency",
            Self::Alert => "alert",
            Self::Critical => "critical",
            Self::Error => "error",
            Self::Warn => "warning",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
