// SPDX-License-Identifier: MIT OR Apache-2.0
use std::fmt::Display;
use std::str::FromStr;

/**
Severity of a [Record](crate::Record).

Levels are ordered from most verbose to most severe, so `level >= minimum` is the
filtering test a sink applies.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    /// Step-by-step detail, usually only interesting while chasing a bug
    Trace,
    /// Diagnostics for the developer of the application
    Debug,
    /// The normal flow of the application
    #[default]
    Information,
    /// Suspicious or unexpected, but the application continues
    Warning,
    /// An operation failed
    Error,
    /// The application cannot continue
    Critical,
}

impl Level {
    /// Every level, most verbose first.
    pub const ALL: [Level; 6] = [
        Level::Trace,
        Level::Debug,
        Level::Information,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    /**
    The four-letter tag the console sink prints in front of each record.
    */
    pub const fn console_tag(self) -> &'static str {
        match self {
            Level::Trace => "trce",
            Level::Debug => "dbug",
            Level::Information => "info",
            Level::Warning => "warn",
            Level::Error => "fail",
            Level::Critical => "crit",
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Information => "information",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Critical => "critical",
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a string does not name a [Level].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level '{0}'")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Level::ALL
            .into_iter()
            .find(|level| {
                wanted.eq_ignore_ascii_case(level.name())
                    || wanted.eq_ignore_ascii_case(level.console_tag())
            })
            .ok_or_else(|| ParseLevelError(s.to_string()))
    }
}

/*
Boilerplate notes.

Copy/Clone/Eq/Ord/Hash are all natural for a fieldless enum; Ord is the whole point.
Default is Information, which is what an unconfigured console host filters at.
From/Into integers was considered and rejected: the numeric values are not a stable surface.
*/
