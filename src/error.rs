// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors.
//!
//! bootlog sorts failures by who is allowed to see them:
//!
//! * [`ConfigureError`] and [`HostError`] come from the host and from logging
//!   configuration callbacks.  During a terminal run they are expected.
//! * [`AttemptError`] is what one terminal attempt produced.  A failed preferred attempt
//!   is absorbed by the fallback controller and only shows up in its outcome.
//! * [`FallbackError`] means the minimal configuration failed as well.  Nothing else can
//!   be tried, so it is handed to the caller.

use std::error::Error;

type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Returned by a logging configuration callback that cannot apply itself.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ConfigureError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ConfigureError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// A host could not be built or did not run to completion.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// A logging configuration callback failed while the host was being built.
    #[error("logging configuration #{index} failed: {source}")]
    LoggingConfiguration {
        /// Position of the callback, in registration order.
        index: usize,
        #[source]
        source: ConfigureError,
    },
    /// The host could not be built for a reason of its own.
    #[error("failed to build host: {0}")]
    Build(String),
    /// The host started but its run ended in failure.
    #[error("host run failed: {source}")]
    Run {
        #[source]
        source: BoxError,
    },
}

impl HostError {
    pub fn run(source: impl Into<BoxError>) -> Self {
        HostError::Run {
            source: source.into(),
        }
    }
}

/// Why a single terminal attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error(transparent)]
    Host(#[from] HostError),
    /// Configuration, build or run panicked.
    #[error("terminal attempt panicked: {0}")]
    Panicked(String),
    /// The host ran to completion without ever reporting that it started, so the buffer
    /// was never replayed.
    #[error("host finished without reporting that it started")]
    NeverStarted,
}

/// Both terminal tiers failed; buffered diagnostics could not be emitted.
#[derive(Debug, thiserror::Error)]
pub enum FallbackError {
    #[error("minimal logging configuration failed: {source}")]
    DefaultTier {
        #[source]
        source: AttemptError,
        /// The failure of the preferred tier, if that tier was attempted.
        preferred: Option<AttemptError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("a preferred logging configuration is already registered")]
    PreferredAlreadyRegistered,
}
