// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
Getting buffered diagnostics out of a process whose host failed to start.

When startup fails, the records in the [StartupBuffer] are often the only explanation of
what went wrong, and the host that was supposed to log them never came up.  The
[FallbackController] builds a throwaway *terminal host* whose only job is to replay the
buffer and stop.

It tries two tiers:

1. **Preferred.**  The logging configuration the application registered, if any.  It is
   what the operator expects to read, but it is also the prime suspect: a broken sink or
   a bad setting may be why the process is dying.  Any failure here, including a panic,
   is absorbed.
2. **Default.**  A minimal configuration: one console sink, nothing else.  If even this
   fails, the error goes to the caller as [FallbackError::DefaultTier].

Both tiers log at [Level::Trace], so a verbose record captured during startup is not
filtered out on its way to the operator.

```
use bootlog::{CapturedConsole, ConsoleHostFactory, FallbackController, StartupBuffer, Tier};
use std::sync::Arc;

let buffer = Arc::new(StartupBuffer::new());
buffer.debug("connecting to the settings store");
buffer.error("settings store unreachable");

let console = Arc::new(CapturedConsole::new());
let controller = FallbackController::new(
    buffer,
    None,
    ConsoleHostFactory::with_console(console.clone()),
    Vec::new(),
);
let outcome = test_executors::spin_on(controller.terminal_emit()).unwrap();
assert_eq!(outcome.tier, Tier::Default);
assert_eq!(outcome.emitted, 2);
assert!(console.contents().contains("settings store unreachable"));
```
*/

use crate::Level;
use crate::buffer::StartupBuffer;
use crate::error::{AttemptError, FallbackError, HostError};
use crate::hooks::TerminatorHook;
use crate::host::{Host, HostBuilder, HostFactory, LoggingConfig, logging_config};
use crate::unwind;
use std::sync::{Arc, Mutex, PoisonError};

/// Which configuration a terminal host ran with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Preferred,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FallbackState {
    #[default]
    Idle,
    AttemptingPreferred,
    AttemptingDefault,
    Success(Tier),
    Fatal,
}

/// How a successful terminal emission went.
#[derive(Debug)]
pub struct TerminalOutcome {
    /// The tier whose host emitted the buffer.
    pub tier: Tier,
    /// Buffered records emitted by that host, not counting the banner.
    pub emitted: usize,
    /// Why the preferred tier was abandoned, if it was tried and failed.
    pub preferred_failure: Option<AttemptError>,
    /// Every state the controller passed through, starting with [FallbackState::Idle].
    pub states: Vec<FallbackState>,
}

/**
The logging configuration of the default tier: drop every sink the host installed, log
to the console only.

The level is forced to [Level::Trace] separately, for both tiers.
*/
pub fn minimal_logging() -> LoggingConfig {
    logging_config(|_, logging| {
        logging
            .clear_loggers()
            .add_console()
            .set_minimum_level(Level::Trace);
        Ok(())
    })
}

fn trace_everything() -> LoggingConfig {
    logging_config(|_, logging| {
        logging.set_minimum_level(Level::Trace);
        Ok(())
    })
}

/**
Runs terminal emission against fresh hosts from a [HostFactory].

The preferred configuration is handed over at construction; a controller never looks
anything up globally.  See the [module documentation](self) for the tiers.
*/
pub struct FallbackController<F> {
    buffer: Arc<StartupBuffer>,
    preferred: Option<LoggingConfig>,
    factory: F,
    args: Vec<String>,
    state: Mutex<FallbackState>,
}

impl<F: HostFactory> FallbackController<F> {
    pub fn new(
        buffer: Arc<StartupBuffer>,
        preferred: Option<LoggingConfig>,
        factory: F,
        args: Vec<String>,
    ) -> Self {
        Self {
            buffer,
            preferred,
            factory,
            args,
            state: Mutex::new(FallbackState::Idle),
        }
    }

    /// The state of the most recent (or running) emission.
    pub fn state(&self) -> FallbackState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, next: FallbackState, states: &mut Vec<FallbackState>) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
        states.push(next);
    }

    /**
    Emits the buffer through the preferred tier, or the default tier if that fails.

    A failed preferred attempt is not reported as an error; it is kept in
    [TerminalOutcome::preferred_failure].  Only a failure of the default tier is.
    */
    pub async fn terminal_emit(&self) -> Result<TerminalOutcome, FallbackError> {
        let mut states = Vec::new();
        self.enter(FallbackState::Idle, &mut states);

        let mut preferred_failure = None;
        if let Some(preferred) = &self.preferred {
            self.enter(FallbackState::AttemptingPreferred, &mut states);
            match self.attempt_preferred(preferred.clone()).await {
                Ok(emitted) => {
                    self.enter(FallbackState::Success(Tier::Preferred), &mut states);
                    return Ok(TerminalOutcome {
                        tier: Tier::Preferred,
                        emitted,
                        preferred_failure: None,
                        states,
                    });
                }
                Err(failure) => preferred_failure = Some(failure),
            }
        }

        self.enter(FallbackState::AttemptingDefault, &mut states);
        match self.attempt_default().await {
            Ok(emitted) => {
                self.enter(FallbackState::Success(Tier::Default), &mut states);
                Ok(TerminalOutcome {
                    tier: Tier::Default,
                    emitted,
                    preferred_failure,
                    states,
                })
            }
            Err(source) => {
                self.enter(FallbackState::Fatal, &mut states);
                Err(FallbackError::DefaultTier {
                    source,
                    preferred: preferred_failure,
                })
            }
        }
    }

    /// One attempt with `preferred`.  Panics from configuration, build or run are caught.
    pub async fn attempt_preferred(&self, preferred: LoggingConfig) -> Result<usize, AttemptError> {
        let (host, hook) = unwind::catch(|| self.prepare(preferred))
            .map_err(AttemptError::Panicked)??;
        unwind::catch_future(run_terminal(host, hook))
            .await
            .map_err(AttemptError::Panicked)?
    }

    /// One attempt with [minimal_logging].
    pub async fn attempt_default(&self) -> Result<usize, AttemptError> {
        let (host, hook) = self.prepare(minimal_logging())?;
        run_terminal(host, hook).await
    }

    fn prepare(
        &self,
        configure: LoggingConfig,
    ) -> Result<(<F::Builder as HostBuilder>::Host, Arc<TerminatorHook>), HostError> {
        let hook = Arc::new(TerminatorHook::new(self.buffer.clone()));
        let mut builder = self.factory.create_builder(&self.args);
        builder
            .configure_logging(configure)
            .configure_logging(trace_everything())
            .on_started(hook.started_hook());
        let host = builder.build()?;
        Ok((host, hook))
    }
}

async fn run_terminal<H: Host>(host: H, hook: Arc<TerminatorHook>) -> Result<usize, AttemptError> {
    host.run().await?;
    if hook.has_fired() {
        Ok(hook.emitted())
    } else {
        Err(AttemptError::NeverStarted)
    }
}

impl<F: std::fmt::Debug> std::fmt::Debug for FallbackController<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackController")
            .field("buffer", &self.buffer)
            .field("preferred", &self.preferred.is_some())
            .field("factory", &self.factory)
            .field("args", &self.args)
            .field("state", &self.state)
            .finish()
    }
}
