// SPDX-License-Identifier: MIT OR Apache-2.0

//! What bootlog needs from an application host.
//!
//! bootlog does not start services or wire dependencies; a host framework does that.
//! This module is the small surface such a framework has to offer for startup
//! diagnostics to work:
//!
//! * a [`HostFactory`] that makes fresh [`HostBuilder`]s, so a terminal run can start
//!   over from nothing;
//! * [`HostBuilder::configure_logging`], taking a [`LoggingConfig`] callback that is
//!   applied to a [`LoggingBuilder`] when the host is built;
//! * [`HostBuilder::on_started`], a [`StartedHook`] fired once the application reports
//!   that it started, with the live [`HostLogger`] and an [`ApplicationLifetime`] that
//!   can request shutdown;
//! * [`Host::run`], which runs the host to completion.
//!
//! [`crate::console_host`] is a reference implementation.

use crate::Level;
use crate::config::Config;
use crate::console::{Console, ConsoleLogger};
use crate::error::{ConfigureError, HostError};
use crate::logger::Logger;
use crate::record::Record;
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// What a logging configuration callback can see about the host it configures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
    args: Vec<String>,
    application_name: String,
    environment: String,
}

impl HostContext {
    /// A context for `args`, named and placed according to [`Config::global`].
    pub fn new(args: Vec<String>) -> Self {
        let config = Config::global();
        Self {
            args,
            application_name: config.process_name.clone(),
            environment: config.environment.clone(),
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Case-insensitive comparison against the environment name.
    pub fn is_environment(&self, name: &str) -> bool {
        self.environment.eq_ignore_ascii_case(name)
    }
}

/**
Collects the sinks and minimum level a host will log with.

A builder starts empty; hosts add their defaults before running the registered
[LoggingConfig] callbacks against it.
*/
#[derive(Debug)]
pub struct LoggingBuilder {
    loggers: Vec<Arc<dyn Logger>>,
    minimum_level: Level,
    console: Arc<dyn Console>,
}

impl LoggingBuilder {
    /// An empty builder whose [LoggingBuilder::add_console] writes to `console`.
    pub fn new(console: Arc<dyn Console>) -> Self {
        Self {
            loggers: Vec::new(),
            minimum_level: Level::default(),
            console,
        }
    }

    pub fn add_logger(&mut self, logger: Arc<dyn Logger>) -> &mut Self {
        self.loggers.push(logger);
        self
    }

    /// Adds a [ConsoleLogger] writing to the host's console.
    pub fn add_console(&mut self) -> &mut Self {
        self.add_logger(Arc::new(ConsoleLogger::new(self.console.clone())))
    }

    pub fn clear_loggers(&mut self) -> &mut Self {
        self.loggers.clear();
        self
    }

    pub fn set_minimum_level(&mut self, level: Level) -> &mut Self {
        self.minimum_level = level;
        self
    }

    pub fn minimum_level(&self) -> Level {
        self.minimum_level
    }

    pub fn loggers(&self) -> &[Arc<dyn Logger>] {
        &self.loggers
    }

    pub fn build(self) -> HostLogger {
        HostLogger {
            minimum_level: self.minimum_level,
            loggers: self.loggers.into(),
        }
    }
}

/**
A logging configuration callback.

Callbacks may fail, and during a terminal run the operator's callback is presumed
guilty: it is often the reason the process is dying.  Use [logging_config] to build one
from a closure.
*/
pub type LoggingConfig =
    Arc<dyn Fn(&HostContext, &mut LoggingBuilder) -> Result<(), ConfigureError> + Send + Sync>;

/**
Wraps a closure as a [LoggingConfig].

```
use bootlog::{Level, logging_config};

let verbose = logging_config(|context, logging| {
    if context.is_environment("Development") {
        logging.set_minimum_level(Level::Debug);
    }
    Ok(())
});
# let _ = verbose;
```
*/
pub fn logging_config<F>(configure: F) -> LoggingConfig
where
    F: Fn(&HostContext, &mut LoggingBuilder) -> Result<(), ConfigureError> + Send + Sync + 'static,
{
    Arc::new(configure)
}

/**
The logger a built host hands to its started hooks.

It forwards every record at or above its minimum level to each configured sink.
*/
#[derive(Debug, Clone)]
pub struct HostLogger {
    minimum_level: Level,
    loggers: Arc<[Arc<dyn Logger>]>,
}

impl HostLogger {
    pub fn minimum_level(&self) -> Level {
        self.minimum_level
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        level >= self.minimum_level
    }

    /// Logs a freshly stamped message.
    pub fn log(&self, level: Level, message: &str) {
        if self.is_enabled(level) {
            self.finish_log_record(Record::new(level, message, None, Vec::new()));
        }
    }
}

impl Logger for HostLogger {
    fn finish_log_record(&self, record: Record) {
        if !self.is_enabled(record.level()) {
            return;
        }
        for logger in self.loggers.iter() {
            logger.finish_log_record(record.clone());
        }
    }

    fn finish_log_record_async<'s>(
        &'s self,
        record: Record,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 's>> {
        Box::pin(async move {
            if !self.is_enabled(record.level()) {
                return;
            }
            for logger in self.loggers.iter() {
                logger.finish_log_record_async(record.clone()).await;
            }
        })
    }

    fn prepare_to_die(&self) {
        for logger in self.loggers.iter() {
            logger.prepare_to_die();
        }
    }
}

/// Lets a started hook ask the host to shut down.
pub trait ApplicationLifetime: Send + Sync {
    /// Requests a graceful stop; [Host::run] returns once the host has wound down.
    fn stop_application(&self);

    fn is_stopping(&self) -> bool;
}

/**
Fired once when the built application reports that it started.

Hosts call each registered hook once per run.  bootlog's own hooks tolerate being
fired again anyway.
*/
pub type StartedHook = Arc<dyn Fn(&HostLogger, &dyn ApplicationLifetime) + Send + Sync>;

/// Wraps a closure as a [StartedHook].
pub fn started_hook<F>(hook: F) -> StartedHook
where
    F: Fn(&HostLogger, &dyn ApplicationLifetime) + Send + Sync + 'static,
{
    Arc::new(hook)
}

pub trait HostBuilder {
    type Host: Host;

    fn context(&self) -> &HostContext;

    /// Registers a logging configuration callback, applied in registration order during
    /// [HostBuilder::build].
    fn configure_logging(&mut self, configure: LoggingConfig) -> &mut Self;

    fn on_started(&mut self, hook: StartedHook) -> &mut Self;

    fn build(self) -> Result<Self::Host, HostError>;
}

pub trait Host {
    /// Runs the application until it stops, firing started hooks along the way.
    fn run(self) -> impl Future<Output = Result<(), HostError>> + Send;
}

/// Makes fresh host builders, so a terminal run never inherits a failed builder's state.
pub trait HostFactory {
    type Builder: HostBuilder;

    fn create_builder(&self, args: &[String]) -> Self::Builder;
}
