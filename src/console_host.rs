// SPDX-License-Identifier: MIT OR Apache-2.0

//! A reference host that logs to a console.
//!
//! `ConsoleHost` is the smallest host that satisfies [`crate::host`]: it builds a
//! [`HostLogger`] with a console sink, fires started hooks, then waits until something
//! calls [`ApplicationLifetime::stop_application`].  It is what the minimal terminal
//! configuration runs on by default, and a fine host for command-line tools.
//!
//! ```
//! use bootlog::{CapturedConsole, ConsoleHostBuilder, Host, HostBuilder, started_hook};
//! use std::sync::Arc;
//!
//! let console = Arc::new(CapturedConsole::new());
//! let mut builder = ConsoleHostBuilder::with_console(Vec::<String>::new(), console.clone());
//! builder.on_started(started_hook(|logger, lifetime| {
//!     logger.log(bootlog::Level::Information, "up");
//!     lifetime.stop_application();
//! }));
//! let host = builder.build().unwrap();
//! test_executors::spin_on(host.run()).unwrap();
//! assert!(console.contents().contains("up"));
//! ```

use crate::config::Config;
use crate::console::{Console, StdErrConsole};
use crate::error::HostError;
use crate::host::{
    ApplicationLifetime, Host, HostBuilder, HostContext, HostFactory, HostLogger, LoggingBuilder,
    LoggingConfig, StartedHook,
};
use crate::logger::Logger;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, Waker};

/// Makes [ConsoleHostBuilder]s that share one console.
#[derive(Debug, Clone)]
pub struct ConsoleHostFactory {
    console: Arc<dyn Console>,
}

impl ConsoleHostFactory {
    /// Hosts that write to standard error.
    pub fn new() -> Self {
        Self::with_console(Arc::new(StdErrConsole))
    }

    pub fn with_console(console: Arc<dyn Console>) -> Self {
        Self { console }
    }
}

impl Default for ConsoleHostFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl HostFactory for ConsoleHostFactory {
    type Builder = ConsoleHostBuilder;

    fn create_builder(&self, args: &[String]) -> ConsoleHostBuilder {
        ConsoleHostBuilder::with_console(args.to_vec(), self.console.clone())
    }
}

pub struct ConsoleHostBuilder {
    context: HostContext,
    console: Arc<dyn Console>,
    logging: Vec<LoggingConfig>,
    started: Vec<StartedHook>,
    lifetime: Arc<ConsoleLifetime>,
}

impl ConsoleHostBuilder {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_console(args, Arc::new(StdErrConsole))
    }

    pub fn with_console<I, S>(args: I, console: Arc<dyn Console>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            context: HostContext::new(args.into_iter().map(Into::into).collect()),
            console,
            logging: Vec::new(),
            started: Vec::new(),
            lifetime: Arc::new(ConsoleLifetime::new()),
        }
    }

    /// The handle the built host waits on.  Call `stop_application` on it to end the run.
    pub fn lifetime(&self) -> Arc<ConsoleLifetime> {
        self.lifetime.clone()
    }
}

impl std::fmt::Debug for ConsoleHostBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleHostBuilder")
            .field("context", &self.context)
            .field("console", &self.console)
            .field("logging", &self.logging.len())
            .field("started", &self.started.len())
            .finish()
    }
}

impl HostBuilder for ConsoleHostBuilder {
    type Host = ConsoleHost;

    fn context(&self) -> &HostContext {
        &self.context
    }

    fn configure_logging(&mut self, configure: LoggingConfig) -> &mut Self {
        self.logging.push(configure);
        self
    }

    fn on_started(&mut self, hook: StartedHook) -> &mut Self {
        self.started.push(hook);
        self
    }

    /**
    Applies the defaults (a console sink at [Config::minimum_level]) and then every
    registered logging configuration, in order.  The first failing configuration
    aborts the build.
    */
    fn build(self) -> Result<ConsoleHost, HostError> {
        let mut logging = LoggingBuilder::new(self.console.clone());
        logging
            .add_console()
            .set_minimum_level(Config::global().minimum_level);
        for (index, configure) in self.logging.iter().enumerate() {
            configure(&self.context, &mut logging)
                .map_err(|source| HostError::LoggingConfiguration { index, source })?;
        }
        Ok(ConsoleHost {
            logger: logging.build(),
            started: self.started,
            lifetime: self.lifetime,
        })
    }
}

pub struct ConsoleHost {
    logger: HostLogger,
    started: Vec<StartedHook>,
    lifetime: Arc<ConsoleLifetime>,
}

impl ConsoleHost {
    pub fn logger(&self) -> &HostLogger {
        &self.logger
    }

    pub fn lifetime(&self) -> Arc<ConsoleLifetime> {
        self.lifetime.clone()
    }
}

impl std::fmt::Debug for ConsoleHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleHost")
            .field("logger", &self.logger)
            .field("started", &self.started.len())
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl Host for ConsoleHost {
    fn run(self) -> impl Future<Output = Result<(), HostError>> + Send {
        async move {
            for hook in &self.started {
                hook(&self.logger, &*self.lifetime);
            }
            self.lifetime.stopped().await;
            self.logger.prepare_to_die();
            Ok(())
        }
    }
}

/// Stop signal for a [ConsoleHost].
#[derive(Debug, Default)]
pub struct ConsoleLifetime {
    stopping: AtomicBool,
    waker: Mutex<Option<Waker>>,
}

impl ConsoleLifetime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves once [ApplicationLifetime::stop_application] has been called.
    pub fn stopped(&self) -> impl Future<Output = ()> + Send + '_ {
        Stopped { lifetime: self }
    }
}

impl ApplicationLifetime for ConsoleLifetime {
    fn stop_application(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        let waker = self
            .waker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }
}

struct Stopped<'a> {
    lifetime: &'a ConsoleLifetime,
}

impl Future for Stopped<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.lifetime.is_stopping() {
            return Poll::Ready(());
        }
        *self
            .lifetime
            .waker
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(cx.waker().clone());
        //a stop between the first check and storing the waker would otherwise be missed
        if self.lifetime.is_stopping() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}
