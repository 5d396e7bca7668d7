// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
The application-facing entry points.

[StartupDiagnostics] ties a [StartupBuffer] to the host's lifecycle.  An application
usually touches it twice:

* while configuring the host, through [StartupDiagnostics::configure_logging] (or
  [StartupDiagnostics::add_to] when it has no logging configuration of its own), so the
  buffer is replayed once the application starts;
* when startup fails, through [StartupDiagnostics::terminal_emit], so the buffer is
  replayed anyway.

The logging configuration registered in the first step is remembered and becomes the
preferred tier of the second.
*/

use crate::buffer::StartupBuffer;
use crate::error::{FallbackError, RegistrationError};
use crate::fallback::{FallbackController, TerminalOutcome};
use crate::hooks::{EmitterHook, TerminatorHook};
use crate::host::{HostBuilder, HostFactory, LoggingConfig};
use std::sync::{Arc, OnceLock};

static GLOBAL_DIAGNOSTICS: OnceLock<StartupDiagnostics> = OnceLock::new();

pub struct StartupDiagnostics {
    buffer: Arc<StartupBuffer>,
    preferred: OnceLock<LoggingConfig>,
    emitter: Arc<EmitterHook>,
}

impl StartupDiagnostics {
    /// Diagnostics over a buffer of their own.
    pub fn new() -> Self {
        Self::with_buffer(Arc::new(StartupBuffer::new()))
    }

    pub fn with_buffer(buffer: Arc<StartupBuffer>) -> Self {
        Self {
            emitter: Arc::new(EmitterHook::new(buffer.clone())),
            buffer,
            preferred: OnceLock::new(),
        }
    }

    /// The process-wide instance, over [StartupBuffer::global].
    pub fn global() -> &'static StartupDiagnostics {
        GLOBAL_DIAGNOSTICS.get_or_init(|| Self::with_buffer(StartupBuffer::global()))
    }

    pub fn buffer(&self) -> &Arc<StartupBuffer> {
        &self.buffer
    }

    /// The registered preferred logging configuration, if any.
    pub fn preferred(&self) -> Option<&LoggingConfig> {
        self.preferred.get()
    }

    /// Registers the started-normally hook on `builder`.
    pub fn add_to<'b, B: HostBuilder>(&self, builder: &'b mut B) -> &'b mut B {
        builder.on_started(self.emitter.started_hook())
    }

    /**
    Registers `configure` as the host's logging configuration and as the preferred tier of
    any later terminal emission, then registers the started-normally hook.

    Only one preferred configuration can ever be registered.  A second call fails without
    touching `builder`.
    */
    pub fn configure_logging<'b, B: HostBuilder>(
        &self,
        builder: &'b mut B,
        configure: LoggingConfig,
    ) -> Result<&'b mut B, RegistrationError> {
        self.preferred
            .set(configure.clone())
            .map_err(|_| RegistrationError::PreferredAlreadyRegistered)?;
        Ok(self.add_to(builder).configure_logging(configure))
    }

    /// [StartupDiagnostics::configure_logging] with [crate::log_backend].
    #[cfg(feature = "log")]
    pub fn use_log_backend<'b, B: HostBuilder>(
        &self,
        builder: &'b mut B,
    ) -> Result<&'b mut B, RegistrationError> {
        self.configure_logging(builder, crate::log_bridge::log_backend())
    }

    /**
    Registers a started-abnormally hook on `builder`.

    Use this when building a terminal host by hand; [StartupDiagnostics::terminal_emit]
    does it for you.
    */
    pub fn add_terminal_to<B: HostBuilder>(&self, builder: &mut B) -> Arc<TerminatorHook> {
        let hook = Arc::new(TerminatorHook::new(self.buffer.clone()));
        builder.on_started(hook.started_hook());
        hook
    }

    /// A controller over this buffer, preferring the registered configuration.
    pub fn fallback<F: HostFactory>(&self, factory: F, args: Vec<String>) -> FallbackController<F> {
        FallbackController::new(self.buffer.clone(), self.preferred().cloned(), factory, args)
    }

    /// Emits the buffer through a terminal host.  See [FallbackController::terminal_emit].
    pub async fn terminal_emit<F: HostFactory>(
        &self,
        factory: F,
        args: Vec<String>,
    ) -> Result<TerminalOutcome, FallbackError> {
        self.fallback(factory, args).terminal_emit().await
    }
}

impl Default for StartupDiagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StartupDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartupDiagnostics")
            .field("buffer", &self.buffer)
            .field("preferred", &self.preferred.get().is_some())
            .field("emitter", &self.emitter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Level;
    use crate::console::CapturedConsole;
    use crate::console_host::{ConsoleHostBuilder, ConsoleHostFactory};
    use crate::fallback::Tier;
    use crate::hooks::STARTED_NORMALLY_BANNER;
    use crate::host::{Host, logging_config, started_hook};
    use crate::inmemory_logger::InMemoryLogger;

    #[test]
    fn normal_start_replays_through_the_registered_configuration() {
        let diagnostics = StartupDiagnostics::new();
        diagnostics.buffer().info("configuring");
        let memory = Arc::new(InMemoryLogger::new());
        let sink = memory.clone();

        let mut builder = ConsoleHostBuilder::with_console(Vec::<String>::new(), Arc::new(CapturedConsole::new()));
        diagnostics
            .configure_logging(
                &mut builder,
                logging_config(move |_, logging| {
                    logging.clear_loggers().add_logger(sink.clone());
                    Ok(())
                }),
            )
            .unwrap()
            .on_started(started_hook(|_, lifetime| lifetime.stop_application()));
        test_executors::spin_on(builder.build().unwrap().run()).unwrap();

        let records = memory.records();
        assert_eq!(records[0].body(), STARTED_NORMALLY_BANNER);
        assert_eq!(records[1].body(), "configuring");
        assert!(diagnostics.buffer().is_retired());
        assert!(diagnostics.preferred().is_some());
    }

    #[test]
    fn second_preferred_registration_is_rejected() {
        let diagnostics = StartupDiagnostics::new();
        let mut builder = ConsoleHostBuilder::with_console(Vec::<String>::new(), Arc::new(CapturedConsole::new()));
        diagnostics
            .configure_logging(&mut builder, logging_config(|_, _| Ok(())))
            .unwrap();

        let mut other = ConsoleHostBuilder::with_console(Vec::<String>::new(), Arc::new(CapturedConsole::new()));
        let rejected = diagnostics.configure_logging(
            &mut other,
            logging_config(|_, logging| {
                logging.set_minimum_level(Level::Critical);
                Ok(())
            }),
        );
        assert_eq!(rejected.err(), Some(RegistrationError::PreferredAlreadyRegistered));
        let host = other.build().unwrap();
        assert_ne!(host.logger().minimum_level(), Level::Critical);
    }

    #[test]
    fn emitter_is_shared_between_registrations() {
        let diagnostics = StartupDiagnostics::new();
        diagnostics.buffer().warn("once");
        let console = Arc::new(CapturedConsole::new());
        let mut builder = ConsoleHostBuilder::with_console(Vec::<String>::new(), console.clone());
        diagnostics.add_to(&mut builder);
        diagnostics
            .add_to(&mut builder)
            .on_started(started_hook(|_, lifetime| lifetime.stop_application()));
        test_executors::spin_on(builder.build().unwrap().run()).unwrap();
        assert_eq!(console.contents().matches("Application started normally.").count(), 1);
    }

    #[test]
    fn terminal_hook_stops_a_hand_built_host() {
        let diagnostics = StartupDiagnostics::new();
        diagnostics.buffer().error("why");
        let console = Arc::new(CapturedConsole::new());
        let mut builder = ConsoleHostBuilder::with_console(Vec::<String>::new(), console.clone());
        let hook = diagnostics.add_terminal_to(&mut builder);
        test_executors::spin_on(builder.build().unwrap().run()).unwrap();
        assert_eq!(hook.emitted(), 1);
        assert!(console.contents().contains("why"));
    }

    #[test]
    fn terminal_emit_prefers_the_registered_configuration() {
        let diagnostics = StartupDiagnostics::new();
        let memory = Arc::new(InMemoryLogger::new());
        let sink = memory.clone();
        let mut builder = ConsoleHostBuilder::with_console(Vec::<String>::new(), Arc::new(CapturedConsole::new()));
        diagnostics
            .configure_logging(
                &mut builder,
                logging_config(move |_, logging| {
                    logging.add_logger(sink.clone());
                    Ok(())
                }),
            )
            .unwrap();
        drop(builder);
        diagnostics.buffer().critical("startup failed");

        let console = Arc::new(CapturedConsole::new());
        let outcome = test_executors::spin_on(
            diagnostics.terminal_emit(ConsoleHostFactory::with_console(console), Vec::new()),
        )
        .unwrap();
        assert_eq!(outcome.tier, Tier::Preferred);
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn global_is_one_instance_over_the_global_buffer() {
        assert!(std::ptr::eq(StartupDiagnostics::global(), StartupDiagnostics::global()));
        assert!(Arc::ptr_eq(StartupDiagnostics::global().buffer(), &StartupBuffer::global()));
    }

    #[cfg(feature = "log")]
    #[test]
    fn log_backend_becomes_the_preferred_tier() {
        let diagnostics = StartupDiagnostics::new();
        let mut builder = ConsoleHostBuilder::with_console(Vec::<String>::new(), Arc::new(CapturedConsole::new()));
        diagnostics.use_log_backend(&mut builder).unwrap();
        assert!(diagnostics.preferred().is_some());
        assert_eq!(
            diagnostics.use_log_backend(&mut builder).err(),
            Some(RegistrationError::PreferredAlreadyRegistered)
        );
    }
}
