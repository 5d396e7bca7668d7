// SPDX-License-Identifier: MIT OR Apache-2.0

//! A guarded program entry point.

use crate::diagnostics::StartupDiagnostics;
use crate::error::FallbackError;
use crate::fallback::TerminalOutcome;
use crate::host::{Host, HostBuilder, HostFactory};
use crate::record::Failure;
use crate::unwind;

/// Logged with the failure that ended a guarded run.
pub const ENTRY_FAILURE_MESSAGE: &str = "Program entry caught failure";

#[derive(Debug)]
pub enum RunOutcome {
    /// The host ran and stopped without failing.
    Completed,
    /// Setup, build or run failed, and the buffer was emitted through a terminal host.
    Terminated(TerminalOutcome),
}

/**
Builds and runs a host, emitting buffered diagnostics if anything goes wrong.

`setup` configures a fresh builder from `factory`; this is where the application
registers its services, calls [StartupDiagnostics::configure_logging] and logs into the
buffer.  Every failure from `setup`, from building the host or from running it, panics
included, is buffered at [crate::Level::Error] under [ENTRY_FAILURE_MESSAGE] and followed
by [StartupDiagnostics::terminal_emit].

Only a failure of the terminal emission's default tier is returned as an error.

```
use bootlog::{
    CapturedConsole, ConsoleHostFactory, Failure, RunOutcome, StartupDiagnostics, run_guarded,
};
use std::sync::Arc;

let diagnostics = StartupDiagnostics::new();
let console = Arc::new(CapturedConsole::new());
let factory = ConsoleHostFactory::with_console(console.clone());

let outcome = test_executors::spin_on(run_guarded(&diagnostics, factory, Vec::new(), |_, diagnostics| {
    diagnostics.buffer().info("reading settings");
    Err(Failure::message("settings file is missing"))
}))
.unwrap();
assert!(matches!(outcome, RunOutcome::Terminated(_)));
assert!(console.contents().contains("settings file is missing"));
```
*/
pub async fn run_guarded<F, S>(
    diagnostics: &StartupDiagnostics,
    factory: F,
    args: Vec<String>,
    setup: S,
) -> Result<RunOutcome, FallbackError>
where
    F: HostFactory,
    S: FnOnce(&mut F::Builder, &StartupDiagnostics) -> Result<(), Failure>,
{
    let failure = match build_and_run(diagnostics, &factory, &args, setup).await {
        Ok(()) => return Ok(RunOutcome::Completed),
        Err(failure) => failure,
    };
    diagnostics
        .buffer()
        .error_with_error(ENTRY_FAILURE_MESSAGE, failure);
    let outcome = diagnostics.terminal_emit(factory, args).await?;
    Ok(RunOutcome::Terminated(outcome))
}

async fn build_and_run<F, S>(
    diagnostics: &StartupDiagnostics,
    factory: &F,
    args: &[String],
    setup: S,
) -> Result<(), Failure>
where
    F: HostFactory,
    S: FnOnce(&mut F::Builder, &StartupDiagnostics) -> Result<(), Failure>,
{
    let mut builder = factory.create_builder(args);
    unwind::catch(|| setup(&mut builder, diagnostics)).map_err(panicked)??;
    let host = unwind::catch(|| builder.build()).map_err(panicked)??;
    unwind::catch_future(host.run()).await.map_err(panicked)??;
    Ok(())
}

fn panicked(message: String) -> Failure {
    Failure::message(format!("panicked: {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::CapturedConsole;
    use crate::console_host::ConsoleHostFactory;
    use crate::fallback::Tier;
    use crate::host::started_hook;
    use std::sync::Arc;

    fn factory() -> (ConsoleHostFactory, Arc<CapturedConsole>) {
        let console = Arc::new(CapturedConsole::new());
        (ConsoleHostFactory::with_console(console.clone()), console)
    }

    #[test]
    fn clean_run_completes_without_terminal_emission() {
        let diagnostics = StartupDiagnostics::new();
        let (factory, console) = factory();
        let outcome = test_executors::spin_on(run_guarded(&diagnostics, factory, Vec::new(), |builder, diagnostics| {
            diagnostics.add_to(builder);
            builder.on_started(started_hook(|_, lifetime| lifetime.stop_application()));
            Ok(())
        }))
        .unwrap();
        assert!(matches!(outcome, RunOutcome::Completed));
        assert!(!console.contents().contains("Abnormal application shutdown."));
    }

    #[test]
    fn panic_in_setup_is_caught_and_reported() {
        let diagnostics = StartupDiagnostics::new();
        let (factory, console) = factory();
        let outcome = test_executors::spin_on(run_guarded(&diagnostics, factory, Vec::new(), |_, _| {
            panic!("setup blew up")
        }))
        .unwrap();
        match outcome {
            RunOutcome::Terminated(outcome) => {
                assert_eq!(outcome.tier, Tier::Default);
                assert_eq!(outcome.emitted, 1);
            }
            RunOutcome::Completed => panic!("expected termination"),
        }
        let output = console.contents();
        assert!(output.contains(ENTRY_FAILURE_MESSAGE));
        assert!(output.contains("panicked: setup blew up"));
    }
}
