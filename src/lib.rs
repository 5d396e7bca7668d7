//SPDX-License-Identifier: MIT OR Apache-2.0
/*!
# bootlog

bootlog keeps the log records an application writes before its logging exists, and makes
sure somebody gets to read them.

# Development status

bootlog is experimental and the API may change.

# The problem

Logging is usually configured by the same host that configures everything else.  Until
that host is built, there is no logger, and the code that runs during that window
(reading settings, wiring services, validating options) is exactly the code most likely
to fail in an interesting way.

Here are some problems:

* Where does a settings loader log to, when the log sinks are themselves configured from
  those settings?
* If the host fails to build, who prints the message explaining why?
* If the logging configuration is what broke, how do we still say so?

# The approach

bootlog gives the startup window a buffer, and gives the buffer two ways out.

| Path              | When                                    | Through                                        |
|-------------------|-----------------------------------------|------------------------------------------------|
| started normally  | the host came up                        | the host's own logger, via [EmitterHook]       |
| terminal emission | setup, build or run failed              | a throwaway host, via [FallbackController]     |

Terminal emission tries the application's own logging configuration first, since that is
where the operator looks.  If that configuration fails (it is the prime suspect, after
all) bootlog falls back to a bare console.  Both announce themselves with a banner, and
both log at [Level::Trace] so nothing captured during startup is filtered out.

# The API

```
use bootlog::{CapturedConsole, ConsoleHostFactory, Failure, RunOutcome, StartupDiagnostics, logging_config, run_guarded};
use std::sync::Arc;

let diagnostics = StartupDiagnostics::new();
let console = Arc::new(CapturedConsole::new());

let outcome = test_executors::spin_on(run_guarded(
    &diagnostics,
    ConsoleHostFactory::with_console(console.clone()),
    Vec::new(),
    |builder, diagnostics| {
        diagnostics
            .configure_logging(builder, logging_config(|_, _| Ok(())))
            .map_err(Failure::new)?;
        diagnostics.buffer().info("Everything looks OK so far...");
        Err(Failure::message("could not reach the database"))
    },
))
.unwrap();

assert!(matches!(outcome, RunOutcome::Terminated(_)));
let output = console.contents();
assert!(output.contains("Abnormal application shutdown."));
assert!(output.contains("Everything looks OK so far..."));
assert!(output.contains("could not reach the database"));
```

Code that runs during startup logs into [StartupBuffer::global] (or a buffer it was
handed).  With the `log` feature, [LogCapture] routes the `log` facade there too, and
[log_backend] lets an application that already has a `log` backend use it as its
preferred configuration.

# Hosts

bootlog does not include an application framework.  It talks to one through the traits in
[host]: a [HostFactory] for fresh builders, a [HostBuilder] that accepts logging
configurations and started hooks, and a [Host] that runs.  [ConsoleHost] is a small
reference implementation.

# Configuration

Record headers and default levels come from [Config], read from `BOOTLOG_*` environment
variables on first use.

# Multithreading

The buffer accepts records from any thread and keeps each thread's own order.  Draining
pops records one at a time, so a record logged during a drain is emitted exactly once,
by that drain or the next.
*/

mod buffer;
mod config;
mod console;
pub mod console_host;
mod diagnostics;
mod entry;
mod error;
pub mod fallback;
mod hooks;
pub mod host;
mod inmemory_logger;
mod level;
mod logger;
#[cfg(feature = "log")]
mod log_bridge;
mod record;
pub mod replay;
mod spinlock;
mod unwind;

pub use buffer::StartupBuffer;
pub use config::{Config, TimestampFormat};
pub use console::{CapturedConsole, Console, ConsoleLogger, StdErrConsole};
pub use console_host::{ConsoleHost, ConsoleHostBuilder, ConsoleHostFactory, ConsoleLifetime};
pub use diagnostics::StartupDiagnostics;
pub use entry::{ENTRY_FAILURE_MESSAGE, RunOutcome, run_guarded};
pub use error::{AttemptError, ConfigureError, FallbackError, HostError, RegistrationError};
pub use fallback::{FallbackController, FallbackState, TerminalOutcome, Tier, minimal_logging};
pub use hooks::{ABNORMAL_SHUTDOWN_BANNER, EmitterHook, STARTED_NORMALLY_BANNER, TerminatorHook};
pub use host::{
    ApplicationLifetime, Host, HostBuilder, HostContext, HostFactory, HostLogger, LoggingBuilder,
    LoggingConfig, StartedHook, logging_config, started_hook,
};
pub use inmemory_logger::InMemoryLogger;
pub use level::{Level, ParseLevelError};
#[cfg(feature = "log")]
pub use log_bridge::{DEFAULT_TARGET, LogCapture, LogForwarder, UNFORMATTABLE_MESSAGE, log_backend};
pub use logger::Logger;
pub use record::{Failure, LogArg, Record, UNFORMATTABLE_ARGUMENT, UNFORMATTABLE_ERROR, stamp};
pub use replay::{replay, replay_async};
