// SPDX-License-Identifier: MIT OR Apache-2.0

/*!
Both directions between bootlog and the `log` facade.

[LogCapture] sends `log` macros into a [StartupBuffer] while startup is in progress.
[LogForwarder] goes the other way: it is a [Logger] that hands records to a `log`
backend, so an application that already logs through `log` can use that backend as its
preferred configuration with [log_backend].
*/

use crate::buffer::StartupBuffer;
use crate::host::{LoggingConfig, logging_config};
use crate::level::Level;
use crate::logger::Logger;
use crate::record::{Record, display_or};
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Stored in place of a `log` message whose arguments could not be formatted.
pub const UNFORMATTABLE_MESSAGE: &str = "<unformattable message>";

/// The `log` target used for records that do not name one.
pub const DEFAULT_TARGET: &str = "bootlog";

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warning,
            log::Level::Info => Level::Information,
            log::Level::Debug => Level::Debug,
            log::Level::Trace => Level::Trace,
        }
    }
}

impl From<Level> for log::Level {
    fn from(level: Level) -> Self {
        match level {
            Level::Critical | Level::Error => log::Level::Error,
            Level::Warning => log::Level::Warn,
            Level::Information => log::Level::Info,
            Level::Debug => log::Level::Debug,
            Level::Trace => log::Level::Trace,
        }
    }
}

/**
A `log::Log` implementation that enqueues every record into a [StartupBuffer].

The message is formatted when it arrives and stored as final text, so braces in it are
kept as written.  The `log` target is kept as the record's target.
*/
#[derive(Debug)]
pub struct LogCapture {
    buffer: Arc<StartupBuffer>,
}

impl LogCapture {
    pub fn new(buffer: Arc<StartupBuffer>) -> Self {
        LogCapture { buffer }
    }

    /// Installs a capture into the global buffer as the `log` facade's logger.
    pub fn install() -> Result<(), log::SetLoggerError> {
        log::set_boxed_logger(Box::new(LogCapture::new(StartupBuffer::global())))?;
        log::set_max_level(log::LevelFilter::Trace);
        Ok(())
    }
}

impl log::Log for LogCapture {
    fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        let message = display_or(record.args(), UNFORMATTABLE_MESSAGE);
        let captured = Record::verbatim(record.level().into(), &message, None)
            .with_target(record.target());
        self.buffer.enqueue_record(captured);
    }

    fn flush(&self) {}
}

/**
A [Logger] that forwards each record to a `log` backend.

The text handed to the backend is the rendered record, header included, followed by the
error text when there is one.  A record without a target is logged under
[DEFAULT_TARGET].
*/
#[derive(Clone, Default)]
pub struct LogForwarder {
    // None means whatever `log::logger()` returns at the time of each record
    backend: Option<Arc<dyn log::Log>>,
}

impl LogForwarder {
    /// Forwards to the logger installed in the `log` facade.
    pub fn new() -> Self {
        LogForwarder { backend: None }
    }

    /// Forwards to `backend` directly, bypassing the facade's global logger.
    pub fn to(backend: Arc<dyn log::Log>) -> Self {
        LogForwarder {
            backend: Some(backend),
        }
    }

    fn backend(&self) -> &dyn log::Log {
        match &self.backend {
            Some(backend) => backend.as_ref(),
            None => log::logger(),
        }
    }
}

impl Debug for LogForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = if self.backend.is_some() { "explicit" } else { "global" };
        f.debug_struct("LogForwarder").field("backend", &backend).finish()
    }
}

impl Logger for LogForwarder {
    fn finish_log_record(&self, record: Record) {
        let backend = self.backend();
        let metadata = log::Metadata::builder()
            .level(record.level().into())
            .target(record.target().unwrap_or(DEFAULT_TARGET))
            .build();
        if !backend.enabled(&metadata) {
            return;
        }
        match record.error_text() {
            Some(error) => backend.log(
                &log::Record::builder()
                    .metadata(metadata)
                    .args(format_args!("{}\n{}", record.rendered(), error))
                    .build(),
            ),
            None => backend.log(
                &log::Record::builder()
                    .metadata(metadata)
                    .args(format_args!("{}", record.rendered()))
                    .build(),
            ),
        }
    }

    fn finish_log_record_async<'s>(
        &'s self,
        record: Record,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 's>> {
        Box::pin(async move { self.finish_log_record(record) })
    }

    fn prepare_to_die(&self) {
        self.backend().flush();
    }
}

/**
A logging configuration that replaces the host's loggers with a [LogForwarder] to the
`log` facade's global logger.

Pass it to [crate::StartupDiagnostics::configure_logging] (or use
[crate::StartupDiagnostics::use_log_backend]) so that both a normal start and the
preferred terminal tier log through the same backend as the rest of the application.
*/
pub fn log_backend() -> LoggingConfig {
    logging_config(|_, logging| {
        logging
            .clear_loggers()
            .add_logger(Arc::new(LogForwarder::new()));
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::CapturedConsole;
    use crate::host::{HostContext, LoggingBuilder};
    use crate::record::{Failure, LogArg};
    use log::Log;
    use std::fmt;
    use std::sync::Mutex;

    /// Remembers every record it accepts; rejects anything below Debug.
    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<(log::Level, String, String)>>,
        flushes: Mutex<usize>,
    }

    impl Recording {
        fn seen(&self) -> Vec<(log::Level, String, String)> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl log::Log for Recording {
        fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
            metadata.level() <= log::Level::Debug
        }

        fn log(&self, record: &log::Record<'_>) {
            self.seen.lock().unwrap().push((
                record.level(),
                record.target().to_string(),
                record.args().to_string(),
            ));
        }

        fn flush(&self) {
            *self.flushes.lock().unwrap() += 1;
        }
    }

    struct Exploding;

    impl fmt::Display for Exploding {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            panic!("display exploded")
        }
    }

    struct Refusing;

    impl fmt::Display for Refusing {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    fn capture(buffer: &Arc<StartupBuffer>, level: log::Level, target: &str, args: fmt::Arguments<'_>) {
        LogCapture::new(buffer.clone()).log(
            &log::Record::builder()
                .level(level)
                .target(target)
                .args(args)
                .build(),
        );
    }

    #[test]
    fn levels_map_both_ways() {
        assert_eq!(Level::from(log::Level::Warn), Level::Warning);
        assert_eq!(Level::from(log::Level::Info), Level::Information);
        assert_eq!(log::Level::from(Level::Critical), log::Level::Error);
        assert_eq!(log::Level::from(Level::Information), log::Level::Info);
        for level in [
            log::Level::Error,
            log::Level::Warn,
            log::Level::Info,
            log::Level::Debug,
            log::Level::Trace,
        ] {
            assert_eq!(log::Level::from(Level::from(level)), level);
        }
    }

    #[test]
    fn capture_keeps_braces_and_target() {
        let buffer = Arc::new(StartupBuffer::new());
        capture(&buffer, log::Level::Warn, "settings", format_args!("map {{a: {}}}", 1));

        let record = buffer.pop_front().unwrap();
        assert_eq!(record.level(), Level::Warning);
        assert_eq!(record.body(), "map {a: 1}");
        assert!(record.args().is_empty());
        assert!(record.rendered().ends_with("map {a: 1}"));
        assert_eq!(record.target(), Some("settings"));
    }

    #[test]
    fn capture_survives_broken_arguments() {
        let buffer = Arc::new(StartupBuffer::new());
        capture(&buffer, log::Level::Info, "a", format_args!("boom {}", Exploding));
        capture(&buffer, log::Level::Info, "b", format_args!("refused {}", Refusing));
        capture(&buffer, log::Level::Error, "c", format_args!("still here"));

        let bodies: Vec<String> = std::iter::from_fn(|| buffer.pop_front())
            .map(|record| record.body().to_string())
            .collect();
        assert_eq!(
            bodies,
            [UNFORMATTABLE_MESSAGE, UNFORMATTABLE_MESSAGE, "still here"]
        );
    }

    #[test]
    fn forwarder_maps_level_target_and_error() {
        let recording = Arc::new(Recording::default());
        let forwarder = LogForwarder::to(recording.clone());

        forwarder.finish_log_record(
            Record::new(Level::Critical, "disk {name} gone", Some(Failure::message("EIO")), vec![
                LogArg::new("sda"),
            ])
            .with_target("storage"),
        );
        test_executors::spin_on(
            forwarder.finish_log_record_async(Record::new(Level::Information, "ready", None, Vec::new())),
        );
        // below what the backend accepts
        forwarder.finish_log_record(Record::new(Level::Trace, "noise", None, Vec::new()));

        let seen = recording.seen();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, log::Level::Error);
        assert_eq!(seen[0].1, "storage");
        assert!(seen[0].2.contains("disk sda gone\nEIO"));
        assert_eq!(seen[1].0, log::Level::Info);
        assert_eq!(seen[1].1, DEFAULT_TARGET);
        assert!(seen[1].2.ends_with("ready"));

        forwarder.prepare_to_die();
        assert_eq!(*recording.flushes.lock().unwrap(), 1);
    }

    #[test]
    fn forwarder_replays_a_buffer_in_order() {
        let recording = Arc::new(Recording::default());
        let buffer = StartupBuffer::new();
        buffer.info("first");
        buffer.warn("second");
        assert_eq!(buffer.drain(&LogForwarder::to(recording.clone())), 2);

        let levels: Vec<log::Level> = recording.seen().into_iter().map(|seen| seen.0).collect();
        assert_eq!(levels, [log::Level::Info, log::Level::Warn]);
    }

    #[test]
    fn log_backend_replaces_the_loggers() {
        let mut logging = LoggingBuilder::new(Arc::new(CapturedConsole::new()));
        logging.add_console();
        log_backend()(&HostContext::new(Vec::new()), &mut logging).unwrap();
        assert_eq!(logging.loggers().len(), 1);
        assert!(format!("{:?}", logging.loggers()[0]).contains("global"));
    }
}
