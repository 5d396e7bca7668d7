// SPDX-License-Identifier: MIT OR Apache-2.0

//! The console sink.
//!
//! This is the sink the minimal terminal configuration falls back to, so it is kept
//! deliberately dull: one record becomes a block of lines on a [`Console`], with the
//! level tag in front and every following line indented.
//!
//! ```text
//! warn: [orders] at UTC [2024-05-01T09:30:00.1234567+00:00]
//!       Abnormal application shutdown.
//! ```

use crate::logger::Logger;
use crate::record::Record;
use std::fmt::Debug;
use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

const INDENT: &str = "      ";

/// A line-oriented output the console sink writes to.
pub trait Console: Debug + Send + Sync {
    fn write_line(&self, line: &str);
    fn flush(&self);
}

/// Writes to the process's standard error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StdErrConsole;

impl Console for StdErrConsole {
    fn write_line(&self, line: &str) {
        let mut lock = std::io::stderr().lock();
        //nowhere left to report a failed write to stderr
        let _ = lock.write_all(line.as_bytes());
        let _ = lock.write_all(b"\n");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/**
A console that keeps everything written to it.

Useful for tests, and for embedding hosts that want to decide later where console
output goes.

```
use bootlog::{CapturedConsole, Console};

let console = CapturedConsole::new();
console.write_line("hello");
assert_eq!(console.contents(), "hello\n");
assert_eq!(console.take(), "hello\n");
assert_eq!(console.contents(), "");
```
*/
#[derive(Debug, Default)]
pub struct CapturedConsole {
    text: Mutex<String>,
}

impl CapturedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.text
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the contents and clears them.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.text.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Console for CapturedConsole {
    fn write_line(&self, line: &str) {
        let mut text = self.text.lock().unwrap_or_else(PoisonError::into_inner);
        text.push_str(line);
        text.push('\n');
    }

    fn flush(&self) {}
}

/**
A [Logger] that writes records to a [Console].
*/
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    console: Arc<dyn Console>,
}

impl ConsoleLogger {
    pub fn new(console: Arc<dyn Console>) -> Self {
        Self { console }
    }

    pub fn stderr() -> Self {
        Self::new(Arc::new(StdErrConsole))
    }

    /// The block of text `record` is written as.
    pub fn format(record: &Record) -> String {
        let mut block = String::new();
        block.push_str(record.level().console_tag());
        block.push_str(": ");
        let lines = record
            .rendered()
            .lines()
            .chain(record.error_text().into_iter().flat_map(str::lines));
        for (index, line) in lines.enumerate() {
            if index > 0 {
                block.push('\n');
                block.push_str(INDENT);
            }
            block.push_str(line);
        }
        block
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::stderr()
    }
}

impl Logger for ConsoleLogger {
    fn finish_log_record(&self, record: Record) {
        self.console.write_line(&Self::format(&record));
    }

    fn finish_log_record_async<'s>(
        &'s self,
        record: Record,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 's>> {
        Box::pin(async move { self.finish_log_record(record) })
    }

    fn prepare_to_die(&self) {
        self.console.flush();
    }
}
