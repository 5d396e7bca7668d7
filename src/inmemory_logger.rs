// SPDX-License-Identifier: MIT OR Apache-2.0

//! # In-Memory Logger
//!
//! A [`Logger`] that keeps every record it receives instead of writing it anywhere.
//! It is the natural sink for tests of startup code: register it from a logging
//! configuration, let the host replay the startup buffer into it, then look at what
//! arrived.
//!
//! ## Architecture
//!
//! Records are kept whole in a `Mutex<Vec<Record>>`, so callers can examine levels,
//! errors and arguments, not only text.  [`InMemoryLogger::drain_logs`] renders them the
//! way a plain-text sink would.

use crate::logger::Logger;
use crate::record::Record;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

/// An in-memory logger that stores the records it receives.
///
/// # Thread Safety
///
/// The `InMemoryLogger` is thread-safe and can be shared across multiple threads using
/// `Arc`. All operations on the internal store are protected by a mutex.
///
/// # Example
///
/// ```rust
/// use bootlog::{InMemoryLogger, Level, Logger, Record};
///
/// let logger = InMemoryLogger::new();
/// logger.finish_log_record(Record::new(Level::Information, "Test message {value}", None, vec![42u32.into()]));
///
/// let logs = logger.drain_logs();
/// assert!(logs.contains("Test message 42"));
///
/// // The store is now empty
/// assert_eq!(logger.drain_logs(), "");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryLogger {
    records: Mutex<Vec<Record>>,
}

// ============================================================================
// BOILERPLATE TRAIT IMPLEMENTATIONS
// ============================================================================
//
// - Debug: Derived, required by Logger
// - Default: Derived, an empty store
// - Clone: NOT implemented - two handles to one store is what Arc is for
// - PartialEq/Eq/Hash: NOT implemented - Record has no equality
// - Send/Sync: Automatic via Mutex

impl InMemoryLogger {
    /// Creates a new `InMemoryLogger` with an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains all records into a single string, clearing the store.
    ///
    /// Each record is rendered with its [`Display`](std::fmt::Display) form (message
    /// with arguments filled in, then the error chain) and the records are joined with
    /// newlines.
    pub fn drain_logs(&self) -> String {
        let mut records = self.lock();
        let result = records
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        records.clear();
        result
    }

    /// Clones of the stored records, in arrival order.  The store is left alone.
    pub fn records(&self) -> Vec<Record> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Record>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Logger for InMemoryLogger {
    fn finish_log_record(&self, record: Record) {
        self.lock().push(record);
    }

    fn finish_log_record_async<'s>(
        &'s self,
        record: Record,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 's>> {
        Box::pin(async move {
            self.finish_log_record(record);
        })
    }

    fn prepare_to_die(&self) {
        // nothing buffered outside the store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Level;

    #[test]
    fn keeps_records_in_arrival_order() {
        let logger = InMemoryLogger::new();
        logger.finish_log_record(Record::new(Level::Debug, "one", None, Vec::new()));
        logger.finish_log_record(Record::new(Level::Error, "two", None, Vec::new()));

        let records = logger.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].body(), "one");
        assert_eq!(records[1].level(), Level::Error);
        assert_eq!(logger.len(), 2, "records() must not drain");
    }

    #[test]
    fn async_submission_is_stored() {
        let logger = InMemoryLogger::new();
        test_executors::spin_on(
            logger.finish_log_record_async(Record::new(Level::Trace, "later", None, Vec::new())),
        );
        assert!(logger.drain_logs().ends_with("\nlater"));
        assert!(logger.is_empty());
    }
}
