// SPDX-License-Identifier: MIT OR Apache-2.0

//! The startup buffer.
//!
//! [`StartupBuffer`] is where log records go before a real logger exists.  Anything can
//! write to it, from any thread, while the host is still being configured; later, once
//! some sink is live, the buffer is drained into it in the order records arrived.
//!
//! # Lifecycle
//!
//! 1. Created on first use.  The process-wide instance lives behind
//!    [`StartupBuffer::global`]; tests and embedders can make their own with
//!    [`StartupBuffer::new`] and pass that handle around instead.
//! 2. Filled while the host is being built.
//! 3. Drained, ideally once: by the started-normally hook, or by the terminal hook when
//!    startup failed.  After the normal-start drain the buffer is *retired*; it still
//!    accepts records, but nothing should rely on it any more.
//!
//! # Concurrency
//!
//! Enqueueing is safe from any number of threads and preserves each caller's own order.
//! Draining pops one record at a time, so records enqueued during a drain are either
//! picked up by that drain or left for the next one; none is emitted twice or lost.
//! Only one drain should run at a time if exactly-once emission across drains matters.
//!
//! # Example
//!
//! ```
//! use bootlog::{InMemoryLogger, StartupBuffer};
//!
//! let buffer = StartupBuffer::new();
//! buffer.info("Everything looks OK so far...");
//! buffer.error_with_error("could not read settings", std::io::Error::other("no such file"));
//!
//! let sink = InMemoryLogger::new();
//! assert_eq!(buffer.drain(&sink), 2);
//! assert!(buffer.is_empty());
//!
//! let logs = sink.drain_logs();
//! assert!(logs.contains("Everything looks OK so far..."));
//! assert!(logs.contains("no such file"));
//! ```

use crate::Level;
use crate::logger::Logger;
use crate::record::{Failure, LogArg, Record};
use crate::spinlock::Spinlock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

static GLOBAL_BUFFER: OnceLock<Arc<StartupBuffer>> = OnceLock::new();

/// A process-wide FIFO of records logged before a real logger exists.
pub struct StartupBuffer {
    queue: Spinlock<VecDeque<Record>>,
    retired: AtomicBool,
}

macro_rules! level_methods {
    ($($level:ident => $plain:ident, $with_error:ident;)*) => {
        $(
            #[doc = concat!("Buffers `message` at [`Level::", stringify!($level), "`].")]
            pub fn $plain(&self, message: &str) {
                self.enqueue(Level::$level, message, None, Vec::new());
            }

            #[doc = concat!("Buffers `message` with an attached error at [`Level::", stringify!($level), "`].")]
            pub fn $with_error(&self, message: &str, error: impl Into<Failure>) {
                self.enqueue(Level::$level, message, Some(error.into()), Vec::new());
            }
        )*
    };
}

impl StartupBuffer {
    pub fn new() -> Self {
        Self {
            queue: Spinlock::new(VecDeque::new()),
            retired: AtomicBool::new(false),
        }
    }

    /**
    The process-wide buffer, created the first time this is called.

    Every call returns a handle to the same buffer.  Prefer passing the handle to the code
    that needs it over calling this from everywhere.
    */
    pub fn global() -> Arc<StartupBuffer> {
        GLOBAL_BUFFER
            .get_or_init(|| Arc::new(StartupBuffer::new()))
            .clone()
    }

    /**
    Stamps a new record and appends it.

    This never fails and never waits on anything but the buffer's own (very short) lock.
    */
    pub fn enqueue(&self, level: Level, message: &str, error: Option<Failure>, args: Vec<LogArg>) {
        self.enqueue_record(Record::new(level, message, error, args));
    }

    /// Appends a record that was already stamped.
    pub fn enqueue_record(&self, record: Record) {
        self.queue.with_mut(|queue| queue.push_back(record));
    }

    /// Buffers a message template whose `{...}` holes are filled from `args` on output.
    pub fn log_with_args(&self, level: Level, message: &str, args: Vec<LogArg>) {
        self.enqueue(level, message, None, args);
    }

    level_methods! {
        Trace => trace, trace_with_error;
        Debug => debug, debug_with_error;
        Information => info, info_with_error;
        Warning => warn, warn_with_error;
        Error => error, error_with_error;
        Critical => critical, critical_with_error;
    }

    /**
    Moves every buffered record, oldest first, into `sink`.

    Returns the number of records emitted.  Draining an empty buffer does nothing.
    See [crate::replay] for the details.
    */
    pub fn drain(&self, sink: &dyn Logger) -> usize {
        crate::replay::replay(self, sink)
    }

    pub(crate) fn pop_front(&self) -> Option<Record> {
        self.queue.with_mut(|queue| queue.pop_front())
    }

    #[cfg(test)]
    pub(crate) fn queue_snapshot(&self) -> Vec<String> {
        self.queue
            .with_mut(|queue| queue.iter().map(|r| r.message().to_string()).collect())
    }

    pub fn len(&self) -> usize {
        self.queue.with_mut(|queue| queue.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Marks the buffer as drained by a normal application start.
    pub fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }
}

impl Default for StartupBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StartupBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartupBuffer")
            .field("len", &self.len())
            .field("retired", &self.is_retired())
            .finish()
    }
}

/*
Boilerplate notes for StartupBuffer:

- Debug: manual, reports size and state rather than dumping every record
- Default: an empty, live buffer
- Clone: NOT implemented - two copies of a FIFO would emit records twice; share with Arc
- PartialEq/Eq/Hash: NOT implemented - identity is what matters, compare Arc pointers
*/

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory_logger::InMemoryLogger;
    use std::thread;

    #[test]
    fn drains_in_enqueue_order() {
        let buffer = StartupBuffer::new();
        buffer.trace("t");
        buffer.debug("d");
        buffer.info("i");
        buffer.warn("w");
        buffer.error("e");
        buffer.critical("c");

        let sink = InMemoryLogger::new();
        assert_eq!(buffer.drain(&sink), 6);
        let levels: Vec<Level> = sink.records().iter().map(Record::level).collect();
        assert_eq!(levels, Level::ALL.to_vec());
        let bodies: Vec<String> = sink.records().iter().map(|r| r.body().to_string()).collect();
        assert_eq!(bodies, ["t", "d", "i", "w", "e", "c"]);
    }

    #[test]
    fn draining_empty_buffer_is_a_no_op() {
        let buffer = StartupBuffer::new();
        let sink = InMemoryLogger::new();
        assert_eq!(buffer.drain(&sink), 0);
        assert_eq!(buffer.drain(&sink), 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn drain_is_destructive() {
        let buffer = StartupBuffer::new();
        buffer.info("once");
        let first = InMemoryLogger::new();
        let second = InMemoryLogger::new();
        buffer.drain(&first);
        buffer.drain(&second);
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn error_forms_attach_the_failure() {
        let buffer = StartupBuffer::new();
        buffer.warn_with_error("sink unreachable", std::io::Error::other("connection refused"));
        let record = buffer.pop_front().unwrap();
        assert_eq!(record.level(), Level::Warning);
        assert_eq!(record.error().unwrap().to_string(), "connection refused");
    }

    #[test]
    fn concurrent_enqueues_are_each_emitted_once_in_caller_order() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 500;
        let buffer = Arc::new(StartupBuffer::new());
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let buffer = buffer.clone();
                thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        buffer.log_with_args(
                            Level::Information,
                            "{thread} {seq}",
                            vec![t.into(), i.into()],
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let sink = InMemoryLogger::new();
        assert_eq!(buffer.drain(&sink), THREADS * PER_THREAD);

        let mut next = [0usize; THREADS];
        for record in sink.records() {
            let rendered = record.rendered();
            let body = rendered.rsplit('\n').next().unwrap();
            let mut parts = body.split(' ');
            let t: usize = parts.next().unwrap().parse().unwrap();
            let i: usize = parts.next().unwrap().parse().unwrap();
            assert_eq!(i, next[t], "thread {t} emitted out of order");
            next[t] += 1;
        }
        assert!(next.iter().all(|n| *n == PER_THREAD));
    }

    #[test]
    fn enqueue_during_drain_is_not_lost() {
        let buffer = Arc::new(StartupBuffer::new());
        for _ in 0..1000 {
            buffer.info("before");
        }
        let writer = {
            let buffer = buffer.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    buffer.info("during");
                }
            })
        };
        let sink = InMemoryLogger::new();
        let mut emitted = buffer.drain(&sink);
        writer.join().unwrap();
        emitted += buffer.drain(&sink);
        assert_eq!(emitted, 2000);
        assert_eq!(sink.len(), 2000);
    }

    #[test]
    fn retiring_keeps_accepting_records() {
        let buffer = StartupBuffer::new();
        assert!(!buffer.is_retired());
        buffer.retire();
        buffer.info("late");
        assert!(buffer.is_retired());
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn global_is_one_instance() {
        assert!(Arc::ptr_eq(&StartupBuffer::global(), &StartupBuffer::global()));
    }
}
