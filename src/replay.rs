// SPDX-License-Identifier: MIT OR Apache-2.0

//! Replaying the startup buffer into a live sink.
//!
//! This is the only place buffered diagnostics become visible.  Replay forwards each
//! record exactly as it was captured: same level, same stamped message, same error and
//! arguments, in enqueue order.  It does no filtering of its own; a sink that drops
//! verbose levels will drop them here too, which is why the terminal configurations run
//! their sinks at [`Level::Trace`](crate::Level::Trace).
//!
//! Replay is destructive.  Each record is popped from the buffer before it is handed to
//! the sink, so a second replay only sees records that arrived in between.

use crate::buffer::StartupBuffer;
use crate::logger::Logger;

/// Drains `buffer` into `sink`, oldest record first.  Returns how many were emitted.
pub fn replay(buffer: &StartupBuffer, sink: &dyn Logger) -> usize {
    let mut emitted = 0;
    while let Some(record) = buffer.pop_front() {
        sink.finish_log_record(record);
        emitted += 1;
    }
    emitted
}

/**
Like [replay], but submits through [Logger::finish_log_record_async].

Useful when the sink does its I/O asynchronously and the caller is already running on
an executor.
*/
pub async fn replay_async(buffer: &StartupBuffer, sink: &dyn Logger) -> usize {
    let mut emitted = 0;
    while let Some(record) = buffer.pop_front() {
        sink.finish_log_record_async(record).await;
        emitted += 1;
    }
    emitted
}
