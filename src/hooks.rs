// SPDX-License-Identifier: MIT OR Apache-2.0

//! Started hooks that flush the startup buffer.
//!
//! Two hooks cover the two ways a host can come up:
//!
//! * [`EmitterHook`] runs when the application started normally.  It announces itself at
//!   [`Level::Information`], replays the buffer into the host's logger and retires the
//!   buffer.
//! * [`TerminatorHook`] runs inside a terminal host, one built only to get buffered
//!   diagnostics out of a process that is going down.  It announces itself at
//!   [`Level::Warning`], replays the buffer, flushes the sink and asks the host to stop.
//!
//! Each hook fires at most once per instance, whatever the host does.

use crate::Level;
use crate::buffer::StartupBuffer;
use crate::host::{ApplicationLifetime, StartedHook, started_hook};
use crate::logger::Logger;
use crate::record::Record;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Logged before the buffer is replayed after a normal start.
pub const STARTED_NORMALLY_BANNER: &str =
    "Application started normally.\nEmitting messages cached during host configuration.";

/// Logged before the buffer is replayed by a terminal host.
pub const ABNORMAL_SHUTDOWN_BANNER: &str =
    "Abnormal application shutdown.\nEmitting messages cached during host configuration.";

/// Replays the buffer once the application has started normally.
#[derive(Debug)]
pub struct EmitterHook {
    buffer: Arc<StartupBuffer>,
    fired: AtomicBool,
}

impl EmitterHook {
    pub fn new(buffer: Arc<StartupBuffer>) -> Self {
        Self {
            buffer,
            fired: AtomicBool::new(false),
        }
    }

    /**
    Logs the started-normally banner to `logger`, replays the buffer into it and retires
    the buffer.

    Returns the number of buffered records emitted, or `None` if this hook already fired.
    */
    pub fn fire(&self, logger: &dyn Logger) -> Option<usize> {
        if self.fired.swap(true, Ordering::AcqRel) {
            return None;
        }
        logger.finish_log_record(Record::new(
            Level::Information,
            STARTED_NORMALLY_BANNER,
            None,
            Vec::new(),
        ));
        let emitted = self.buffer.drain(logger);
        self.buffer.retire();
        Some(emitted)
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// This hook in the form [crate::HostBuilder::on_started] takes.
    pub fn started_hook(self: &Arc<Self>) -> StartedHook {
        let hook = self.clone();
        started_hook(move |logger, _| {
            hook.fire(logger);
        })
    }
}

/**
Replays the buffer from inside a terminal host, then stops that host.

A terminal host exists only to emit diagnostics, so once the buffer is out there is
nothing left for it to do.  The sink is flushed with [Logger::prepare_to_die] before
the stop request, since the process is usually about to exit.
*/
#[derive(Debug)]
pub struct TerminatorHook {
    buffer: Arc<StartupBuffer>,
    fired: AtomicBool,
    emitted: AtomicUsize,
}

impl TerminatorHook {
    pub fn new(buffer: Arc<StartupBuffer>) -> Self {
        Self {
            buffer,
            fired: AtomicBool::new(false),
            emitted: AtomicUsize::new(0),
        }
    }

    /// Returns the number of buffered records emitted, or `None` if this hook already fired.
    pub fn fire(&self, logger: &dyn Logger, lifetime: &dyn ApplicationLifetime) -> Option<usize> {
        if self.fired.swap(true, Ordering::AcqRel) {
            return None;
        }
        logger.finish_log_record(Record::new(
            Level::Warning,
            ABNORMAL_SHUTDOWN_BANNER,
            None,
            Vec::new(),
        ));
        let emitted = self.buffer.drain(logger);
        self.emitted.store(emitted, Ordering::Release);
        logger.prepare_to_die();
        lifetime.stop_application();
        Some(emitted)
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Buffered records emitted by the firing, zero if the hook has not fired.
    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::Acquire)
    }

    pub fn started_hook(self: &Arc<Self>) -> StartedHook {
        let hook = self.clone();
        started_hook(move |logger, lifetime| {
            hook.fire(logger, lifetime);
        })
    }
}
