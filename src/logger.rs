//SPDX-License-Identifier: MIT OR Apache-2.0
use crate::record::Record;
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

/**
A sink that makes records visible: a console, a file, a collector.

bootlog does not care how the sink works.  It only needs the sink it replays into to
accept every level, which is why terminal replay always runs at [crate::Level::Trace].
*/
pub trait Logger: Debug + Send + Sync {
    /**
        Submits the record for logging.
    */
    fn finish_log_record(&self, record: Record);

    /**
    Submits the record for logging asynchronously.

    Loggers may choose to implement this as a simple wrapper around [Self::finish_log_record] if they wish.
    */
    fn finish_log_record_async<'s>(
        &'s self,
        record: Record,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 's>>;

    /**
    The application may imminently exit.  Ensure all buffers are flushed and up to date.
    */
    fn prepare_to_die(&self);
}

/*
Boilerplate notes.

# Logger

Clone on Logger doesn't make sense; sinks own unique resources (a console handle, a file).  Share them with Arc.
PartialEq/Eq/Hash: unclear whether we would mean data equality or provenance.  Avoid.
Default is not sensible since a sink may need a destination to be constructed.
Send/Sync are required: hooks fire on whatever thread the host runs them on.
*/
