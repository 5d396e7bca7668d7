// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record type for bootlog.
//!
//! A [`Record`] is one log event captured before (or replayed into) a real logger.
//! Unlike a record that is formatted when a sink writes it, a bootlog record is stamped
//! when it is *created*: the header carries the process name and the UTC time of the
//! event, so replaying it minutes later, from a different host, still says when it
//! actually happened.
//!
//! ```rust
//! use bootlog::{Level, Record};
//!
//! let record = Record::new(Level::Information, "Loaded {count} plugins", None, vec![3u32.into()]);
//! assert!(record.message().contains(" at UTC ["));
//! assert!(record.message().ends_with("\nLoaded {count} plugins"));
//! assert!(record.rendered().ends_with("\nLoaded 3 plugins"));
//! ```

use crate::Level;
use crate::config::Config;
use crate::unwind;
use chrono::Utc;
use std::error::Error;
use std::fmt::{Debug, Display, Write};
use std::sync::Arc;

/**
Stamps `message` with the header every record carries:

```text
[process-name] at UTC [2024-05-01T09:30:00.1234567+00:00]
message
```

Banners emitted by the replay hooks go through here too, so they line up with the
records that follow them.
*/
pub fn stamp(message: &str) -> String {
    let mut stamped = header();
    stamped.push_str(message);
    stamped
}

fn header() -> String {
    let config = Config::global();
    format!(
        "[{}] at UTC [{}]\n",
        config.process_name,
        config.timestamp_format.format(Utc::now())
    )
}

trait ArgValue: Display + Debug + Send + Sync {}
impl<T: Display + Debug + Send + Sync> ArgValue for T {}

/**
An argument attached to a record.

Arguments are opaque to bootlog.  Structured sinks can inspect them through [Debug];
[Record::rendered] substitutes their [Display] form into the message holes.
*/
#[derive(Clone)]
pub struct LogArg(Arc<dyn ArgValue>);

impl LogArg {
    pub fn new<T: Display + Debug + Send + Sync + 'static>(value: T) -> Self {
        LogArg(Arc::new(value))
    }

    /// The argument's [Display] form, or [UNFORMATTABLE_ARGUMENT] if that fails.
    //not a Display impl: that would collide with the blanket From below
    pub fn rendered(&self) -> String {
        display_or(&*self.0, UNFORMATTABLE_ARGUMENT)
    }
}

impl<T: Display + Debug + Send + Sync + 'static> From<T> for LogArg {
    fn from(value: T) -> Self {
        LogArg::new(value)
    }
}

impl Debug for LogArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&*self.0, f)
    }
}

/**
An error attached to a record.

This is a shared handle, so cloning a record does not clone the error.  Any
`std::error::Error + Send + Sync + 'static` converts into it with `?` or `.into()`.
*/
#[derive(Clone)]
pub struct Failure(Arc<dyn Error + Send + Sync + 'static>);

#[derive(Debug)]
struct MessageFailure(String);

impl Display for MessageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for MessageFailure {}

impl Failure {
    pub fn new<E: Error + Send + Sync + 'static>(error: E) -> Self {
        Failure(Arc::new(error))
    }

    pub fn from_boxed(error: Box<dyn Error + Send + Sync + 'static>) -> Self {
        Failure(Arc::from(error))
    }

    /// A failure that is nothing but a message, such as a panic payload.
    pub fn message(message: impl Into<String>) -> Self {
        Failure::new(MessageFailure(message.into()))
    }

    pub fn as_error(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.0
    }
}

impl<E: Error + Send + Sync + 'static> From<E> for Failure {
    fn from(error: E) -> Self {
        Failure::new(error)
    }
}

impl Debug for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&*self.0, f)
    }
}

/// The error followed by its `source()` chain, one cause per line.
impl Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(cause) = source {
            write!(f, "\n  caused by: {}", cause)?;
            source = cause.source();
        }
        Ok(())
    }
}

/// Written in place of an argument whose `Display` panicked or failed.
pub const UNFORMATTABLE_ARGUMENT: &str = "<unformattable argument>";

/// Written in place of an error whose `Display` panicked or failed.
pub const UNFORMATTABLE_ERROR: &str = "<unformattable error>";

/**
Formats `value`, or returns `placeholder` if its `Display` panics or reports an error.

Replay runs while the process is going down; one broken `Display` impl must not take the
rest of the buffer with it.
*/
pub(crate) fn display_or<T: Display + ?Sized>(value: &T, placeholder: &str) -> String {
    let mut out = String::new();
    match unwind::catch(|| write!(out, "{value}")) {
        Ok(Ok(())) => out,
        _ => placeholder.to_string(),
    }
}

/**
A single log event.

Records are immutable.  Everything about them is decided in the constructor: the message
is stamped with [stamp] exactly once, so the header reflects when the event occurred
rather than when it was later drained, and arguments and errors are formatted right
away, so emitting a record never runs caller code.
*/
#[derive(Debug, Clone)]
pub struct Record {
    level: Level,
    message: String,
    //byte offset where the caller's message starts, after the header
    body_start: usize,
    rendered: String,
    error: Option<Failure>,
    error_text: Option<String>,
    args: Vec<LogArg>,
    target: Option<String>,
}

impl Record {
    /**
    A record whose `message` is a template: each `{...}` hole takes the next argument.

    An argument or error whose `Display` panics or fails is rendered as
    [UNFORMATTABLE_ARGUMENT] or [UNFORMATTABLE_ERROR].
    */
    pub fn new(level: Level, message: &str, error: Option<Failure>, args: Vec<LogArg>) -> Self {
        Self::build(level, message, error, args, true)
    }

    /// A record whose message is final text; braces in it are kept as written.
    pub fn verbatim(level: Level, message: &str, error: Option<Failure>) -> Self {
        Self::build(level, message, error, Vec::new(), false)
    }

    fn build(
        level: Level,
        message: &str,
        error: Option<Failure>,
        args: Vec<LogArg>,
        template: bool,
    ) -> Self {
        let stamped = stamp(message);
        let body_start = stamped.len() - message.len();
        let mut rendered = String::with_capacity(stamped.len());
        rendered.push_str(&stamped[..body_start]);
        if template {
            fill_holes(message, &args, &mut rendered);
        } else {
            rendered.push_str(message);
        }
        let error_text = error
            .as_ref()
            .map(|error| display_or(error, UNFORMATTABLE_ERROR));
        Self {
            level,
            message: stamped,
            body_start,
            rendered,
            error,
            error_text,
            args,
            target: None,
        }
    }

    /// Names the component the record came from, such as a `log` target.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// The stamped message, header included, with argument holes left unfilled.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The message as the caller wrote it, without the header.
    pub fn body(&self) -> &str {
        &self.message[self.body_start..]
    }

    pub fn error(&self) -> Option<&Failure> {
        self.error.as_ref()
    }

    /// The error and its causes as formatted when the record was created.
    pub fn error_text(&self) -> Option<&str> {
        self.error_text.as_deref()
    }

    pub fn args(&self) -> &[LogArg] {
        &self.args
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /**
    The stamped message with each `{...}` hole in the body replaced by the next
    argument's [Display] form.

    `{{` and `}}` produce literal braces.  Holes beyond the supplied arguments are left
    as written, and surplus arguments are ignored.
    */
    pub fn rendered(&self) -> &str {
        &self.rendered
    }
}

fn fill_holes(template: &str, args: &[LogArg], out: &mut String) {
    let mut args = args.iter();
    let mut rest = template;
    while let Some(at) = rest.find(['{', '}']) {
        out.push_str(&rest[..at]);
        let tail = &rest[at..];
        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
        } else {
            match tail.find('}') {
                Some(close) => {
                    match args.next() {
                        Some(arg) => out.push_str(&arg.rendered()),
                        None => out.push_str(&tail[..=close]),
                    }
                    rest = &tail[close + 1..];
                }
                None => {
                    out.push_str(tail);
                    rest = "";
                }
            }
        }
    }
    out.push_str(rest);
}

impl Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.rendered)?;
        if let Some(error) = &self.error_text {
            write!(f, "\n{}", error)?;
        }
        Ok(())
    }
}

/*
Boilerplate notes for Record:

IMPLEMENTED:
- Debug: Derived - essential for diagnostics
- Clone: Derived - errors and args are shared handles, so clones are cheap-ish
- Display: rendered message, then the error chain, both as formatted at construction

NOT IMPLEMENTED:
- PartialEq/Eq/Hash: errors and args are opaque trait objects with no equality
- Default: a record without a level or a moment in time is meaningless
- Ord: records are ordered by the buffer, not by value

AUTOMATIC:
- Send/Sync: every field is Send + Sync
*/
