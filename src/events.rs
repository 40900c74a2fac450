//! Event logging for script-driven instrumentation.
//!
//! Every user-facing message produced by the bridges (a rule being added, an
//! instruction being removed, a callback failing, the final mutation count of an
//! apply) is an [`Event`] delivered to one injectable [`LogSink`]. Nothing in
//! this crate writes to a console directly.
//!
//! # Architecture
//!
//! - [`Event`] - A single recorded event
//! - [`LogSink`] - Destination for events, injected into every bridge
//! - [`EventLog`] - Append-only sink with query and summary capabilities
//! - [`FnSink`] - Adapts a closure (for example a script console) as a sink
//! - [`EventBuilder`] - Fluent API for creating events, emitted on drop
//!
//! [`EventLog`] additionally forwards each event to the [`log`] facade, so a
//! host that installs a logger sees the same stream without extra wiring.
//!
//! # Example
//!
//! ```rust,ignore
//! use irhook::events::{EventKind, EventLog, LogSink};
//!
//! let log = EventLog::new();
//! let sink: &dyn LogSink = &log;
//!
//! sink.record(EventKind::InstructionRemoved)
//!     .at("com/example/Foo.bar()V", 3)
//!     .message("removed v7 = INVOKE java/io/PrintStream.println");
//! sink.info("Added replaceConstant rule");
//!
//! println!("{}", log.summary());
//! ```

use std::{collections::HashMap, fmt};

/// Categories of events that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A script handler was registered with a bridge.
    HandlerRegistered,
    /// An instrumentation rule was added.
    RuleAdded,
    /// Handlers or rules were cleared.
    RulesCleared,

    /// An IR instruction was removed from its block.
    InstructionRemoved,
    /// An IR instruction was replaced in place.
    InstructionReplaced,
    /// A constant load was rewritten to a different constant.
    ConstantReplaced,
    /// A syntax-tree node was removed from its parent.
    NodeRemoved,
    /// A syntax-tree node was replaced.
    NodeReplaced,
    /// A declared annotation was deleted.
    AnnotationRemoved,
    /// An observational rule fired.
    RuleActivated,

    /// A method was lifted to IR or to a syntax tree.
    MethodLifted,
    /// Lifting a method failed.
    LiftFailed,
    /// A class or method reference could not be resolved.
    ResolutionFailed,
    /// A script callback raised an error.
    CallbackFailed,
    /// A full apply completed.
    PassCompleted,

    /// Informational message.
    Info,
    /// Warning (something unexpected but recoverable).
    Warning,
    /// Error (something failed).
    Error,
}

impl EventKind {
    /// Returns a human-readable description of this event kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            // Registry
            Self::HandlerRegistered => "handler registered",
            Self::RuleAdded => "rule added",
            Self::RulesCleared => "rules cleared",
            // Transformations
            Self::InstructionRemoved => "instruction removed",
            Self::InstructionReplaced => "instruction replaced",
            Self::ConstantReplaced => "constant replaced",
            Self::NodeRemoved => "node removed",
            Self::NodeReplaced => "node replaced",
            Self::AnnotationRemoved => "annotation removed",
            // Engine
            Self::RuleActivated => "rule activated",
            Self::MethodLifted => "method lifted",
            Self::LiftFailed => "lift failed",
            Self::ResolutionFailed => "resolution failed",
            Self::CallbackFailed => "callback failed",
            Self::PassCompleted => "pass completed",
            // Diagnostic
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Returns true if this event represents a structural change.
    #[must_use]
    pub fn is_transformation(&self) -> bool {
        matches!(
            self,
            Self::InstructionRemoved
                | Self::InstructionReplaced
                | Self::ConstantReplaced
                | Self::NodeRemoved
                | Self::NodeReplaced
                | Self::AnnotationRemoved
        )
    }

    /// Returns true if this event reports something that went wrong.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::LiftFailed
                | Self::ResolutionFailed
                | Self::CallbackFailed
                | Self::Warning
                | Self::Error
        )
    }

    /// Returns true if this is a plain diagnostic event (info/warning/error).
    #[must_use]
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Self::Info | Self::Warning | Self::Error)
    }

    fn level(&self) -> log::Level {
        match self {
            Self::Error => log::Level::Error,
            Self::Warning | Self::LiftFailed | Self::ResolutionFailed | Self::CallbackFailed => {
                log::Level::Warn
            }
            k if k.is_transformation() => log::Level::Debug,
            Self::RuleActivated | Self::HandlerRegistered => log::Level::Debug,
            _ => log::Level::Info,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A single logged event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// The type of event.
    pub kind: EventKind,
    /// Qualified method (`owner.name(desc)`) the event belongs to, if any.
    pub method: Option<String>,
    /// Location within the method (instruction index or node id).
    pub location: Option<usize>,
    /// Human-readable description.
    pub message: String,
}

impl Event {
    /// Creates a new event with the given kind and message.
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            method: None,
            location: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.method, self.location) {
            (Some(method), Some(loc)) => {
                write!(f, "[{}] {}@{}: {}", self.kind, method, loc, self.message)
            }
            (Some(method), None) => write!(f, "[{}] {}: {}", self.kind, method, self.message),
            _ => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Destination for every user-facing message the bridges produce.
///
/// One sink is shared by all bridges of a session. Implementations must accept
/// events through a shared reference because callbacks may log re-entrantly.
pub trait LogSink {
    /// Delivers a single event.
    fn emit(&self, event: Event);
}

impl<'s> dyn LogSink + 's {
    /// Starts building a new event of the given kind.
    ///
    /// The event is emitted when the builder is dropped.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_, 's> {
        EventBuilder::new(self, kind)
    }

    /// Emits an informational message.
    pub fn info(&self, message: impl Into<String>) {
        self.emit(Event::new(EventKind::Info, message));
    }

    /// Emits a warning message.
    pub fn warn(&self, message: impl Into<String>) {
        self.emit(Event::new(EventKind::Warning, message));
    }

    /// Emits an error message.
    pub fn error(&self, message: impl Into<String>) {
        self.emit(Event::new(EventKind::Error, message));
    }
}

/// Builder for creating events with a fluent API.
///
/// Created by `record` on a [`LogSink`]. The event is automatically delivered
/// to the sink when the builder is dropped.
pub struct EventBuilder<'a, 's> {
    sink: &'a (dyn LogSink + 's),
    kind: EventKind,
    method: Option<String>,
    location: Option<usize>,
    message: Option<String>,
}

impl<'a, 's> EventBuilder<'a, 's> {
    fn new(sink: &'a (dyn LogSink + 's), kind: EventKind) -> Self {
        Self {
            sink,
            kind,
            method: None,
            location: None,
            message: None,
        }
    }

    /// Sets the method and location where the event occurred.
    pub fn at(mut self, method: impl Into<String>, location: usize) -> Self {
        self.method = Some(method.into());
        self.location = Some(location);
        self
    }

    /// Sets only the method (for method-level events without specific location).
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Sets a custom message describing the event.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }
}

impl Drop for EventBuilder<'_, '_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        self.sink.emit(Event {
            kind: self.kind,
            method: self.method.take(),
            location: self.location.take(),
            message,
        });
    }
}

/// Append-only collection of events.
///
/// Provides methods for querying recorded events and generating summaries.
/// Every emitted event is also forwarded to the [`log`] facade at a level
/// derived from its kind, and to an optional listener closure.
pub struct EventLog {
    events: boxcar::Vec<Event>,
    listener: Option<Box<dyn Fn(&Event)>>,
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("events", &self.events.count())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: boxcar::Vec::new(),
            listener: None,
        }
    }

    /// Creates an empty event log that also hands every event to `listener`.
    ///
    /// Script hosts use this to mirror events into their console output.
    #[must_use]
    pub fn with_listener(listener: impl Fn(&Event) + 'static) -> Self {
        Self {
            events: boxcar::Vec::new(),
            listener: Some(Box::new(listener)),
        }
    }

    /// Returns true if no events have been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Returns true if any event of the given kind exists.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.events.iter().any(|(_, e)| e.kind == kind)
    }

    /// Counts events of the given kind.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|(_, e)| e.kind == kind).count()
    }

    /// Returns an iterator over all events.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Returns an iterator over events of a specific kind.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.events
            .iter()
            .filter_map(move |(_, e)| if e.kind == kind { Some(e) } else { None })
    }

    /// Returns an iterator over events for a specific method.
    pub fn filter_method<'a>(&'a self, method: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events
            .iter()
            .filter_map(move |(_, e)| (e.method.as_deref() == Some(method)).then_some(e))
    }

    /// Returns an iterator over failure events only.
    pub fn failures(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events
            .iter()
            .filter_map(|(_, e)| e.kind.is_failure().then_some(e))
    }

    /// Returns the messages of all events, in order.
    ///
    /// Convenient for hosts that display a plain text console.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.iter().map(|e| e.message.clone()).collect()
    }

    /// Counts events grouped by kind.
    #[must_use]
    pub fn count_by_kind(&self) -> HashMap<EventKind, usize> {
        let mut counts = HashMap::new();
        for (_, event) in &self.events {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Returns the number of transformation events.
    #[must_use]
    pub fn transformation_count(&self) -> usize {
        self.events
            .iter()
            .filter(|(_, e)| e.kind.is_transformation())
            .count()
    }

    /// Generates a human-readable summary of all events.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no events".to_string();
        }

        let counts = self.count_by_kind();

        // Only show transformation counts in summary
        let mut parts: Vec<String> = counts
            .iter()
            .filter(|(k, _)| k.is_transformation())
            .map(|(kind, count)| format!("{} {}", count, kind.description()))
            .collect();

        if parts.is_empty() {
            return format!("{} events", self.len());
        }

        parts.sort();
        parts.join(", ")
    }
}

impl LogSink for EventLog {
    fn emit(&self, event: Event) {
        log::log!(target: "irhook", event.kind.level(), "{}", event);
        if let Some(listener) = &self.listener {
            listener(&event);
        }
        self.events.push(event);
    }
}

/// Sink that forwards every event to a closure and keeps nothing.
pub struct FnSink<F>(pub F);

impl<F: Fn(&Event)> LogSink for FnSink<F> {
    fn emit(&self, event: Event) {
        (self.0)(&event);
    }
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn emit(&self, _event: Event) {}
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[test]
    fn test_empty_log() {
        let log = EventLog::new();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
        assert!(!log.has(EventKind::InstructionRemoved));
        assert_eq!(log.summary(), "no events");
    }

    #[test]
    fn test_record_event() {
        let log = EventLog::new();
        let sink: &dyn LogSink = &log;

        sink.record(EventKind::InstructionRemoved)
            .at("a/B.c()V", 2)
            .message("removed v1 = 1");

        assert_eq!(log.len(), 1);
        let event = log.iter().next().unwrap();
        assert_eq!(event.method.as_deref(), Some("a/B.c()V"));
        assert_eq!(event.location, Some(2));
        assert_eq!(event.message, "removed v1 = 1");
        assert_eq!(event.to_string(), "[instruction removed] a/B.c()V@2: removed v1 = 1");
    }

    #[test]
    fn test_default_message_is_description() {
        let log = EventLog::new();
        let sink: &dyn LogSink = &log;
        sink.record(EventKind::RulesCleared);
        assert_eq!(log.iter().next().unwrap().message, "rules cleared");
    }

    #[test]
    fn test_summary_counts_transformations() {
        let log = EventLog::new();
        let sink: &dyn LogSink = &log;
        sink.record(EventKind::InstructionRemoved);
        sink.record(EventKind::InstructionRemoved);
        sink.record(EventKind::ConstantReplaced);
        sink.info("Applied 3 modifications to run");

        assert_eq!(log.transformation_count(), 3);
        assert_eq!(log.summary(), "1 constant replaced, 2 instruction removed");
        assert_eq!(log.count_kind(EventKind::Info), 1);
    }

    #[test]
    fn test_failures_and_filters() {
        let log = EventLog::new();
        let sink: &dyn LogSink = &log;
        sink.record(EventKind::CallbackFailed).method("x/Y.z()V");
        sink.warn("careful");
        sink.info("fine");

        assert_eq!(log.failures().count(), 2);
        assert_eq!(log.filter_method("x/Y.z()V").count(), 1);
        assert_eq!(log.filter_kind(EventKind::Info).count(), 1);
    }

    #[test]
    fn test_listener_and_fn_sink() {
        let seen = std::rc::Rc::new(RefCell::new(Vec::new()));
        let captured = seen.clone();
        let log = EventLog::with_listener(move |e| captured.borrow_mut().push(e.message.clone()));
        let sink: &dyn LogSink = &log;
        sink.info("hello");
        assert_eq!(seen.borrow().as_slice(), ["hello".to_string()]);
        assert_eq!(log.messages(), vec!["hello".to_string()]);

        let lines = RefCell::new(Vec::new());
        let fn_sink = FnSink(|e: &Event| lines.borrow_mut().push(e.to_string()));
        let sink: &dyn LogSink = &fn_sink;
        sink.error("boom");
        assert_eq!(lines.borrow().as_slice(), ["[error] boom".to_string()]);
    }
}
