//! Typed events decoded from engine messages.

use std::fmt;

use crate::value::{Tab, Value};

/// Trace types the engine is known to report. The set is not exhaustive;
/// unknown trace types are carried through verbatim.
pub const TRACE_TYPES: &[&str] = &[
    "message",
    "abort",
    "assignment",
    "osc_recv",
    "conditional",
    "loop",
    "curve",
    "process",
    "function",
];

/// Kind of an inbound engine message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Stop,
    BeatPosition,
    Rnow,
    Tempo,
    Pitch,
    ActionTrace,
    LoadScore,
    Unknown,
}

impl EventKind {
    /// Classify a wire message-type string. Total: anything unrecognized
    /// is `Unknown`, never an error.
    pub fn from_message(message_type: &str) -> Self {
        match message_type {
            "stop" => EventKind::Stop,
            "event_beatpos" => EventKind::BeatPosition,
            "rnow" => EventKind::Rnow,
            "tempo" => EventKind::Tempo,
            "pitch" => EventKind::Pitch,
            "action_trace" => EventKind::ActionTrace,
            "loadscore" => EventKind::LoadScore,
            _ => EventKind::Unknown,
        }
    }

    /// The wire tag for this kind (`"unknown"` for [`EventKind::Unknown`]).
    pub fn message_tag(self) -> &'static str {
        match self {
            EventKind::Stop => "stop",
            EventKind::BeatPosition => "event_beatpos",
            EventKind::Rnow => "rnow",
            EventKind::Tempo => "tempo",
            EventKind::Pitch => "pitch",
            EventKind::ActionTrace => "action_trace",
            EventKind::LoadScore => "loadscore",
            EventKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message_tag())
    }
}

/// One step of score-driven action execution, as reported by an
/// `action_trace` message with its full six-field payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionTrace {
    pub action_name: String,
    pub trace_type: String,
    pub father_name: String,
    /// Absolute time in seconds.
    pub now: f64,
    /// Relative (score) time.
    pub rnow: f64,
    pub message: String,
}

impl ActionTrace {
    /// Whether `trace_type` is one of the documented [`TRACE_TYPES`].
    pub fn is_known_type(&self) -> bool {
        TRACE_TYPES.contains(&self.trace_type.as_str())
    }
}

/// An event decoded from one inbound message. Created once per message,
/// handed to every matching handler, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    /// The single decoded argument if the message carried exactly one,
    /// otherwise a [`Tab`] of all arguments (empty tab for zero args).
    pub data: Value,
    /// Original OSC address the message arrived on.
    pub raw_address: Option<String>,
    /// Present only for fully-formed `action_trace` messages.
    pub trace: Option<ActionTrace>,
}

impl Event {
    pub fn new(kind: EventKind, data: impl Into<Value>, raw_address: Option<String>) -> Self {
        Self {
            kind,
            data: data.into(),
            raw_address,
            trace: None,
        }
    }

    /// Build an event from decoded message arguments.
    ///
    /// An `ActionTrace` kind with at least six arguments yields an event
    /// with `trace` populated from positional fields 0..5; fewer
    /// arguments degrade to a generic event (a wire-format precondition,
    /// not an error). The two time fields must coerce to floats; a value
    /// that cannot is a hard error for that message.
    pub fn from_args(
        kind: EventKind,
        mut args: Vec<Value>,
        raw_address: Option<String>,
    ) -> Result<Event, TraceFieldError> {
        if kind == EventKind::ActionTrace && args.len() >= 6 {
            let now = coerce_time(&args[3], 3)?;
            let rnow = coerce_time(&args[4], 4)?;
            let trace = ActionTrace {
                action_name: args[0].display_string(),
                trace_type: args[1].display_string(),
                father_name: args[2].display_string(),
                now,
                rnow,
                message: args[5].display_string(),
            };
            return Ok(Event {
                kind,
                data: Value::Tab(Tab::new()),
                raw_address,
                trace: Some(trace),
            });
        }

        if kind == EventKind::ActionTrace {
            log::debug!(
                "action_trace carried {} args, expected 6; treating as generic event",
                args.len()
            );
        }

        let data = match args.len() {
            1 => args.remove(0),
            _ => Value::Tab(Tab::from_vec(args)),
        };
        Ok(Event {
            kind,
            data,
            raw_address,
            trace: None,
        })
    }
}

fn coerce_time(value: &Value, index: usize) -> Result<f64, TraceFieldError> {
    value.as_f64().ok_or_else(|| TraceFieldError {
        index,
        value: value.to_string(),
    })
}

/// A trace time field that could not be read as a float.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceFieldError {
    pub index: usize,
    pub value: String,
}

impl fmt::Display for TraceFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "action_trace arg {} is not a time value: {}",
            self.index, self.value
        )
    }
}

impl std::error::Error for TraceFieldError {}
