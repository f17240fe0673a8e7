//! # antescofo-types
//!
//! Shared type definitions for the Antescofo client crates: the value
//! model exchanged with the engine, typed events decoded from inbound
//! messages, and the subscription dispatcher that fans events out to
//! handlers.

pub mod dispatch;
pub mod event;
pub mod value;

pub use dispatch::{EventDispatcher, HandlerId};
pub use event::{ActionTrace, Event, EventKind, TraceFieldError, TRACE_TYPES};
pub use value::{Map, Tab, Value};
