//! # antescofo-osc
//!
//! OSC transport and control client for the Antescofo score-following
//! engine: the wire codec between [`antescofo_types::Value`] and OSC
//! arguments, a UDP link whose background receive loop turns inbound
//! messages into typed events, and a high-level command client.
//!
//! ```rust,ignore
//! use antescofo_osc::{AntescofoClient, Config};
//! use antescofo_types::EventKind;
//!
//! let config = Config::load();
//! let mut client = AntescofoClient::connect(&config)?;
//! client.load_score("demo.asco.txt")?;
//! client.on(Some(EventKind::Tempo), |event| {
//!     println!("tempo: {}", event.data);
//! });
//! client.start()?;
//! client.wait(10.0);
//! client.stop()?;
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod link;

pub use client::AntescofoClient;
pub use codec::{decode_args, encode_args, from_osc, to_osc, CodecError};
pub use config::Config;
pub use error::LinkError;
pub use link::{OscLink, OSC_PREFIX};
