//! Transport error type.

use std::fmt;
use std::io;

/// Error raised by the OSC link. Sends are best-effort: a failure is
/// surfaced to the caller once and never retried.
#[derive(Debug)]
pub enum LinkError {
    /// Opening the link failed (socket bind or receive-thread spawn).
    Connect { addr: String, source: io::Error },
    /// A datagram send failed.
    Io(io::Error),
    /// The outbound message could not be encoded as OSC.
    Encode(rosc::OscError),
}

impl LinkError {
    pub(crate) fn connect(host: &str, port: u16, source: io::Error) -> Self {
        Self::Connect {
            addr: format!("{}:{}", host, port),
            source,
        }
    }
}

impl From<io::Error> for LinkError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<rosc::OscError> for LinkError {
    fn from(e: rosc::OscError) -> Self {
        Self::Encode(e)
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect { addr, source } => write!(
                f,
                "could not open OSC link to {} ({}); check that the engine \
                 is running and listening on that port",
                addr, source
            ),
            Self::Io(e) => write!(f, "OSC send failed: {}", e),
            Self::Encode(e) => write!(f, "could not encode OSC message: {}", e),
        }
    }
}

impl std::error::Error for LinkError {}
