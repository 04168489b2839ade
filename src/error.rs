use thiserror::Error;

/// Connection-level failure: the controller is unreachable or the link dropped.
#[derive(Debug, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// Failure modes of a single register read.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The connection failed mid-request. The poller re-enters CONNECTING.
    #[error("transport error: {0}")]
    Transport(String),

    /// The controller answered with a protocol exception for this field.
    #[error("protocol exception: {0}")]
    Protocol(String),
}

/// Raw register words could not be decoded into a typed value.
///
/// Decoding fails only on malformed or short input; out-of-range sensor
/// values pass through unchanged.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("short register payload: needed {needed} words, got {got}")]
    Short { needed: usize, got: usize },

    #[error("invalid string payload: {0}")]
    InvalidString(String),
}

/// A sink was unreachable or the reading could not be serialized for it.
#[derive(Debug, Error)]
pub enum ForwarderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to encode reading: {0}")]
    Encode(String),
}

/// Why a poll cycle did not publish.
///
/// Every variant is caught at the cycle boundary inside the poller; none of
/// them escape the loop.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("connect failed: {0}")]
    Connect(#[from] TransportError),

    #[error("read of '{field}' failed: {source}")]
    Read {
        field: &'static str,
        source: ReadError,
    },

    #[error("decode of '{field}' failed: {source}")]
    Decode {
        field: &'static str,
        source: DecodeError,
    },
}

impl CycleError {
    /// True when the connection must be torn down and re-established.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CycleError::Connect(_)
                | CycleError::Read {
                    source: ReadError::Transport(_),
                    ..
                }
        )
    }
}
