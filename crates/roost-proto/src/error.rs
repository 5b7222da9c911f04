//! Wire-level error types.

use thiserror::Error;

use crate::destination::TopicKind;

/// Errors produced while encoding or decoding wire data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A destination path did not match any known addressing scheme.
    #[error("invalid destination path: {path}")]
    InvalidDestination {
        /// The path that failed to parse.
        path: String,
    },

    /// A payload failed to decode as the type its stream kind implies.
    #[error("payload decode failed on {kind:?} stream: {reason}")]
    Decode {
        /// Stream kind the payload arrived on.
        kind: TopicKind,
        /// Decoder error description.
        reason: String,
    },

    /// A payload failed to encode.
    #[error("payload encode failed: {reason}")]
    Encode {
        /// Encoder error description.
        reason: String,
    },
}
