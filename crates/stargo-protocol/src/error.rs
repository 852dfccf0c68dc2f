//! Error types for StarGo protocol parsing and encoding

use thiserror::Error;

/// Errors that can occur while parsing protocol data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Invalid frame structure
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Reply did not have the shape expected for the command
    #[error("unexpected reply to {expected}: {reply:?}")]
    UnexpectedReply {
        /// Description of the expected reply
        expected: &'static str,
        /// The reply as received (terminator stripped)
        reply: String,
    },

    /// Character outside the ahex alphabet (`'0'..='?'`)
    #[error("invalid ahex digit: {0:?}")]
    InvalidAhexDigit(char),

    /// Ahex field of the wrong width
    #[error("invalid ahex field length: expected 8, got {0}")]
    InvalidAhexLength(usize),
}

/// Higher-level protocol errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    /// Parse error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Command argument cannot be represented on the wire
    #[error("argument out of range: {0}")]
    OutOfRange(String),
}
