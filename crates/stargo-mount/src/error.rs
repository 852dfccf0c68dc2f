//! Error types for the mount link and controllers

use stargo_filter::FilterError;
use stargo_protocol::{GuideDirection, ParseError, ProtocolError};
use thiserror::Error;

/// Errors from the byte-level transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// Nothing (or no complete frame) arrived before the deadline
    #[error("timed out waiting for data")]
    Timeout,

    /// The peer closed the stream
    #[error("connection closed")]
    Closed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from mount operations
#[derive(Debug, Error)]
pub enum MountError {
    /// Transport failure; the query is not retried
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Serial port could not be opened
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// Command could not be encoded
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Reply did not have the expected shape
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Filter construction failed
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    /// A command that expects a reply got none within its wait
    #[error("no reply to {command}")]
    NoReply {
        /// Command as sent
        command: String,
    },

    /// Direction has no meaning for the operation
    #[error("direction {0:?} is not valid here")]
    InvalidDirection(GuideDirection),

    /// Auto-adjust settings outside their usable range
    #[error("invalid auto-adjust config: {0}")]
    InvalidConfig(String),

    /// Sample offered while auto-adjust is off
    #[error("RA auto-adjust is disabled")]
    AutoAdjustDisabled,
}
