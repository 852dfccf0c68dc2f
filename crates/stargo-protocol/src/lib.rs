//! StarGo Protocol Library
//!
//! This crate provides parsing and encoding for the ASCII command protocol
//! spoken by Avalon StarGo equatorial mount controllers.
//!
//! # Format
//! - Commands: `:XXppp#` - a colon, a command code, optional parameters, `#`
//! - Replies: mostly `#`-terminated ASCII; a few commands use another sentinel
//! - Some commands produce no reply at all (fire-and-forget)
//!
//! # Unsolicited status frames
//!
//! The controller emits motion status frames at arbitrary times, interleaved
//! with replies to commands:
//!
//! - `:Z1mts#` or `:Zmts#` (firmware dependent)
//! - `m` motor power, `t` tracking mode, `s` slew speed tier
//!
//! A reader must therefore classify every frame it receives. The
//! [`MotionStatusParser`] recognizes status frames and folds them into a
//! [`MountState`]; anything else is a reply.
//!
//! # Example
//!
//! ```rust
//! use stargo_protocol::{MotionStatusParser, MountState, MotorsState, StarGoCommand};
//!
//! let mut state = MountState::default();
//! assert!(MotionStatusParser::update(&mut state, ":Z1303"));
//! assert_eq!(state.motors(), MotorsState::On);
//!
//! assert!(!MotionStatusParser::update(&mut state, "or+025"));
//!
//! let cmd = StarGoCommand::SetTrackingAdjustment { percent: 0.25 };
//! assert_eq!(cmd.encode().unwrap(), ":X41+025#");
//! ```

pub mod ahex;
pub mod command;
pub mod error;
pub mod reply;
pub mod status;

pub use command::{Axis, GuideDirection, StarGoCommand};
pub use error::{ParseError, ProtocolError};
pub use reply::GuidingSpeeds;
pub use status::{MotionStatusParser, MotorsState, MountState, SlewRate, StatusFrame, TrackMode};

/// Terminator used by commands and by most replies
pub const TERMINATOR: u8 = b'#';

/// Practical upper bound on the width of a single reply frame
///
/// Informational: readers should treat longer runs without a terminator as a
/// complete (unterminated) frame rather than grow without bound.
pub const MAX_FRAME_LEN: usize = 64;

/// Largest tracking adjustment the controller accepts, in percent
pub const MAX_TRACKING_ADJUSTMENT: f64 = 5.0;
