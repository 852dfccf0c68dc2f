//! Unsolicited motion status frames
//!
//! The controller reports motor power, tracking mode and slew tier as
//! `:Z1mts` (current firmware) or `:Zmts` (older firmware), terminator
//! stripped. Each field is a single decimal digit.

use std::fmt;

/// Motor power tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MotorsState {
    /// Both motors off
    Off,
    /// Only the declination motor powered
    DecOnly,
    /// Only the right ascension motor powered
    RaOnly,
    /// Both motors powered
    On,
}

impl MotorsState {
    fn from_digit(d: u8) -> Option<Self> {
        match d {
            0 => Some(MotorsState::Off),
            1 => Some(MotorsState::DecOnly),
            2 => Some(MotorsState::RaOnly),
            3 => Some(MotorsState::On),
            _ => None,
        }
    }
}

/// Coarse tracking mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrackMode {
    Lunar,
    Solar,
    Sidereal,
}

impl TrackMode {
    /// Digit 0 is reported while slewing and carries no tracking information
    fn from_digit(d: u8) -> Option<Self> {
        match d {
            1 => Some(TrackMode::Lunar),
            2 => Some(TrackMode::Solar),
            3 => Some(TrackMode::Sidereal),
            _ => None,
        }
    }
}

/// Slew speed tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SlewRate {
    Guide,
    Centering,
    Find,
    Max,
}

impl SlewRate {
    fn from_digit(d: u8) -> Option<Self> {
        match d {
            0 => Some(SlewRate::Guide),
            1 => Some(SlewRate::Centering),
            2 => Some(SlewRate::Find),
            3 => Some(SlewRate::Max),
            _ => None,
        }
    }
}

/// Mount state as last reported by status frames
///
/// Fields are read-only outside this crate; the only way to change them is
/// [`MotionStatusParser::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MountState {
    motors: MotorsState,
    tracking: TrackMode,
    slew_rate: SlewRate,
}

impl Default for MountState {
    fn default() -> Self {
        Self {
            motors: MotorsState::Off,
            tracking: TrackMode::Sidereal,
            slew_rate: SlewRate::Max,
        }
    }
}

impl MountState {
    pub fn motors(&self) -> MotorsState {
        self.motors
    }

    pub fn tracking(&self) -> TrackMode {
        self.tracking
    }

    pub fn slew_rate(&self) -> SlewRate {
        self.slew_rate
    }

    fn apply(&mut self, frame: &StatusFrame) {
        if let Some(motors) = MotorsState::from_digit(frame.motors) {
            self.motors = motors;
        }
        if let Some(tracking) = TrackMode::from_digit(frame.tracking) {
            self.tracking = tracking;
        }
        if let Some(slew_rate) = SlewRate::from_digit(frame.slew) {
            self.slew_rate = slew_rate;
        }
    }
}

impl fmt::Display for MountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "motors={:?} tracking={:?} slew={:?}",
            self.motors, self.tracking, self.slew_rate
        )
    }
}

/// Raw digits of a status frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFrame {
    pub motors: u8,
    pub tracking: u8,
    pub slew: u8,
}

/// Recognizes status frames and folds them into a [`MountState`]
pub struct MotionStatusParser;

impl MotionStatusParser {
    /// Parse a frame (terminator stripped) as a status frame
    ///
    /// The `:Z1` shape is tried first. A frame such as `:Z130` does not carry
    /// three digits after `:Z1`, so it falls back to the short shape and reads
    /// as motors=1, tracking=3, slew=0.
    pub fn parse(frame: &str) -> Option<StatusFrame> {
        frame
            .strip_prefix(":Z1")
            .and_then(three_digits)
            .or_else(|| frame.strip_prefix(":Z").and_then(three_digits))
            .map(|[motors, tracking, slew]| StatusFrame {
                motors,
                tracking,
                slew,
            })
    }

    /// Update `state` from `frame`, returning whether it was a status frame
    ///
    /// Digits outside the known tables leave the matching field unchanged.
    pub fn update(state: &mut MountState, frame: &str) -> bool {
        match Self::parse(frame) {
            Some(status) => {
                state.apply(&status);
                true
            }
            None => false,
        }
    }
}

fn three_digits(rest: &str) -> Option<[u8; 3]> {
    let bytes = rest.as_bytes();
    if bytes.len() < 3 {
        return None;
    }
    let mut digits = [0u8; 3];
    for (slot, b) in digits.iter_mut().zip(bytes) {
        if !b.is_ascii_digit() {
            return None;
        }
        *slot = b - b'0';
    }
    Some(digits)
}
