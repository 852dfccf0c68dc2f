//! StarGo commands
//!
//! Each command knows how it is written to the wire and what kind of reply it
//! produces. Mount-specific commands outside the tracking and guiding core
//! (parking, site, time) are sent as raw strings by their callers.

use crate::error::ProtocolError;
use crate::MAX_TRACKING_ADJUSTMENT;

/// Longest guide pulse representable in the 4-digit duration field
pub const MAX_PULSE_MS: u32 = 9999;

/// Mount axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    /// Right ascension
    Ra,
    /// Declination
    Dec,
}

impl Axis {
    /// Index used by the controller for per-axis queries (RA = 0, DEC = 1)
    pub fn index(&self) -> u8 {
        match self {
            Axis::Ra => 0,
            Axis::Dec => 1,
        }
    }
}

/// Guide pulse direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GuideDirection {
    North,
    South,
    East,
    West,
}

impl GuideDirection {
    /// Axis moved by a pulse in this direction
    pub fn axis(&self) -> Axis {
        match self {
            GuideDirection::North | GuideDirection::South => Axis::Dec,
            GuideDirection::East | GuideDirection::West => Axis::Ra,
        }
    }

    /// Sign of the RA correction made by a pulse in this direction
    ///
    /// West pulses speed up the RA drive (+1), east pulses slow it (-1).
    /// Declination pulses have no RA component.
    pub fn ra_sign(&self) -> Option<f64> {
        match self {
            GuideDirection::West => Some(1.0),
            GuideDirection::East => Some(-1.0),
            GuideDirection::North | GuideDirection::South => None,
        }
    }

    fn code(&self) -> char {
        match self {
            GuideDirection::North => 'n',
            GuideDirection::South => 's',
            GuideDirection::East => 'e',
            GuideDirection::West => 'w',
        }
    }
}

/// StarGo command
#[derive(Debug, Clone, PartialEq)]
pub enum StarGoCommand {
    /// Read the RA tracking adjustment: `:X42#` -> `or+025`
    GetTrackingAdjustment,
    /// Set the RA tracking adjustment in percent: `:X41+025#` (no reply)
    SetTrackingAdjustment { percent: f64 },
    /// Read guiding speeds: `:X22#` -> `30b50`
    GetGuidingSpeeds,
    /// Set the guiding speed of one axis in percent of sidereal: `:X2030#` (no reply)
    SetGuidingSpeed { axis: Axis, percent: u8 },
    /// Guide pulse: `:Mge0500#` (no reply)
    GuidePulse {
        direction: GuideDirection,
        duration_ms: u32,
    },
    /// Read the gear ratio of an axis: `:X480#` -> prefix + ahex field
    GetGearRatio(Axis),
    /// Read the motor step position of an axis: `:TTGMs0#` -> ahex field
    GetMotorSteps(Axis),
}

impl StarGoCommand {
    /// Encode this command to its wire format
    pub fn encode(&self) -> Result<String, ProtocolError> {
        let cmd = match self {
            StarGoCommand::GetTrackingAdjustment => ":X42#".to_string(),
            StarGoCommand::SetTrackingAdjustment { percent } => {
                if !percent.is_finite() {
                    return Err(ProtocolError::OutOfRange(format!(
                        "tracking adjustment {percent}"
                    )));
                }
                let clamped = percent.clamp(-MAX_TRACKING_ADJUSTMENT, MAX_TRACKING_ADJUSTMENT);
                if clamped != *percent {
                    tracing::warn!(
                        "Tracking adjustment {:+.2}% clamped to {:+.2}%",
                        percent,
                        clamped
                    );
                }
                let hundredths = (clamped * 100.0).round() as i32;
                format!(":X41{:+04}#", hundredths)
            }
            StarGoCommand::GetGuidingSpeeds => ":X22#".to_string(),
            StarGoCommand::SetGuidingSpeed { axis, percent } => {
                if *percent > 99 {
                    return Err(ProtocolError::OutOfRange(format!(
                        "guiding speed {percent}%"
                    )));
                }
                let code = match axis {
                    Axis::Ra => "X20",
                    Axis::Dec => "X21",
                };
                format!(":{}{:02}#", code, percent)
            }
            StarGoCommand::GuidePulse {
                direction,
                duration_ms,
            } => format!(
                ":Mg{}{:04}#",
                direction.code(),
                (*duration_ms).min(MAX_PULSE_MS)
            ),
            StarGoCommand::GetGearRatio(axis) => format!(":X48{}#", axis.index()),
            StarGoCommand::GetMotorSteps(axis) => format!(":TTGMs{}#", axis.index()),
        };
        Ok(cmd)
    }

    /// Whether the controller answers this command
    pub fn expects_reply(&self) -> bool {
        !matches!(
            self,
            StarGoCommand::SetTrackingAdjustment { .. }
                | StarGoCommand::SetGuidingSpeed { .. }
                | StarGoCommand::GuidePulse { .. }
        )
    }

    /// Byte terminating the reply to this command
    pub fn reply_terminator(&self) -> u8 {
        crate::TERMINATOR
    }
}
