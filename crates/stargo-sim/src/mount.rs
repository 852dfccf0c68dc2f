//! Virtual StarGo controller state
//!
//! Holds the handful of registers the driver reads and writes, and answers
//! commands with the reply frames a real controller would send.

use stargo_protocol::{ahex, Axis, GuideDirection, MAX_TRACKING_ADJUSTMENT};
use tracing::{debug, warn};

/// A guide pulse the virtual mount received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuidePulseRecord {
    pub direction: GuideDirection,
    pub duration_ms: u32,
}

/// Virtual StarGo controller
///
/// Commands are the complete `:...#` text. Replies include their terminator.
pub struct VirtualMount {
    /// Identifier for logging
    id: String,
    trim_hundredths: i32,
    guide_speeds: [u8; 2],
    gear_ratios: [u32; 2],
    motor_steps: [i32; 2],
    /// Motor, tracking and slew digits of the next status frame
    status: [u8; 3],
    legacy_status: bool,
    status_chatter: bool,
    pulses: Vec<GuidePulseRecord>,
    /// Commands received (for test verification)
    received_commands: Vec<String>,
}

impl VirtualMount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            trim_hundredths: 0,
            guide_speeds: [30, 30],
            gear_ratios: [0x0001_2C00, 0x0001_2C00],
            motor_steps: [0, 0],
            status: [3, 3, 0],
            legacy_status: false,
            status_chatter: false,
            pulses: Vec::new(),
            received_commands: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// RA tracking adjustment in hundredths of a percent
    pub fn tracking_adjustment_hundredths(&self) -> i32 {
        self.trim_hundredths
    }

    pub fn set_tracking_adjustment_hundredths(&mut self, hundredths: i32) {
        let max = (MAX_TRACKING_ADJUSTMENT * 100.0) as i32;
        self.trim_hundredths = hundredths.clamp(-max, max);
    }

    pub fn guide_speed(&self, axis: Axis) -> u8 {
        self.guide_speeds[usize::from(axis.index())]
    }

    pub fn set_guide_speed(&mut self, axis: Axis, percent: u8) {
        self.guide_speeds[usize::from(axis.index())] = percent;
    }

    pub fn set_gear_ratio(&mut self, axis: Axis, ratio: u32) {
        self.gear_ratios[usize::from(axis.index())] = ratio;
    }

    pub fn set_motor_steps(&mut self, axis: Axis, steps: i32) {
        self.motor_steps[usize::from(axis.index())] = steps;
    }

    /// Set the digits reported by the next status frame
    pub fn set_status(&mut self, motors: u8, tracking: u8, slew: u8) {
        self.status = [motors, tracking, slew];
    }

    /// Report status as `:Zmts` instead of `:Z1mts`
    pub fn set_legacy_status(&mut self, legacy: bool) {
        self.legacy_status = legacy;
    }

    /// Wrap every reply in status frames
    pub fn set_status_chatter(&mut self, enabled: bool) {
        self.status_chatter = enabled;
    }

    pub fn status_chatter(&self) -> bool {
        self.status_chatter
    }

    /// Status frame for the current digits, terminator included
    pub fn status_frame(&self) -> String {
        let [m, t, s] = self.status;
        if self.legacy_status {
            format!(":Z{}{}{}#", m, t, s)
        } else {
            format!(":Z1{}{}{}#", m, t, s)
        }
    }

    pub fn pulses(&self) -> &[GuidePulseRecord] {
        &self.pulses
    }

    pub fn received_commands(&self) -> &[String] {
        &self.received_commands
    }

    pub fn clear_received(&mut self) {
        self.received_commands.clear();
        self.pulses.clear();
    }

    /// Process one command and return its reply frame, if it has one
    pub fn process_command(&mut self, command: &str) -> Option<String> {
        self.received_commands.push(command.to_string());

        let Some(body) = command
            .strip_prefix(':')
            .and_then(|c| c.strip_suffix('#'))
        else {
            warn!("Virtual mount {} ignoring malformed command {:?}", self.id, command);
            return None;
        };

        match body {
            "X42" => Some(format!("or{:+04}#", self.trim_hundredths)),
            "X22" => Some(format!(
                "{:02}b{:02}#",
                self.guide_speeds[0], self.guide_speeds[1]
            )),
            "X480" | "X481" => {
                let axis = usize::from(body.ends_with('1'));
                Some(format!("i{}{}#", axis, ahex::encode(self.gear_ratios[axis])))
            }
            "TTGMs0" => Some(format!("{}r#", ahex::encode_signed(self.motor_steps[0]))),
            "TTGMs1" => Some(format!("{}d#", ahex::encode_signed(self.motor_steps[1]))),
            _ => {
                self.process_setter(body);
                None
            }
        }
    }

    /// Commands without a reply
    fn process_setter(&mut self, body: &str) {
        if let Some(value) = body.strip_prefix("X41") {
            match value.parse::<i32>() {
                Ok(h) => self.set_tracking_adjustment_hundredths(h),
                Err(_) => warn!("Virtual mount {} bad trim {:?}", self.id, value),
            }
        } else if let Some(value) = body.strip_prefix("X20") {
            self.set_speed_from(Axis::Ra, value);
        } else if let Some(value) = body.strip_prefix("X21") {
            self.set_speed_from(Axis::Dec, value);
        } else if let Some(pulse) = body.strip_prefix("Mg") {
            self.record_pulse(pulse);
        } else {
            debug!("Virtual mount {} ignoring unknown command {:?}", self.id, body);
        }
    }

    fn set_speed_from(&mut self, axis: Axis, value: &str) {
        match value.parse::<u8>() {
            Ok(percent) => self.set_guide_speed(axis, percent),
            Err(_) => warn!("Virtual mount {} bad guide speed {:?}", self.id, value),
        }
    }

    fn record_pulse(&mut self, pulse: &str) {
        let direction = match pulse.as_bytes().first() {
            Some(b'n') => GuideDirection::North,
            Some(b's') => GuideDirection::South,
            Some(b'e') => GuideDirection::East,
            Some(b'w') => GuideDirection::West,
            _ => {
                warn!("Virtual mount {} bad guide pulse {:?}", self.id, pulse);
                return;
            }
        };
        match pulse[1..].parse::<u32>() {
            Ok(duration_ms) => self.pulses.push(GuidePulseRecord {
                direction,
                duration_ms,
            }),
            Err(_) => warn!("Virtual mount {} bad pulse length {:?}", self.id, pulse),
        }
    }
}
