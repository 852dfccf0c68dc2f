//! Reply parsers for the typed StarGo queries
//!
//! All inputs are frames with the terminator already stripped.

use crate::ahex;
use crate::error::ParseError;

/// Parse the reply to `:X42#` (`or+025`) into a tracking adjustment in percent
///
/// The value is sent in hundredths of a percent with an explicit sign. Digits
/// are always decimal, leading zeros included.
pub fn parse_tracking_adjustment(reply: &str) -> Result<f64, ParseError> {
    let unexpected = || ParseError::UnexpectedReply {
        expected: "tracking adjustment (or+NNN)",
        reply: reply.to_string(),
    };

    let body = reply.strip_prefix("or").ok_or_else(unexpected)?;
    let (negative, digits) = match body.as_bytes().first() {
        Some(b'+') => (false, &body[1..]),
        Some(b'-') => (true, &body[1..]),
        _ => (false, body),
    };
    if digits.is_empty() || digits.len() > 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(unexpected());
    }

    let hundredths: i32 = digits.parse().map_err(|_| unexpected())?;
    let value = f64::from(hundredths) / 100.0;
    Ok(if negative { -value } else { value })
}

/// Guiding speeds of both axes, in percent of sidereal rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GuidingSpeeds {
    pub ra_percent: u8,
    pub dec_percent: u8,
}

impl GuidingSpeeds {
    /// Parse the reply to `:X22#` (`rrbdd`)
    pub fn parse(reply: &str) -> Result<Self, ParseError> {
        let unexpected = || ParseError::UnexpectedReply {
            expected: "guiding speeds (rrbdd)",
            reply: reply.to_string(),
        };

        let (ra, dec) = reply.split_once('b').ok_or_else(unexpected)?;
        let field = |s: &str| -> Result<u8, ParseError> {
            let s = s.trim();
            if s.is_empty() || s.len() > 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
                return Err(unexpected());
            }
            s.parse().map_err(|_| unexpected())
        };

        Ok(Self {
            ra_percent: field(ra)?,
            dec_percent: field(dec)?,
        })
    }

    /// RA guiding speed as a fraction of sidereal rate
    pub fn ra_fraction(&self) -> f64 {
        f64::from(self.ra_percent) / 100.0
    }

    /// DEC guiding speed as a fraction of sidereal rate
    pub fn dec_fraction(&self) -> f64 {
        f64::from(self.dec_percent) / 100.0
    }
}

/// Parse the reply to `:X48n#`: a two-character prefix, then an ahex field
pub fn parse_gear_ratio(reply: &str) -> Result<i32, ParseError> {
    let field = reply
        .get(2..2 + ahex::FIELD_WIDTH)
        .ok_or_else(|| ParseError::UnexpectedReply {
            expected: "gear ratio (prefix + 8 ahex digits)",
            reply: reply.to_string(),
        })?;
    ahex::decode(field)
}

/// Parse the reply to `:TTGMsn#`: an ahex field, optionally followed by an
/// axis suffix
pub fn parse_motor_steps(reply: &str) -> Result<i32, ParseError> {
    let field = reply
        .get(..ahex::FIELD_WIDTH)
        .ok_or_else(|| ParseError::UnexpectedReply {
            expected: "motor steps (8 ahex digits)",
            reply: reply.to_string(),
        })?;
    ahex::decode(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_adjustment() {
        assert_eq!(parse_tracking_adjustment("or+025").unwrap(), 0.25);
        assert_eq!(parse_tracking_adjustment("or-150").unwrap(), -1.5);
        assert_eq!(parse_tracking_adjustment("or+000").unwrap(), 0.0);
        assert_eq!(parse_tracking_adjustment("or500").unwrap(), 5.0);
    }

    #[test]
    fn test_tracking_adjustment_leading_zero_is_decimal() {
        // "010" is ten hundredths, not an octal eight
        assert_eq!(parse_tracking_adjustment("or+010").unwrap(), 0.1);
    }

    #[test]
    fn test_tracking_adjustment_rejects_garbage() {
        assert!(parse_tracking_adjustment("").is_err());
        assert!(parse_tracking_adjustment("or").is_err());
        assert!(parse_tracking_adjustment("or+").is_err());
        assert!(parse_tracking_adjustment("od+025").is_err());
        assert!(parse_tracking_adjustment("or+0x5").is_err());
    }

    #[test]
    fn test_guiding_speeds() {
        let speeds = GuidingSpeeds::parse("30b50").unwrap();
        assert_eq!(speeds.ra_percent, 30);
        assert_eq!(speeds.dec_percent, 50);
        assert!((speeds.ra_fraction() - 0.3).abs() < 1e-12);
        assert!((speeds.dec_fraction() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_guiding_speeds_rejects_garbage() {
        assert!(GuidingSpeeds::parse("3050").is_err());
        assert!(GuidingSpeeds::parse("b50").is_err());
        assert!(GuidingSpeeds::parse("30bxx").is_err());
    }

    #[test]
    fn test_gear_ratio() {
        assert_eq!(parse_gear_ratio("i:0000<3?0").unwrap(), 0x0000_C3F0);
        assert_eq!(parse_gear_ratio("r!00012<3?").unwrap(), 0x0001_2C3F);
        assert!(parse_gear_ratio("i:00").is_err());
    }

    #[test]
    fn test_motor_steps() {
        assert_eq!(parse_motor_steps("00000100r").unwrap(), 0x100);
        assert_eq!(parse_motor_steps("????????").unwrap(), -1);
        assert!(parse_motor_steps("0001").is_err());
    }
}
