//! "ahex" numeric fields
//!
//! Motor step positions and gear ratios travel as fixed-width, 8-character
//! fields in which every character carries 4 bits: its value is the character
//! code minus `'0'`. This is base 16, but digits 10..=15 are `':'..='?'` rather
//! than `'A'..='F'`.
//!
//! ```text
//! 0x0001_2C3F  ->  "00012<3?"
//! ```
//!
//! Decoded values at or above 2^31 wrap to negative numbers, as the
//! controller stores these fields as signed 32-bit integers.

use crate::error::ParseError;

/// Width of an ahex field in characters
pub const FIELD_WIDTH: usize = 8;

const DIGIT_BASE: u8 = b'0';

/// Encode a 32-bit value as an 8-character ahex field, most significant first
pub fn encode(value: u32) -> String {
    (0..FIELD_WIDTH)
        .rev()
        .map(|nibble| {
            let shift = nibble * 4;
            char::from(((value >> shift) & 0xF) as u8 + DIGIT_BASE)
        })
        .collect()
}

/// Encode a signed value using its two's-complement bit pattern
pub fn encode_signed(value: i32) -> String {
    encode(value as u32)
}

/// Decode an 8-character ahex field
pub fn decode(field: &str) -> Result<i32, ParseError> {
    if field.len() != FIELD_WIDTH {
        return Err(ParseError::InvalidAhexLength(field.len()));
    }

    let mut value: u32 = 0;
    for c in field.chars() {
        let digit = (c as u32)
            .checked_sub(DIGIT_BASE as u32)
            .filter(|d| *d <= 0xF)
            .ok_or(ParseError::InvalidAhexDigit(c))?;
        value = (value << 4) | digit;
    }

    Ok(value as i32)
}
