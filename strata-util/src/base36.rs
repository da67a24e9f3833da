//! Signed base-36 integers, lowercase, as used in alpha chunk file names.

use thiserror::Error;

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Base36Error {
    #[error("Empty base-36 string")]
    Empty,
    #[error("Invalid base-36 string {0:?}")]
    Invalid(String),
}

pub fn encode(value: i64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut magnitude = value.unsigned_abs();
    let mut digits = Vec::with_capacity(14);
    while magnitude > 0 {
        digits.push(DIGITS[(magnitude % 36) as usize]);
        magnitude /= 36;
    }
    if value < 0 {
        digits.push(b'-');
    }
    digits.reverse();
    // Only ASCII digits were pushed
    digits.into_iter().map(char::from).collect()
}

pub fn decode(text: &str) -> Result<i64, Base36Error> {
    if text.is_empty() {
        return Err(Base36Error::Empty);
    }
    i64::from_str_radix(text, 36).map_err(|_| Base36Error::Invalid(text.to_string()))
}
