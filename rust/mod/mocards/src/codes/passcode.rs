//! Passcodes: `{location code}-{4 random digits}`.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use super::CodeError;

pub const PASSCODE_MIN: u16 = 1000;
pub const PASSCODE_MAX: u16 = 9999;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passcode {
    pub location: String,
    pub number: u16,
}

impl Passcode {
    /// Draw a fresh passcode for `location`.
    pub fn random<R: Rng + ?Sized>(location: &str, rng: &mut R) -> Self {
        Self {
            location: location.to_string(),
            number: rng.gen_range(PASSCODE_MIN..=PASSCODE_MAX),
        }
    }
}

impl fmt::Display for Passcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:04}", self.location, self.number)
    }
}

impl FromStr for Passcode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || CodeError::Passcode(s.to_string());
        let (location, number) = s.split_once('-').ok_or_else(err)?;
        validate_location_code(location).map_err(|_| err())?;
        if number.len() != 4 || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        Ok(Self {
            location: location.to_string(),
            number: number.parse().map_err(|_| err())?,
        })
    }
}

/// Location codes are exactly three uppercase ASCII letters or digits.
pub fn validate_location_code(code: &str) -> Result<(), CodeError> {
    let ok = code.len() == 3
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(CodeError::LocationCode(code.to_string()))
    }
}
