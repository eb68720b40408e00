//! Control number parsing.
//!
//! Two formats coexist on printed cards:
//!
//! - legacy: `PHL-BATCH-001-0001` (prefix, batch label, sequence). The batch
//!   label may itself contain `-`, so the prefix is the first segment and the
//!   sequence is the last one.
//! - V2: `MOC-01-0012-00003` (region, clinic number, card number), minted
//!   when a card reaches a clinic.

use std::fmt;
use std::str::FromStr;

use super::CodeError;

pub const V2_PREFIX: &str = "MOC";

/// A parsed legacy control number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlNumber {
    pub prefix: String,
    pub batch_label: String,
    pub sequence: u32,
}

impl FromStr for ControlNumber {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || CodeError::ControlNumber(s.to_string());

        let (prefix, rest) = s.split_once('-').ok_or_else(err)?;
        let (label, seq) = rest.rsplit_once('-').ok_or_else(err)?;

        if prefix.len() != 3 || !prefix.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(err());
        }
        if label.is_empty() || seq.len() < 4 || !seq.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }

        Ok(Self {
            prefix: prefix.to_string(),
            batch_label: label.to_string(),
            sequence: seq.parse().map_err(|_| err())?,
        })
    }
}

/// A V2 control number: `MOC-{region:02}-{clinic:04}-{card:05}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlNumberV2 {
    pub region: u8,
    pub clinic: u16,
    pub card: u32,
}

impl ControlNumberV2 {
    pub const MAX_REGION: u8 = 99;
    pub const MAX_CLINIC: u16 = 9999;
    pub const MAX_CARD: u32 = 99_999;

    /// Build a V2 number, rejecting parts that would not fit their width.
    pub fn new(region: u8, clinic: u16, card: u32) -> Option<Self> {
        let fits = (1..=Self::MAX_REGION).contains(&region)
            && (1..=Self::MAX_CLINIC).contains(&clinic)
            && (1..=Self::MAX_CARD).contains(&card);
        fits.then_some(Self {
            region,
            clinic,
            card,
        })
    }
}

impl fmt::Display for ControlNumberV2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}-{:04}-{:05}",
            V2_PREFIX, self.region, self.clinic, self.card
        )
    }
}

impl FromStr for ControlNumberV2 {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || CodeError::ControlNumberV2(s.to_string());

        let parts: Vec<&str> = s.split('-').collect();
        let [prefix, region, clinic, card] = parts.as_slice() else {
            return Err(err());
        };
        if *prefix != V2_PREFIX || region.len() != 2 || clinic.len() != 4 || card.len() != 5 {
            return Err(err());
        }
        let digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if !digits(*region) || !digits(*clinic) || !digits(*card) {
            return Err(err());
        }

        Self::new(
            region.parse().map_err(|_| err())?,
            clinic.parse().map_err(|_| err())?,
            card.parse().map_err(|_| err())?,
        )
        .ok_or_else(err)
    }
}
