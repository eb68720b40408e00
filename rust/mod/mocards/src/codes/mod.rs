//! Card code formats: control numbers, passcodes and batch numbers.
//!
//! Everything here is pure string work. Uniqueness is the service's job:
//! it probes the store for each candidate and the UNIQUE constraints on
//! `cards` have the final word.
//!
//! ```rust
//! use mocards::codes::{CodeFormat, ControlNumber, ControlNumberV2, Passcode};
//!
//! let format = CodeFormat::default();
//! let cn = format.control_number("BATCH-001", 7);
//! assert_eq!(cn, "PHL-BATCH-001-0007");
//! assert_eq!(cn.parse::<ControlNumber>().unwrap().sequence, 7);
//!
//! let v2 = ControlNumberV2 { region: 1, clinic: 12, card: 3 };
//! assert_eq!(v2.to_string(), "MOC-01-0012-00003");
//!
//! let pc: Passcode = "MNL-4821".parse().unwrap();
//! assert_eq!(pc.location, "MNL");
//! ```

pub mod batch_number;
pub mod control_number;
pub mod format;
pub mod passcode;

pub use batch_number::{fallback_batch_number, format_batch_number, MAX_BATCH_SEQUENCE};
pub use control_number::{ControlNumber, ControlNumberV2, V2_PREFIX};
pub use format::{CodeFormat, FormatError};
pub use passcode::{validate_location_code, Passcode, PASSCODE_MAX, PASSCODE_MIN};

/// Attempts for a legacy or V2 control number before giving up.
pub const CONTROL_NUMBER_RETRIES: u32 = 5;

/// Attempts for a passcode before giving up.
pub const PASSCODE_RETRIES: u32 = 3;

/// Hard ceiling on cards generated in one call.
///
/// A location has only 9,000 passcodes (`PASSCODE_MIN..=PASSCODE_MAX`) and
/// each draw gets [`PASSCODE_RETRIES`] attempts, so batches approaching this
/// ceiling for a single location are likely to fail with
/// `GenerationExhausted` well before the passcode space is used up.
pub const MAX_CARDS_PER_BATCH: u32 = 10_000;

/// Errors from parsing a code string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    #[error("'{0}' is not a valid control number")]
    ControlNumber(String),

    #[error("'{0}' is not a valid V2 control number")]
    ControlNumberV2(String),

    #[error("'{0}' is not a valid passcode")]
    Passcode(String),

    #[error("location code '{0}' must be 3 uppercase letters or digits")]
    LocationCode(String),
}
