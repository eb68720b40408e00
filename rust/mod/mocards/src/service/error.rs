use std::fmt;

use axum::http::StatusCode;
use mocards_core::ServiceError;

use crate::model::CardStatus;

/// Which code ran out of candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    ControlNumber,
    ControlNumberV2,
    Passcode,
    BatchNumber,
}

impl fmt::Display for CodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CodeKind::ControlNumber => "control number",
            CodeKind::ControlNumberV2 => "V2 control number",
            CodeKind::Passcode => "passcode",
            CodeKind::BatchNumber => "batch number",
        })
    }
}

/// Card domain errors. Store failures ride along in [`CardError::Service`]
/// with the backend message untouched.
#[derive(Debug, thiserror::Error)]
pub enum CardError {
    #[error("{kind} generation exhausted for '{label}' after {attempts} attempts{}", starting_at(.start))]
    GenerationExhausted {
        kind: CodeKind,
        /// Batch label, location code or clinic the code was built from.
        label: String,
        start: Option<u32>,
        attempts: u32,
    },

    #[error("location code '{0}' does not exist or is inactive")]
    InvalidLocationCode(String),

    #[error("card {card_id} is not assigned to clinic {clinic_id}")]
    NotAssignedToClinic { card_id: String, clinic_id: String },

    #[error("card count {0} must be between 1 and {max}", max = crate::codes::MAX_CARDS_PER_BATCH)]
    InvalidCount(u32),

    #[error("card {card_id} cannot move from {from} to {to}")]
    InvalidTransition {
        card_id: String,
        from: CardStatus,
        to: CardStatus,
    },

    #[error("perk {perk_id} cannot be claimed: {reason}")]
    PerkUnavailable { perk_id: String, reason: String },

    #[error(transparent)]
    Service(#[from] ServiceError),
}

fn starting_at(start: &Option<u32>) -> String {
    start
        .map(|s| format!(" (starting sequence {s})"))
        .unwrap_or_default()
}

impl CardError {
    pub fn error_code(&self) -> &'static str {
        match self {
            CardError::GenerationExhausted { .. } => "GENERATION_EXHAUSTED",
            CardError::InvalidLocationCode(_) => "INVALID_LOCATION_CODE",
            CardError::NotAssignedToClinic { .. } => "NOT_ASSIGNED_TO_CLINIC",
            CardError::InvalidCount(_) => "INVALID_COUNT",
            CardError::InvalidTransition { .. } => "INVALID_TRANSITION",
            CardError::PerkUnavailable { .. } => "PERK_UNAVAILABLE",
            CardError::Service(e) => e.error_code(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CardError::InvalidLocationCode(_) | CardError::InvalidCount(_) => {
                StatusCode::BAD_REQUEST
            }
            CardError::GenerationExhausted { .. }
            | CardError::NotAssignedToClinic { .. }
            | CardError::InvalidTransition { .. }
            | CardError::PerkUnavailable { .. } => StatusCode::CONFLICT,
            CardError::Service(e) => e.status_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_message_names_batch_and_start() {
        let e = CardError::GenerationExhausted {
            kind: CodeKind::ControlNumber,
            label: "BATCH-001".into(),
            start: Some(17),
            attempts: 5,
        };
        assert_eq!(
            e.to_string(),
            "control number generation exhausted for 'BATCH-001' after 5 attempts (starting sequence 17)"
        );

        let e = CardError::GenerationExhausted {
            kind: CodeKind::Passcode,
            label: "MNL".into(),
            start: None,
            attempts: 3,
        };
        assert_eq!(e.to_string(), "passcode generation exhausted for 'MNL' after 3 attempts");
    }

    #[test]
    fn store_errors_pass_through() {
        let e: CardError = ServiceError::Storage("disk I/O error".into()).into();
        assert_eq!(e.to_string(), "disk I/O error");
        assert_eq!(e.error_code(), "STORAGE_ERROR");
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn count_message_carries_ceiling() {
        assert_eq!(
            CardError::InvalidCount(10_001).to_string(),
            "card count 10001 must be between 1 and 10000"
        );
    }
}
