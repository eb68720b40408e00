//! Card code generation: control numbers, passcodes, batch numbers, and
//! bulk card creation.
//!
//! Every generator probes the store for its candidate and retries a fixed
//! number of times. The probe is only a fast path: the UNIQUE constraints on
//! `cards` and `card_batches` decide, and a rejected insert is handled as a
//! collision.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use mocards_core::{format_rfc3339, new_id, now_rfc3339, ServiceError};
use mocards_sql::Value;

use crate::codes::{
    fallback_batch_number, format_batch_number, validate_location_code, CodeFormat,
    ControlNumberV2, Passcode, CONTROL_NUMBER_RETRIES, MAX_BATCH_SEQUENCE, MAX_CARDS_PER_BATCH,
    PASSCODE_RETRIES,
};
use crate::model::{Card, CardStatus, GenerationMethod};
use super::card::{card_values, CARD_COLUMNS};
use super::{store_error, CardError, CardService, CodeKind, VALIDITY_DAYS};

/// Attempts at the atomic bulk insert before giving up.
const BULK_INSERT_ATTEMPTS: u32 = 3;

/// Result of a batch generation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCards {
    /// Every card that was persisted, in sequence order.
    pub cards: Vec<Card>,

    /// Cards whose default perks could not be written.
    pub cards_missing_perks: Vec<String>,
}

impl CardService {
    /// Produce a free legacy control number, starting at `sequence` and
    /// bumping it on every collision, at most `max_retries` attempts.
    pub fn generate_control_number(
        &self,
        batch_label: &str,
        sequence: u32,
        max_retries: u32,
    ) -> Result<String, CardError> {
        let format = self.get_code_format()?;
        self.probe_control_number(&format, batch_label, sequence, max_retries)
            .map(|(candidate, _)| candidate)
    }

    /// Produce a free passcode for `location_code` using the thread RNG.
    pub fn generate_passcode(
        &self,
        location_code: &str,
        max_retries: u32,
    ) -> Result<String, CardError> {
        self.generate_passcode_with(
            location_code,
            max_retries,
            &HashSet::new(),
            &mut rand::thread_rng(),
        )
    }

    /// Like [`generate_passcode`](Self::generate_passcode) with an explicit
    /// random source, also skipping candidates already `reserved` by the
    /// caller but not yet persisted.
    pub fn generate_passcode_with<R: Rng + ?Sized>(
        &self,
        location_code: &str,
        max_retries: u32,
        reserved: &HashSet<String>,
        rng: &mut R,
    ) -> Result<String, CardError> {
        validate_location_code(location_code)
            .map_err(|_| CardError::InvalidLocationCode(location_code.to_string()))?;

        let attempts = max_retries.max(1);
        for _ in 0..attempts {
            let candidate = Passcode::random(location_code, rng).to_string();
            if reserved.contains(&candidate) {
                continue;
            }
            if !self.exists_by("cards", "passcode", &candidate)? {
                return Ok(candidate);
            }
            debug!("passcode {candidate} taken, drawing again");
        }

        Err(CardError::GenerationExhausted {
            kind: CodeKind::Passcode,
            label: location_code.to_string(),
            start: None,
            attempts,
        })
    }

    /// Generate `count` unassigned cards for a batch, each with its default
    /// perks.
    pub fn generate_cards_for_batch(
        &self,
        batch_id: &str,
        batch_label: &str,
        location_code: &str,
        count: u32,
    ) -> Result<GeneratedCards, CardError> {
        self.generate_cards_for_batch_with(
            batch_id,
            batch_label,
            location_code,
            count,
            &mut rand::thread_rng(),
        )
    }

    pub fn generate_cards_for_batch_with<R: Rng + ?Sized>(
        &self,
        batch_id: &str,
        batch_label: &str,
        location_code: &str,
        count: u32,
        rng: &mut R,
    ) -> Result<GeneratedCards, CardError> {
        if count == 0 || count > MAX_CARDS_PER_BATCH {
            return Err(CardError::InvalidCount(count));
        }
        let location = self.active_location(location_code)?;
        let batch = self.get_batch(batch_id)?;
        let format = self.get_code_format()?;

        // Sequences continue after whatever the batch already owns.
        let existing = self.count_records("cards", &[("batch_id", batch_id.into())])? as u32;

        let mut attempt = 0;
        let cards = loop {
            attempt += 1;
            let cards =
                self.build_cards(&format, batch_id, batch_label, &location.code, existing, count, rng)?;
            match self.insert_cards(&cards) {
                Ok(()) => break cards,
                Err(ServiceError::Conflict(msg)) if attempt < BULK_INSERT_ATTEMPTS => {
                    warn!(
                        batch = %batch.batch_number,
                        attempt,
                        "bulk card insert hit a unique constraint, regenerating: {msg}"
                    );
                }
                Err(ServiceError::Conflict(msg)) => {
                    warn!(batch = %batch.batch_number, "giving up after {attempt} bulk inserts: {msg}");
                    return Err(CardError::GenerationExhausted {
                        kind: CodeKind::ControlNumber,
                        label: batch_label.to_string(),
                        start: Some(existing + 1),
                        attempts: attempt,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        };

        let perk_expiry = format_rfc3339(Utc::now() + Duration::days(VALIDITY_DAYS));
        let mut cards_missing_perks = Vec::new();
        for card in &cards {
            if let Err(e) = self.create_default_perks(&card.id, &perk_expiry) {
                warn!(card_id = %card.id, "default perks not created: {e}");
                cards_missing_perks.push(card.id.clone());
            }
        }

        self.refresh_batch_total(batch_id)?;

        info!(
            batch = %batch.batch_number,
            location = %location.code,
            created = cards.len(),
            missing_perks = cards_missing_perks.len(),
            "generated cards"
        );

        Ok(GeneratedCards {
            cards,
            cards_missing_perks,
        })
    }

    /// Pick the next batch number: the lowest free `BATCH-nnn` after the
    /// current batch count, or a `BTH` timestamp number once those run out.
    pub fn next_batch_number(&self) -> Result<String, CardError> {
        let count = self.count_records("card_batches", &[])? as u32;
        for seq in (count + 1)..=MAX_BATCH_SEQUENCE {
            if let Some(candidate) = format_batch_number(seq) {
                if !self.exists_by("card_batches", "batch_number", &candidate)? {
                    return Ok(candidate);
                }
            }
        }

        let now = Utc::now().timestamp_millis();
        for i in 0..CONTROL_NUMBER_RETRIES {
            let candidate = fallback_batch_number(now + i as i64);
            if !self.exists_by("card_batches", "batch_number", &candidate)? {
                return Ok(candidate);
            }
        }

        Err(CardError::GenerationExhausted {
            kind: CodeKind::BatchNumber,
            label: "BTH".into(),
            start: None,
            attempts: CONTROL_NUMBER_RETRIES,
        })
    }

    // ── internals ──

    /// Returns the free candidate and the sequence it was built from.
    pub(crate) fn probe_control_number(
        &self,
        format: &CodeFormat,
        batch_label: &str,
        start: u32,
        max_retries: u32,
    ) -> Result<(String, u32), CardError> {
        let attempts = max_retries.max(1);
        for offset in 0..attempts {
            let seq = start.saturating_add(offset);
            let candidate = format.control_number(batch_label, seq);
            if !self.exists_by("cards", "control_number", &candidate)? {
                return Ok((candidate, seq));
            }
            debug!("control number {candidate} taken, bumping sequence");
        }

        Err(CardError::GenerationExhausted {
            kind: CodeKind::ControlNumber,
            label: batch_label.to_string(),
            start: Some(start),
            attempts,
        })
    }

    /// Returns the free V2 number and the card number it was built from.
    pub(crate) fn probe_control_number_v2(
        &self,
        region: u8,
        clinic_number: u16,
        start: u32,
        max_retries: u32,
    ) -> Result<(String, u32), CardError> {
        let attempts = max_retries.max(1);
        let exhausted = || CardError::GenerationExhausted {
            kind: CodeKind::ControlNumberV2,
            label: format!("{:02}-{:04}", region, clinic_number),
            start: Some(start),
            attempts,
        };

        for offset in 0..attempts {
            let card_no = start.saturating_add(offset);
            let Some(v2) = ControlNumberV2::new(region, clinic_number, card_no) else {
                return Err(exhausted());
            };
            let candidate = v2.to_string();
            if !self.exists_by("cards", "control_number_v2", &candidate)? {
                return Ok((candidate, card_no));
            }
            debug!("V2 control number {candidate} taken, bumping card number");
        }
        Err(exhausted())
    }

    /// First V2 card number to try for a clinic.
    pub(crate) fn next_v2_card_number(&self, clinic_id: &str) -> Result<u32, CardError> {
        let rows = self
            .sql
            .query(
                "SELECT COUNT(*) AS cnt FROM cards WHERE clinic_id = ?1 AND control_number_v2 IS NOT NULL",
                &[Value::Text(clinic_id.to_string())],
            )
            .map_err(store_error)?;
        let taken = rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0);
        Ok(taken as u32 + 1)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_cards<R: Rng + ?Sized>(
        &self,
        format: &CodeFormat,
        batch_id: &str,
        batch_label: &str,
        location_code: &str,
        existing: u32,
        count: u32,
        rng: &mut R,
    ) -> Result<Vec<Card>, CardError> {
        let now = now_rfc3339();
        let mut cards = Vec::with_capacity(count as usize);
        let mut reserved = HashSet::with_capacity(count as usize);
        let mut next_seq = existing + 1;

        for _ in 0..count {
            let (control_number, used) =
                self.probe_control_number(format, batch_label, next_seq, CONTROL_NUMBER_RETRIES)?;
            next_seq = used + 1;

            let passcode =
                self.generate_passcode_with(location_code, PASSCODE_RETRIES, &reserved, rng)?;
            reserved.insert(passcode.clone());

            cards.push(Card {
                id: new_id(),
                batch_id: batch_id.to_string(),
                clinic_id: None,
                control_number,
                control_number_v2: None,
                passcode,
                location_code: location_code.to_string(),
                status: CardStatus::Unassigned,
                generation_method: GenerationMethod::Auto,
                assigned_at: None,
                activated_at: None,
                activated_by: None,
                activated_by_name: None,
                expires_at: None,
                create_at: Some(now.clone()),
                update_at: Some(now.clone()),
            });
        }

        Ok(cards)
    }

    fn insert_cards(&self, cards: &[Card]) -> Result<(), ServiceError> {
        let rows: Vec<(&str, &Card, Vec<Value>)> = cards
            .iter()
            .map(|c| (c.id.as_str(), c, card_values(c)))
            .collect();
        self.insert_records("cards", CARD_COLUMNS, &rows)?;
        Ok(())
    }
}
