//! Card lookup and lifecycle.
//!
//! Every status change goes through [`CardService::transition_card`]: the
//! transition table is checked first, then the row is rewritten only while
//! it still holds the status (and clinic) the caller read. A lost race shows
//! up as zero affected rows, never as a double write.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use mocards_core::{format_rfc3339, new_id, now_rfc3339, ListParams, ListResult, ServiceError};
use mocards_sql::Value;

use crate::codes::CONTROL_NUMBER_RETRIES;
use crate::model::{Card, CardPerk, CardStatus, CardTransaction, Clinic, TransactionType};
use super::{CardError, CardService, CodeKind, VALIDITY_DAYS};

pub(crate) const CARD_COLUMNS: &[&str] = &[
    "batch_id",
    "clinic_id",
    "control_number",
    "control_number_v2",
    "passcode",
    "location_code",
    "status",
    "expires_at",
    "create_at",
    "update_at",
];

pub(crate) fn card_values(c: &Card) -> Vec<Value> {
    vec![
        Value::Text(c.batch_id.clone()),
        Value::from(c.clinic_id.clone()),
        Value::Text(c.control_number.clone()),
        Value::from(c.control_number_v2.clone()),
        Value::Text(c.passcode.clone()),
        Value::Text(c.location_code.clone()),
        Value::Text(c.status.to_string()),
        Value::from(c.expires_at.clone()),
        Value::from(c.create_at.clone()),
        Value::from(c.update_at.clone()),
    ]
}

fn card_indexes(c: &Card) -> Vec<(&'static str, Value)> {
    CARD_COLUMNS.iter().copied().zip(card_values(c)).collect()
}

#[derive(Debug, Default)]
pub struct CardFilters {
    pub batch_id: Option<String>,
    pub clinic_id: Option<String>,
    pub status: Option<CardStatus>,
    pub location_code: Option<String>,
}

/// A card with its perks, as shown on lookup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    pub card: Card,
    pub perks: Vec<CardPerk>,
}

/// Outcome of a bulk assignment.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResult {
    pub assigned: Vec<Card>,
    /// Ids that were missing or no longer unassigned.
    pub skipped: Vec<String>,
}

impl CardService {
    pub fn get_card(&self, id: &str) -> Result<Card, ServiceError> {
        self.get_record("cards", id)
    }

    pub fn list_cards(
        &self,
        params: &ListParams,
        filters: &CardFilters,
    ) -> Result<ListResult<Card>, ServiceError> {
        let mut f: Vec<(&str, Value)> = Vec::new();
        if let Some(ref b) = filters.batch_id {
            f.push(("batch_id", Value::Text(b.clone())));
        }
        if let Some(ref c) = filters.clinic_id {
            f.push(("clinic_id", Value::Text(c.clone())));
        }
        if let Some(s) = filters.status {
            f.push(("status", Value::Text(s.to_string())));
        }
        if let Some(ref l) = filters.location_code {
            f.push(("location_code", Value::Text(l.clone())));
        }
        self.list_records("cards", &f, params.limit.min(500), params.offset, "control_number ASC")
    }

    /// Find a card by legacy control number, V2 control number or passcode.
    pub fn lookup_card(&self, code: &str) -> Result<CardDetails, ServiceError> {
        let code = code.trim().to_uppercase();
        if code.is_empty() {
            return Err(ServiceError::Validation("lookup code is required".into()));
        }

        for column in ["control_number", "control_number_v2", "passcode"] {
            if let Some(card) = self.find_record_by::<Card>("cards", column, Value::Text(code.clone()))? {
                let perks = self.list_perks(&card.id)?;
                return Ok(CardDetails { card, perks });
            }
        }
        Err(ServiceError::NotFound(format!("card {}", code)))
    }

    /// Hand unassigned cards to a clinic, minting a V2 number for each.
    ///
    /// Missing cards and cards that are no longer unassigned are skipped.
    pub fn assign_cards_to_clinic(
        &self,
        card_ids: &[String],
        clinic_id: &str,
        performed_by: &str,
    ) -> Result<AssignmentResult, CardError> {
        let clinic = self.active_clinic(clinic_id)?;
        let region = self.get_location(&clinic.location_code)?.region_number;
        let mut cursor = self.next_v2_card_number(&clinic.id)?;
        let mut result = AssignmentResult::default();

        for card_id in card_ids {
            let card = match self.get_card(card_id) {
                Ok(c) if c.status == CardStatus::Unassigned => c,
                Ok(c) => {
                    debug!(card = %c.control_number, status = %c.status, "not unassigned, skipping");
                    result.skipped.push(card_id.clone());
                    continue;
                }
                Err(ServiceError::NotFound(_)) => {
                    result.skipped.push(card_id.clone());
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let Some(placed) = self.place_card(&card, &clinic, region, &mut cursor)? else {
                result.skipped.push(card_id.clone());
                continue;
            };

            self.log_transaction(
                &placed.id,
                TransactionType::Assigned,
                Some(&clinic.id),
                performed_by,
                None,
                None,
            )?;
            if let Err(e) = self.record_assignment(&placed.batch_id) {
                warn!(
                    batch = %placed.batch_id,
                    card = %placed.control_number,
                    "batch counter not updated: {e}"
                );
            }
            result.assigned.push(placed);
        }

        info!(
            clinic = %clinic.clinic_code,
            assigned = result.assigned.len(),
            skipped = result.skipped.len(),
            "cards assigned"
        );
        Ok(result)
    }

    /// Move an assigned card to another clinic under a fresh V2 number.
    pub fn reassign_card(
        &self,
        card_id: &str,
        clinic_id: &str,
        performed_by: &str,
    ) -> Result<Card, CardError> {
        let card = self.get_card(card_id)?;
        if card.status != CardStatus::Assigned {
            return Err(CardError::InvalidTransition {
                card_id: card.id,
                from: card.status,
                to: CardStatus::Assigned,
            });
        }
        if card.clinic_id.as_deref() == Some(clinic_id) {
            return Err(ServiceError::Validation(format!(
                "card {} is already held by clinic {}",
                card.control_number, clinic_id
            ))
            .into());
        }

        let clinic = self.active_clinic(clinic_id)?;
        let region = self.get_location(&clinic.location_code)?.region_number;
        let mut cursor = self.next_v2_card_number(&clinic.id)?;

        let placed = self
            .place_card(&card, &clinic, region, &mut cursor)?
            .ok_or(CardError::InvalidTransition {
                card_id: card.id.clone(),
                from: card.status,
                to: CardStatus::Assigned,
            })?;

        self.log_transaction(
            &placed.id,
            TransactionType::Reassigned,
            Some(&clinic.id),
            performed_by,
            None,
            card.clinic_id.as_deref().map(|from| format!("from clinic {from}")).as_deref(),
        )?;
        info!(card = %placed.control_number, clinic = %clinic.clinic_code, "card reassigned");
        Ok(placed)
    }

    /// Activate a card at the clinic that holds it. Validity runs
    /// [`VALIDITY_DAYS`] from now.
    pub fn activate_card(
        &self,
        card_id: &str,
        clinic_id: &str,
        activated_by: &str,
        activated_by_name: Option<&str>,
    ) -> Result<Card, CardError> {
        let card = self.get_card(card_id)?;
        if card.status != CardStatus::Assigned || card.clinic_id.as_deref() != Some(clinic_id) {
            return Err(CardError::NotAssignedToClinic {
                card_id: card.id,
                clinic_id: clinic_id.to_string(),
            });
        }

        let now = Utc::now();
        let ts = format_rfc3339(now);
        let mut next = card.clone();
        next.status = CardStatus::Activated;
        next.activated_at = Some(ts.clone());
        next.activated_by = Some(activated_by.to_string());
        next.activated_by_name = activated_by_name.map(String::from);
        next.expires_at = Some(format_rfc3339(now + Duration::days(VALIDITY_DAYS)));
        next.update_at = Some(ts);

        if !self.transition_card(&card, &next)? {
            return Err(self.lost_race(&card, CardStatus::Activated));
        }

        self.log_transaction(
            &card.id,
            TransactionType::Activated,
            Some(clinic_id),
            activated_by,
            activated_by_name,
            None,
        )?;
        info!(card = %card.control_number, "card activated");
        Ok(next)
    }

    /// Suspend a card from any state except suspended.
    pub fn suspend_card(
        &self,
        card_id: &str,
        performed_by: &str,
        reason: Option<&str>,
    ) -> Result<Card, CardError> {
        let card = self.get_card(card_id)?;
        let mut next = card.clone();
        next.status = CardStatus::Suspended;
        next.update_at = Some(now_rfc3339());

        if !self.transition_card(&card, &next)? {
            return Err(self.lost_race(&card, CardStatus::Suspended));
        }

        self.log_transaction(
            &card.id,
            TransactionType::Suspended,
            card.clinic_id.as_deref(),
            performed_by,
            None,
            reason,
        )?;
        warn!(card = %card.control_number, "card suspended");
        Ok(next)
    }

    /// Expire every activated card whose validity ended at or before `now`.
    /// Returns the ids that were expired by this call.
    pub fn expire_due_cards(&self, now: DateTime<Utc>) -> Result<Vec<String>, CardError> {
        let due: Vec<Card> = self.select_records(
            "cards",
            "status = ?1 AND expires_at <= ?2",
            &[
                Value::Text(CardStatus::Activated.to_string()),
                Value::Text(format_rfc3339(now)),
            ],
            "expires_at ASC",
        )?;

        let mut expired = Vec::with_capacity(due.len());
        for card in due {
            let mut next = card.clone();
            next.status = CardStatus::Expired;
            next.update_at = Some(now_rfc3339());
            if !self.transition_card(&card, &next)? {
                continue;
            }
            self.log_transaction(
                &card.id,
                TransactionType::Expired,
                card.clinic_id.as_deref(),
                "system",
                None,
                None,
            )?;
            expired.push(card.id);
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "cards expired");
        }
        Ok(expired)
    }

    /// Audit trail of a card, oldest first.
    pub fn list_card_transactions(&self, card_id: &str) -> Result<Vec<CardTransaction>, ServiceError> {
        self.select_records(
            "card_transactions",
            "card_id = ?1",
            &[Value::Text(card_id.to_string())],
            "create_at ASC, rowid ASC",
        )
    }

    pub(crate) fn log_transaction(
        &self,
        card_id: &str,
        transaction_type: TransactionType,
        clinic_id: Option<&str>,
        performed_by: &str,
        performed_by_name: Option<&str>,
        notes: Option<&str>,
    ) -> Result<CardTransaction, ServiceError> {
        let record = CardTransaction {
            id: new_id(),
            card_id: card_id.to_string(),
            transaction_type,
            clinic_id: clinic_id.map(String::from),
            performed_by: performed_by.to_string(),
            performed_by_name: performed_by_name.map(String::from),
            notes: notes.map(String::from),
            create_at: Some(now_rfc3339()),
        };
        self.insert_record(
            "card_transactions",
            &record.id,
            &record,
            &[
                ("card_id", Value::Text(record.card_id.clone())),
                ("transaction_type", Value::Text(transaction_type.to_string())),
                ("clinic_id", Value::from(record.clinic_id.clone())),
                ("create_at", Value::from(record.create_at.clone())),
            ],
        )?;
        Ok(record)
    }

    // ── internals ──

    /// Rewrite `current` as `next` if the transition is allowed and the row
    /// still holds the status and clinic `current` was read with.
    ///
    /// `Ok(false)` means another writer got there first.
    pub(crate) fn transition_card(&self, current: &Card, next: &Card) -> Result<bool, CardError> {
        if !current.status.can_transition_to(next.status) {
            return Err(CardError::InvalidTransition {
                card_id: current.id.clone(),
                from: current.status,
                to: next.status,
            });
        }

        let mut guards = vec![("status", Value::Text(current.status.to_string()))];
        if let Some(ref clinic) = current.clinic_id {
            guards.push(("clinic_id", Value::Text(clinic.clone())));
        }
        Ok(self.update_record_if("cards", &current.id, next, &card_indexes(next), &guards)?)
    }

    /// Put a card in `clinic`'s hands under the next free V2 number.
    /// `cursor` is the next card number to try and moves past every
    /// number used or found taken.
    fn place_card(
        &self,
        card: &Card,
        clinic: &Clinic,
        region: u8,
        cursor: &mut u32,
    ) -> Result<Option<Card>, CardError> {
        let start = *cursor;
        for _ in 0..CONTROL_NUMBER_RETRIES {
            let (v2, used) =
                self.probe_control_number_v2(region, clinic.clinic_number, *cursor, CONTROL_NUMBER_RETRIES)?;
            *cursor = used + 1;

            let now = now_rfc3339();
            let mut next = card.clone();
            next.status = CardStatus::Assigned;
            next.clinic_id = Some(clinic.id.clone());
            next.control_number_v2 = Some(v2);
            next.assigned_at = Some(now.clone());
            next.update_at = Some(now);

            match self.transition_card(card, &next) {
                Ok(true) => return Ok(Some(next)),
                Ok(false) => return Ok(None),
                Err(CardError::Service(ServiceError::Conflict(msg))) => {
                    debug!(card = %card.control_number, "V2 number raced: {msg}");
                }
                Err(e) => return Err(e),
            }
        }

        Err(CardError::GenerationExhausted {
            kind: CodeKind::ControlNumberV2,
            label: clinic.clinic_code.clone(),
            start: Some(start),
            attempts: CONTROL_NUMBER_RETRIES,
        })
    }

    /// Error for a guarded write that matched no row, reporting the status
    /// the card holds now.
    fn lost_race(&self, card: &Card, to: CardStatus) -> CardError {
        let from = self.get_card(&card.id).map(|c| c.status).unwrap_or(card.status);
        CardError::InvalidTransition {
            card_id: card.id.clone(),
            from,
            to,
        }
    }
}
