use serde::Serialize;

use mocards_core::{now_rfc3339, new_id, ListParams, ListResult, ServiceError};
use mocards_sql::Value;

use crate::codes::MAX_CARDS_PER_BATCH;
use crate::model::{BatchStatus, CardBatch};
use super::generator::GeneratedCards;
use super::{CardError, CardService};

/// Attempts at a counter update that lost a race with another writer.
const COUNTER_RETRIES: u32 = 5;

pub struct CreateBatchInput {
    pub created_by: String,
    pub total_cards: u32,
    pub location_code: Option<String>,
    pub notes: Option<String>,
    /// Explicit batch number; one is picked when absent.
    pub batch_number: Option<String>,
}

pub struct CreateBatchWithCardsInput {
    pub created_by: String,
    pub location_code: String,
    pub count: u32,
    pub notes: Option<String>,
    pub batch_number: Option<String>,
}

/// A new batch together with the cards generated for it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchWithCards {
    pub batch: CardBatch,
    #[serde(flatten)]
    pub generated: GeneratedCards,
}

fn batch_indexes(b: &CardBatch) -> Vec<(&'static str, Value)> {
    vec![
        ("batch_number", Value::Text(b.batch_number.clone())),
        ("total_cards", Value::Integer(b.total_cards as i64)),
        ("cards_assigned", Value::Integer(b.cards_assigned as i64)),
        ("status", Value::Text(b.status.to_string())),
        ("create_at", Value::from(b.create_at.clone())),
        ("update_at", Value::from(b.update_at.clone())),
    ]
}

impl CardService {
    pub fn create_batch(&self, input: CreateBatchInput) -> Result<CardBatch, CardError> {
        if input.created_by.trim().is_empty() {
            return Err(ServiceError::Validation("createdBy is required".into()).into());
        }
        let batch_number = match input.batch_number {
            Some(n) if !n.trim().is_empty() => n.trim().to_uppercase(),
            _ => self.next_batch_number()?,
        };

        let now = now_rfc3339();
        let record = CardBatch {
            id: new_id(),
            batch_number,
            total_cards: input.total_cards,
            cards_assigned: 0,
            status: BatchStatus::Active,
            created_by: input.created_by,
            location_code: input.location_code,
            notes: input.notes,
            create_at: Some(now.clone()),
            update_at: Some(now),
        };

        self.insert_record("card_batches", &record.id, &record, &batch_indexes(&record))
            .map_err(|e| match e {
                ServiceError::Conflict(_) => ServiceError::Conflict(format!(
                    "batch number {} already exists",
                    record.batch_number
                )),
                other => other,
            })?;

        tracing::info!(batch = %record.batch_number, "batch created");
        Ok(record)
    }

    /// Create a batch and generate its cards in one call.
    ///
    /// The count and location are checked before the batch row is written.
    pub fn create_batch_with_cards(
        &self,
        input: CreateBatchWithCardsInput,
    ) -> Result<BatchWithCards, CardError> {
        if input.count == 0 || input.count > MAX_CARDS_PER_BATCH {
            return Err(CardError::InvalidCount(input.count));
        }
        let location = self.active_location(&input.location_code)?;

        let batch = self.create_batch(CreateBatchInput {
            created_by: input.created_by,
            total_cards: 0,
            location_code: Some(location.code.clone()),
            notes: input.notes,
            batch_number: input.batch_number,
        })?;

        let generated = self
            .generate_cards_for_batch(&batch.id, &batch.batch_number, &location.code, input.count)
            .inspect_err(|e| {
                tracing::warn!(batch = %batch.batch_number, "card generation failed, batch left empty: {e}")
            })?;

        Ok(BatchWithCards {
            batch: self.get_batch(&batch.id)?,
            generated,
        })
    }

    pub fn get_batch(&self, id: &str) -> Result<CardBatch, ServiceError> {
        self.get_record("card_batches", id)
    }

    pub fn list_batches(
        &self,
        params: &ListParams,
        status: Option<BatchStatus>,
    ) -> Result<ListResult<CardBatch>, ServiceError> {
        let mut f: Vec<(&str, Value)> = Vec::new();
        if let Some(s) = status {
            f.push(("status", Value::Text(s.to_string())));
        }
        self.list_records("card_batches", &f, params.limit.min(500), params.offset, "create_at DESC")
    }

    pub fn archive_batch(&self, id: &str) -> Result<CardBatch, ServiceError> {
        self.update_batch_counters(id, |b| b.status = BatchStatus::Archived)
    }

    /// Set `total_cards` to the number of cards the batch owns.
    pub(crate) fn refresh_batch_total(&self, id: &str) -> Result<CardBatch, ServiceError> {
        let owned = self.count_records("cards", &[("batch_id", Value::Text(id.to_string()))])? as u32;
        self.update_batch_counters(id, |b| {
            b.total_cards = owned;
            settle_status(b);
        })
    }

    /// Count one more card out of the unassigned pool.
    pub(crate) fn record_assignment(&self, id: &str) -> Result<CardBatch, ServiceError> {
        self.update_batch_counters(id, |b| {
            b.cards_assigned += 1;
            settle_status(b);
        })
    }

    /// Read-modify-write on a batch, retried while another writer moves
    /// `cards_assigned` or `total_cards` underneath.
    fn update_batch_counters(
        &self,
        id: &str,
        mut apply: impl FnMut(&mut CardBatch),
    ) -> Result<CardBatch, ServiceError> {
        for _ in 0..COUNTER_RETRIES {
            let current = self.get_batch(id)?;
            let mut next = current.clone();
            apply(&mut next);
            next.update_at = Some(now_rfc3339());

            let guards = [
                ("cards_assigned", Value::Integer(current.cards_assigned as i64)),
                ("total_cards", Value::Integer(current.total_cards as i64)),
                ("status", Value::Text(current.status.to_string())),
            ];
            if self.update_record_if("card_batches", id, &next, &batch_indexes(&next), &guards)? {
                return Ok(next);
            }
            tracing::debug!(batch = %current.batch_number, "batch counters moved, retrying");
        }
        Err(ServiceError::Conflict(format!("batch {} is being updated concurrently", id)))
    }
}

/// Completed once every owned card has left the pool; archived batches stay
/// archived.
fn settle_status(b: &mut CardBatch) {
    if b.status == BatchStatus::Archived {
        return;
    }
    b.status = if b.total_cards > 0 && b.cards_assigned >= b.total_cards {
        BatchStatus::Completed
    } else {
        BatchStatus::Active
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing;

    fn input(number: Option<&str>) -> CreateBatchInput {
        CreateBatchInput {
            created_by: "admin".into(),
            total_cards: 0,
            location_code: None,
            notes: None,
            batch_number: number.map(String::from),
        }
    }

    #[test]
    fn auto_numbers_in_sequence() {
        let svc = testing::service();
        let a = svc.create_batch(input(None)).unwrap();
        let b = svc.create_batch(input(None)).unwrap();
        assert_eq!(a.batch_number, "BATCH-001");
        assert_eq!(b.batch_number, "BATCH-002");
        assert_eq!(a.status, BatchStatus::Active);
    }

    #[test]
    fn explicit_duplicate_number_conflicts() {
        let svc = testing::service();
        svc.create_batch(input(Some("spring"))).unwrap();
        let err = svc.create_batch(input(Some("SPRING"))).unwrap_err();
        assert!(matches!(err, CardError::Service(ServiceError::Conflict(_))));
    }

    #[test]
    fn with_cards_validates_before_creating_batch() {
        let svc = testing::service();
        testing::location(&svc, "MNL", 1);

        let bad_count = svc.create_batch_with_cards(CreateBatchWithCardsInput {
            created_by: "admin".into(),
            location_code: "MNL".into(),
            count: 10_001,
            notes: None,
            batch_number: None,
        });
        assert!(matches!(bad_count, Err(CardError::InvalidCount(10_001))));

        let bad_location = svc.create_batch_with_cards(CreateBatchWithCardsInput {
            created_by: "admin".into(),
            location_code: "ZZZ".into(),
            count: 5,
            notes: None,
            batch_number: None,
        });
        assert!(matches!(bad_location, Err(CardError::InvalidLocationCode(_))));

        assert_eq!(svc.count_records("card_batches", &[]).unwrap(), 0);
    }

    #[test]
    fn with_cards_fills_totals() {
        let svc = testing::service();
        testing::location(&svc, "MNL", 1);
        let out = svc
            .create_batch_with_cards(CreateBatchWithCardsInput {
                created_by: "admin".into(),
                location_code: "MNL".into(),
                count: 4,
                notes: Some("launch".into()),
                batch_number: None,
            })
            .unwrap();
        assert_eq!(out.batch.batch_number, "BATCH-001");
        assert_eq!(out.batch.total_cards, 4);
        assert_eq!(out.batch.location_code.as_deref(), Some("MNL"));
        assert_eq!(out.generated.cards.len(), 4);
        assert_eq!(out.generated.cards[0].control_number, "PHL-BATCH-001-0001");
    }

    #[test]
    fn completes_when_every_card_assigned() {
        let svc = testing::service();
        let b = svc.create_batch(input(None)).unwrap();
        svc.update_batch_counters(&b.id, |b| b.total_cards = 2).unwrap();

        assert_eq!(svc.record_assignment(&b.id).unwrap().status, BatchStatus::Active);
        let done = svc.record_assignment(&b.id).unwrap();
        assert_eq!(done.cards_assigned, 2);
        assert_eq!(done.status, BatchStatus::Completed);
    }

    #[test]
    fn archive_sticks_and_filters() {
        let svc = testing::service();
        let a = svc.create_batch(input(None)).unwrap();
        svc.create_batch(input(None)).unwrap();
        svc.archive_batch(&a.id).unwrap();
        svc.record_assignment(&a.id).unwrap();
        assert_eq!(svc.get_batch(&a.id).unwrap().status, BatchStatus::Archived);

        let archived = svc
            .list_batches(&ListParams::default(), Some(BatchStatus::Archived))
            .unwrap();
        assert_eq!(archived.total, 1);
        assert_eq!(svc.list_batches(&ListParams::default(), None).unwrap().total, 2);
    }
}
