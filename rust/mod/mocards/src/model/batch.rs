use serde::{Deserialize, Serialize};

/// Batch status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Active,
    Completed,
    Archived,
}

impl_str_enum!(BatchStatus {
    Active => "active",
    Completed => "completed",
    Archived => "archived",
});

impl Default for BatchStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// CardBatch: a group of cards generated together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardBatch {
    pub id: String,

    /// Human-readable unique number, e.g. "BATCH-007".
    pub batch_number: String,

    /// Number of cards the batch owns.
    pub total_cards: u32,

    /// Cards that have left the unassigned pool.
    #[serde(default)]
    pub cards_assigned: u32,

    #[serde(default)]
    pub status: BatchStatus,

    pub created_by: String,

    /// Location the cards were generated for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_counters_default() {
        let b: CardBatch = serde_json::from_value(serde_json::json!({
            "id": "b1",
            "batchNumber": "BATCH-001",
            "totalCards": 10,
            "createdBy": "admin",
        }))
        .unwrap();
        assert_eq!(b.cards_assigned, 0);
        assert_eq!(b.status, BatchStatus::Active);
        assert_eq!(b.status.to_string(), "active");
    }
}
