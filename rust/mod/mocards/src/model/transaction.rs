use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Assigned,
    Reassigned,
    Activated,
    Suspended,
    Expired,
    PerkClaimed,
}

impl_str_enum!(TransactionType {
    Assigned => "assigned",
    Reassigned => "reassigned",
    Activated => "activated",
    Suspended => "suspended",
    Expired => "expired",
    PerkClaimed => "perk_claimed",
});

/// CardTransaction: append-only audit row written for every card movement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardTransaction {
    pub id: String,

    pub card_id: String,

    pub transaction_type: TransactionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinic_id: Option<String>,

    pub performed_by: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performed_by_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,
}
