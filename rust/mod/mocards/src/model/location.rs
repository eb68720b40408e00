use serde::{Deserialize, Serialize};

/// LocationCode: a geographic region code used in passcodes and V2
/// control numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationCode {
    pub id: String,

    /// Three uppercase alphanumerics, e.g. "MNL".
    pub code: String,

    /// Two-digit region number (1..=99).
    pub region_number: u8,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "default_active")]
    pub is_active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_at: Option<String>,
}

fn default_active() -> bool {
    true
}
