use serde::{Deserialize, Serialize};

/// ClinicMessage: a note from the admin desk (or a patient) to a clinic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClinicMessage {
    pub id: String,

    pub clinic_id: String,

    pub sender: String,

    pub subject: String,

    pub body: String,

    #[serde(default)]
    pub read: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_at: Option<String>,
}
