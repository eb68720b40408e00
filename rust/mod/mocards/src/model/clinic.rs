use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClinicStatus {
    Active,
    Inactive,
}

impl_str_enum!(ClinicStatus {
    Active => "active",
    Inactive => "inactive",
});

impl Default for ClinicStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// Clinic: a partner clinic that receives and activates cards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Clinic {
    pub id: String,

    /// Unique login/reference code, e.g. "CVT001".
    pub clinic_code: String,

    /// Unique number (1..=9999) embedded in V2 control numbers.
    pub clinic_number: u16,

    pub name: String,

    pub location_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_person: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default)]
    pub status: ClinicStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_at: Option<String>,
}
