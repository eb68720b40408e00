use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl_str_enum!(AppointmentStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl Default for AppointmentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl AppointmentStatus {
    pub fn can_move_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Approved, Completed)
                | (Approved, Cancelled)
        )
    }
}

/// AppointmentRequest: a patient asking a clinic for a slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub id: String,

    pub clinic_id: String,

    /// Card the patient presents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_number: Option<String>,

    pub patient_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_email: Option<String>,

    /// Requested date, "YYYY-MM-DD".
    pub preferred_date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_time: Option<String>,

    pub service_type: String,

    #[serde(default)]
    pub status: AppointmentStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::AppointmentStatus::*;

    #[test]
    fn terminal_states_stay_put() {
        for s in [Rejected, Completed, Cancelled] {
            for next in [Pending, Approved, Rejected, Completed, Cancelled] {
                assert!(!s.can_move_to(next));
            }
        }
        assert!(Pending.can_move_to(Approved));
        assert!(!Pending.can_move_to(Completed));
    }
}
