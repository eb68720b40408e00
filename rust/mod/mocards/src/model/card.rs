use serde::{Deserialize, Serialize};

/// Card lifecycle status.
///
/// `unassigned → assigned → activated → expired`, with `suspended`
/// reachable from every other state. Nothing goes back to `unassigned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Unassigned,
    Assigned,
    Activated,
    Expired,
    Suspended,
}

impl_str_enum!(CardStatus {
    Unassigned => "unassigned",
    Assigned => "assigned",
    Activated => "activated",
    Expired => "expired",
    Suspended => "suspended",
});

impl Default for CardStatus {
    fn default() -> Self {
        Self::Unassigned
    }
}

impl CardStatus {
    /// The single transition table every card write goes through.
    ///
    /// `assigned → assigned` is a clinic reassignment.
    pub fn can_transition_to(self, next: CardStatus) -> bool {
        use CardStatus::*;
        match (self, next) {
            (Unassigned, Assigned) => true,
            (Assigned, Assigned) => true,
            (Assigned, Activated) => true,
            (Activated, Expired) => true,
            (Suspended, Suspended) => false,
            (_, Suspended) => true,
            _ => false,
        }
    }
}

/// How the card's codes were produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMethod {
    #[default]
    Auto,
    Manual,
}

/// Card: one printed perk card. Created unassigned by batch generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,

    /// Owning batch.
    pub batch_id: String,

    /// Clinic currently holding the card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinic_id: Option<String>,

    /// Legacy control number, e.g. "PHL-BATCH-001-0001".
    pub control_number: String,

    /// V2 control number, minted when the card reaches a clinic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_number_v2: Option<String>,

    /// Patient-side lookup code, e.g. "MNL-4821".
    pub passcode: String,

    pub location_code: String,

    #[serde(default)]
    pub status: CardStatus,

    #[serde(default)]
    pub generation_method: GenerationMethod,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_by_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use CardStatus::*;

    #[test]
    fn forward_transitions_only() {
        assert!(Unassigned.can_transition_to(Assigned));
        assert!(Assigned.can_transition_to(Activated));
        assert!(Activated.can_transition_to(Expired));

        assert!(!Unassigned.can_transition_to(Activated));
        assert!(!Activated.can_transition_to(Assigned));
        assert!(!Expired.can_transition_to(Activated));
        for s in [Assigned, Activated, Expired, Suspended] {
            assert!(!s.can_transition_to(Unassigned), "{s} must not return to unassigned");
        }
    }

    #[test]
    fn suspension_from_any_live_state() {
        for s in [Unassigned, Assigned, Activated, Expired] {
            assert!(s.can_transition_to(Suspended));
        }
        assert!(!Suspended.can_transition_to(Suspended));
    }

    #[test]
    fn status_strings_match_serde() {
        for s in [Unassigned, Assigned, Activated, Expired, Suspended] {
            let json = serde_json::to_value(s).unwrap();
            assert_eq!(json.as_str(), Some(s.as_str()));
            assert_eq!(s.as_str().parse::<CardStatus>(), Ok(s));
        }
        assert!("lost".parse::<CardStatus>().is_err());
    }

    #[test]
    fn card_json_uses_camel_case() {
        let card = Card {
            id: "c1".into(),
            batch_id: "b1".into(),
            clinic_id: None,
            control_number: "PHL-B1-0001".into(),
            control_number_v2: None,
            passcode: "MNL-1234".into(),
            location_code: "MNL".into(),
            status: Unassigned,
            generation_method: GenerationMethod::Auto,
            assigned_at: None,
            activated_at: None,
            activated_by: None,
            activated_by_name: None,
            expires_at: None,
            create_at: None,
            update_at: None,
        };
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["controlNumber"], "PHL-B1-0001");
        assert_eq!(json["generationMethod"], "auto");
        assert!(json.get("clinicId").is_none());
    }
}
