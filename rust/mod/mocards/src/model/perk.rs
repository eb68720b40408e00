use serde::{Deserialize, Serialize};

/// Redeemable benefit bundled with every card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerkType {
    Consultation,
    Cleaning,
    Xray,
    Extraction,
    Filling,
}

impl_str_enum!(PerkType {
    Consultation => "consultation",
    Cleaning => "cleaning",
    Xray => "xray",
    Extraction => "extraction",
    Filling => "filling",
});

impl PerkType {
    /// The default perk set created with each card, in creation order.
    pub const ALL: [PerkType; 5] = [
        PerkType::Consultation,
        PerkType::Cleaning,
        PerkType::Xray,
        PerkType::Extraction,
        PerkType::Filling,
    ];

    /// Default monetary value (PHP).
    pub fn default_value(self) -> u32 {
        match self {
            PerkType::Consultation => 500,
            PerkType::Cleaning => 800,
            PerkType::Xray => 1000,
            PerkType::Extraction => 1500,
            PerkType::Filling => 1200,
        }
    }
}

/// CardPerk: one claimable perk row. `claimed` flips once and stays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardPerk {
    pub id: String,

    pub card_id: String,

    pub perk_type: PerkType,

    pub perk_value: u32,

    #[serde(default)]
    pub claimed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by_clinic: Option<String>,

    pub expires_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let values: Vec<u32> = PerkType::ALL.iter().map(|p| p.default_value()).collect();
        assert_eq!(values, vec![500, 800, 1000, 1500, 1200]);
    }

    #[test]
    fn xray_is_one_word() {
        assert_eq!(serde_json::to_value(PerkType::Xray).unwrap(), "xray");
        assert_eq!("xray".parse::<PerkType>(), Ok(PerkType::Xray));
    }
}
