use chrono::Utc;

use mocards_core::{new_id, now_rfc3339, parse_rfc3339, ServiceError};
use mocards_sql::Value;

use crate::model::{CardPerk, CardStatus, PerkType, TransactionType};
use super::{CardError, CardService};

const PERK_COLUMNS: &[&str] = &["card_id", "perk_type", "claimed", "create_at", "update_at"];

fn perk_values(p: &CardPerk, update_at: &str) -> Vec<Value> {
    vec![
        Value::Text(p.card_id.clone()),
        Value::Text(p.perk_type.to_string()),
        Value::from(p.claimed),
        Value::from(p.create_at.clone()),
        Value::Text(update_at.to_string()),
    ]
}

impl CardService {
    /// Write the default perk set for a card, all or nothing.
    pub fn create_default_perks(
        &self,
        card_id: &str,
        expires_at: &str,
    ) -> Result<Vec<CardPerk>, ServiceError> {
        let now = now_rfc3339();
        let perks: Vec<CardPerk> = PerkType::ALL
            .iter()
            .map(|&perk_type| CardPerk {
                id: new_id(),
                card_id: card_id.to_string(),
                perk_type,
                perk_value: perk_type.default_value(),
                claimed: false,
                claimed_at: None,
                claimed_by_clinic: None,
                expires_at: expires_at.to_string(),
                create_at: Some(now.clone()),
            })
            .collect();

        let rows: Vec<(&str, &CardPerk, Vec<Value>)> = perks
            .iter()
            .map(|p| (p.id.as_str(), p, perk_values(p, &now)))
            .collect();
        self.insert_records("card_perks", PERK_COLUMNS, &rows)?;
        Ok(perks)
    }

    /// Perks of a card in creation order.
    pub fn list_perks(&self, card_id: &str) -> Result<Vec<CardPerk>, ServiceError> {
        self.select_records(
            "card_perks",
            "card_id = ?1",
            &[Value::Text(card_id.to_string())],
            "rowid ASC",
        )
    }

    /// Redeem a perk at the clinic holding its card.
    pub fn claim_perk(
        &self,
        perk_id: &str,
        clinic_id: &str,
        claimed_by: &str,
    ) -> Result<CardPerk, CardError> {
        let perk: CardPerk = self.get_record("card_perks", perk_id)?;
        let card = self.get_card(&perk.card_id)?;

        let unavailable = |reason: &str| CardError::PerkUnavailable {
            perk_id: perk_id.to_string(),
            reason: reason.to_string(),
        };

        if card.clinic_id.as_deref() != Some(clinic_id) {
            return Err(CardError::NotAssignedToClinic {
                card_id: card.id,
                clinic_id: clinic_id.to_string(),
            });
        }
        if card.status != CardStatus::Activated {
            return Err(unavailable(&format!("card is {}", card.status)));
        }
        if perk.claimed {
            return Err(unavailable("already claimed"));
        }
        let now = Utc::now();
        if parse_rfc3339(&perk.expires_at).is_some_and(|exp| exp <= now) {
            return Err(unavailable("perk expired"));
        }

        let ts = now_rfc3339();
        let mut claimed = perk.clone();
        claimed.claimed = true;
        claimed.claimed_at = Some(ts.clone());
        claimed.claimed_by_clinic = Some(clinic_id.to_string());

        let won = self.update_record_if(
            "card_perks",
            perk_id,
            &claimed,
            &[("claimed", Value::from(true)), ("update_at", Value::Text(ts))],
            &[("claimed", Value::from(false))],
        )?;
        if !won {
            return Err(unavailable("already claimed"));
        }

        self.log_transaction(
            &card.id,
            TransactionType::PerkClaimed,
            Some(clinic_id),
            claimed_by,
            None,
            Some(&format!("{} perk claimed", perk.perk_type)),
        )?;
        tracing::info!(card = %card.control_number, perk = %perk.perk_type, "perk claimed");
        Ok(claimed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing;

    #[test]
    fn claim_flow() {
        let svc = testing::service();
        let (card, clinic) = testing::activated_card(&svc);
        let perks = svc.list_perks(&card.id).unwrap();
        assert_eq!(perks.len(), 5);

        let claimed = svc.claim_perk(&perks[0].id, &clinic.id, "frontdesk").unwrap();
        assert!(claimed.claimed);
        assert_eq!(claimed.claimed_by_clinic.as_deref(), Some(clinic.id.as_str()));

        let again = svc.claim_perk(&perks[0].id, &clinic.id, "frontdesk");
        assert!(matches!(again, Err(CardError::PerkUnavailable { .. })));

        let history = svc.list_card_transactions(&card.id).unwrap();
        assert_eq!(history.last().unwrap().transaction_type, TransactionType::PerkClaimed);
    }

    #[test]
    fn other_clinic_cannot_claim() {
        let svc = testing::service();
        let (card, _) = testing::activated_card(&svc);
        let other = testing::clinic(&svc, "MNL099", 99, "MNL");
        let perks = svc.list_perks(&card.id).unwrap();
        assert!(matches!(
            svc.claim_perk(&perks[1].id, &other.id, "frontdesk"),
            Err(CardError::NotAssignedToClinic { .. })
        ));
        assert!(!svc.list_perks(&card.id).unwrap()[1].claimed);
    }

    #[test]
    fn unactivated_card_cannot_claim() {
        let svc = testing::service();
        let (card, clinic) = testing::assigned_card(&svc);
        let perks = svc.list_perks(&card.id).unwrap();
        assert!(matches!(
            svc.claim_perk(&perks[0].id, &clinic.id, "frontdesk"),
            Err(CardError::PerkUnavailable { .. })
        ));
    }

    #[test]
    fn expired_perk_cannot_claim() {
        let svc = testing::service();
        let (card, clinic) = testing::activated_card(&svc);
        let perks = svc.list_perks(&card.id).unwrap();
        svc.sql
            .exec(
                "UPDATE card_perks SET data = json_set(data, '$.expiresAt', '2000-01-01T00:00:00.000Z') WHERE id = ?1",
                &[Value::Text(perks[0].id.clone())],
            )
            .unwrap();
        let err = svc.claim_perk(&perks[0].id, &clinic.id, "frontdesk").unwrap_err();
        assert!(matches!(err, CardError::PerkUnavailable { ref reason, .. } if reason == "perk expired"));
    }
}
