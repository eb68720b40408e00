use mocards_core::{new_id, now_rfc3339, ListParams, ListResult, ServiceError};
use mocards_sql::Value;

use crate::model::{Clinic, ClinicStatus};
use super::{CardError, CardService};

pub struct CreateClinicInput {
    pub clinic_code: String,
    pub clinic_number: u16,
    pub name: String,
    pub location_code: String,
    pub contact_person: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Default)]
pub struct ClinicFilters {
    pub status: Option<String>,
    pub location_code: Option<String>,
}

fn clinic_indexes(c: &Clinic) -> Vec<(&'static str, Value)> {
    vec![
        ("clinic_code", Value::Text(c.clinic_code.clone())),
        ("clinic_number", Value::Integer(c.clinic_number as i64)),
        ("location_code", Value::Text(c.location_code.clone())),
        ("status", Value::Text(c.status.to_string())),
        ("create_at", Value::from(c.create_at.clone())),
        ("update_at", Value::from(c.update_at.clone())),
    ]
}

fn validate_clinic_number(n: u16) -> Result<(), ServiceError> {
    if (1..=9999).contains(&n) {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!(
            "clinic number {} must be between 1 and 9999",
            n
        )))
    }
}

impl CardService {
    pub fn create_clinic(&self, input: CreateClinicInput) -> Result<Clinic, CardError> {
        if input.clinic_code.trim().is_empty() {
            return Err(ServiceError::Validation("clinic code is required".into()).into());
        }
        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation("clinic name is required".into()).into());
        }
        validate_clinic_number(input.clinic_number)?;
        let location = self.active_location(&input.location_code)?;

        let now = now_rfc3339();
        let record = Clinic {
            id: new_id(),
            clinic_code: input.clinic_code.trim().to_uppercase(),
            clinic_number: input.clinic_number,
            name: input.name,
            location_code: location.code,
            contact_person: input.contact_person,
            contact_email: input.contact_email,
            contact_phone: input.contact_phone,
            address: input.address,
            status: ClinicStatus::Active,
            create_at: Some(now.clone()),
            update_at: Some(now),
        };

        self.insert_record("clinics", &record.id, &record, &clinic_indexes(&record))
            .map_err(|e| match e {
                ServiceError::Conflict(_) => ServiceError::Conflict(format!(
                    "clinic code {} or number {} already in use",
                    record.clinic_code, record.clinic_number
                )),
                other => other,
            })?;

        tracing::info!(clinic = %record.clinic_code, number = record.clinic_number, "clinic created");
        Ok(record)
    }

    pub fn get_clinic(&self, id: &str) -> Result<Clinic, ServiceError> {
        self.get_record("clinics", id)
    }

    pub fn get_clinic_by_code(&self, code: &str) -> Result<Clinic, ServiceError> {
        let code = code.trim().to_uppercase();
        self.find_record_by("clinics", "clinic_code", Value::Text(code.clone()))?
            .ok_or_else(|| ServiceError::NotFound(format!("clinic {}", code)))
    }

    pub fn list_clinics(
        &self,
        params: &ListParams,
        filters: &ClinicFilters,
    ) -> Result<ListResult<Clinic>, ServiceError> {
        let mut f: Vec<(&str, Value)> = Vec::new();
        if let Some(ref s) = filters.status {
            f.push(("status", Value::Text(s.clone())));
        }
        if let Some(ref l) = filters.location_code {
            f.push(("location_code", Value::Text(l.clone())));
        }
        self.list_records("clinics", &f, params.limit.min(500), params.offset, "clinic_number ASC")
    }

    /// Merge-patch a clinic. The code and number stay unique; a new
    /// location must be active.
    pub fn update_clinic(&self, id: &str, patch: serde_json::Value) -> Result<Clinic, CardError> {
        let current = self.get_clinic(id)?;
        let mut updated: Clinic = Self::apply_patch(&current, patch)?;
        updated.clinic_code = updated.clinic_code.trim().to_uppercase();

        validate_clinic_number(updated.clinic_number)?;
        if updated.location_code != current.location_code {
            updated.location_code = self.active_location(&updated.location_code)?.code;
        }

        self.update_record("clinics", id, &updated, &clinic_indexes(&updated))?;
        Ok(updated)
    }

    pub fn deactivate_clinic(&self, id: &str) -> Result<Clinic, ServiceError> {
        let mut clinic = self.get_clinic(id)?;
        clinic.status = ClinicStatus::Inactive;
        clinic.update_at = Some(now_rfc3339());
        self.update_record("clinics", id, &clinic, &clinic_indexes(&clinic))?;
        tracing::info!(clinic = %clinic.clinic_code, "clinic deactivated");
        Ok(clinic)
    }

    /// A clinic that may still receive cards.
    pub(crate) fn active_clinic(&self, id: &str) -> Result<Clinic, ServiceError> {
        let clinic = self.get_clinic(id)?;
        if clinic.status != ClinicStatus::Active {
            return Err(ServiceError::Validation(format!(
                "clinic {} is inactive",
                clinic.clinic_code
            )));
        }
        Ok(clinic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing;

    #[test]
    fn create_requires_active_location() {
        let svc = testing::service();
        let res = svc.create_clinic(CreateClinicInput {
            clinic_code: "CVT001".into(),
            clinic_number: 1,
            name: "Cavite Dental".into(),
            location_code: "CVT".into(),
            contact_person: None,
            contact_email: None,
            contact_phone: None,
            address: None,
        });
        assert!(matches!(res, Err(CardError::InvalidLocationCode(_))));
    }

    #[test]
    fn code_lookup_is_case_insensitive() {
        let svc = testing::service();
        testing::location(&svc, "MNL", 1);
        let c = testing::clinic(&svc, "MNL001", 12, "MNL");
        assert_eq!(svc.get_clinic_by_code(" mnl001 ").unwrap().id, c.id);
    }

    #[test]
    fn number_and_code_unique() {
        let svc = testing::service();
        testing::location(&svc, "MNL", 1);
        testing::clinic(&svc, "MNL001", 12, "MNL");

        let again = |code: &str, number: u16| {
            svc.create_clinic(CreateClinicInput {
                clinic_code: code.into(),
                clinic_number: number,
                name: "x".into(),
                location_code: "MNL".into(),
                contact_person: None,
                contact_email: None,
                contact_phone: None,
                address: None,
            })
        };
        assert!(matches!(again("MNL002", 12), Err(CardError::Service(ServiceError::Conflict(_)))));
        assert!(matches!(again("MNL001", 13), Err(CardError::Service(ServiceError::Conflict(_)))));
        assert!(matches!(again("MNL003", 0), Err(CardError::Service(ServiceError::Validation(_)))));
    }

    #[test]
    fn update_patches_fields_and_keeps_id() {
        let svc = testing::service();
        testing::location(&svc, "MNL", 1);
        testing::location(&svc, "CEB", 2);
        let c = testing::clinic(&svc, "MNL001", 12, "MNL");

        let updated = svc
            .update_clinic(&c.id, serde_json::json!({"id": "hijack", "contactPhone": "0917", "locationCode": "CEB"}))
            .unwrap();
        assert_eq!(updated.id, c.id);
        assert_eq!(updated.contact_phone.as_deref(), Some("0917"));
        assert_eq!(svc.get_clinic(&c.id).unwrap().location_code, "CEB");

        let bad = svc.update_clinic(&c.id, serde_json::json!({"locationCode": "XXX"}));
        assert!(matches!(bad, Err(CardError::InvalidLocationCode(_))));
    }

    #[test]
    fn deactivate_filters_list() {
        let svc = testing::service();
        testing::location(&svc, "MNL", 1);
        let a = testing::clinic(&svc, "MNL001", 1, "MNL");
        testing::clinic(&svc, "MNL002", 2, "MNL");
        svc.deactivate_clinic(&a.id).unwrap();

        let active = svc
            .list_clinics(
                &ListParams::default(),
                &ClinicFilters { status: Some("active".into()), location_code: None },
            )
            .unwrap();
        assert_eq!(active.total, 1);
        assert_eq!(active.items[0].clinic_code, "MNL002");
        assert!(svc.active_clinic(&a.id).is_err());
    }
}
