use mocards_core::{new_id, now_rfc3339, ListParams, ListResult, ServiceError};
use mocards_sql::Value;

use crate::model::{AppointmentRequest, AppointmentStatus};
use super::CardService;

pub struct CreateAppointmentInput {
    pub clinic_id: String,
    pub control_number: Option<String>,
    pub patient_name: String,
    pub patient_phone: Option<String>,
    pub patient_email: Option<String>,
    pub preferred_date: String,
    pub preferred_time: Option<String>,
    pub service_type: String,
    pub notes: Option<String>,
}

#[derive(Debug, Default)]
pub struct AppointmentFilters {
    pub clinic_id: Option<String>,
    pub status: Option<AppointmentStatus>,
}

fn appointment_indexes(a: &AppointmentRequest) -> Vec<(&'static str, Value)> {
    vec![
        ("clinic_id", Value::Text(a.clinic_id.clone())),
        ("status", Value::Text(a.status.to_string())),
        ("create_at", Value::from(a.create_at.clone())),
        ("update_at", Value::from(a.update_at.clone())),
    ]
}

impl CardService {
    pub fn create_appointment(
        &self,
        input: CreateAppointmentInput,
    ) -> Result<AppointmentRequest, ServiceError> {
        if input.patient_name.trim().is_empty() {
            return Err(ServiceError::Validation("patient name is required".into()));
        }
        if chrono::NaiveDate::parse_from_str(&input.preferred_date, "%Y-%m-%d").is_err() {
            return Err(ServiceError::Validation(format!(
                "preferred date '{}' is not YYYY-MM-DD",
                input.preferred_date
            )));
        }
        let _clinic = self.get_clinic(&input.clinic_id)?;

        let now = now_rfc3339();
        let record = AppointmentRequest {
            id: new_id(),
            clinic_id: input.clinic_id,
            control_number: input.control_number.map(|c| c.trim().to_uppercase()),
            patient_name: input.patient_name,
            patient_phone: input.patient_phone,
            patient_email: input.patient_email,
            preferred_date: input.preferred_date,
            preferred_time: input.preferred_time,
            service_type: input.service_type,
            status: AppointmentStatus::Pending,
            notes: input.notes,
            create_at: Some(now.clone()),
            update_at: Some(now),
        };
        self.insert_record("appointments", &record.id, &record, &appointment_indexes(&record))?;
        Ok(record)
    }

    pub fn get_appointment(&self, id: &str) -> Result<AppointmentRequest, ServiceError> {
        self.get_record("appointments", id)
    }

    pub fn list_appointments(
        &self,
        params: &ListParams,
        filters: &AppointmentFilters,
    ) -> Result<ListResult<AppointmentRequest>, ServiceError> {
        let mut f: Vec<(&str, Value)> = Vec::new();
        if let Some(ref c) = filters.clinic_id {
            f.push(("clinic_id", Value::Text(c.clone())));
        }
        if let Some(s) = filters.status {
            f.push(("status", Value::Text(s.to_string())));
        }
        self.list_records("appointments", &f, params.limit.min(500), params.offset, "create_at DESC")
    }

    pub fn update_appointment_status(
        &self,
        id: &str,
        status: AppointmentStatus,
        notes: Option<String>,
    ) -> Result<AppointmentRequest, ServiceError> {
        let current = self.get_appointment(id)?;
        if !current.status.can_move_to(status) {
            return Err(ServiceError::Validation(format!(
                "appointment cannot move from {} to {}",
                current.status, status
            )));
        }

        let mut next = current.clone();
        next.status = status;
        if notes.is_some() {
            next.notes = notes;
        }
        next.update_at = Some(now_rfc3339());

        let moved = self.update_record_if(
            "appointments",
            id,
            &next,
            &appointment_indexes(&next),
            &[("status", Value::Text(current.status.to_string()))],
        )?;
        if !moved {
            return Err(ServiceError::Conflict(format!("appointment {} changed concurrently", id)));
        }
        Ok(next)
    }
}
