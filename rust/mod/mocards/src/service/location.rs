use mocards_core::{new_id, now_rfc3339, ListParams, ListResult, ServiceError};
use mocards_sql::Value;

use crate::codes::validate_location_code;
use crate::model::LocationCode;
use super::{CardError, CardService};

pub struct CreateLocationInput {
    pub code: String,
    pub region_number: u8,
    pub name: String,
    pub description: Option<String>,
}

fn location_indexes(loc: &LocationCode) -> Vec<(&'static str, Value)> {
    vec![
        ("code", Value::Text(loc.code.clone())),
        ("region_number", Value::Integer(loc.region_number as i64)),
        ("is_active", Value::from(loc.is_active)),
        ("create_at", Value::from(loc.create_at.clone())),
        ("update_at", Value::from(loc.update_at.clone())),
    ]
}

impl CardService {
    pub fn create_location(&self, input: CreateLocationInput) -> Result<LocationCode, ServiceError> {
        validate_location_code(&input.code).map_err(|e| ServiceError::Validation(e.to_string()))?;
        if !(1..=99).contains(&input.region_number) {
            return Err(ServiceError::Validation(format!(
                "region number {} must be between 1 and 99",
                input.region_number
            )));
        }
        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation("location name is required".into()));
        }

        let now = now_rfc3339();
        let record = LocationCode {
            id: new_id(),
            code: input.code,
            region_number: input.region_number,
            name: input.name,
            description: input.description,
            is_active: true,
            create_at: Some(now.clone()),
            update_at: Some(now),
        };

        self.insert_record("location_codes", &record.id, &record, &location_indexes(&record))
            .map_err(|e| match e {
                ServiceError::Conflict(_) => ServiceError::Conflict(format!(
                    "location {} or region {} already exists",
                    record.code, record.region_number
                )),
                other => other,
            })?;

        tracing::info!(code = %record.code, region = record.region_number, "location created");
        Ok(record)
    }

    pub fn get_location(&self, code: &str) -> Result<LocationCode, ServiceError> {
        self.find_record_by("location_codes", "code", Value::Text(code.to_string()))?
            .ok_or_else(|| ServiceError::NotFound(format!("location {}", code)))
    }

    pub fn list_locations(
        &self,
        params: &ListParams,
        active_only: bool,
    ) -> Result<ListResult<LocationCode>, ServiceError> {
        let mut f: Vec<(&str, Value)> = Vec::new();
        if active_only {
            f.push(("is_active", Value::from(true)));
        }
        self.list_records("location_codes", &f, params.limit.min(500), params.offset, "code ASC")
    }

    pub fn deactivate_location(&self, code: &str) -> Result<LocationCode, ServiceError> {
        let mut loc = self.get_location(code)?;
        loc.is_active = false;
        loc.update_at = Some(now_rfc3339());
        self.update_record("location_codes", &loc.id, &loc, &location_indexes(&loc))?;
        tracing::info!(code = %loc.code, "location deactivated");
        Ok(loc)
    }

    /// Resolve a location that cards may still be issued for.
    pub(crate) fn active_location(&self, code: &str) -> Result<LocationCode, CardError> {
        match self.get_location(code) {
            Ok(loc) if loc.is_active => Ok(loc),
            Ok(_) | Err(ServiceError::NotFound(_)) => {
                Err(CardError::InvalidLocationCode(code.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
