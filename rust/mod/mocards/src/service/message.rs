use mocards_core::{new_id, now_rfc3339, ListParams, ListResult, ServiceError};
use mocards_sql::Value;

use crate::model::ClinicMessage;
use super::CardService;

pub struct SendMessageInput {
    pub clinic_id: String,
    pub sender: String,
    pub subject: String,
    pub body: String,
}

fn message_indexes(m: &ClinicMessage) -> Vec<(&'static str, Value)> {
    vec![
        ("clinic_id", Value::Text(m.clinic_id.clone())),
        ("is_read", Value::from(m.read)),
        ("create_at", Value::from(m.create_at.clone())),
        ("update_at", Value::from(m.update_at.clone())),
    ]
}

impl CardService {
    pub fn send_message(&self, input: SendMessageInput) -> Result<ClinicMessage, ServiceError> {
        if input.subject.trim().is_empty() && input.body.trim().is_empty() {
            return Err(ServiceError::Validation("message is empty".into()));
        }
        let _clinic = self.get_clinic(&input.clinic_id)?;

        let now = now_rfc3339();
        let record = ClinicMessage {
            id: new_id(),
            clinic_id: input.clinic_id,
            sender: input.sender,
            subject: input.subject,
            body: input.body,
            read: false,
            create_at: Some(now.clone()),
            update_at: Some(now),
        };
        self.insert_record("clinic_messages", &record.id, &record, &message_indexes(&record))?;
        Ok(record)
    }

    pub fn list_messages(
        &self,
        clinic_id: &str,
        params: &ListParams,
        unread_only: bool,
    ) -> Result<ListResult<ClinicMessage>, ServiceError> {
        let mut f: Vec<(&str, Value)> = vec![("clinic_id", Value::Text(clinic_id.to_string()))];
        if unread_only {
            f.push(("is_read", Value::from(false)));
        }
        self.list_records("clinic_messages", &f, params.limit.min(500), params.offset, "create_at DESC")
    }

    pub fn mark_message_read(&self, id: &str) -> Result<ClinicMessage, ServiceError> {
        let mut msg: ClinicMessage = self.get_record("clinic_messages", id)?;
        if msg.read {
            return Ok(msg);
        }
        msg.read = true;
        msg.update_at = Some(now_rfc3339());
        self.update_record("clinic_messages", id, &msg, &message_indexes(&msg))?;
        Ok(msg)
    }
}
