//! Keyed configuration rows: text labels, free-form system settings and the
//! control number format.

use mocards_core::{now_rfc3339, ServiceError};
use mocards_sql::Value;

use crate::codes::CodeFormat;
use crate::model::{SystemSetting, TextLabel};
use super::CardService;

const CODE_FORMAT_ID: &str = "default";

impl CardService {
    // ── Text labels ──

    pub fn upsert_label(
        &self,
        key: &str,
        value: &str,
        category: Option<&str>,
    ) -> Result<TextLabel, ServiceError> {
        if key.trim().is_empty() {
            return Err(ServiceError::Validation("label key is required".into()));
        }
        let label = TextLabel {
            key: key.to_string(),
            value: value.to_string(),
            category: category.map(String::from),
            update_at: Some(now_rfc3339()),
        };
        self.upsert_record(
            "text_labels",
            key,
            &label,
            &[("category", Value::from(label.category.clone()))],
        )?;
        Ok(label)
    }

    pub fn get_label(&self, key: &str) -> Result<TextLabel, ServiceError> {
        self.get_record("text_labels", key)
    }

    pub fn list_labels(&self, category: Option<&str>) -> Result<Vec<TextLabel>, ServiceError> {
        match category {
            Some(c) => self.select_records("text_labels", "category = ?1", &[Value::from(c)], "id ASC"),
            None => self.select_records("text_labels", "1 = 1", &[], "id ASC"),
        }
    }

    pub fn delete_label(&self, key: &str) -> Result<(), ServiceError> {
        self.delete_record("text_labels", key)
    }

    // ── System settings ──

    pub fn get_setting(&self, key: &str) -> Result<SystemSetting, ServiceError> {
        self.get_record("system_config", key)
    }

    pub fn set_setting(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> Result<SystemSetting, ServiceError> {
        if key.trim().is_empty() {
            return Err(ServiceError::Validation("setting key is required".into()));
        }
        let setting = SystemSetting {
            key: key.to_string(),
            value,
            update_at: Some(now_rfc3339()),
        };
        self.upsert_record("system_config", key, &setting, &[])?;
        Ok(setting)
    }

    pub fn list_settings(&self) -> Result<Vec<SystemSetting>, ServiceError> {
        self.select_records("system_config", "1 = 1", &[], "id ASC")
    }

    // ── Code format ──

    /// The stored control number format, or the built-in default.
    pub fn get_code_format(&self) -> Result<CodeFormat, ServiceError> {
        Ok(self
            .find_record_by("code_formats", "id", Value::from(CODE_FORMAT_ID))?
            .unwrap_or_default())
    }

    pub fn set_code_format(&self, format: &CodeFormat) -> Result<CodeFormat, ServiceError> {
        format
            .validate()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;
        self.upsert_record("code_formats", CODE_FORMAT_ID, format, &[])?;
        tracing::info!(prefix = %format.control_prefix, width = format.sequence_width, "code format updated");
        Ok(format.clone())
    }

    /// Store `format` unless an operator already saved one. Returns the
    /// format in effect.
    pub fn seed_code_format(&self, format: &CodeFormat) -> Result<CodeFormat, ServiceError> {
        if self.exists_by("code_formats", "id", CODE_FORMAT_ID)? {
            return self.get_code_format();
        }
        self.set_code_format(format)
    }
}
