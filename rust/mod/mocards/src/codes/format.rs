//! Operator-configurable pieces of the legacy control number.

use serde::{Deserialize, Serialize};

/// Legacy control number layout: `{control_prefix}-{batch label}-{sequence}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeFormat {
    /// Three uppercase letters, e.g. "PHL".
    #[serde(default = "default_prefix")]
    pub control_prefix: String,

    /// Zero-padding width of the sequence part.
    #[serde(default = "default_sequence_width")]
    pub sequence_width: usize,
}

fn default_prefix() -> String {
    "PHL".into()
}

fn default_sequence_width() -> usize {
    4
}

impl Default for CodeFormat {
    fn default() -> Self {
        Self {
            control_prefix: default_prefix(),
            sequence_width: default_sequence_width(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("control prefix '{0}' must be exactly 3 uppercase ASCII letters")]
    Prefix(String),

    #[error("sequence width {0} must be between 4 and 8")]
    SequenceWidth(usize),
}

impl CodeFormat {
    pub fn validate(&self) -> Result<(), FormatError> {
        let p = &self.control_prefix;
        if p.len() != 3 || !p.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(FormatError::Prefix(p.clone()));
        }
        if !(4..=8).contains(&self.sequence_width) {
            return Err(FormatError::SequenceWidth(self.sequence_width));
        }
        Ok(())
    }

    /// Build a legacy control number candidate.
    pub fn control_number(&self, batch_label: &str, sequence: u32) -> String {
        format!(
            "{}-{}-{:0width$}",
            self.control_prefix,
            batch_label,
            sequence,
            width = self.sequence_width
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let f = CodeFormat::default();
        f.validate().unwrap();
        assert_eq!(f.control_number("B1", 1), "PHL-B1-0001");
        assert_eq!(f.control_number("B1", 12345), "PHL-B1-12345");
    }

    #[test]
    fn rejects_bad_prefix() {
        for p in ["PH", "PHLX", "phl", "P1L"] {
            let f = CodeFormat {
                control_prefix: p.into(),
                ..Default::default()
            };
            assert_eq!(f.validate(), Err(FormatError::Prefix(p.into())));
        }
    }

    #[test]
    fn rejects_bad_width() {
        let f = CodeFormat {
            sequence_width: 2,
            ..Default::default()
        };
        assert_eq!(f.validate(), Err(FormatError::SequenceWidth(2)));
    }

    #[test]
    fn missing_fields_fall_back() {
        let f: CodeFormat = serde_json::from_str(r#"{"controlPrefix":"MOC"}"#).unwrap();
        assert_eq!(f.sequence_width, 4);
        assert_eq!(f.control_number("X", 3), "MOC-X-0003");
    }
}
