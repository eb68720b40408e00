//! Server configuration, read from a TOML file.
//!
//! ```toml
//! [storage]
//! data_dir = "/var/lib/mocards"
//!
//! [generator]
//! control_prefix = "PHL"
//! sequence_width = 4
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use mocards::codes::CodeFormat;

/// Directory searched for bare context names.
const CONFIG_DIR: &str = "/etc/mocards";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub storage: StorageConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,

    /// Overrides `{data_dir}/mocards.sqlite`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite_path: Option<String>,
}

/// Control number layout applied on first start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_prefix")]
    pub control_prefix: String,

    #[serde(default = "default_sequence_width")]
    pub sequence_width: usize,
}

fn default_prefix() -> String {
    CodeFormat::default().control_prefix
}

fn default_sequence_width() -> usize {
    CodeFormat::default().sequence_width
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            control_prefix: default_prefix(),
            sequence_width: default_sequence_width(),
        }
    }
}

impl GeneratorConfig {
    pub fn code_format(&self) -> CodeFormat {
        CodeFormat {
            control_prefix: self.control_prefix.clone(),
            sequence_width: self.sequence_width,
        }
    }
}

impl ServerConfig {
    /// Resolve `-c` to a file: anything containing `/` or `.` is a path,
    /// a bare name maps to `/etc/mocards/<name>.toml`.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            Path::new(CONFIG_DIR).join(format!("{}.toml", name_or_path))
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
