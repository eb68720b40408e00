//! Bootstrap: first-start checks.
//!
//! When mocardsd starts:
//! 1. Verify the config is usable, refusing to start otherwise.
//! 2. Seed the stored code format from `[generator]` unless an operator
//!    already changed it through the API.

use mocards::service::CardService;
use tracing::info;

use crate::config::ServerConfig;

/// Verify server configuration is ready for use.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.storage.data_dir.is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }
    config
        .generator
        .code_format()
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid [generator] section: {}", e))?;
    Ok(())
}

/// Make sure a code format is stored, preferring one already saved.
pub fn ensure_code_format(svc: &CardService, config: &ServerConfig) -> anyhow::Result<()> {
    let wanted = config.generator.code_format();
    let active = svc
        .seed_code_format(&wanted)
        .map_err(|e| anyhow::anyhow!("failed to store code format: {}", e))?;
    if active != wanted {
        info!(
            "Keeping stored code format {}/{} over config {}/{}",
            active.control_prefix, active.sequence_width, wanted.control_prefix, wanted.sequence_width
        );
    } else {
        info!("Code format {}/{}", active.control_prefix, active.sequence_width);
    }
    Ok(())
}
