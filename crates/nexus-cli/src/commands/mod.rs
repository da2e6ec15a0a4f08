pub mod check_config;
pub mod connect;

use std::path::Path;

use nexus_types::{NexusConfig, CONFIG_FILENAME};

/// Resolve the effective configuration: an explicit path must load, a
/// `nexus.toml` in the working directory is picked up when present, and
/// otherwise the built-in defaults apply.
pub fn resolve_config(path: Option<&Path>) -> anyhow::Result<NexusConfig> {
    match path {
        Some(path) => Ok(NexusConfig::load(path)?),
        None => {
            let default_path = Path::new(CONFIG_FILENAME);
            if default_path.exists() {
                Ok(NexusConfig::load(default_path)?)
            } else {
                Ok(NexusConfig::default())
            }
        }
    }
}
