//! Client configuration loading.

use anyhow::{Context, Result};
use castup_core::ClientConfig;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::path::{Path, PathBuf};

/// Command-line values that take precedence over file and environment.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub server: Option<String>,
    pub token: Option<String>,
    pub chunk_size: Option<u64>,
}

/// Resolve the config file location: explicit flag, then `CASTUP_CONFIG`,
/// then `$XDG_CONFIG_HOME/castup/config.toml` (or `~/.config`).
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(path) = std::env::var_os("CASTUP_CONFIG") {
        return Some(PathBuf::from(path));
    }

    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(std::env::var_os("HOME")?).join(".config"),
    };
    Some(base.join("castup").join("config.toml"))
}

/// Load the config file (if present) and `CASTUP_*` variables on top.
///
/// A missing file at the default location is not an error; a missing file
/// named explicitly is.
pub fn load_config(path: Option<&Path>, explicit: bool) -> Result<ClientConfig> {
    let mut figment = Figment::new();

    if let Some(path) = path {
        if path.exists() {
            figment = figment.merge(Toml::file(path));
        } else if explicit {
            anyhow::bail!("config file not found: {}", path.display());
        }
    }

    figment = figment.merge(Env::prefixed("CASTUP_").split("__"));

    figment
        .extract::<ClientConfig>()
        .context("failed to load client configuration")
}

/// Load configuration and apply command-line overrides.
pub fn resolve(explicit: Option<&Path>, overrides: &Overrides) -> Result<ClientConfig> {
    let path = config_path(explicit);
    let mut config = load_config(path.as_deref(), explicit.is_some())?;
    apply_overrides(&mut config, overrides);
    tracing::debug!(
        path = ?path,
        server_url = %config.server_url,
        chunk_size = config.chunk_size,
        "resolved client configuration"
    );
    Ok(config)
}

pub fn apply_overrides(config: &mut ClientConfig, overrides: &Overrides) {
    if let Some(server) = &overrides.server {
        config.server_url = server.clone();
    }
    if let Some(token) = &overrides.token {
        config.token = Some(token.clone());
    }
    if let Some(chunk_size) = overrides.chunk_size {
        config.chunk_size = chunk_size;
    }
}
