//! Packager settings, persisted as JSON.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::capacity::ErrorCorrection;

const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagerConfig {
    /// Schema version for forward compatibility.
    pub version: u32,
    /// Symbol error correction level used for capacity estimates.
    pub error_correction: ErrorCorrection,
    /// Gzip-frame payloads. When off, the raw binary is the payload.
    pub compress: bool,
    /// Six application bits carried in the payload header.
    pub feature_flags: u8,
    /// Theme written to the header when a document names none.
    pub default_theme: String,
    /// JSON file backing the resolution cache. Memory-only when unset.
    pub cache_path: Option<PathBuf>,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            error_correction: ErrorCorrection::default(),
            compress: true,
            feature_flags: 0,
            default_theme: "default".to_string(),
            cache_path: None,
        }
    }
}

impl PackagerConfig {
    /// Load config from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("packager config not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read packager config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse packager config from {}", path.display()))?;

        if config.version > CONFIG_VERSION {
            log::warn!(
                "packager config version {} is newer than supported ({CONFIG_VERSION}), some fields may be ignored",
                config.version
            );
        }
        if config.feature_flags > crate::binary::FEATURE_FLAGS_MASK {
            log::warn!(
                "feature flags {:#04x} exceed six bits; the high bits are dropped",
                config.feature_flags
            );
        }
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize packager config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write packager config to {}", path.display()))?;
        log::info!("packager config saved to {}", path.display());
        Ok(())
    }
}
