//! # CLI Configuration
//!
//! Optional YAML file passed with `--config`:
//!
//! ```yaml
//! loader:
//!   ttl_secs: 3600
//!   preload_builtin: true
//! contexts:
//!   "https://example.org/contexts/employment/v1": contexts/employment.json
//! ```
//!
//! Context paths are relative to the configuration file. Without a file the
//! loader holds only the built-in contexts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use vcdi_core::{Canonicalizer, ContextLoader, LoaderConfig};

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Context cache settings.
    pub loader: LoaderConfig,
    /// Extra context documents: URL → JSON file.
    pub contexts: BTreeMap<String, PathBuf>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl CliConfig {
    /// Load `path`, or return the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_yaml(&text, &base_dir)
            .with_context(|| format!("invalid config: {}", path.display()))
    }

    /// Parse YAML text; relative context paths resolve against `base_dir`.
    pub fn from_yaml(text: &str, base_dir: &Path) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(text)?;
        config.base_dir = base_dir.to_path_buf();
        Ok(config)
    }

    /// Where the document for a configured context lives.
    pub fn context_path(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.base_dir.join(file)
        }
    }

    /// Build a canonicalizer whose loader holds the configured contexts.
    pub fn canonicalizer(&self) -> Result<Canonicalizer> {
        let loader = ContextLoader::from_config(&self.loader)?;
        for (url, file) in &self.contexts {
            let path = self.context_path(file);
            let document = crate::read_json(&path)?;
            loader
                .add_context(url, document)
                .with_context(|| format!("invalid context document for {url}"))?;
            tracing::debug!(%url, path = %path.display(), "registered context");
        }
        Ok(Canonicalizer::new(Arc::new(loader)))
    }
}
