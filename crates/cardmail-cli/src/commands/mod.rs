//! CLI commands.

pub mod batch;
pub mod config;
pub mod process;

use std::fs;
use std::path::Path;

use cardmail_core::{ExtractionConfig, RawEmail};

/// Load the configuration from an explicit path, the default location, or defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ExtractionConfig> {
    if let Some(path) = config_path {
        return Ok(ExtractionConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        Ok(ExtractionConfig::from_file(&default_path)?)
    } else {
        Ok(ExtractionConfig::default())
    }
}

/// Read an email from a `.json` or `.eml` file.
pub fn load_email(path: &Path) -> anyhow::Result<RawEmail> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "json" => {
            let content = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        }
        "eml" => {
            let data = fs::read(path)?;
            Ok(RawEmail::from_eml(&data)?)
        }
        _ => anyhow::bail!("Unsupported file format: {}", extension),
    }
}

/// Whether a path looks like an email input.
pub fn is_email_file(path: &Path) -> bool {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    matches!(ext.to_lowercase().as_str(), "json" | "eml")
}
