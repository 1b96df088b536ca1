use anyhow::{Context, Result};
use retopo_base::ToolSettings;
use std::fs;
use std::path::Path;

/// Reads tool settings from JSON. Missing fields take their defaults.
pub fn load_settings(path: impl AsRef<Path>) -> Result<ToolSettings> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("read settings file {}", path.display()))?;
    let settings: ToolSettings = serde_json::from_str(&text)
        .with_context(|| format!("parse settings file {}", path.display()))?;
    settings
        .validate()
        .with_context(|| format!("invalid settings in {}", path.display()))?;
    Ok(settings)
}

pub fn save_settings(settings: &ToolSettings, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(settings).context("serialize settings")?;
    fs::write(path, text).with_context(|| format!("write settings file {}", path.display()))?;
    Ok(())
}
