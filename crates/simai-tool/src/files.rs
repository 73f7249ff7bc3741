use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::SHIFT_JIS;
use log::debug;
use simai_model::SimaiConfig;

/// Read a chart file, trying UTF-8 first and falling back to Shift-JIS.
pub fn read_chart_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    match String::from_utf8(bytes) {
        Ok(content) => Ok(content),
        Err(err) => {
            let (content, _, had_errors) = SHIFT_JIS.decode(err.as_bytes());
            if had_errors {
                anyhow::bail!("Failed to decode {} as UTF-8 or Shift-JIS", path.display());
            }
            debug!("Decoded {} as Shift-JIS", path.display());
            Ok(content.into_owned())
        }
    }
}

/// Load settings from a JSON file. Fields missing from the file keep their defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SimaiConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = SimaiConfig::from_json_str(&content)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    Ok(config)
}

pub fn write_output<P: AsRef<Path>>(path: Option<P>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            let path = path.as_ref();
            fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            debug!("Wrote {} bytes to {}", content.len(), path.display());
        }
        None => println!("{content}"),
    }
    Ok(())
}
