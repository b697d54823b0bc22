//! Key-value settings with environment fallback

use crate::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Override path of the CJK font
pub const FONT_CN_PATH: &str = "pdfFactory.font.cn.path";
/// SVG drawn on the first page
pub const SVG_FRAME_PATH: &str = "pdfFactory.svg.frame.path";
/// SVG used as the watermark of normal pages
pub const SVG_WATERMARK_PATH: &str = "pdfFactory.svg.logoWaterPrint.path";

/// Settings looked up at the point of use
///
/// Explicit values win; otherwise the process environment variable of the
/// same name is read (unless the settings were created isolated).
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
    use_env: bool,
}

#[derive(Debug, Default, Deserialize)]
struct PathEntry {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FontSection {
    #[serde(default)]
    cn: PathEntry,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SvgSection {
    #[serde(default)]
    frame: PathEntry,
    #[serde(default)]
    logo_water_print: PathEntry,
}

/// Layout of the JSON config file
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    font: FontSection,
    #[serde(default)]
    svg: SvgSection,
}

impl Settings {
    /// Settings with no explicit values and no environment fallback
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings that fall back to environment variables
    pub fn from_env() -> Self {
        Self {
            values: HashMap::new(),
            use_env: true,
        }
    }

    /// Set an explicit value
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// Merge the paths of a JSON config file into these settings
    pub fn merge_json(mut self, json: &str) -> Result<Self> {
        let config: ConfigFile = serde_json::from_str(json)?;
        let entries = [
            (FONT_CN_PATH, config.font.cn.path),
            (SVG_FRAME_PATH, config.svg.frame.path),
            (SVG_WATERMARK_PATH, config.svg.logo_water_print.path),
        ];
        for (key, value) in entries {
            if let Some(value) = value {
                log::debug!("Config {key} = {value}");
                self.values.insert(key.to_string(), value);
            }
        }
        Ok(self)
    }

    /// Environment-backed settings overlaid with a JSON config file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_env().merge_json(&json)
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.values.get(key) {
            return Some(value.clone());
        }
        if self.use_env {
            return std::env::var(key).ok().filter(|v| !v.is_empty());
        }
        None
    }
}
