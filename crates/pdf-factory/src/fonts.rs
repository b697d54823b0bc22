//! Font resolution
//!
//! The first candidate path that loads as a usable TrueType font wins.
//! When none does, the built-in `STSong-Light` CID font is used instead.

use crate::settings::{Settings, FONT_CN_PATH};
use crate::{ReportError, Result};
use pdf_core::{FontData, FontHandle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Built-in CID font registered when no candidate file works
pub const DEFAULT_FONT_NAME: &str = "STSong-Light";

/// System font locations tried after the configured override
pub const SYSTEM_FONT_PATHS: &[&str] = &[
    // Windows
    "C:/Windows/Fonts/msyh.ttc",
    "C:/Windows/Fonts/simsun.ttc",
    "C:/Windows/Fonts/simhei.ttf",
    // macOS
    "/System/Library/Fonts/STSong.ttf",
    "/System/Library/Fonts/STHeiti Medium.ttc",
    // Linux
    "/usr/share/fonts/wenquanyi/wqy-zenhei.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
];

/// Fonts registered under a name
#[derive(Debug, Default)]
pub struct FontRegistry {
    fonts: HashMap<String, FontHandle>,
    sources: HashMap<String, PathBuf>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<FontHandle> {
        self.fonts.get(name).cloned()
    }

    /// File a font was registered from; `None` for built-in fonts
    pub fn source_path(&self, name: &str) -> Option<&Path> {
        self.sources.get(name).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Register a TrueType file under `name`
    ///
    /// Registering a name twice returns the existing handle without reading
    /// the file again.
    pub fn register_file(&mut self, name: &str, path: &Path) -> Result<FontHandle> {
        if let Some(font) = self.get(name) {
            return Ok(font);
        }
        let data = std::fs::read(path)?;
        let font = Arc::new(FontData::from_ttf(name, &data)?);
        self.fonts.insert(name.to_string(), Arc::clone(&font));
        self.sources.insert(name.to_string(), path.to_path_buf());
        Ok(font)
    }

    /// Register a built-in CID font
    pub fn register_builtin(&mut self, name: &str) -> Result<FontHandle> {
        if let Some(font) = self.get(name) {
            return Ok(font);
        }
        let font = Arc::new(FontData::builtin_cid(name)?);
        self.fonts.insert(name.to_string(), Arc::clone(&font));
        Ok(font)
    }
}

/// Ordered font candidates with a built-in fallback
#[derive(Debug, Clone)]
pub struct FontResolver {
    candidates: Vec<PathBuf>,
    fallback: String,
}

impl Default for FontResolver {
    fn default() -> Self {
        Self {
            candidates: SYSTEM_FONT_PATHS.iter().map(PathBuf::from).collect(),
            fallback: DEFAULT_FONT_NAME.to_string(),
        }
    }
}

impl FontResolver {
    /// System candidates, preceded by the configured override path if any
    pub fn from_settings(settings: &Settings) -> Self {
        let mut resolver = Self::default();
        if let Some(path) = settings.get(FONT_CN_PATH) {
            resolver.candidates.insert(0, PathBuf::from(path));
        }
        resolver
    }

    /// A resolver with an explicit candidate list
    pub fn with_candidates<I, P>(candidates: I, fallback: &str) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            fallback: fallback.to_string(),
        }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Register the first usable font and return it
    pub fn resolve(&self, registry: &mut FontRegistry) -> Result<FontHandle> {
        for path in &self.candidates {
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            match registry.register_file(name, path) {
                Ok(font) => {
                    log::info!("Using font name: {name}");
                    return Ok(font);
                }
                Err(err) => log::debug!("Skipping font {}: {err}", path.display()),
            }
        }

        match registry.register_builtin(&self.fallback) {
            Ok(font) => {
                log::info!("Using default font name: {}", self.fallback);
                Ok(font)
            }
            Err(err) => {
                log::error!("No usable font: {err}");
                Err(ReportError::NoUsableFont(self.fallback.clone()))
            }
        }
    }
}
