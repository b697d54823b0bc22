//! PDF Core - Low-level PDF writing
//!
//! This crate provides functionality for:
//! - Building a PDF document page by page
//! - Embedding TrueType fonts and referencing built-in CJK CID fonts
//! - Painting text, lines, rectangles and XObjects through a [`Canvas`]
//! - Embedding images (JPEG, PNG) and vector forms
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{Align, Canvas, FontData, PdfDocument};
//! use std::sync::Arc;
//!
//! let font = Arc::new(FontData::builtin_cid("STSong-Light")?);
//! let mut canvas = Canvas::new();
//! canvas.set_font(&font, 12.0);
//! canvas.draw_string(72.0, 700.0, "你好, World!", Align::Left)?;
//!
//! let mut doc = PdfDocument::new();
//! doc.add_page(595.28, 841.89, canvas)?;
//! doc.save("output.pdf")?;
//! ```

mod canvas;
mod document;
mod font;
mod image;
mod text;
mod xobject;

pub use canvas::{Canvas, SavedState};
pub use document::{Color, DocumentInfo, PdfDocument};
pub use font::{FontData, FontHandle, FontObjects, BUILTIN_CID_FONTS};
pub use image::{ImageFormat, ImageXObject};
pub use text::{format_number, wrap_text, TextRun};
pub use xobject::{FormXObject, XObject};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Unsupported font: {0}")]
    UnsupportedFont(String),

    #[error("Unknown built-in CID font: {0}")]
    UnknownCidFont(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("Unbalanced graphics state: {0}")]
    GraphicsState(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Text alignment options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Points per inch
pub const INCH: f64 = 72.0;

/// A4 page size in points
pub const A4: (f64, f64) = (595.275_590_551_181_2, 841.889_763_779_527_7);
