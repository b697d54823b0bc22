//! PDF Factory - styled, Chinese-font-aware PDF reports
//!
//! This crate provides:
//! - Font resolution with a prioritized list of system fonts and a built-in
//!   CJK fallback
//! - A cache of SVG drawings loaded from configured paths
//! - A paragraph style set whose fonts all use the resolved font
//! - Page templates (`FirstPage`, `NormalPage`, `TwoColumnsPage`) with
//!   header, footer and watermark decorations
//! - A generator that flows paragraphs, tables and images through the
//!   templates into a PDF
//!
//! # Example
//!
//! ```ignore
//! use pdf_factory::{Context, PdfGenerator, Settings};
//!
//! let context = Context::new(Settings::from_env())?;
//! let mut generator = PdfGenerator::new(&context);
//! generator.switch_page_template("NormalPage");
//! generator.insert_paragraph("你好, PDF", None);
//! generator.build()?;
//! generator.save("pdf/a.pdf")?;
//! ```

pub mod drawing;
pub mod fonts;
pub mod generator;
pub mod layout;
pub mod markup;
pub mod settings;
pub mod styles;
pub mod templates;

pub use drawing::{Drawing, DrawingCache};
pub use fonts::{FontRegistry, FontResolver, DEFAULT_FONT_NAME};
pub use generator::{Context, ContentElement, DocumentState, ImageSource, PdfGenerator};
pub use layout::{FrameLayout, LaidOutPage, Mark};
pub use settings::Settings;
pub use styles::{Alignment, ParagraphStyle, StyleSet};
pub use templates::{build_templates, Frame, PageContext, PageGeometry, PageLabels, PageTemplate, TemplateSet};

use thiserror::Error;

/// Errors that can occur while generating a report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot register a usable font: {0}")]
    NoUsableFont(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Drawing error for {key}: {reason}")]
    Drawing { key: String, reason: String },

    #[error("Drawing {0} is already shared and cannot be resized")]
    DrawingShared(String),

    #[error("Unknown page template: {0}")]
    UnknownTemplate(String),

    #[error("Page template {0} has no frames")]
    EmptyTemplate(String),

    #[error("Image error for {source_name}: {reason}")]
    Image { source_name: String, reason: String },

    #[error("Document already built; insert new elements before building again")]
    AlreadyBuilt,

    #[error("Document has not been built")]
    NotBuilt,

    #[error("PDF error: {0}")]
    PdfError(#[from] pdf_core::PdfError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for report operations
pub type Result<T> = std::result::Result<T, ReportError>;
