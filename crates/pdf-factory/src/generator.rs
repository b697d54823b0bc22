//! Document assembly
//!
//! A [`Context`] holds everything resolved once per process: the document
//! font, the style set, the drawings and the page templates. A
//! [`PdfGenerator`] collects content elements against a context and turns
//! them into PDF bytes on [`PdfGenerator::build`].

use crate::drawing::DrawingCache;
use crate::fonts::{FontRegistry, FontResolver};
use crate::layout::{layout, Flowable, LaidOutPage, Table, TableStyle};
use crate::markup;
use crate::settings::{Settings, SVG_FRAME_PATH, SVG_WATERMARK_PATH};
use crate::styles::StyleSet;
use crate::templates::{build_templates, PageContext, PageLabels, TemplateSet};
use crate::{ReportError, Result};
use chrono::Local;
use pdf_core::{
    Canvas, Color, DocumentInfo, FontHandle, ImageXObject, PdfDocument, XObject, INCH,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Height the logo and watermark drawings are scaled to, in inches
const DRAWING_HEIGHT_INCHES: f64 = 4.0;
const PARAGRAPH_GAP_INCHES: f64 = 0.2;
const CAPTION_GAP_INCHES: f64 = 0.3;
const TABLE_COLUMN_WIDTH: f64 = 120.0;

const DEFAULT_STYLE: &str = "cBodyText";
const FALLBACK_STYLE: &str = "BodyText";
const CAPTION_STYLE: &str = "cImageCaption";

/// Shared, read-only generation state
#[derive(Debug)]
pub struct Context {
    settings: Settings,
    fonts: FontRegistry,
    font: FontHandle,
    styles: StyleSet,
    drawings: DrawingCache,
    templates: TemplateSet,
    labels: PageLabels,
}

impl Context {
    /// Resolve the font, build the styles and templates from `settings`
    pub fn new(settings: Settings) -> Result<Self> {
        let resolver = FontResolver::from_settings(&settings);
        Self::with_options(settings, &resolver, PageLabels::default())
    }

    /// Like [`Context::new`] with an explicit font resolver and page labels
    pub fn with_options(
        settings: Settings,
        resolver: &FontResolver,
        labels: PageLabels,
    ) -> Result<Self> {
        let mut fonts = FontRegistry::new();
        let font = resolver.resolve(&mut fonts)?;
        let styles = StyleSet::build(&font);

        let mut drawings = DrawingCache::new(settings.clone());
        if let Some(path) = fonts.source_path(font.name()) {
            drawings.add_font_file(path);
        }
        // Scale before the templates take their references
        for key in [SVG_FRAME_PATH, SVG_WATERMARK_PATH] {
            let drawing = drawings.resize_by_height(key, DRAWING_HEIGHT_INCHES)?;
            let (_, _, w, h) = drawing.bounds();
            log::info!("Drawing {key} scaled to {w:.1} x {h:.1}");
        }
        let templates = build_templates(&font, &mut drawings, &labels)?;

        Ok(Self {
            settings,
            fonts,
            font,
            styles,
            drawings,
            templates,
            labels,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Fonts registered while resolving the document font
    pub fn fonts(&self) -> &FontRegistry {
        &self.fonts
    }

    pub fn font(&self) -> &FontHandle {
        &self.font
    }

    pub fn styles(&self) -> &StyleSet {
        &self.styles
    }

    pub fn drawings(&self) -> &DrawingCache {
        &self.drawings
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    pub fn labels(&self) -> &PageLabels {
        &self.labels
    }
}

/// Where an image comes from
#[derive(Debug, Clone)]
pub enum ImageSource {
    Path(PathBuf),
    /// In-memory JPEG or PNG data
    Bytes { name: String, data: Vec<u8> },
}

impl ImageSource {
    fn name(&self) -> String {
        match self {
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Bytes { name, .. } => name.clone(),
        }
    }

    fn load(&self) -> Result<ImageXObject> {
        let image = match self {
            ImageSource::Path(path) => ImageXObject::open(path),
            ImageSource::Bytes { data, .. } => ImageXObject::from_bytes(data),
        };
        image.map_err(|err| ReportError::Image {
            source_name: self.name(),
            reason: err.to_string(),
        })
    }
}

impl From<&str> for ImageSource {
    fn from(path: &str) -> Self {
        ImageSource::Path(PathBuf::from(path))
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

/// One queued piece of content
#[derive(Debug, Clone)]
pub enum ContentElement {
    /// Escaped text and the name of its style
    Paragraph { text: String, style: String },
    /// Width in points; the height follows the aspect ratio
    Image { source: ImageSource, width: f64 },
    Table {
        rows: Vec<Vec<String>>,
        column_width: f64,
    },
    Spacer(f64),
    PageBreak,
    FrameBreak,
    /// Template used from the next page on
    TemplateSwitch(String),
}

/// Lifecycle of the generated document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocumentState {
    #[default]
    Empty,
    Built,
    Saved,
}

/// Collects content and renders it into a PDF
pub struct PdfGenerator<'a> {
    context: &'a Context,
    elements: Vec<ContentElement>,
    pages: Vec<LaidOutPage>,
    buffer: Option<Vec<u8>>,
    warnings: Vec<String>,
    state: DocumentState,
}

impl<'a> PdfGenerator<'a> {
    pub fn new(context: &'a Context) -> Self {
        Self {
            context,
            elements: Vec::new(),
            pages: Vec::new(),
            buffer: None,
            warnings: Vec::new(),
            state: DocumentState::Empty,
        }
    }

    fn push(&mut self, element: ContentElement) {
        log::debug!("Insert {element:?}");
        self.elements.push(element);
    }

    /// Queue a paragraph; `style` defaults to `cBodyText`
    ///
    /// The text is escaped, so markup-like input is printed as is.
    pub fn insert_paragraph(&mut self, text: &str, style: Option<&str>) {
        self.push(ContentElement::Paragraph {
            text: markup::escape(text).into_owned(),
            style: style.unwrap_or(DEFAULT_STYLE).to_string(),
        });
        self.push(ContentElement::Spacer(PARAGRAPH_GAP_INCHES * INCH));
    }

    /// Queue an image scaled to `width_inches`, followed by its caption
    pub fn insert_image_with_caption(
        &mut self,
        source: impl Into<ImageSource>,
        caption: &str,
        width_inches: f64,
    ) {
        self.push(ContentElement::Image {
            source: source.into(),
            width: width_inches * INCH,
        });
        self.push(ContentElement::Paragraph {
            text: markup::escape(caption).into_owned(),
            style: CAPTION_STYLE.to_string(),
        });
        self.push(ContentElement::Spacer(CAPTION_GAP_INCHES * INCH));
    }

    /// Queue a table; the first row is the header
    pub fn insert_table<R, S>(&mut self, rows: impl IntoIterator<Item = R>)
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        self.push(ContentElement::Table {
            rows,
            column_width: TABLE_COLUMN_WIDTH,
        });
    }

    pub fn insert_spacer(&mut self, height_inches: f64) {
        self.push(ContentElement::Spacer(height_inches * INCH));
    }

    pub fn insert_page_break(&mut self) {
        self.push(ContentElement::PageBreak);
    }

    pub fn insert_frame_break(&mut self) {
        self.push(ContentElement::FrameBreak);
    }

    /// Continue on a new page using template `name`
    ///
    /// The name is checked when the document is built.
    pub fn switch_page_template(&mut self, name: &str) {
        self.push(ContentElement::TemplateSwitch(name.to_string()));
        self.push(ContentElement::PageBreak);
    }

    /// Elements queued since the last build
    pub fn elements(&self) -> &[ContentElement] {
        &self.elements
    }

    pub fn state(&self) -> DocumentState {
        self.state
    }

    /// Pages of the last build
    pub fn pages(&self) -> &[LaidOutPage] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Recoverable problems met during the last build
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Bytes of the last build
    pub fn bytes(&self) -> Option<&[u8]> {
        self.buffer.as_deref()
    }

    fn to_flowables(&mut self) -> Result<Vec<Flowable>> {
        let context = self.context;
        let mut flowables = Vec::with_capacity(self.elements.len());

        for element in &self.elements {
            let flowable = match element {
                ContentElement::Paragraph { text, style } => {
                    let found = match context.styles.get(style) {
                        Some(found) => found,
                        None => {
                            let message =
                                format!("Unknown style {style}, falling back to {FALLBACK_STYLE}");
                            log::warn!("{message}");
                            self.warnings.push(message);
                            context.styles.get(FALLBACK_STYLE).ok_or_else(|| {
                                ReportError::MissingConfig(format!("style {FALLBACK_STYLE}"))
                            })?
                        }
                    };
                    Flowable::Paragraph {
                        text: text.clone(),
                        style: found.clone(),
                    }
                }
                ContentElement::Image { source, width } => {
                    let image = source.load()?;
                    let height = image.height_for_width(*width);
                    Flowable::Image {
                        xobject: Arc::new(XObject::Image(image)),
                        width: *width,
                        height,
                    }
                }
                ContentElement::Table { rows, column_width } => Flowable::Table(Arc::new(Table {
                    rows: rows.clone(),
                    font: FontHandle::clone(&context.font),
                    style: TableStyle {
                        column_width: *column_width,
                        ..TableStyle::default()
                    },
                })),
                ContentElement::Spacer(height) => Flowable::Spacer { height: *height },
                ContentElement::PageBreak => Flowable::PageBreak,
                ContentElement::FrameBreak => Flowable::FrameBreak,
                ContentElement::TemplateSwitch(name) => Flowable::NextPageTemplate(name.clone()),
            };
            flowables.push(flowable);
        }

        Ok(flowables)
    }

    fn render(&self, pages: &[LaidOutPage], date: &str, info: DocumentInfo) -> Result<Vec<u8>> {
        let templates = &self.context.templates;
        let geometry = templates.geometry();
        let mut document = PdfDocument::new();
        document.set_info(info);

        for page in pages {
            let template = templates.require(&page.template)?;
            let mut canvas = Canvas::new();
            let page_context = PageContext {
                page_number: page.number,
                date,
                geometry,
            };
            template.decoration.decorate(&mut canvas, &page_context)?;

            for frame in template.frames.iter().filter(|f| f.show_boundary) {
                let mut canvas = canvas.saved();
                canvas.set_stroke_color(Color::black());
                canvas.rect(frame.x, frame.y, frame.width, frame.height, true, false);
            }
            for mark in page.frames.iter().flat_map(|f| &f.items) {
                mark.paint(&mut canvas)?;
            }

            document.add_page(geometry.page_width, geometry.page_height, canvas)?;
        }

        Ok(document.to_bytes()?)
    }

    /// Lay out and render the queued elements
    ///
    /// The first page uses the first template. Queued elements are consumed
    /// only when the build succeeds.
    pub fn build(&mut self) -> Result<&[u8]> {
        if self.elements.is_empty() && self.state != DocumentState::Empty {
            return Err(ReportError::AlreadyBuilt);
        }
        log::debug!("Building {} elements", self.elements.len());

        self.warnings.clear();
        let flowables = self.to_flowables()?;
        let pages = layout(flowables, &self.context.templates)?;

        let now = Local::now();
        let date = now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
        let info = DocumentInfo {
            title: Some(self.context.labels.title.clone()),
            creator: Some("pdf-factory".to_string()),
            creation_date: Some(now.fixed_offset()),
            ..Default::default()
        };
        let bytes = self.render(&pages, &date, info)?;
        log::info!("Built {} pages ({} bytes)", pages.len(), bytes.len());

        self.elements.clear();
        self.pages = pages;
        self.state = DocumentState::Built;
        Ok(self.buffer.insert(bytes).as_slice())
    }

    /// Write the last build to `path`, creating parent directories
    ///
    /// # Returns
    /// The absolute path written
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<PathBuf> {
        let buffer = self.buffer.as_ref().ok_or(ReportError::NotBuilt)?;
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, buffer)?;

        let path = std::path::absolute(path)?;
        log::info!("Saved PDF to {}", path.display());
        self.state = DocumentState::Saved;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="80" height="40">
        <circle cx="20" cy="20" r="15" fill="#3366cc"/>
    </svg>"##;

    fn context() -> (tempfile::TempDir, Context) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.svg");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(SVG.as_bytes())
            .unwrap();
        let settings = Settings::new()
            .with(SVG_FRAME_PATH, path.to_str().unwrap())
            .with(SVG_WATERMARK_PATH, path.to_str().unwrap());
        let resolver = FontResolver::with_candidates(Vec::<PathBuf>::new(), "STSong-Light");
        let context = Context::with_options(settings, &resolver, PageLabels::default()).unwrap();
        (dir, context)
    }

    #[test]
    fn test_context_scales_drawings_once() {
        let (_dir, context) = context();
        assert_eq!(context.font().name(), "STSong-Light");
        for key in [SVG_FRAME_PATH, SVG_WATERMARK_PATH] {
            let drawing = context.drawings().get(key).unwrap();
            // 80 x 40 scaled to 4in tall
            let (_, _, w, h) = drawing.bounds();
            assert!((w - 576.0).abs() < 1e-9 && (h - 288.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_paragraph_is_escaped_and_spaced() {
        let (_dir, context) = context();
        let mut generator = PdfGenerator::new(&context);
        generator.insert_paragraph("<b>x</b>", None);

        match generator.elements() {
            [ContentElement::Paragraph { text, style }, ContentElement::Spacer(gap)] => {
                assert_eq!(text, "&lt;b&gt;x&lt;/b&gt;");
                assert_eq!(style, "cBodyText");
                assert!((gap - 14.4).abs() < 1e-9);
            }
            other => panic!("unexpected elements {other:?}"),
        }
    }

    #[test]
    fn test_switch_page_template_queues_a_page_break() {
        let (_dir, context) = context();
        let mut generator = PdfGenerator::new(&context);
        generator.switch_page_template("NormalPage");
        assert!(matches!(
            generator.elements(),
            [ContentElement::TemplateSwitch(name), ContentElement::PageBreak] if name == "NormalPage"
        ));
    }

    #[test]
    fn test_unknown_style_falls_back_with_warning() {
        let (_dir, context) = context();
        let mut generator = PdfGenerator::new(&context);
        generator.insert_paragraph("hello", Some("NoSuchStyle"));
        generator.build().unwrap();

        assert_eq!(generator.warnings().len(), 1);
        assert!(generator.warnings()[0].contains("NoSuchStyle"));
        assert_eq!(generator.pages()[0].texts().collect::<Vec<_>>(), vec!["hello"]);
    }

    #[test]
    fn test_build_twice_without_new_elements() {
        let (_dir, context) = context();
        let mut generator = PdfGenerator::new(&context);
        generator.build().unwrap();
        assert_eq!(generator.state(), DocumentState::Built);
        assert!(matches!(generator.build(), Err(ReportError::AlreadyBuilt)));

        generator.insert_paragraph("more", None);
        assert!(generator.build().is_ok());
    }

    #[test]
    fn test_failed_build_keeps_elements() {
        let (_dir, context) = context();
        let mut generator = PdfGenerator::new(&context);
        generator.switch_page_template("ThreeColumns");

        assert!(matches!(generator.build(), Err(ReportError::UnknownTemplate(_))));
        assert_eq!(generator.elements().len(), 2);
        assert_eq!(generator.state(), DocumentState::Empty);
    }

    #[test]
    fn test_save_before_build() {
        let (dir, context) = context();
        let mut generator = PdfGenerator::new(&context);
        let result = generator.save(dir.path().join("a.pdf"));
        assert!(matches!(result, Err(ReportError::NotBuilt)));
    }

    #[test]
    fn test_broken_image_is_fatal() {
        let (_dir, context) = context();
        let mut generator = PdfGenerator::new(&context);
        generator.insert_image_with_caption(
            ImageSource::Bytes {
                name: "junk".to_string(),
                data: b"not an image".to_vec(),
            },
            "caption",
            2.0,
        );
        match generator.build() {
            Err(ReportError::Image { source_name, .. }) => assert_eq!(source_name, "junk"),
            other => panic!("unexpected result {:?}", other.map(|b| b.len())),
        }
    }
}
