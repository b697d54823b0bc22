//! Page templates: frames plus a decoration painted on every page
//!
//! Three templates are built, in this order:
//! - `FirstPage`: one frame; header, footer block, logo and titles
//! - `TwoColumnsPage`: two half-width frames; header, page number, watermark
//! - `NormalPage`: one frame; same decoration as `TwoColumnsPage`

use crate::drawing::{Drawing, DrawingCache};
use crate::settings::{SVG_FRAME_PATH, SVG_WATERMARK_PATH};
use crate::{ReportError, Result};
use pdf_core::{Align, Canvas, Color, FontHandle, A4, INCH};
use std::fmt;
use std::sync::Arc;

/// Page size and margins in points
#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    pub page_width: f64,
    pub page_height: f64,
    pub left_margin: f64,
    pub right_margin: f64,
    pub top_margin: f64,
    pub bottom_margin: f64,
    /// Padding between a frame's edge and its content, on every side
    pub frame_padding: f64,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            page_width: A4.0,
            page_height: A4.1,
            left_margin: 72.0,
            right_margin: 72.0,
            top_margin: 72.0,
            bottom_margin: 72.0,
            frame_padding: 6.0,
        }
    }
}

impl PageGeometry {
    /// Width between the left and right margins
    pub fn content_width(&self) -> f64 {
        self.page_width - self.left_margin - self.right_margin
    }

    /// Height between the top and bottom margins
    pub fn content_height(&self) -> f64 {
        self.page_height - self.top_margin - self.bottom_margin
    }
}

/// A rectangular region of the page that receives flowed content
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub padding: f64,
    pub show_boundary: bool,
}

impl Frame {
    pub fn new(id: &str, x: f64, y: f64, width: f64, height: f64, padding: f64) -> Self {
        Self {
            id: id.to_string(),
            x,
            y,
            width,
            height,
            padding,
            show_boundary: false,
        }
    }

    pub fn with_boundary(mut self) -> Self {
        self.show_boundary = true;
        self
    }

    /// Left edge of the content area
    pub fn content_x(&self) -> f64 {
        self.x + self.padding
    }

    /// Top edge of the content area
    pub fn content_top(&self) -> f64 {
        self.y + self.height - self.padding
    }

    /// Bottom edge of the content area
    pub fn content_bottom(&self) -> f64 {
        self.y + self.padding
    }

    pub fn content_width(&self) -> f64 {
        self.width - 2.0 * self.padding
    }

    pub fn content_height(&self) -> f64 {
        self.height - 2.0 * self.padding
    }
}

/// What a decoration knows about the page it paints
pub struct PageContext<'a> {
    /// 1-based page number within the document
    pub page_number: usize,
    /// Build timestamp shown in headers
    pub date: &'a str,
    pub geometry: &'a PageGeometry,
}

/// Painting done on every page of a template, before its content
pub trait PageDecoration: Send + Sync {
    fn decorate(&self, canvas: &mut Canvas, page: &PageContext<'_>) -> pdf_core::Result<()>;
}

/// Header and footer strings
#[derive(Debug, Clone, PartialEq)]
pub struct PageLabels {
    pub first_header_left: String,
    pub first_header_right: String,
    pub footer_lines: Vec<String>,
    pub title: String,
    pub subtitle: String,
    pub header_left: String,
    /// Page number text, `{page}` is replaced by the number
    pub page_number: String,
}

impl Default for PageLabels {
    fn default() -> Self {
        Self {
            first_header_left: "Left".to_string(),
            first_header_right: "Right".to_string(),
            footer_lines: vec![
                "CopyRight:  Belongs to no-one".to_string(),
                "Author:  Listenzcc".to_string(),
                "Address:  Some building, some road".to_string(),
                "Location:  Some city, some state".to_string(),
            ],
            title: "Auto Generated PDF".to_string(),
            subtitle: "Example Page".to_string(),
            header_left: "Left prompt".to_string(),
            page_number: "第 {page} 页".to_string(),
        }
    }
}

impl PageLabels {
    pub fn page_number_text(&self, page: usize) -> String {
        self.page_number.replace("{page}", &page.to_string())
    }
}

/// A named page layout
#[derive(Clone)]
pub struct PageTemplate {
    pub id: String,
    pub frames: Vec<Frame>,
    pub decoration: Arc<dyn PageDecoration>,
}

impl fmt::Debug for PageTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTemplate")
            .field("id", &self.id)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

/// Header rule with a label on each side, drawn above the top margin
fn draw_header(
    canvas: &mut Canvas,
    geometry: &PageGeometry,
    font: &FontHandle,
    color: Color,
    left: &str,
    right: &str,
) -> pdf_core::Result<()> {
    let w = geometry.content_width();
    let mut canvas = canvas.saved();
    canvas.set_fill_color(color);
    canvas.set_stroke_color(color);
    canvas.set_font(font, 8.0);
    canvas.translate(
        geometry.left_margin,
        geometry.page_height - geometry.top_margin + 0.5 * INCH,
    );

    let dy = 0.05 * INCH;
    canvas.draw_string(0.0, dy, left, Align::Left)?;
    canvas.draw_string(w, dy, right, Align::Right)?;
    canvas.line(0.0, 0.0, w, 0.0);
    Ok(())
}

/// Decoration of the cover page
struct FirstPageDecoration {
    font: FontHandle,
    logo: Arc<Drawing>,
    labels: PageLabels,
}

impl PageDecoration for FirstPageDecoration {
    fn decorate(&self, canvas: &mut Canvas, page: &PageContext<'_>) -> pdf_core::Result<()> {
        let g = page.geometry;
        let (w, h) = (g.content_width(), g.content_height());
        let color = Color::darkblue();

        draw_header(
            canvas,
            g,
            &self.font,
            color,
            &self.labels.first_header_left,
            &self.labels.first_header_right,
        )?;

        {
            let mut canvas = canvas.saved();
            canvas.set_fill_color(color);
            canvas.set_stroke_color(color);
            canvas.set_font(&self.font, 12.0);
            canvas.translate(g.left_margin, g.bottom_margin - 0.5 * INCH);

            let offset_y = 1.6 * INCH;
            let dy = -0.25 * INCH;
            canvas.line(0.0, offset_y, w * 0.3, offset_y);
            for (i, line) in self.labels.footer_lines.iter().enumerate() {
                canvas.draw_string(0.0, offset_y + (i as f64 + 2.0) * dy, line, Align::Left)?;
            }
        }

        let mut canvas = canvas.saved();
        canvas.translate(g.left_margin, g.bottom_margin);

        let (x1, y1, x2, y2) = self.logo.bounds();
        self.logo.draw(&mut canvas, w * 0.5 - (x1 + x2) * 0.5, h * 0.5);

        canvas.set_fill_color(color);
        canvas.set_stroke_color(color);
        canvas.set_font(&self.font, 36.0);
        canvas.draw_string(
            w * 0.5,
            h * 0.5 + (y1 + y2) * 0.5 - 0.12 * INCH,
            &self.labels.title,
            Align::Center,
        )?;
        canvas.set_font(&self.font, 24.0);
        canvas.draw_string(w * 0.5, h * 0.5, &self.labels.subtitle, Align::Center)?;
        Ok(())
    }
}

/// Decoration of content pages: header with date, page number, watermark
struct NormalPageDecoration {
    font: FontHandle,
    watermark: Arc<Drawing>,
    labels: PageLabels,
}

impl PageDecoration for NormalPageDecoration {
    fn decorate(&self, canvas: &mut Canvas, page: &PageContext<'_>) -> pdf_core::Result<()> {
        let g = page.geometry;
        let (w, h) = (g.content_width(), g.content_height());
        let color = Color::grey();

        draw_header(canvas, g, &self.font, color, &self.labels.header_left, page.date)?;

        {
            let mut canvas = canvas.saved();
            canvas.set_fill_color(color);
            canvas.set_stroke_color(color);
            canvas.set_font(&self.font, 8.0);
            canvas.translate(g.left_margin, g.bottom_margin - 0.5 * INCH);

            let page_number = self.labels.page_number_text(page.page_number);
            canvas.draw_string(w / 2.0, -0.15 * INCH, &page_number, Align::Center)?;
            canvas.line(0.0, 0.0, w, 0.0);
        }

        let mut canvas = canvas.saved();
        canvas.translate(g.left_margin, g.bottom_margin);
        canvas.translate(w * 0.5, h * 0.5);
        canvas.rotate(20.0);
        let (x1, y1, x2, y2) = self.watermark.bounds();
        self.watermark
            .draw(&mut canvas, -(x1 + x2) * 0.5, -(y1 + y2) * 0.5);
        Ok(())
    }
}

/// The templates available to a document, first one used for page 1
#[derive(Debug, Clone)]
pub struct TemplateSet {
    geometry: PageGeometry,
    templates: Vec<PageTemplate>,
}

impl TemplateSet {
    pub fn new(geometry: PageGeometry, templates: Vec<PageTemplate>) -> Self {
        Self {
            geometry,
            templates,
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn get(&self, id: &str) -> Option<&PageTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Look up a template, failing on unknown ids
    pub fn require(&self, id: &str) -> Result<&PageTemplate> {
        self.get(id)
            .ok_or_else(|| ReportError::UnknownTemplate(id.to_string()))
    }

    pub fn first(&self) -> Option<&PageTemplate> {
        self.templates.first()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|t| t.id.as_str())
    }
}

/// Build `FirstPage`, `TwoColumnsPage` and `NormalPage` on an A4 page
///
/// Both drawings are checked out here, so a missing or broken SVG fails
/// before any content is laid out.
pub fn build_templates(
    font: &FontHandle,
    drawings: &mut DrawingCache,
    labels: &PageLabels,
) -> Result<TemplateSet> {
    build_templates_with(PageGeometry::default(), font, drawings, labels)
}

pub fn build_templates_with(
    geometry: PageGeometry,
    font: &FontHandle,
    drawings: &mut DrawingCache,
    labels: &PageLabels,
) -> Result<TemplateSet> {
    let logo = drawings.checkout(SVG_FRAME_PATH)?;
    let watermark = drawings.checkout(SVG_WATERMARK_PATH)?;

    let (x, y) = (geometry.left_margin, geometry.bottom_margin);
    let (w, h) = (geometry.content_width(), geometry.content_height());
    let padding = geometry.frame_padding;

    let first: Arc<dyn PageDecoration> = Arc::new(FirstPageDecoration {
        font: FontHandle::clone(font),
        logo,
        labels: labels.clone(),
    });
    let normal: Arc<dyn PageDecoration> = Arc::new(NormalPageDecoration {
        font: FontHandle::clone(font),
        watermark,
        labels: labels.clone(),
    });

    let templates = vec![
        PageTemplate {
            id: "FirstPage".to_string(),
            frames: vec![Frame::new("firstPageFrame", x, y, w, h, padding)],
            decoration: first,
        },
        PageTemplate {
            id: "TwoColumnsPage".to_string(),
            frames: vec![
                Frame::new("twoColumnsPageLeftFrame", x, y, w / 2.0, h, padding).with_boundary(),
                Frame::new("twoColumnsPageRightFrame", x + w / 2.0, y, w / 2.0, h, padding)
                    .with_boundary(),
            ],
            decoration: Arc::clone(&normal),
        },
        PageTemplate {
            id: "NormalPage".to_string(),
            frames: vec![Frame::new("normalPageFrame", x, y, w, h, padding).with_boundary()],
            decoration: normal,
        },
    ];

    Ok(TemplateSet::new(geometry, templates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use pdf_core::FontData;
    use pretty_assertions::assert_eq;

    const SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="50">
        <rect width="100" height="50" fill="#336699"/>
    </svg>"##;

    fn font() -> FontHandle {
        Arc::new(FontData::builtin_cid("STSong-Light").unwrap())
    }

    fn cache() -> DrawingCache {
        let mut cache = DrawingCache::new(Settings::new());
        for key in [SVG_FRAME_PATH, SVG_WATERMARK_PATH] {
            cache.insert(Drawing::from_svg_data(key, SVG.as_bytes()).unwrap());
        }
        cache
    }

    fn render(template: &PageTemplate, page_number: usize) -> String {
        let geometry = PageGeometry::default();
        let context = PageContext {
            page_number,
            date: "2025-06-16T10:00:00.000000",
            geometry: &geometry,
        };
        let mut canvas = Canvas::new();
        template.decoration.decorate(&mut canvas, &context).unwrap();
        String::from_utf8(canvas.content().to_vec()).unwrap()
    }

    #[test]
    fn test_template_order_and_frames() {
        let set = build_templates(&font(), &mut cache(), &PageLabels::default()).unwrap();
        assert_eq!(
            set.ids().collect::<Vec<_>>(),
            vec!["FirstPage", "TwoColumnsPage", "NormalPage"]
        );
        assert_eq!(set.first().unwrap().id, "FirstPage");

        let two = set.get("TwoColumnsPage").unwrap();
        assert_eq!(two.frames.len(), 2);
        assert!(two.frames.iter().all(|f| f.show_boundary));
        assert!((two.frames[0].width - two.frames[1].width).abs() < 1e-9);
        assert!((two.frames[1].x - (72.0 + two.frames[0].width)).abs() < 1e-9);

        assert!(!set.get("FirstPage").unwrap().frames[0].show_boundary);
    }

    #[test]
    fn test_unknown_template() {
        let set = build_templates(&font(), &mut cache(), &PageLabels::default()).unwrap();
        assert!(matches!(set.require("ThreeColumns"), Err(ReportError::UnknownTemplate(_))));
    }

    #[test]
    fn test_missing_drawing_fails_fast() {
        let mut cache = DrawingCache::new(Settings::new());
        let result = build_templates(&font(), &mut cache, &PageLabels::default());
        assert!(matches!(result, Err(ReportError::MissingConfig(_))));
    }

    #[test]
    fn test_frame_content_area() {
        let frame = Frame::new("f", 72.0, 72.0, 451.28, 697.89, 6.0);
        assert_eq!(frame.content_x(), 78.0);
        assert_eq!(frame.content_bottom(), 78.0);
        assert!((frame.content_width() - 439.28).abs() < 1e-9);
        assert!((frame.content_top() - (72.0 + 697.89 - 6.0)).abs() < 1e-9);
    }

    #[test]
    fn test_page_number_text() {
        assert_eq!(PageLabels::default().page_number_text(3), "第 3 页");
    }

    #[test]
    fn test_normal_page_decoration_is_balanced() {
        let set = build_templates(&font(), &mut cache(), &PageLabels::default()).unwrap();
        let ops = render(set.get("NormalPage").unwrap(), 2);

        assert_eq!(ops.matches("q\n").count(), ops.matches("Q\n").count());
        assert!(ops.starts_with("q\n"));
        assert!(ops.ends_with("Q\n"));
        // rotation by 20 degrees
        assert!(ops.contains("0.9397 0.342 -0.342 0.9397 0 0 cm"));
        assert!(ops.contains("/X1 Do"));
    }

    #[test]
    fn test_first_page_decoration() {
        let set = build_templates(&font(), &mut cache(), &PageLabels::default()).unwrap();
        let ops = render(set.get("FirstPage").unwrap(), 1);

        assert_eq!(ops.matches("q\n").count(), ops.matches("Q\n").count());
        assert!(ops.contains("/F1 36 Tf"));
        assert!(ops.contains("/F1 24 Tf"));
        // four footer lines at 12pt
        assert_eq!(ops.matches("/F1 12 Tf").count(), 4);
    }
}
