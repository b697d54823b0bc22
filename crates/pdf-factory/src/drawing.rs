//! SVG drawings converted to PDF form XObjects
//!
//! Drawings are loaded from the paths configured in [`Settings`], cached by
//! their configuration key and scaled at most once before being shared with
//! the page templates.

use crate::settings::Settings;
use crate::{ReportError, Result};
use pdf_core::{format_number, Canvas, FormXObject, XObject};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use usvg::fontdb;
use usvg::tiny_skia_path::PathSegment;

/// System fonts for SVG text, loaded once per process
fn system_fonts() -> Arc<fontdb::Database> {
    static FONTS: OnceLock<Arc<fontdb::Database>> = OnceLock::new();
    let fonts = FONTS.get_or_init(|| {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        // usvg falls back to the serif family, which must name an installed face
        let serif = [fontdb::Family::Serif];
        let query = fontdb::Query {
            families: &serif,
            ..Default::default()
        };
        if db.query(&query).is_none() {
            let fallback = db
                .faces()
                .find_map(|face| face.families.first())
                .map(|(name, _)| name.clone());
            if let Some(name) = fallback {
                log::debug!("SVG text falls back to {name}");
                db.set_serif_family(name.clone());
                db.set_sans_serif_family(name);
            }
        }
        log::debug!("Loaded {} system font faces for SVG text", db.len());
        Arc::new(db)
    });
    Arc::clone(fonts)
}

fn has_text(group: &usvg::Group) -> bool {
    group.children().iter().any(|node| match node {
        usvg::Node::Text(_) => true,
        usvg::Node::Group(group) => has_text(group),
        _ => false,
    })
}

/// A vector drawing with its own scale
#[derive(Debug, Clone)]
pub struct Drawing {
    key: String,
    width: f64,
    height: f64,
    scale: f64,
    form: Arc<XObject>,
}

impl Drawing {
    /// Parse SVG data into a drawing, laying out text with the system fonts
    pub fn from_svg_data(key: &str, data: &[u8]) -> Result<Self> {
        Self::from_svg_data_with_fonts(key, data, system_fonts())
    }

    /// Parse SVG data, laying out `<text>` with faces from `fonts`
    pub fn from_svg_data_with_fonts(
        key: &str,
        data: &[u8],
        fonts: Arc<fontdb::Database>,
    ) -> Result<Self> {
        let options = usvg::Options {
            fontdb: fonts,
            ..usvg::Options::default()
        };
        let tree = usvg::Tree::from_data(data, &options).map_err(|e| ReportError::Drawing {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        if !has_text(tree.root()) && data.windows(5).any(|w| w == b"<text") {
            log::warn!("Text in drawing {key} could not be laid out and is left out");
        }

        let size = tree.size();
        let (width, height) = (size.width() as f64, size.height() as f64);

        let mut content = String::new();
        write_group(&mut content, tree.root());

        Ok(Self {
            key: key.to_string(),
            width,
            height,
            scale: 1.0,
            form: Arc::new(XObject::Form(FormXObject::top_down(
                width,
                height,
                content.into_bytes(),
            ))),
        })
    }

    /// Load an SVG file
    pub fn open<P: AsRef<Path>>(key: &str, path: P, fonts: Arc<fontdb::Database>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| ReportError::Drawing {
            key: key.to_string(),
            reason: format!("{}: {e}", path.display()),
        })?;
        Self::from_svg_data_with_fonts(key, &data, fonts)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Unscaled size in points
    pub fn original_size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Multiply the scale uniformly
    pub fn scale_by(&mut self, factor: f64) {
        self.scale *= factor;
    }

    /// Scaled bounds as (x1, y1, x2, y2)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (0.0, 0.0, self.width * self.scale, self.height * self.scale)
    }

    /// Paint the drawing with its lower-left corner at (x, y)
    pub fn draw(&self, canvas: &mut Canvas, x: f64, y: f64) {
        let (_, _, w, h) = self.bounds();
        canvas.draw_xobject(&self.form, x, y, w, h);
    }
}

fn write_group(out: &mut String, group: &usvg::Group) {
    for node in group.children() {
        match node {
            usvg::Node::Group(group) => write_group(out, group),
            usvg::Node::Path(path) => write_path(out, path),
            usvg::Node::Text(text) => write_group(out, text.flattened()),
            usvg::Node::Image(_) => log::debug!("Skipping raster image inside SVG"),
        }
    }
}

fn solid_color(paint: &usvg::Paint) -> Option<(f64, f64, f64)> {
    match paint {
        usvg::Paint::Color(c) => Some((
            c.red as f64 / 255.0,
            c.green as f64 / 255.0,
            c.blue as f64 / 255.0,
        )),
        _ => None,
    }
}

fn write_path(out: &mut String, path: &usvg::Path) {
    if !path.is_visible() {
        return;
    }

    let fill = path
        .fill()
        .and_then(|f| solid_color(f.paint()).map(|c| (c, f.rule())));
    let stroke = path
        .stroke()
        .and_then(|s| solid_color(s.paint()).map(|c| (c, s.width().get() as f64)));
    if fill.is_none() && stroke.is_none() {
        return;
    }

    let n = |v: f32| format_number(v as f64);
    let t = path.abs_transform();

    out.push_str("q\n");
    let _ = writeln!(
        out,
        "{} {} {} {} {} {} cm",
        n(t.sx),
        n(t.ky),
        n(t.kx),
        n(t.sy),
        n(t.tx),
        n(t.ty)
    );

    if let Some(((r, g, b), _)) = fill {
        let _ = writeln!(out, "{} {} {} rg", format_number(r), format_number(g), format_number(b));
    }
    if let Some(((r, g, b), width)) = stroke {
        let _ = writeln!(out, "{} {} {} RG", format_number(r), format_number(g), format_number(b));
        let _ = writeln!(out, "{} w", format_number(width));
    }

    let mut last = (0.0f32, 0.0f32);
    let mut start = last;
    for segment in path.data().segments() {
        match segment {
            PathSegment::MoveTo(p) => {
                let _ = writeln!(out, "{} {} m", n(p.x), n(p.y));
                last = (p.x, p.y);
                start = last;
            }
            PathSegment::LineTo(p) => {
                let _ = writeln!(out, "{} {} l", n(p.x), n(p.y));
                last = (p.x, p.y);
            }
            PathSegment::QuadTo(c, p) => {
                // Degree elevation: both cubic controls lie 2/3 towards the quad control
                let c1 = (last.0 + 2.0 / 3.0 * (c.x - last.0), last.1 + 2.0 / 3.0 * (c.y - last.1));
                let c2 = (p.x + 2.0 / 3.0 * (c.x - p.x), p.y + 2.0 / 3.0 * (c.y - p.y));
                let _ = writeln!(
                    out,
                    "{} {} {} {} {} {} c",
                    n(c1.0),
                    n(c1.1),
                    n(c2.0),
                    n(c2.1),
                    n(p.x),
                    n(p.y)
                );
                last = (p.x, p.y);
            }
            PathSegment::CubicTo(c1, c2, p) => {
                let _ = writeln!(
                    out,
                    "{} {} {} {} {} {} c",
                    n(c1.x),
                    n(c1.y),
                    n(c2.x),
                    n(c2.y),
                    n(p.x),
                    n(p.y)
                );
                last = (p.x, p.y);
            }
            PathSegment::Close => {
                out.push_str("h\n");
                last = start;
            }
        }
    }

    let even_odd = matches!(fill, Some((_, usvg::FillRule::EvenOdd)));
    let op = match (fill.is_some(), stroke.is_some(), even_odd) {
        (true, true, false) => "B",
        (true, true, true) => "B*",
        (true, false, false) => "f",
        (true, false, true) => "f*",
        _ => "S",
    };
    out.push_str(op);
    out.push_str("\nQ\n");
}

/// Drawings memoized by configuration key
#[derive(Debug)]
pub struct DrawingCache {
    settings: Settings,
    fonts: Arc<fontdb::Database>,
    cache: HashMap<String, Arc<Drawing>>,
}

impl DrawingCache {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            fonts: system_fonts(),
            cache: HashMap::new(),
        }
    }

    /// Make a font file available to SVG text loaded from now on
    ///
    /// Its family also becomes the serif and sans-serif fallback, so text
    /// without a matching family uses the document font.
    pub fn add_font_file(&mut self, path: &Path) {
        let db = Arc::make_mut(&mut self.fonts);
        let ids = db.load_font_source(fontdb::Source::File(path.to_path_buf()));
        let family = ids
            .first()
            .and_then(|id| db.face(*id))
            .and_then(|face| face.families.first())
            .map(|(name, _)| name.clone());
        match family {
            Some(name) => {
                log::debug!("SVG text uses {name} from {}", path.display());
                db.set_serif_family(name.clone());
                db.set_sans_serif_family(name);
            }
            None => log::warn!("Font {} cannot be used for SVG text", path.display()),
        }
    }

    /// Add a drawing under a key, replacing any cached one
    pub fn insert(&mut self, drawing: Drawing) -> Arc<Drawing> {
        let drawing = Arc::new(drawing);
        self.cache
            .insert(drawing.key().to_string(), Arc::clone(&drawing));
        drawing
    }

    /// The cached drawing for `key`, if loaded
    pub fn get(&self, key: &str) -> Option<Arc<Drawing>> {
        self.cache.get(key).cloned()
    }

    /// Return the drawing for `key`, loading it on first use
    pub fn checkout(&mut self, key: &str) -> Result<Arc<Drawing>> {
        if let Some(drawing) = self.cache.get(key) {
            return Ok(Arc::clone(drawing));
        }

        let path = self
            .settings
            .get(key)
            .ok_or_else(|| ReportError::MissingConfig(key.to_string()))?;
        let drawing = Drawing::open(key, &path, Arc::clone(&self.fonts))?;
        log::debug!(
            "Loaded drawing {key} from {path} ({} x {})",
            drawing.width,
            drawing.height
        );
        Ok(self.insert(drawing))
    }

    /// Scale the drawing so its height becomes `inches` times its current scale
    ///
    /// The factor is `inches * 72 / original_height`, so repeated calls
    /// compound. Only possible while the cache holds the sole reference.
    pub fn resize_by_height(&mut self, key: &str, inches: f64) -> Result<Arc<Drawing>> {
        self.checkout(key)?;
        let entry = self
            .cache
            .get_mut(key)
            .ok_or_else(|| ReportError::MissingConfig(key.to_string()))?;
        let drawing =
            Arc::get_mut(entry).ok_or_else(|| ReportError::DrawingShared(key.to_string()))?;

        if drawing.height <= 0.0 {
            return Err(ReportError::Drawing {
                key: key.to_string(),
                reason: "drawing has no height".to_string(),
            });
        }
        drawing.scale_by(inches * pdf_core::INCH / drawing.height);

        Ok(Arc::clone(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SVG_FRAME_PATH;
    use pretty_assertions::assert_eq;

    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100">
        <rect x="10" y="10" width="50" height="20" fill="#ff0000" stroke="#000000" stroke-width="2"/>
        <path d="M 0 0 Q 50 100 100 0" fill="none" stroke="#0000ff"/>
    </svg>"##;

    fn content(drawing: &Drawing) -> String {
        match drawing.form.as_ref() {
            XObject::Form(form) => String::from_utf8(form.content.clone()).unwrap(),
            XObject::Image(_) => unreachable!(),
        }
    }

    #[test]
    fn test_parse_svg() {
        let drawing = Drawing::from_svg_data("test", SQUARE.as_bytes()).unwrap();
        assert_eq!(drawing.original_size(), (200.0, 100.0));
        assert_eq!(drawing.bounds(), (0.0, 0.0, 200.0, 100.0));

        let ops = content(&drawing);
        assert!(ops.contains("1 0 0 rg"));
        assert!(ops.contains("0 0 0 RG"));
        assert!(ops.contains("\nB\n"));
        // the quadratic curve is written as a cubic
        assert!(ops.contains(" c\n"));
        assert!(ops.contains("0 0 1 RG"));
    }

    #[test]
    fn test_invalid_svg() {
        let result = Drawing::from_svg_data("bad", b"<not-svg");
        assert!(matches!(result, Err(ReportError::Drawing { .. })));
    }

    #[test]
    fn test_svg_text_is_drawn() {
        if system_fonts().is_empty() {
            return;
        }
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="100">
            <text x="10" y="50" font-size="30">LOGO</text>
        </svg>"#;
        let drawing = Drawing::from_svg_data("text", svg).unwrap();

        let ops = content(&drawing);
        assert!(!ops.is_empty());
        // glyph outlines are filled with the default black
        assert!(ops.contains("0 0 0 rg"));
        assert!(ops.contains("\nf\n"));
    }

    #[test]
    fn test_unusable_font_file_keeps_cache_working() {
        let mut cache = DrawingCache::new(Settings::new());
        let before = cache.fonts.len();
        cache.add_font_file(Path::new("/nonexistent/font.ttf"));
        assert_eq!(cache.fonts.len(), before);

        cache.insert(Drawing::from_svg_data("k", SQUARE.as_bytes()).unwrap());
        assert!(cache.get("k").is_some());
    }

    #[test]
    fn test_missing_config_key() {
        let mut cache = DrawingCache::new(Settings::new());
        let result = cache.checkout(SVG_FRAME_PATH);
        assert!(matches!(result, Err(ReportError::MissingConfig(key)) if key == SVG_FRAME_PATH));
    }

    #[test]
    fn test_checkout_is_memoized() {
        let mut cache = DrawingCache::new(Settings::new());
        cache.insert(Drawing::from_svg_data("k", SQUARE.as_bytes()).unwrap());
        let a = cache.checkout("k").unwrap();
        let b = cache.checkout("k").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_resize_by_height() {
        let mut cache = DrawingCache::new(Settings::new());
        cache.insert(Drawing::from_svg_data("k", SQUARE.as_bytes()).unwrap());

        let drawing = cache.resize_by_height("k", 4.0).unwrap();
        let (_, _, w, h) = drawing.bounds();
        assert!((h - 288.0).abs() < 1e-9);
        assert!((w - 576.0).abs() < 1e-9);
    }

    #[test]
    fn test_resize_compounds() {
        let mut cache = DrawingCache::new(Settings::new());
        cache.insert(Drawing::from_svg_data("k", SQUARE.as_bytes()).unwrap());

        cache.resize_by_height("k", 2.0).unwrap();
        let drawing = cache.resize_by_height("k", 2.0).unwrap();
        let expected = (2.0 * 72.0 / 100.0) * (2.0 * 72.0 / 100.0);
        assert!((drawing.scale() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_resize_shared_drawing_fails() {
        let mut cache = DrawingCache::new(Settings::new());
        let shared = cache.insert(Drawing::from_svg_data("k", SQUARE.as_bytes()).unwrap());

        let result = cache.resize_by_height("k", 4.0);
        assert!(matches!(result, Err(ReportError::DrawingShared(_))));
        assert_eq!(shared.scale(), 1.0);
    }

    #[test]
    fn test_draw_places_form() {
        let drawing = Drawing::from_svg_data("k", SQUARE.as_bytes()).unwrap();
        let mut canvas = Canvas::new();
        drawing.draw(&mut canvas, 5.0, 6.0);
        let ops = String::from_utf8(canvas.content().to_vec()).unwrap();
        assert!(ops.contains("1 0 0 1 5 6 cm\n/X1 Do"));
    }
}
