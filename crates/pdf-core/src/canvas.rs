//! Page content construction
//!
//! A [`Canvas`] collects the content stream of one page together with the
//! fonts and XObjects it references. Resource names (`F1`, `X1`, ...) are
//! local to the canvas; the document maps them onto shared objects when the
//! page is added.

use crate::document::Color;
use crate::font::FontHandle;
use crate::text::{format_number, TextRun};
use crate::xobject::XObject;
use crate::{Align, PdfError, Result};
use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
struct FontState {
    index: usize,
    size: f64,
}

/// Content stream and resources of a single page
#[derive(Debug, Default)]
pub struct Canvas {
    content: Vec<u8>,
    pub(crate) fonts: Vec<FontHandle>,
    pub(crate) used_chars: Vec<BTreeSet<char>>,
    pub(crate) xobjects: Vec<Arc<XObject>>,
    font: Option<FontState>,
    saved_fonts: Vec<Option<FontState>>,
}

/// Graphics state saved with `q`, restored with `Q` when dropped
pub struct SavedState<'a> {
    canvas: &'a mut Canvas,
}

impl Deref for SavedState<'_> {
    type Target = Canvas;

    fn deref(&self) -> &Canvas {
        self.canvas
    }
}

impl DerefMut for SavedState<'_> {
    fn deref_mut(&mut self) -> &mut Canvas {
        self.canvas
    }
}

impl Drop for SavedState<'_> {
    fn drop(&mut self) {
        self.canvas.content.extend_from_slice(b"Q\n");
        self.canvas.font = self.canvas.saved_fonts.pop().flatten();
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw content stream written so far
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    fn push_op(&mut self, op: &str) {
        self.content.extend_from_slice(op.as_bytes());
        self.content.push(b'\n');
    }

    fn numbers(values: &[f64]) -> String {
        values
            .iter()
            .map(|v| format_number(*v))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Save the graphics state until the returned guard is dropped
    pub fn saved(&mut self) -> SavedState<'_> {
        self.push_op("q");
        self.saved_fonts.push(self.font);
        SavedState { canvas: self }
    }

    pub fn set_fill_color(&mut self, color: Color) {
        let op = format!("{} rg", Self::numbers(&[color.r, color.g, color.b]));
        self.push_op(&op);
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        let op = format!("{} RG", Self::numbers(&[color.r, color.g, color.b]));
        self.push_op(&op);
    }

    pub fn set_line_width(&mut self, width: f64) {
        let op = format!("{} w", format_number(width));
        self.push_op(&op);
    }

    /// Select the font used by subsequent `draw_string` calls
    pub fn set_font(&mut self, font: &FontHandle, size: f64) {
        let index = match self.fonts.iter().position(|f| f.name() == font.name()) {
            Some(index) => index,
            None => {
                self.fonts.push(Arc::clone(font));
                self.used_chars.push(BTreeSet::new());
                self.fonts.len() - 1
            }
        };
        self.font = Some(FontState { index, size });
    }

    /// Size of the current font, 0 when none is selected
    pub fn font_size(&self) -> f64 {
        self.font.map(|f| f.size).unwrap_or(0.0)
    }

    /// Width of `text` in the current font
    pub fn string_width(&self, text: &str) -> f64 {
        match self.font {
            Some(state) => self.fonts[state.index].text_width_points(text, state.size),
            None => 0.0,
        }
    }

    /// Draw one line of text with its anchor at (x, y)
    pub fn draw_string(&mut self, x: f64, y: f64, text: &str, align: Align) -> Result<()> {
        let state = self
            .font
            .ok_or_else(|| PdfError::GraphicsState("no font selected".to_string()))?;
        let resource = format!("F{}", state.index + 1);
        let run = TextRun {
            resource: &resource,
            size: state.size,
            width: self.string_width(text),
        };
        let ops = run.operators(&self.fonts[state.index].encode_text_hex(text), x, y, align);

        self.used_chars[state.index].extend(text.chars());
        self.content.extend_from_slice(ops.as_bytes());
        Ok(())
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let op = format!(
            "{} m {} l S",
            Self::numbers(&[x1, y1]),
            Self::numbers(&[x2, y2])
        );
        self.push_op(&op);
    }

    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, stroke: bool, fill: bool) {
        let paint = match (stroke, fill) {
            (true, true) => "B",
            (false, true) => "f",
            (true, false) => "S",
            (false, false) => "n",
        };
        let op = format!("{} re {paint}", Self::numbers(&[x, y, width, height]));
        self.push_op(&op);
    }

    /// Concatenate `matrix` to the current transformation
    pub fn transform(&mut self, matrix: [f64; 6]) {
        let op = format!("{} cm", Self::numbers(&matrix));
        self.push_op(&op);
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.transform([1.0, 0.0, 0.0, 1.0, dx, dy]);
    }

    /// Rotate counter-clockwise by `degrees`
    pub fn rotate(&mut self, degrees: f64) {
        let (sin, cos) = degrees.to_radians().sin_cos();
        self.transform([cos, sin, -sin, cos, 0.0, 0.0]);
    }

    /// Paint an XObject into the box with lower-left corner (x, y)
    pub fn draw_xobject(&mut self, xobject: &Arc<XObject>, x: f64, y: f64, width: f64, height: f64) {
        let index = match self.xobjects.iter().position(|o| Arc::ptr_eq(o, xobject)) {
            Some(index) => index,
            None => {
                self.xobjects.push(Arc::clone(xobject));
                self.xobjects.len() - 1
            }
        };

        // Images occupy the unit square, forms their own bounding box
        let (sx, sy) = match xobject.as_ref() {
            XObject::Image(_) => (width, height),
            XObject::Form(_) => {
                let (w, h) = xobject.size();
                (
                    if w > 0.0 { width / w } else { 1.0 },
                    if h > 0.0 { height / h } else { 1.0 },
                )
            }
        };

        let mut state = self.saved();
        state.transform([sx, 0.0, 0.0, sy, x, y]);
        state.push_op(&format!("/X{} Do", index + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontData;
    use crate::xobject::FormXObject;
    use pretty_assertions::assert_eq;

    fn song() -> FontHandle {
        Arc::new(FontData::builtin_cid("STSong-Light").unwrap())
    }

    fn text(canvas: &Canvas) -> String {
        String::from_utf8(canvas.content().to_vec()).unwrap()
    }

    #[test]
    fn test_draw_string_requires_font() {
        let mut canvas = Canvas::new();
        let result = canvas.draw_string(0.0, 0.0, "x", Align::Left);
        assert!(matches!(result, Err(PdfError::GraphicsState(_))));
    }

    #[test]
    fn test_draw_string_records_font_and_chars() {
        let font = song();
        let mut canvas = Canvas::new();
        canvas.set_font(&font, 12.0);
        canvas.draw_string(72.0, 700.0, "第 1 页", Align::Center).unwrap();

        assert_eq!(canvas.fonts.len(), 1);
        assert!(canvas.used_chars[0].contains(&'页'));
        // width 2000 + 1500 over 1000 at 12pt is 42, half of it is 21
        assert!(text(&canvas).contains("/F1 12 Tf\n51 700 Td"));
    }

    #[test]
    fn test_same_font_is_registered_once() {
        let font = song();
        let mut canvas = Canvas::new();
        canvas.set_font(&font, 12.0);
        canvas.set_font(&font, 8.0);
        assert_eq!(canvas.fonts.len(), 1);
        assert_eq!(canvas.font_size(), 8.0);
    }

    #[test]
    fn test_saved_state_restores_font() {
        let font = song();
        let mut canvas = Canvas::new();
        canvas.set_font(&font, 12.0);
        {
            let mut state = canvas.saved();
            state.set_font(&font, 36.0);
            assert_eq!(state.font_size(), 36.0);
        }
        assert_eq!(canvas.font_size(), 12.0);
        assert_eq!(text(&canvas), "q\nQ\n");
    }

    #[test]
    fn test_nested_saved_states_balance() {
        let mut canvas = Canvas::new();
        {
            let mut outer = canvas.saved();
            outer.translate(72.0, 72.0);
            {
                let mut inner = outer.saved();
                inner.rotate(90.0);
            }
            outer.set_line_width(0.5);
        }
        assert_eq!(
            text(&canvas),
            "q\n1 0 0 1 72 72 cm\nq\n0 1 -1 0 0 0 cm\nQ\n0.5 w\nQ\n"
        );
    }

    #[test]
    fn test_paths_and_colors() {
        let mut canvas = Canvas::new();
        canvas.set_fill_color(Color::rgb(1.0, 0.0, 0.0));
        canvas.set_stroke_color(Color::grey());
        canvas.rect(0.0, 0.0, 10.0, 5.0, true, false);
        canvas.line(0.0, 0.0, 100.0, 0.0);
        assert_eq!(
            text(&canvas),
            "1 0 0 rg\n0.502 0.502 0.502 RG\n0 0 10 5 re S\n0 0 m 100 0 l S\n"
        );
    }

    #[test]
    fn test_draw_form_scales_to_box() {
        let form = Arc::new(XObject::Form(FormXObject::top_down(100.0, 50.0, Vec::new())));
        let mut canvas = Canvas::new();
        canvas.draw_xobject(&form, 10.0, 20.0, 200.0, 100.0);
        canvas.draw_xobject(&form, 0.0, 0.0, 100.0, 50.0);

        assert_eq!(canvas.xobjects.len(), 1);
        assert_eq!(
            text(&canvas),
            "q\n2 0 0 2 10 20 cm\n/X1 Do\nQ\nq\n1 0 0 1 0 0 cm\n/X1 Do\nQ\n"
        );
    }
}
