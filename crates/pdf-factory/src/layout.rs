//! Flow layout
//!
//! Flowables are poured into the frames of the current page template from
//! top to bottom. Paragraphs split between lines and tables between rows;
//! anything else that does not fit moves on to the next frame. When the
//! last frame of a page is full a new page starts, using the template
//! requested by the most recent `NextPageTemplate`, or the current one.

use crate::markup;
use crate::styles::ParagraphStyle;
use crate::templates::{Frame, PageTemplate, TemplateSet};
use crate::{ReportError, Result};
use pdf_core::{wrap_text, Align, Canvas, Color, FontHandle, XObject};
use std::collections::VecDeque;
use std::sync::Arc;

/// Cell formatting of a table
#[derive(Debug, Clone, PartialEq)]
pub struct TableStyle {
    pub column_width: f64,
    pub header_font_size: f64,
    pub body_font_size: f64,
    pub header_background: Option<Color>,
    pub header_align: Align,
    pub body_align: Align,
    pub text_color: Color,
    pub grid_color: Color,
    pub grid_width: f64,
    pub padding_x: f64,
    pub padding_y: f64,
}

impl Default for TableStyle {
    fn default() -> Self {
        Self {
            column_width: 120.0,
            header_font_size: 12.0,
            body_font_size: 10.0,
            header_background: Color::from_hex("#d5dae6"),
            header_align: Align::Center,
            body_align: Align::Left,
            text_color: Color::darkslategray(),
            grid_color: Color::grey(),
            grid_width: 0.5,
            padding_x: 6.0,
            padding_y: 3.0,
        }
    }
}

/// Rows of plain-text cells; the first row is the header
#[derive(Debug, Clone)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
    pub font: FontHandle,
    pub style: TableStyle,
}

impl Table {
    fn columns(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Content to be laid out
#[derive(Debug, Clone)]
pub enum Flowable {
    /// Escaped paragraph text
    Paragraph { text: String, style: ParagraphStyle },
    Spacer { height: f64 },
    Image {
        xobject: Arc<XObject>,
        width: f64,
        height: f64,
    },
    Table(Arc<Table>),
    PageBreak,
    FrameBreak,
    NextPageTemplate(String),
}

/// Something painted on a page, in page coordinates
#[derive(Debug, Clone)]
pub enum Mark {
    /// One line of text anchored at (x, y) on the baseline
    Text {
        x: f64,
        y: f64,
        text: String,
        font: FontHandle,
        size: f64,
        color: Color,
        align: Align,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Option<Color>,
        stroke: Option<(Color, f64)>,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        color: Color,
        width: f64,
    },
    Image {
        xobject: Arc<XObject>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

impl Mark {
    pub fn paint(&self, canvas: &mut Canvas) -> pdf_core::Result<()> {
        match self {
            Mark::Text {
                x,
                y,
                text,
                font,
                size,
                color,
                align,
            } => {
                let mut canvas = canvas.saved();
                canvas.set_fill_color(*color);
                canvas.set_font(font, *size);
                canvas.draw_string(*x, *y, text, *align)?;
            }
            Mark::Rect {
                x,
                y,
                width,
                height,
                fill,
                stroke,
            } => {
                let mut canvas = canvas.saved();
                if let Some(color) = fill {
                    canvas.set_fill_color(*color);
                }
                if let Some((color, line_width)) = stroke {
                    canvas.set_stroke_color(*color);
                    canvas.set_line_width(*line_width);
                }
                canvas.rect(*x, *y, *width, *height, stroke.is_some(), fill.is_some());
            }
            Mark::Line {
                x1,
                y1,
                x2,
                y2,
                color,
                width,
            } => {
                let mut canvas = canvas.saved();
                canvas.set_stroke_color(*color);
                canvas.set_line_width(*width);
                canvas.line(*x1, *y1, *x2, *y2);
            }
            Mark::Image {
                xobject,
                x,
                y,
                width,
                height,
            } => canvas.draw_xobject(xobject, *x, *y, *width, *height),
        }
        Ok(())
    }
}

/// Marks placed in one frame
#[derive(Debug, Clone)]
pub struct FrameLayout {
    pub frame_id: String,
    pub items: Vec<Mark>,
}

/// A page after layout
#[derive(Debug, Clone)]
pub struct LaidOutPage {
    pub template: String,
    /// 1-based page number
    pub number: usize,
    pub frames: Vec<FrameLayout>,
}

impl LaidOutPage {
    pub fn is_empty(&self) -> bool {
        self.frames.iter().all(|f| f.items.is_empty())
    }

    /// Text of every text mark, in placement order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().flat_map(|f| {
            f.items.iter().filter_map(|m| match m {
                Mark::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
        })
    }
}

/// Work queue entries; split remainders are pushed back to the front
enum Item {
    Flow(Flowable),
    Lines {
        style: ParagraphStyle,
        lines: Vec<String>,
        first: bool,
    },
    Rows { table: Arc<Table>, start: usize },
}

struct Layouter<'a> {
    templates: &'a TemplateSet,
    template: &'a PageTemplate,
    next_template: Option<&'a PageTemplate>,
    pages: Vec<LaidOutPage>,
    frame_index: usize,
    /// Top of the free space in the current frame
    cursor: f64,
    /// Nothing has been placed in the current frame yet
    at_top: bool,
}

impl<'a> Layouter<'a> {
    fn frame(&self) -> &'a Frame {
        &self.template.frames[self.frame_index]
    }

    fn start_page(&mut self) {
        if let Some(template) = self.next_template.take() {
            self.template = template;
        }
        self.pages.push(LaidOutPage {
            template: self.template.id.clone(),
            number: self.pages.len() + 1,
            frames: self
                .template
                .frames
                .iter()
                .map(|f| FrameLayout {
                    frame_id: f.id.clone(),
                    items: Vec::new(),
                })
                .collect(),
        });
        self.frame_index = 0;
        self.reset_cursor();
    }

    fn reset_cursor(&mut self) {
        self.cursor = self.frame().content_top();
        self.at_top = true;
    }

    fn next_frame(&mut self) {
        if self.frame_index + 1 < self.template.frames.len() {
            self.frame_index += 1;
            self.reset_cursor();
        } else {
            self.start_page();
        }
    }

    fn available(&self) -> f64 {
        self.cursor - self.frame().content_bottom()
    }

    fn push(&mut self, mark: Mark) {
        let index = self.frame_index;
        if let Some(page) = self.pages.last_mut() {
            page.frames[index].items.push(mark);
        }
    }

    fn run(&mut self, flowables: Vec<Flowable>) -> Result<()> {
        let mut queue: VecDeque<Item> = flowables.into_iter().map(Item::Flow).collect();

        while let Some(item) = queue.pop_front() {
            match item {
                Item::Flow(Flowable::PageBreak) => self.start_page(),
                Item::Flow(Flowable::FrameBreak) => self.next_frame(),
                Item::Flow(Flowable::NextPageTemplate(name)) => {
                    self.next_template = Some(self.templates.require(&name)?);
                }
                Item::Flow(Flowable::Spacer { height }) => {
                    if self.at_top {
                        continue;
                    }
                    if height > self.available() {
                        self.next_frame();
                    } else {
                        self.cursor -= height;
                    }
                }
                Item::Flow(Flowable::Paragraph { text, style }) => {
                    let text = markup::unescape(&text);
                    let lines = if text.is_empty() {
                        Vec::new()
                    } else {
                        text.split('\n').map(str::to_string).collect()
                    };
                    queue.push_front(Item::Lines {
                        style,
                        lines,
                        first: true,
                    });
                }
                Item::Flow(Flowable::Image {
                    xobject,
                    width,
                    height,
                }) => {
                    if height > self.available() && !self.at_top {
                        self.next_frame();
                        queue.push_front(Item::Flow(Flowable::Image {
                            xobject,
                            width,
                            height,
                        }));
                        continue;
                    }
                    if height > self.available() {
                        log::warn!("Image of height {height:.1} is taller than its frame");
                    }
                    let frame = self.frame();
                    let x = frame.content_x() + (frame.content_width() - width) / 2.0;
                    let y = self.cursor - height;
                    self.push(Mark::Image {
                        xobject,
                        x,
                        y,
                        width,
                        height,
                    });
                    self.cursor = y;
                    self.at_top = false;
                }
                Item::Flow(Flowable::Table(table)) => {
                    queue.push_front(Item::Rows { table, start: 0 });
                }
                Item::Lines {
                    style,
                    lines,
                    first,
                } => {
                    if let Some(rest) = self.place_lines(&style, lines, first) {
                        queue.push_front(Item::Lines {
                            style,
                            lines: rest,
                            first: false,
                        });
                    }
                }
                Item::Rows { table, start } => {
                    if let Some(next) = self.place_rows(&table, start) {
                        queue.push_front(Item::Rows { table, start: next });
                    }
                }
            }
        }
        Ok(())
    }

    /// Place as many lines as fit; returns the lines left for the next frame
    fn place_lines(
        &mut self,
        style: &ParagraphStyle,
        lines: Vec<String>,
        first: bool,
    ) -> Option<Vec<String>> {
        let frame = self.frame();
        let width = (frame.content_width() - style.left_indent).max(1.0);
        let measure = |s: &str| style.font.text_width_points(s, style.font_size);
        let mut lines: Vec<String> = lines
            .iter()
            .flat_map(|line| wrap_text(line, width, &measure))
            .collect();

        let space_before = if first && !self.at_top {
            style.space_before
        } else {
            0.0
        };
        let available = self.available() - space_before;
        let mut fit = if style.leading > 0.0 {
            ((available / style.leading) + 1e-9).floor().max(0.0) as usize
        } else {
            lines.len()
        };
        fit = fit.min(lines.len());

        if fit == 0 && !lines.is_empty() {
            if !self.at_top {
                self.next_frame();
                return Some(lines);
            }
            // Not even one line fits an empty frame; overflow rather than loop
            fit = 1;
        }

        let top = self.cursor - space_before;
        let ascent = style.font.ascent() / 1000.0 * style.font_size;
        let align = style.alignment.to_align();
        let x = match align {
            Align::Left => frame.content_x() + style.left_indent,
            Align::Center => frame.content_x() + style.left_indent + width / 2.0,
            Align::Right => frame.content_x() + frame.content_width(),
        };

        let rest = lines.split_off(fit);
        for (i, text) in lines.into_iter().enumerate() {
            self.push(Mark::Text {
                x,
                y: top - ascent - i as f64 * style.leading,
                text,
                font: FontHandle::clone(&style.font),
                size: style.font_size,
                color: style.text_color,
                align,
            });
        }
        self.cursor = top - fit as f64 * style.leading;
        self.at_top = false;

        if rest.is_empty() {
            self.cursor -= style.space_after;
            None
        } else {
            self.next_frame();
            Some(rest)
        }
    }

    /// Place rows from `start` on; returns the first row left over
    fn place_rows(&mut self, table: &Table, start: usize) -> Option<usize> {
        let style = &table.style;
        let columns = table.columns();
        if columns == 0 || start >= table.rows.len() {
            return None;
        }

        let frame = self.frame();
        let table_width = columns as f64 * style.column_width;
        let x0 = frame.content_x() + (frame.content_width() - table_width) / 2.0;
        let (ascent, descent) = (table.font.ascent() / 1000.0, table.font.descent() / 1000.0);

        let mut row_index = start;
        while let Some(row) = table.rows.get(row_index) {
            let header = row_index == 0;
            let size = if header {
                style.header_font_size
            } else {
                style.body_font_size
            };
            let leading = 1.2 * size;
            let cells: Vec<Vec<&str>> = row.iter().map(|c| c.split('\n').collect()).collect();
            let line_count = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
            let row_height = line_count as f64 * leading + 2.0 * style.padding_y;

            if row_height > self.available() && !(self.at_top && row_index == start) {
                break;
            }

            let top = self.cursor;
            for column in 0..columns {
                let cell_x = x0 + column as f64 * style.column_width;
                self.push(Mark::Rect {
                    x: cell_x,
                    y: top - row_height,
                    width: style.column_width,
                    height: row_height,
                    fill: if header { style.header_background } else { None },
                    stroke: Some((style.grid_color, style.grid_width)),
                });

                let Some(lines) = cells.get(column) else {
                    continue;
                };
                let align = if header {
                    style.header_align
                } else {
                    style.body_align
                };
                let x = match align {
                    Align::Left => cell_x + style.padding_x,
                    Align::Center => cell_x + style.column_width / 2.0,
                    Align::Right => cell_x + style.column_width - style.padding_x,
                };
                // Center the block of lines vertically, each glyph box within its line
                let offset = (row_height - lines.len() as f64 * leading) / 2.0;
                for (i, line) in lines.iter().enumerate() {
                    let middle = top - offset - (i as f64 + 0.5) * leading;
                    self.push(Mark::Text {
                        x,
                        y: middle - size * (ascent + descent) / 2.0,
                        text: line.to_string(),
                        font: FontHandle::clone(&table.font),
                        size,
                        color: style.text_color,
                        align,
                    });
                }
            }

            self.cursor = top - row_height;
            self.at_top = false;
            row_index += 1;
        }

        if row_index < table.rows.len() {
            self.next_frame();
            Some(row_index)
        } else {
            None
        }
    }
}

/// Lay `flowables` out, starting on the first template of `templates`
///
/// Always yields at least one page. A trailing page opened by a break that
/// received no content is dropped.
pub fn layout(flowables: Vec<Flowable>, templates: &TemplateSet) -> Result<Vec<LaidOutPage>> {
    let first = templates
        .first()
        .ok_or_else(|| ReportError::MissingConfig("page templates".to_string()))?;
    for id in templates.ids() {
        if templates.require(id)?.frames.is_empty() {
            return Err(ReportError::EmptyTemplate(id.to_string()));
        }
    }

    let mut layouter = Layouter {
        templates,
        template: first,
        next_template: None,
        pages: Vec::new(),
        frame_index: 0,
        cursor: 0.0,
        at_top: true,
    };
    layouter.start_page();
    layouter.run(flowables)?;

    let mut pages = layouter.pages;
    if pages.len() > 1 && pages.last().map(LaidOutPage::is_empty).unwrap_or(false) {
        pages.pop();
    }
    Ok(pages)
}
