//! Paragraph styles
//!
//! The stock set mirrors the usual sample stylesheet (`Normal`, `BodyText`,
//! headings, `Code`, ...). Six custom styles are layered on top, and every
//! style is then switched to the resolved document font.

use pdf_core::{Align, Color, FontHandle};
use std::collections::HashMap;
use std::fmt;

/// Horizontal alignment of paragraph lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    /// Laid out flush left; lines are not stretched
    Justify,
}

impl Alignment {
    pub fn to_align(self) -> Align {
        match self {
            Alignment::Left | Alignment::Justify => Align::Left,
            Alignment::Center => Align::Center,
            Alignment::Right => Align::Right,
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        };
        f.write_str(name)
    }
}

/// A named paragraph style
#[derive(Debug, Clone)]
pub struct ParagraphStyle {
    pub name: String,
    pub parent: Option<String>,
    pub font: FontHandle,
    pub font_size: f64,
    pub leading: f64,
    pub alignment: Alignment,
    pub space_before: f64,
    pub space_after: f64,
    pub left_indent: f64,
    pub text_color: Color,
}

impl ParagraphStyle {
    fn root(name: &str, font: &FontHandle) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            font: FontHandle::clone(font),
            font_size: 10.0,
            leading: 12.0,
            alignment: Alignment::Left,
            space_before: 0.0,
            space_after: 0.0,
            left_indent: 0.0,
            text_color: Color::black(),
        }
    }

    /// A copy of `self` renamed to `name`, with `self` as parent
    fn derive(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: Some(self.name.clone()),
            ..self.clone()
        }
    }

    fn sized(mut self, font_size: f64, leading: f64) -> Self {
        self.font_size = font_size;
        self.leading = leading;
        self
    }

    fn spaced(mut self, before: f64, after: f64) -> Self {
        self.space_before = before;
        self.space_after = after;
        self
    }

    /// Attribute listing shown on the style catalogue page
    pub fn describe(&self) -> String {
        let c = self.text_color;
        let hex = |v: f64| (v * 255.0).round() as u8;
        format!(
            "{{fontName: {}, fontSize: {}, leading: {}, alignment: {}, spaceBefore: {}, spaceAfter: {}, textColor: #{:02x}{:02x}{:02x}}}",
            self.font.name(),
            self.font_size,
            self.leading,
            self.alignment,
            self.space_before,
            self.space_after,
            hex(c.r),
            hex(c.g),
            hex(c.b),
        )
    }
}

/// Overrides applied to a parent style to define a custom style
#[derive(Debug, Clone, Default)]
pub struct CustomStyle {
    pub name: &'static str,
    pub parent: &'static str,
    pub font_size: Option<f64>,
    pub leading: Option<f64>,
    pub alignment: Option<Alignment>,
    pub space_before: Option<f64>,
    pub space_after: Option<f64>,
    pub text_color: Option<Color>,
}

/// The report's own styles
pub fn custom_styles() -> Vec<CustomStyle> {
    vec![
        CustomStyle {
            name: "cTitle",
            parent: "Heading1",
            font_size: Some(24.0),
            leading: Some(28.0),
            alignment: Some(Alignment::Center),
            space_after: Some(20.0),
            text_color: Some(Color::darkblue()),
            ..Default::default()
        },
        CustomStyle {
            name: "cSubTitle",
            parent: "Heading2",
            font_size: Some(14.0),
            leading: Some(18.0),
            alignment: Some(Alignment::Center),
            space_after: Some(15.0),
            text_color: Some(Color::darkblue()),
            ..Default::default()
        },
        CustomStyle {
            name: "cBodyText",
            parent: "BodyText",
            font_size: Some(12.0),
            leading: Some(15.0),
            alignment: Some(Alignment::Left),
            space_after: Some(10.0),
            ..Default::default()
        },
        CustomStyle {
            name: "cCenteredText",
            parent: "Normal",
            font_size: Some(12.0),
            leading: Some(15.0),
            alignment: Some(Alignment::Center),
            space_after: Some(10.0),
            ..Default::default()
        },
        CustomStyle {
            name: "cImageCaption",
            parent: "Italic",
            font_size: Some(10.0),
            leading: Some(12.0),
            alignment: Some(Alignment::Center),
            space_before: Some(5.0),
            space_after: Some(15.0),
            ..Default::default()
        },
        CustomStyle {
            name: "cStopper",
            parent: "Normal",
            font_size: Some(14.0),
            leading: Some(10.0),
            alignment: Some(Alignment::Center),
            space_before: Some(10.0),
            text_color: Some(Color::darkred()),
            ..Default::default()
        },
    ]
}

/// Styles by name, in definition order, with short aliases
#[derive(Debug, Clone)]
pub struct StyleSet {
    styles: Vec<ParagraphStyle>,
    aliases: HashMap<String, String>,
}

impl StyleSet {
    /// Stock styles plus the report's custom styles, all using `font`
    pub fn build(font: &FontHandle) -> Self {
        Self::build_with(font, &custom_styles())
    }

    /// Stock styles plus `custom`, all using `font`
    ///
    /// A custom style whose name is taken keeps the existing definition.
    pub fn build_with(font: &FontHandle, custom: &[CustomStyle]) -> Self {
        let mut set = Self::stock(font);

        for entry in custom {
            if set.contains(entry.name) {
                log::warn!(
                    "Define {}, but the sample style already has it, so I am ignoring it.",
                    entry.name
                );
                continue;
            }
            let Some(parent) = set.get(entry.parent) else {
                log::warn!("Style {} has unknown parent {}, skipped", entry.name, entry.parent);
                continue;
            };

            let mut style = parent.derive(entry.name);
            if let Some(v) = entry.font_size {
                style.font_size = v;
            }
            if let Some(v) = entry.leading {
                style.leading = v;
            }
            if let Some(v) = entry.alignment {
                style.alignment = v;
            }
            if let Some(v) = entry.space_before {
                style.space_before = v;
            }
            if let Some(v) = entry.space_after {
                style.space_after = v;
            }
            if let Some(v) = entry.text_color {
                style.text_color = v;
            }
            log::debug!("Using style: {}", style.name);
            set.styles.push(style);
        }

        for style in &mut set.styles {
            style.font = FontHandle::clone(font);
            log::debug!("Update styles[{}].fontName = {}", style.name, font.name());
        }

        set
    }

    fn stock(font: &FontHandle) -> Self {
        let normal = ParagraphStyle::root("Normal", font);
        let body = normal.derive("BodyText").spaced(6.0, 0.0);
        let italic = body.derive("Italic");
        let heading = |name: &str, size: f64, leading: f64, before: f64, after: f64| {
            normal.derive(name).sized(size, leading).spaced(before, after)
        };

        let mut title = heading("Title", 18.0, 22.0, 0.0, 6.0);
        title.alignment = Alignment::Center;

        let mut definition = normal.derive("Definition").spaced(6.0, 0.0);
        definition.left_indent = 36.0;
        let mut code = normal.derive("Code").sized(8.0, 8.8);
        code.left_indent = 36.0;

        let styles = vec![
            heading("Heading1", 18.0, 22.0, 0.0, 6.0),
            title,
            heading("Heading2", 14.0, 18.0, 12.0, 6.0),
            heading("Heading3", 12.0, 14.0, 12.0, 6.0),
            heading("Heading4", 10.0, 12.0, 10.0, 4.0),
            heading("Heading5", 9.0, 10.8, 8.0, 4.0),
            heading("Heading6", 7.0, 8.4, 6.0, 2.0),
            normal.derive("Bullet").spaced(3.0, 0.0),
            definition,
            code,
        ];

        let aliases = [
            ("title", "Title"),
            ("h1", "Heading1"),
            ("h2", "Heading2"),
            ("h3", "Heading3"),
            ("h4", "Heading4"),
            ("h5", "Heading5"),
            ("h6", "Heading6"),
            ("bu", "Bullet"),
            ("df", "Definition"),
            ("code", "Code"),
        ]
        .into_iter()
        .map(|(alias, name)| (alias.to_string(), name.to_string()))
        .collect();

        let mut all = vec![normal, body, italic];
        all.extend(styles);
        Self {
            styles: all,
            aliases,
        }
    }

    /// Look a style up by name or alias
    pub fn get(&self, name: &str) -> Option<&ParagraphStyle> {
        let name = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.styles.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Style names in definition order (aliases excluded)
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.styles.iter().map(|s| s.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParagraphStyle> {
        self.styles.iter()
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_core::FontData;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn font() -> FontHandle {
        Arc::new(FontData::builtin_cid("STSong-Light").unwrap())
    }

    #[test]
    fn test_stock_and_custom_styles() {
        let styles = StyleSet::build(&font());
        let names: Vec<&str> = styles.names().collect();
        assert_eq!(
            names,
            vec![
                "Normal", "BodyText", "Italic", "Heading1", "Title", "Heading2", "Heading3",
                "Heading4", "Heading5", "Heading6", "Bullet", "Definition", "Code", "cTitle",
                "cSubTitle", "cBodyText", "cCenteredText", "cImageCaption", "cStopper",
            ]
        );
    }

    #[test]
    fn test_custom_style_values() {
        let styles = StyleSet::build(&font());

        let title = styles.get("cTitle").unwrap();
        assert_eq!(title.parent.as_deref(), Some("Heading1"));
        assert_eq!((title.font_size, title.leading), (24.0, 28.0));
        assert_eq!(title.alignment, Alignment::Center);
        assert_eq!(title.space_after, 20.0);
        assert_eq!(title.text_color, Color::darkblue());

        let body = styles.get("cBodyText").unwrap();
        // inherited from BodyText
        assert_eq!(body.space_before, 6.0);
        assert_eq!(body.space_after, 10.0);

        let stopper = styles.get("cStopper").unwrap();
        assert_eq!(stopper.text_color, Color::darkred());
        assert_eq!(stopper.leading, 10.0);
    }

    #[test]
    fn test_every_style_uses_the_resolved_font() {
        let font = font();
        let styles = StyleSet::build(&font);
        assert!(styles.iter().all(|s| Arc::ptr_eq(&s.font, &font)));
    }

    #[test]
    fn test_aliases() {
        let styles = StyleSet::build(&font());
        assert_eq!(styles.get("h2").unwrap().name, "Heading2");
        assert_eq!(styles.get("code").unwrap().left_indent, 36.0);
        assert!(styles.get("nonexistent").is_none());
    }

    #[test]
    fn test_collision_keeps_stock_style() {
        let custom = vec![CustomStyle {
            name: "Normal",
            parent: "Heading1",
            font_size: Some(99.0),
            ..Default::default()
        }];
        let styles = StyleSet::build_with(&font(), &custom);
        assert_eq!(styles.get("Normal").unwrap().font_size, 10.0);
        assert_eq!(styles.len(), 13);
    }

    #[test]
    fn test_describe() {
        let styles = StyleSet::build(&font());
        assert_eq!(
            styles.get("cSubTitle").unwrap().describe(),
            "{fontName: STSong-Light, fontSize: 14, leading: 18, alignment: center, \
             spaceBefore: 12, spaceAfter: 15, textColor: #00008b}"
        );
    }
}
