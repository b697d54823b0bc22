//! Text rendering utilities

use crate::Align;

/// One line of text set in a single font resource
#[derive(Debug, Clone, Copy)]
pub struct TextRun<'a> {
    /// Resource name of the font on the page, e.g. `F1`
    pub resource: &'a str,
    pub size: f64,
    /// Advance width of the whole line in points
    pub width: f64,
}

impl TextRun<'_> {
    /// `BT ... ET` block showing `hex` with its `align` side at (x, y)
    ///
    /// The fill color comes from the current graphics state.
    pub fn operators(&self, hex: &str, x: f64, y: f64, align: Align) -> String {
        let start = match align {
            Align::Left => x,
            Align::Center => x - self.width / 2.0,
            Align::Right => x - self.width,
        };
        format!(
            "BT\n/{} {} Tf\n{} {} Td\n{hex} Tj\nET\n",
            self.resource,
            format_number(self.size),
            format_number(start),
            format_number(y),
        )
    }
}

/// Format a number for a content stream
///
/// Values are rounded to four decimals and trailing zeros are dropped, so
/// `50.0` becomes `50` and `0.123456` becomes `0.1235`.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let text = format!("{rounded:.4}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    text.to_string()
}

/// Whether a character may be broken before or after without a space
pub(crate) fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x2E80..=0x2FDF
        | 0x3000..=0x303F
        | 0x3040..=0x30FF
        | 0x3100..=0x31BF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xAC00..=0xD7AF
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFFEF
        | 0x20000..=0x2FA1F)
}

/// Split a line into breakable tokens: words, whitespace runs and single
/// CJK characters.
fn split_tokens(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;

    for (idx, c) in line.char_indices() {
        if let Some(p) = prev {
            let boundary = is_cjk(c)
                || is_cjk(p)
                || c.is_whitespace() != p.is_whitespace();
            if boundary {
                tokens.push(&line[start..idx]);
                start = idx;
            }
        }
        prev = Some(c);
    }
    if start < line.len() {
        tokens.push(&line[start..]);
    }
    tokens
}

fn split_at_width<F: Fn(&str) -> f64>(s: &str, max_width: f64, measure: &F) -> (String, String) {
    let mut head = String::new();
    for (idx, c) in s.char_indices() {
        head.push(c);
        if measure(&head) > max_width && head.chars().count() > 1 {
            head.pop();
            return (head, s[idx..].to_string());
        }
    }
    (head, String::new())
}

/// Split text into lines no wider than `max_width`
///
/// Latin text breaks at spaces, CJK text breaks between any two characters,
/// and words wider than a whole line are broken by character. Newlines
/// always start a new line.
///
/// # Arguments
/// * `text` - Text to split
/// * `max_width` - Maximum line width in points
/// * `measure` - Width of a string in points
pub fn wrap_text<F: Fn(&str) -> f64>(text: &str, max_width: f64, measure: F) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();

        for token in split_tokens(paragraph) {
            if token.chars().all(char::is_whitespace) {
                if !current.is_empty() {
                    current.push_str(token);
                }
                continue;
            }

            let candidate = format!("{current}{token}");
            if current.is_empty() || measure(candidate.trim_end()) <= max_width {
                current = candidate;
            } else {
                lines.push(current.trim_end().to_string());
                current = token.to_string();
            }

            while measure(&current) > max_width && current.chars().count() > 1 {
                let (head, tail) = split_at_width(&current, max_width, &measure);
                lines.push(head);
                current = tail;
            }
        }

        lines.push(current.trim_end().to_string());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ten_per_char(s: &str) -> f64 {
        s.chars().count() as f64 * 10.0
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(50.0), "50");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(0.123456), "0.1235");
        assert_eq!(format_number(-3.25), "-3.25");
        assert_eq!(format_number(-0.00001), "0");
    }

    #[test]
    fn test_text_run_left() {
        let run = TextRun {
            resource: "F1",
            size: 12.0,
            width: 100.0,
        };
        assert_eq!(
            run.operators("<0041>", 100.0, 700.0, Align::Left),
            "BT\n/F1 12 Tf\n100 700 Td\n<0041> Tj\nET\n"
        );
    }

    #[test]
    fn test_text_run_anchor_sides() {
        let run = TextRun {
            resource: "F2",
            size: 8.0,
            width: 40.0,
        };
        assert!(run.operators("<>", 451.28, 10.0, Align::Right).contains("411.28 10 Td"));
        assert!(run.operators("<>", 100.0, 10.0, Align::Center).contains("80 10 Td"));
    }

    #[test]
    fn test_wrap_latin_at_spaces() {
        let lines = wrap_text("hello world foo", 100.0, ten_per_char);
        assert_eq!(lines, vec!["hello", "world foo"]);
    }

    #[test]
    fn test_wrap_cjk_between_characters() {
        let lines = wrap_text("中文文本换行测试", 30.0, ten_per_char);
        assert_eq!(lines, vec!["中文文", "本换行", "测试"]);
    }

    #[test]
    fn test_wrap_mixed_text() {
        let lines = wrap_text("PDF生成工具", 50.0, ten_per_char);
        assert_eq!(lines, vec!["PDF生成", "工具"]);
    }

    #[test]
    fn test_wrap_breaks_long_words() {
        let lines = wrap_text("abcdefgh", 30.0, ten_per_char);
        assert_eq!(lines, vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_wrap_keeps_newlines() {
        let lines = wrap_text("one\n\ntwo", 100.0, ten_per_char);
        assert_eq!(lines, vec!["one", "", "two"]);
    }

    #[test]
    fn test_split_tokens() {
        let tokens = split_tokens("ab 中文 cd");
        assert_eq!(tokens, vec!["ab", " ", "中", "文", " ", "cd"]);
    }
}
