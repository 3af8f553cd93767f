//! User-agent defaults for the tags the processors know about.

use smol_str::SmolStr;

use crate::model::SegmentFormat;

/// How a tag lays out when it carries no `display` style.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Display {
    #[default]
    Inline,
    Block,
    ListItem,
    /// Table and its internal parts (rows, sections, cells).
    Table,
    /// Never rendered; skipped by the parser.
    None,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DefaultStyle {
    /// Character format implied by the tag itself, such as `<b>` being bold.
    pub segment: SegmentFormat,
    pub display: Display,
    /// Whitespace is preserved inside the element.
    pub is_pre: bool,
}

impl DefaultStyle {
    pub fn is_block(&self) -> bool {
        matches!(self.display, Display::Block | Display::ListItem | Display::Table)
    }
}

const HEADING_SIZES: [&str; 6] = ["2em", "1.5em", "1.17em", "1em", "0.83em", "0.67em"];

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "center", "details", "dialog", "dd", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hgroup", "hr", "main", "menu", "nav", "ol", "p", "pre", "section", "summary", "ul",
];

const TABLE_TAGS: &[&str] = &[
    "table", "caption", "colgroup", "col", "thead", "tbody", "tfoot", "tr", "td", "th",
];

const HIDDEN_TAGS: &[&str] = &[
    "base", "head", "link", "meta", "noscript", "script", "style", "template", "title",
];

/// Inline tags the parser has a dedicated meaning for. Anything else that
/// is neither block nor hidden is kept as an opaque general element.
const KNOWN_INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "big", "br", "cite", "code", "del", "dfn", "em", "font", "i",
    "img", "ins", "kbd", "label", "mark", "q", "s", "samp", "small", "span", "strike", "strong",
    "sub", "sup", "time", "tt", "u", "var", "wbr",
];

pub fn default_style(tag: &str) -> DefaultStyle {
    let mut style = DefaultStyle {
        display: display_of(tag),
        ..Default::default()
    };
    let segment = &mut style.segment;
    match tag {
        "b" | "strong" | "th" => segment.font_weight = Some(SmolStr::new_static("bold")),
        "i" | "em" | "cite" | "var" | "dfn" | "address" => segment.italic = Some(true),
        "u" | "ins" => segment.underline = Some(true),
        "s" | "strike" | "del" => segment.strikethrough = Some(true),
        "sup" => segment.super_or_sub_script = Some(SmolStr::new_static("super")),
        "sub" => segment.super_or_sub_script = Some(SmolStr::new_static("sub")),
        "code" | "kbd" | "samp" | "tt" => segment.font_family = Some(SmolStr::new_static("monospace")),
        "pre" => {
            segment.font_family = Some(SmolStr::new_static("monospace"));
            style.is_pre = true;
        }
        _ => {
            if let Some(level) = heading_level(tag) {
                segment.font_weight = Some(SmolStr::new_static("bold"));
                segment.font_size = Some(SmolStr::new_static(HEADING_SIZES[level - 1]));
            }
        }
    }
    style
}

fn display_of(tag: &str) -> Display {
    if tag == "li" {
        Display::ListItem
    } else if BLOCK_TAGS.contains(&tag) {
        Display::Block
    } else if TABLE_TAGS.contains(&tag) {
        Display::Table
    } else if HIDDEN_TAGS.contains(&tag) {
        Display::None
    } else {
        Display::Inline
    }
}

/// `1..=6` for `h1`..`h6`.
pub fn heading_level(tag: &str) -> Option<usize> {
    let level = tag.strip_prefix('h')?.parse::<usize>().ok()?;
    (1..=6).contains(&level).then_some(level)
}

pub fn is_known_inline(tag: &str) -> bool {
    KNOWN_INLINE_TAGS.contains(&tag)
}

pub fn is_hidden(tag: &str) -> bool {
    HIDDEN_TAGS.contains(&tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_defaults() {
        let h2 = default_style("h2");
        assert!(h2.is_block());
        assert!(h2.segment.is_bold());
        assert_eq!(h2.segment.font_size.as_deref(), Some("1.5em"));
        assert_eq!(heading_level("h7"), None);
        assert_eq!(heading_level("hr"), None);
    }

    #[test]
    fn test_display_classes() {
        assert_eq!(default_style("li").display, Display::ListItem);
        assert_eq!(default_style("td").display, Display::Table);
        assert_eq!(default_style("script").display, Display::None);
        assert_eq!(default_style("my-widget").display, Display::Inline);
        assert!(!is_known_inline("my-widget"));
        assert!(default_style("pre").is_pre);
    }
}
