//! Inline style declarations (`style="..."` attribute).

use smol_str::SmolStr;

/// Parsed inline style of an element.
///
/// Property names are stored lower-cased; declaration order is preserved so
/// serialization is stable across parse/serialize cycles.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct StyleDeclaration {
    entries: Vec<(SmolStr, String)>,
}

impl StyleDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `style` attribute value. Malformed declarations are skipped.
    pub fn parse(text: &str) -> Self {
        let mut style = Self::new();
        for decl in split_declarations(text) {
            let Some((name, value)) = decl.split_once(':') else {
                continue;
            };
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                continue;
            }
            style.set(name, value);
        }
        style
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a property, replacing an existing value in place.
    pub fn set(&mut self, name: &str, value: &str) {
        let value = value.trim().to_string();
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            entry.1 = value;
        } else {
            self.entries
                .push((SmolStr::new(name.to_ascii_lowercase()), value));
        }
    }

    /// Remove a property. Returns true if it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        before != self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Serialize back to attribute text (`a: b; c: d`).
    pub fn to_css_text(&self) -> String {
        let mut out = String::new();
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push_str("; ");
            }
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
        }
        out
    }
}

/// Split on `;` while ignoring semicolons inside parentheses or quotes
/// (`url(data:...;base64,...)`, `font-family: "a;b"`).
fn split_declarations(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize() {
        let style = StyleDeclaration::parse("Font-Weight: bold; color:red;;");
        assert_eq!(style.get("font-weight"), Some("bold"));
        assert_eq!(style.get("COLOR"), Some("red"));
        assert_eq!(style.len(), 2);
        assert_eq!(style.to_css_text(), "font-weight: bold; color: red");
    }

    #[test]
    fn test_parenthesized_semicolons() {
        let style = StyleDeclaration::parse(
            "background-image: url(data:image/png;base64,AAAA); color: blue",
        );
        assert_eq!(
            style.get("background-image"),
            Some("url(data:image/png;base64,AAAA)")
        );
        assert_eq!(style.get("color"), Some("blue"));
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut style = StyleDeclaration::parse("color: red; font-size: 12px");
        style.set("color", "blue");
        assert_eq!(style.to_css_text(), "color: blue; font-size: 12px");
        assert!(style.remove("color"));
        assert!(!style.remove("color"));
        assert_eq!(style.to_css_text(), "font-size: 12px");
    }

    #[test]
    fn test_malformed_declarations_skipped() {
        let style = StyleDeclaration::parse("nonsense; : red; color:");
        assert!(style.is_empty());
    }
}
