//! HTML fragment parsing and serialization.
//!
//! The parser is a forgiving tokenizer plus a small tree builder: it handles
//! the implicit end tags that matter for editable content (`p`, `li`,
//! table rows and cells, headings), void and raw-text elements, and
//! character references. It never fails; unmatched end tags are dropped and
//! anything that does not look like markup is kept as text.

use std::fmt;

use markdown_weaver_escape::{StrWrite, escape_html, escape_html_body_text};
use smol_str::SmolStr;

use crate::node::{Dom, NodeData, NodeId};

/// Elements that never have children or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is not markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title", "xmp"];

/// Start tags that implicitly close an open `<p>`.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "div", "dl", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "li", "main", "nav", "ol", "p", "pre", "section", "table", "ul",
];

/// Open elements that stop an implicit close from reaching further up.
const SCOPE_BARRIERS: &[&str] = &["table", "td", "th", "caption", "button", "template"];

const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

#[derive(Debug, PartialEq)]
enum Token {
    StartTag {
        name: SmolStr,
        attrs: Vec<(SmolStr, String)>,
        self_closing: bool,
    },
    EndTag(SmolStr),
    Text(String),
    Comment(String),
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    /// Skip to just past the next occurrence of `pat`, returning the text in
    /// between. Consumes the rest of the input if `pat` is missing.
    fn take_until(&mut self, pat: &str) -> &'a str {
        let rest = self.rest();
        match rest.find(pat) {
            Some(i) => {
                self.pos += i + pat.len();
                &rest[..i]
            }
            None => {
                self.pos = self.input.len();
                rest
            }
        }
    }

    /// Raw content of a `script`/`style`-like element up to its end tag.
    fn raw_text(&mut self, tag: &str) -> &'a str {
        let rest = self.rest();
        let lower = rest.to_ascii_lowercase();
        let close = format!("</{tag}");
        match lower.find(&close) {
            Some(i) => {
                self.pos += i;
                &rest[..i]
            }
            None => {
                self.pos = self.input.len();
                rest
            }
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        let rest = self.rest();
        if rest.is_empty() {
            return None;
        }

        if let Some(after) = rest.strip_prefix('<') {
            if after.starts_with("!--") {
                self.pos += 4;
                let text = self.take_until("-->");
                return Some(Token::Comment(text.to_string()));
            }
            if after.starts_with('!') || after.starts_with('?') {
                // Doctype, CDATA and processing instructions carry no content.
                self.take_until(">");
                return self.next_token();
            }
            if let Some(name_start) = after.strip_prefix('/') {
                if name_start.starts_with(|c: char| c.is_ascii_alphabetic()) {
                    self.pos += 2;
                    let name = self.tag_name();
                    self.take_until(">");
                    return Some(Token::EndTag(name));
                }
            } else if after.starts_with(|c: char| c.is_ascii_alphabetic()) {
                self.pos += 1;
                return Some(self.start_tag());
            }
            // A lone `<` is text.
            self.pos += 1;
            let mut text = String::from("<");
            text.push_str(&decode_entities(self.take_while(|c| c != '<')));
            return Some(Token::Text(text));
        }

        let text = self.take_while(|c| c != '<');
        Some(Token::Text(decode_entities(text)))
    }

    fn tag_name(&mut self) -> SmolStr {
        let name = self.take_while(|c| !c.is_ascii_whitespace() && c != '>' && c != '/');
        SmolStr::new(name.to_ascii_lowercase())
    }

    fn start_tag(&mut self) -> Token {
        let name = self.tag_name();
        let mut attrs: Vec<(SmolStr, String)> = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some('>') => {
                    self.bump();
                    break;
                }
                Some('/') => {
                    self.bump();
                    if self.peek() == Some('>') {
                        self.bump();
                        self_closing = true;
                        break;
                    }
                }
                Some(_) => {
                    let attr_name = self
                        .take_while(|c| !c.is_ascii_whitespace() && !matches!(c, '=' | '>' | '/'))
                        .to_ascii_lowercase();
                    if attr_name.is_empty() {
                        // Stray `=` or similar.
                        self.bump();
                        continue;
                    }
                    self.skip_whitespace();
                    let value = if self.peek() == Some('=') {
                        self.bump();
                        self.skip_whitespace();
                        self.attr_value()
                    } else {
                        String::new()
                    };
                    if !attrs.iter().any(|(n, _)| *n == attr_name) {
                        attrs.push((SmolStr::new(attr_name), value));
                    }
                }
            }
        }

        Token::StartTag {
            name,
            attrs,
            self_closing,
        }
    }

    fn attr_value(&mut self) -> String {
        match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump();
                let raw = self.take_until(if q == '"' { "\"" } else { "'" });
                decode_entities(raw)
            }
            _ => decode_entities(self.take_while(|c| !c.is_ascii_whitespace() && c != '>')),
        }
    }
}

/// Decode named and numeric character references.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match decode_reference(rest) {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode one reference at the start of `text` (which begins with `&`).
/// Returns the character and the number of bytes consumed.
fn decode_reference(text: &str) -> Option<(char, usize)> {
    let end = text[1..].find(';')? + 1;
    if end > 32 {
        return None;
    }
    let body = &text[1..end];
    let c = if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        char::from_u32(code).unwrap_or('\u{fffd}')
    } else {
        match body {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            "nbsp" => '\u{a0}',
            "copy" => '\u{a9}',
            "reg" => '\u{ae}',
            "trade" => '\u{2122}',
            "hellip" => '\u{2026}',
            "mdash" => '\u{2014}',
            "ndash" => '\u{2013}',
            "lsquo" => '\u{2018}',
            "rsquo" => '\u{2019}',
            "ldquo" => '\u{201c}',
            "rdquo" => '\u{201d}',
            "bull" => '\u{2022}',
            "middot" => '\u{b7}',
            "zwj" => '\u{200d}',
            "zwnj" => '\u{200c}',
            _ => return None,
        }
    };
    Some((c, end + 1))
}

/// Stack-based tree builder writing into a detached container.
struct TreeBuilder<'d> {
    dom: &'d mut Dom,
    stack: Vec<NodeId>,
}

impl<'d> TreeBuilder<'d> {
    fn current(&self) -> NodeId {
        // The container at index 0 is never popped.
        self.stack[self.stack.len() - 1]
    }

    fn current_tag(&self) -> Option<&str> {
        self.dom.tag_name(self.current())
    }

    /// Find an open element named one of `tags`, looking no further than
    /// the nearest barrier. Returns its stack index.
    fn find_in_scope(&self, tags: &[&str], barriers: &[&str]) -> Option<usize> {
        for index in (1..self.stack.len()).rev() {
            let tag = self.dom.tag_name(self.stack[index]).unwrap_or_default();
            if tags.contains(&tag) {
                return Some(index);
            }
            if barriers.contains(&tag) {
                return None;
            }
        }
        None
    }

    fn pop_to(&mut self, index: usize) {
        self.stack.truncate(index.max(1));
    }

    fn append(&mut self, node: NodeId) {
        let parent = self.current();
        if let Err(err) = self.dom.append_child(parent, node) {
            tracing::warn!(target: "trellis::dom", ?err, "dropping node during parse");
        }
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let parent = self.current();
        if let Some(last) = self.dom.last_child(parent) {
            if let NodeData::Text(existing) = &self.dom.node(last).data {
                let merged = format!("{existing}{text}");
                self.dom.set_text(last, &merged);
                return;
            }
        }
        let node = self.dom.create_text(text);
        self.append(node);
    }

    fn start_tag(&mut self, name: &str, attrs: &[(SmolStr, String)], self_closing: bool) {
        self.close_implied(name);

        let element = self.dom.create_element(name);
        for (attr, value) in attrs {
            self.dom.set_attribute(element, attr, value);
        }
        self.append(element);

        if !is_void_element(name) && !self_closing {
            self.stack.push(element);
        }
    }

    fn close_implied(&mut self, name: &str) {
        if CLOSES_PARAGRAPH.contains(&name) {
            if let Some(index) = self.find_in_scope(&["p"], SCOPE_BARRIERS) {
                self.pop_to(index);
            }
        }
        match name {
            "li" => {
                let barriers: Vec<&str> =
                    SCOPE_BARRIERS.iter().copied().chain(["ol", "ul"]).collect();
                if let Some(index) = self.find_in_scope(&["li"], &barriers) {
                    self.pop_to(index);
                }
            }
            "dt" | "dd" => {
                if let Some(index) = self.find_in_scope(&["dt", "dd"], SCOPE_BARRIERS) {
                    self.pop_to(index);
                }
            }
            "tr" => {
                if let Some(index) = self.find_in_scope(&["tr"], &["table"]) {
                    self.pop_to(index);
                }
            }
            "td" | "th" => {
                if let Some(index) = self.find_in_scope(&["td", "th"], &["tr", "table"]) {
                    self.pop_to(index);
                }
            }
            "tbody" | "thead" | "tfoot" => {
                if let Some(index) =
                    self.find_in_scope(&["tbody", "thead", "tfoot"], &["table"])
                {
                    self.pop_to(index);
                }
            }
            h if HEADINGS.contains(&h) => {
                if self.current_tag().is_some_and(|t| HEADINGS.contains(&t)) {
                    let top = self.stack.len() - 1;
                    self.pop_to(top);
                }
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, name: &str) {
        if name == "br" {
            // `</br>` is treated as `<br>`.
            self.start_tag("br", &[], true);
            return;
        }
        let found = (1..self.stack.len())
            .rev()
            .find(|i| self.dom.is_tag(self.stack[*i], name));
        match found {
            Some(index) => self.pop_to(index),
            None => {
                tracing::trace!(target: "trellis::dom", tag = name, "ignoring unmatched end tag");
            }
        }
    }
}

impl Dom {
    /// Parse `html` into detached nodes owned by this tree.
    pub fn parse_fragment(&mut self, html: &str) -> Vec<NodeId> {
        let container = self.create_element("template");
        let mut builder = TreeBuilder {
            dom: &mut *self,
            stack: vec![container],
        };
        let mut tokenizer = Tokenizer::new(html);

        while let Some(token) = tokenizer.next_token() {
            match token {
                Token::StartTag {
                    name,
                    attrs,
                    self_closing,
                } => {
                    builder.start_tag(&name, &attrs, self_closing);
                    if RAW_TEXT_ELEMENTS.contains(&name.as_str()) && !self_closing {
                        let raw = tokenizer.raw_text(&name);
                        if matches!(name.as_str(), "textarea" | "title") {
                            builder.text(&decode_entities(raw));
                        } else {
                            builder.text(raw);
                        }
                    }
                }
                Token::EndTag(name) => builder.end_tag(&name),
                Token::Text(text) => builder.text(&text),
                Token::Comment(text) => {
                    let comment = builder.dom.create_comment(&text);
                    builder.append(comment);
                }
            }
        }

        let children = self.children(container).to_vec();
        for child in &children {
            self.remove(*child);
        }
        children
    }

    /// Replace the children of `id` with nodes parsed from `html`.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) {
        self.remove_children(id);
        for node in self.parse_fragment(html) {
            if let Err(err) = self.append_child(id, node) {
                tracing::warn!(target: "trellis::dom", ?err, "cannot set inner html");
                return;
            }
        }
    }

    /// Serialize the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut writer = HtmlWriter::default();
        if let Err(err) = self.write_children(&mut writer, id) {
            tracing::warn!(target: "trellis::dom", ?err, "serialization failed");
        }
        writer.out
    }

    /// Serialize `id` including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut writer = HtmlWriter::default();
        if let Err(err) = self.write_node(&mut writer, id) {
            tracing::warn!(target: "trellis::dom", ?err, "serialization failed");
        }
        writer.out
    }

    fn write_children(&self, w: &mut HtmlWriter, id: NodeId) -> fmt::Result {
        let raw = self
            .tag_name(id)
            .is_some_and(|t| matches!(t, "script" | "style" | "xmp"));
        for child in self.children(id) {
            match &self.node(*child).data {
                NodeData::Text(text) if raw => w.write_str(text)?,
                _ => self.write_node(w, *child)?,
            }
        }
        Ok(())
    }

    fn write_node(&self, w: &mut HtmlWriter, id: NodeId) -> fmt::Result {
        match &self.node(id).data {
            NodeData::Document => self.write_children(w, id),
            NodeData::Text(text) => write_text(w, text),
            NodeData::Comment(text) => {
                w.write_str("<!--")?;
                w.write_str(text)?;
                w.write_str("-->")
            }
            NodeData::Element(element) => {
                w.write_str("<")?;
                w.write_str(&element.tag)?;
                for (name, value) in &element.attrs {
                    w.write_str(" ")?;
                    w.write_str(name)?;
                    w.write_str("=\"")?;
                    escape_html(&mut *w, value)?;
                    w.write_str("\"")?;
                }
                if !element.style.is_empty() {
                    w.write_str(" style=\"")?;
                    escape_html(&mut *w, &element.style.to_css_text())?;
                    w.write_str("\"")?;
                }
                w.write_str(">")?;
                if is_void_element(&element.tag) {
                    return Ok(());
                }
                self.write_children(w, id)?;
                w.write_str("</")?;
                w.write_str(&element.tag)?;
                w.write_str(">")
            }
        }
    }
}

/// Escape body text, spelling non-breaking spaces as `&nbsp;` so they
/// survive a serialize/parse cycle visibly.
fn write_text(w: &mut HtmlWriter, text: &str) -> fmt::Result {
    let mut parts = text.split('\u{a0}');
    if let Some(first) = parts.next() {
        escape_html_body_text(&mut *w, first)?;
    }
    for part in parts {
        w.write_str("&nbsp;")?;
        escape_html_body_text(&mut *w, part)?;
    }
    Ok(())
}

#[derive(Default)]
struct HtmlWriter {
    out: String,
}

impl StrWrite for HtmlWriter {
    type Error = fmt::Error;

    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.out.push_str(s);
        Ok(())
    }

    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        fmt::Write::write_fmt(&mut self.out, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(html: &str) -> String {
        let (dom, root) = Dom::new_with_root("div", html);
        dom.inner_html(root)
    }

    #[test]
    fn test_simple_roundtrip() {
        assert_eq!(
            roundtrip("<p>Hello <b>World</b></p>"),
            "<p>Hello <b>World</b></p>"
        );
    }

    #[test]
    fn test_casing_and_attributes() {
        insta::assert_snapshot!(
            roundtrip(r#"<P CLASS=a Style="COLOR:red;font-weight:bold">x<BR/>y</P>"#),
            @r#"<p class="a" style="color: red; font-weight: bold">x<br>y</p>"#
        );
    }

    #[test]
    fn test_implicit_closes() {
        insta::assert_snapshot!(
            roundtrip("<p>one<p>two<div>three</div><ul><li>a<li>b</ul>"),
            @"<p>one</p><p>two</p><div>three</div><ul><li>a</li><li>b</li></ul>"
        );
        insta::assert_snapshot!(
            roundtrip("<table><tr><td>1<td>2<tr><td>3</table>"),
            @"<table><tr><td>1</td><td>2</td></tr><tr><td>3</td></tr></table>"
        );
    }

    #[test]
    fn test_entities_and_nbsp() {
        let (dom, root) = Dom::new_with_root("div", "a&nbsp;&amp;&#x41;&#66;&bogus;<b>&lt;</b>");
        let text = dom.first_child(root).unwrap();
        assert_eq!(dom.text(text), Some("a\u{a0}&AB&bogus;"));
        assert_eq!(dom.inner_html(root), "a&nbsp;&amp;AB&amp;bogus;<b>&lt;</b>");
    }

    #[test]
    fn test_comments_doctype_and_raw_text() {
        let (dom, root) = Dom::new_with_root(
            "div",
            "<!DOCTYPE html><!-- note --><script>if (a < b) {}</script>x",
        );
        assert_eq!(dom.child_count(root), 3);
        assert_eq!(dom.kind(dom.child_at(root, 0).unwrap()), crate::NodeKind::Comment);
        assert_eq!(
            dom.inner_html(root),
            "<!-- note --><script>if (a < b) {}</script>x"
        );
    }

    #[test]
    fn test_unmatched_end_tags_dropped() {
        assert_eq!(roundtrip("a</span>b</div>"), "ab");
        assert_eq!(roundtrip("<b>open"), "<b>open</b>");
        assert_eq!(roundtrip("1 < 2"), "1 &lt; 2");
    }

    #[test]
    fn test_set_inner_html_records_mutations() {
        let (mut dom, root) = Dom::new_with_root("div", "<p>a</p>");
        dom.observe(true);
        dom.set_inner_html(root, "<p>b</p><p>c</p>");
        let records = dom.take_records();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.target() == root));
    }
}
