//! Lenient HTML parser
//!
//! Server-rendered fragment responses are well-formed in practice, but the
//! parser still tolerates the usual template output quirks: unquoted
//! attributes, void elements without slashes, stray close tags, unclosed
//! elements at end of input. Malformed constructs degrade to text or are
//! skipped; parsing itself never fails.

use crate::nodes::{is_raw_text, is_void, Document, NodeId, NodeKind};

/// Simple scanning parser for HTML documents and fragments
pub struct SimpleHtmlParser;

impl SimpleHtmlParser {
    /// Parse `content` and attach the resulting nodes under `attach`.
    pub fn parse_into(doc: &mut Document, attach: NodeId, content: &str) {
        // ASCII-lowercased shadow copy for case-insensitive tag searches;
        // byte offsets line up with the original.
        let lower = content.to_ascii_lowercase();
        let len = content.len();

        let mut stack: Vec<NodeId> = vec![attach];
        let mut pos = 0usize;

        while pos < len {
            let rest = &content[pos..];

            if rest.starts_with("<!--") {
                let end = rest.find("-->").map(|i| pos + i).unwrap_or(len);
                let text = &content[pos + 4..end];
                let parent = *stack.last().unwrap();
                doc.push_node(NodeKind::Comment(text.to_string()), parent);
                pos = (end + 3).min(len);
            } else if rest.starts_with("</") {
                let end = rest.find('>').map(|i| pos + i).unwrap_or(len);
                let name = content[pos + 2..end].trim().to_ascii_lowercase();
                Self::close_tag(doc, &mut stack, &name);
                pos = (end + 1).min(len);
            } else if rest.starts_with("<!") {
                let end = rest.find('>').map(|i| pos + i).unwrap_or(len);
                let decl = &content[pos + 2..end];
                let parent = *stack.last().unwrap();
                doc.push_node(NodeKind::Doctype(decl.to_string()), parent);
                pos = (end + 1).min(len);
            } else if Self::is_tag_start(rest) {
                pos = Self::parse_open_tag(doc, &mut stack, content, &lower, pos);
            } else {
                pos = Self::parse_text(doc, &stack, content, pos);
            }
        }
    }

    /// Whether the input starts an open tag (`<` followed by a letter)
    fn is_tag_start(rest: &str) -> bool {
        let mut chars = rest.chars();
        chars.next() == Some('<')
            && chars.next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false)
    }

    /// Consume a text run up to the next markup construct
    fn parse_text(doc: &mut Document, stack: &[NodeId], content: &str, start: usize) -> usize {
        let mut end = start;
        let bytes = content.as_bytes();
        loop {
            match content[end..].find('<') {
                Some(offset) => {
                    let candidate = end + offset;
                    let next = bytes.get(candidate + 1).copied();
                    let is_markup = matches!(next, Some(b'!') | Some(b'/'))
                        || next.map(|b| b.is_ascii_alphabetic()).unwrap_or(false);
                    if is_markup {
                        end = candidate;
                        break;
                    }
                    // Literal '<' in text
                    end = candidate + 1;
                }
                None => {
                    end = content.len();
                    break;
                }
            }
        }

        if end > start {
            let text = decode_entities(&content[start..end]);
            let parent = *stack.last().unwrap();
            doc.push_node(NodeKind::Text(text), parent);
        }
        end.max(start + 1)
    }

    /// Parse an open tag starting at `pos`; returns the position after it
    fn parse_open_tag(
        doc: &mut Document,
        stack: &mut Vec<NodeId>,
        content: &str,
        lower: &str,
        pos: usize,
    ) -> usize {
        let bytes = content.as_bytes();
        let len = content.len();

        // Tag name
        let mut cursor = pos + 1;
        let name_start = cursor;
        while cursor < len
            && (bytes[cursor].is_ascii_alphanumeric() || bytes[cursor] == b'-')
        {
            cursor += 1;
        }
        let tag = content[name_start..cursor].to_ascii_lowercase();

        // Attributes
        let mut attrs: Vec<(String, String)> = Vec::new();
        let mut self_closed = false;
        loop {
            while cursor < len && bytes[cursor].is_ascii_whitespace() {
                cursor += 1;
            }
            if cursor >= len {
                break;
            }
            match bytes[cursor] {
                b'>' => {
                    cursor += 1;
                    break;
                }
                b'/' => {
                    self_closed = true;
                    cursor += 1;
                }
                _ => {
                    let (attr, next) = Self::parse_attr(content, cursor);
                    if let Some(attr) = attr {
                        attrs.push(attr);
                    }
                    // Always make progress, even on junk
                    cursor = next.max(cursor + 1);
                }
            }
        }

        let parent = *stack.last().unwrap();
        let element = doc.push_node(
            NodeKind::Element {
                tag: tag.clone(),
                attrs,
            },
            parent,
        );

        if is_void(&tag) || self_closed {
            return cursor;
        }

        if is_raw_text(&tag) {
            // Raw content runs until the matching close tag
            let close_pattern = format!("</{}", tag);
            let (text_end, resume) = match lower[cursor..].find(&close_pattern) {
                Some(offset) => {
                    let close_start = cursor + offset;
                    let after = lower[close_start..]
                        .find('>')
                        .map(|i| close_start + i + 1)
                        .unwrap_or(len);
                    (close_start, after)
                }
                None => (len, len),
            };
            if text_end > cursor {
                doc.push_node(NodeKind::Text(content[cursor..text_end].to_string()), element);
            }
            return resume;
        }

        stack.push(element);
        cursor
    }

    /// Parse one attribute at `pos`; returns the attribute (if valid) and
    /// the position after it
    fn parse_attr(content: &str, pos: usize) -> (Option<(String, String)>, usize) {
        let bytes = content.as_bytes();
        let len = content.len();

        let name_start = pos;
        let mut cursor = pos;
        while cursor < len
            && !bytes[cursor].is_ascii_whitespace()
            && bytes[cursor] != b'='
            && bytes[cursor] != b'>'
            && bytes[cursor] != b'/'
        {
            cursor += 1;
        }
        if cursor == name_start {
            return (None, cursor + 1);
        }
        let name = content[name_start..cursor].to_ascii_lowercase();

        while cursor < len && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        if cursor >= len || bytes[cursor] != b'=' {
            // Boolean attribute
            return (Some((name, String::new())), cursor);
        }
        cursor += 1;
        while cursor < len && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        if cursor >= len {
            return (Some((name, String::new())), cursor);
        }

        let value;
        match bytes[cursor] {
            quote @ (b'"' | b'\'') => {
                cursor += 1;
                let value_start = cursor;
                while cursor < len && bytes[cursor] != quote {
                    cursor += 1;
                }
                value = decode_entities(&content[value_start..cursor]);
                cursor = (cursor + 1).min(len);
            }
            _ => {
                let value_start = cursor;
                while cursor < len && !bytes[cursor].is_ascii_whitespace() && bytes[cursor] != b'>'
                {
                    cursor += 1;
                }
                value = decode_entities(&content[value_start..cursor]);
            }
        }

        (Some((name, value)), cursor)
    }

    /// Handle a close tag: pop the stack through the nearest matching open
    /// element, or ignore the tag if nothing matches
    fn close_tag(doc: &Document, stack: &mut Vec<NodeId>, name: &str) {
        if name.is_empty() {
            return;
        }
        // stack[0] is the attach point and must never be popped
        let matched = stack
            .iter()
            .skip(1)
            .rposition(|id| doc.tag(*id) == Some(name))
            .map(|i| i + 1);
        if let Some(index) = matched {
            stack.truncate(index);
        }
    }
}

/// Decode the handful of entities template output actually produces
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];

        let semi = rest.find(';');
        match semi {
            Some(end) if end <= 10 => {
                let entity = &rest[1..end];
                let decoded = match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                        u32::from_str_radix(&entity[2..], 16)
                            .ok()
                            .and_then(char::from_u32)
                    }
                    _ if entity.starts_with('#') => {
                        entity[1..].parse::<u32>().ok().and_then(char::from_u32)
                    }
                    _ => None,
                };
                match decoded {
                    Some(c) => {
                        out.push(c);
                        rest = &rest[end + 1..];
                    }
                    None => {
                        out.push('&');
                        rest = &rest[1..];
                    }
                }
            }
            _ => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::Selector;

    #[test]
    fn test_parse_full_document() {
        let doc = Document::parse(
            r#"<!DOCTYPE html>
<html>
<head><title>Accounts</title></head>
<body>
  <div id="account-stats">Total: 100</div>
</body>
</html>"#,
        );
        let stats = doc
            .select_first(&Selector::parse("#account-stats").unwrap())
            .unwrap();
        assert_eq!(doc.text_content(stats), "Total: 100");
    }

    #[test]
    fn test_parse_fragment_without_wrapper() {
        let doc = Document::parse("<tr><td>1</td><td>2</td></tr>");
        let cells = doc.select_all(&Selector::parse("td").unwrap());
        assert_eq!(cells.len(), 2);
    }

    #[test]
    fn test_void_elements_do_not_nest() {
        let doc = Document::parse("<div><br><input type=\"text\"><span>x</span></div>");
        let span = doc.select_first(&Selector::parse("span").unwrap()).unwrap();
        let parent = doc.parent(span).unwrap();
        assert_eq!(doc.tag(parent), Some("div"));
    }

    #[test]
    fn test_unquoted_and_boolean_attributes() {
        let doc = Document::parse("<button data-page=3 disabled class=pg-btn></button>");
        let button = doc.select_first(&Selector::parse("button").unwrap()).unwrap();
        assert_eq!(doc.data_attr(button, "page"), Some("3"));
        assert_eq!(doc.attr(button, "disabled"), Some(""));
        assert!(doc.has_class(button, "pg-btn"));
    }

    #[test]
    fn test_script_content_is_raw_text() {
        let doc = Document::parse(
            r#"<script id="chart-script" type="application/json">{"labels": ["a<b"], "data": [1]}</script>"#,
        );
        let script = doc
            .select_first(&Selector::parse("#chart-script").unwrap())
            .unwrap();
        assert_eq!(
            doc.text_content(script),
            r#"{"labels": ["a<b"], "data": [1]}"#
        );
    }

    #[test]
    fn test_stray_close_tag_is_ignored() {
        let doc = Document::parse("<div>a</span>b</div>");
        let div = doc.select_first(&Selector::parse("div").unwrap()).unwrap();
        assert_eq!(doc.text_content(div), "ab");
    }

    #[test]
    fn test_unclosed_elements_end_at_eof() {
        let doc = Document::parse("<div><p>open");
        let p = doc.select_first(&Selector::parse("p").unwrap()).unwrap();
        assert_eq!(doc.text_content(p), "open");
    }

    #[test]
    fn test_comments_preserved() {
        let doc = Document::parse("<div><!-- marker -->x</div>");
        let div = doc.select_first(&Selector::parse("div").unwrap()).unwrap();
        assert!(doc.inner_html(div).contains("<!-- marker -->"));
    }

    #[test]
    fn test_entity_decoding() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&lt;tag&gt;"), "<tag>");
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("no entities"), "no entities");
        assert_eq!(decode_entities("dangling &"), "dangling &");
    }

    #[test]
    fn test_literal_less_than_in_text() {
        let doc = Document::parse("<div>1 < 2</div>");
        let div = doc.select_first(&Selector::parse("div").unwrap()).unwrap();
        assert_eq!(doc.text_content(div), "1 < 2");
    }
}
