//! Mutable document tree
//!
//! Nodes live in an arena indexed by `NodeId`; ids stay valid for the life
//! of the document. Replacing a region's contents detaches the old subtree
//! (parent link cleared) without reusing ids, so stale references held by
//! callers are detectable via `is_attached` rather than dangling.

use fragweb_utils::{escape_attr, escape_text};

use crate::parser::SimpleHtmlParser;
use crate::selector::{Selector, SimpleSelector};

/// Handle to a node within a `Document`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Node payload
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Synthetic document root
    Document,
    /// An element with a lowercase tag name and ordered attributes
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    /// A text node (unescaped content)
    Text(String),
    /// A comment (without the `<!--`/`-->` markers)
    Comment(String),
    /// A doctype or other `<!...>` declaration (raw content)
    Doctype(String),
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

/// Elements that never have children and serialize without a close tag
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is raw text (no nested markup, no entity decoding)
pub(crate) const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

pub(crate) fn is_raw_text(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

/// A parsed HTML document or fragment
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Document {
    /// Create an empty document (root only)
    pub fn empty() -> Self {
        Document {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    /// Parse an HTML document or fragment.
    ///
    /// Parsing is lenient and never fails: unknown or malformed markup
    /// degrades to text or is skipped.
    pub fn parse(html: &str) -> Self {
        let mut doc = Document::empty();
        let root = doc.root;
        SimpleHtmlParser::parse_into(&mut doc, root, html);
        doc
    }

    /// The synthetic root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn push_node(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Node payload accessor
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Element tag name, if the node is an element
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Child node ids in document order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Parent node id, `None` for the root and for detached nodes
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Whether the node is still reachable from the document root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    // ==================== Attributes and classes ====================

    /// Attribute value by name
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// `data-*` attribute value (`data_attr(id, "time")` reads `data-time`)
    pub fn data_attr(&self, id: NodeId, name: &str) -> Option<&str> {
        // Formatting the key on every call is fine at page-event rates
        match &self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => {
                let key = format!("data-{}", name);
                attrs.iter().find(|(n, _)| *n == key).map(|(_, v)| v.as_str())
            }
            _ => None,
        }
    }

    /// Set (or insert) an attribute, preserving attribute order
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[id.0].kind {
            match attrs.iter_mut().find(|(n, _)| n == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    /// Remove an attribute if present
    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[id.0].kind {
            attrs.retain(|(n, _)| n != name);
        }
    }

    /// Whether the element's class list contains `class`
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .map(|list| list.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Add a class (no-op when already present)
    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let updated = match self.attr(id, "class") {
            Some(list) if !list.trim().is_empty() => format!("{} {}", list.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr(id, "class", &updated);
    }

    /// Remove a class (no-op when absent)
    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let updated = match self.attr(id, "class") {
            Some(list) => list
                .split_whitespace()
                .filter(|c| *c != class)
                .collect::<Vec<_>>()
                .join(" "),
            None => return,
        };
        self.set_attr(id, "class", &updated);
    }

    // ==================== Selection ====================

    /// First attached element matching the selector, in document order
    pub fn select_first(&self, selector: &Selector) -> Option<NodeId> {
        self.select_within(self.root, selector).into_iter().next()
    }

    /// All attached elements matching the selector, in document order
    pub fn select_all(&self, selector: &Selector) -> Vec<NodeId> {
        self.select_within(self.root, selector)
    }

    /// All elements under `scope` (inclusive of descendants, exclusive of
    /// `scope` itself) matching the selector
    pub fn select_within(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        let mut matches = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if self.matches(id, selector) {
                matches.push(id);
            }
            stack.extend(self.children(id).iter().rev().copied());
        }
        matches
    }

    /// Whether the node satisfies the full selector (including ancestors)
    pub fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        if !self.matches_simple(id, selector.target()) {
            return false;
        }

        // Remaining parts must match ancestors, outermost first
        let mut remaining = selector.parts.len() - 1;
        let mut current = self.parent(id);
        while remaining > 0 {
            match current {
                Some(ancestor) => {
                    if self.matches_simple(ancestor, &selector.parts[remaining - 1]) {
                        remaining -= 1;
                    }
                    current = self.parent(ancestor);
                }
                None => return false,
            }
        }
        true
    }

    fn matches_simple(&self, id: NodeId, simple: &SimpleSelector) -> bool {
        let (tag, _) = match &self.nodes[id.0].kind {
            NodeKind::Element { tag, attrs } => (tag, attrs),
            _ => return false,
        };

        if let Some(required) = &simple.tag {
            if tag != required {
                return false;
            }
        }
        if let Some(required) = &simple.id {
            if self.attr(id, "id") != Some(required.as_str()) {
                return false;
            }
        }
        for class in &simple.classes {
            if !self.has_class(id, class) {
                return false;
            }
        }
        for (name, expected) in &simple.attrs {
            match (self.attr(id, name), expected) {
                (Some(actual), Some(expected)) if actual == expected => {}
                (Some(_), None) => {}
                _ => return false,
            }
        }
        true
    }

    // ==================== Content ====================

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => out.push_str(text),
            _ => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Serialized markup of the node's children
    pub fn inner_html(&self, id: NodeId) -> String {
        let raw = self.tag(id).map(is_raw_text).unwrap_or(false);
        let mut out = String::new();
        for child in self.children(id) {
            self.serialize(*child, raw, &mut out);
        }
        out
    }

    /// Serialized markup of the node itself
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize(id, false, &mut out);
        out
    }

    /// Serialized markup of the whole document
    pub fn to_html(&self) -> String {
        self.inner_html(self.root)
    }

    fn serialize(&self, id: NodeId, raw_parent: bool, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Document => {
                for child in self.children(id) {
                    self.serialize(*child, false, out);
                }
            }
            NodeKind::Text(text) => {
                if raw_parent {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_text(text));
                }
            }
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Doctype(decl) => {
                out.push_str("<!");
                out.push_str(decl);
                out.push('>');
            }
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if is_void(tag) {
                    return;
                }
                let raw = is_raw_text(tag);
                for child in self.children(id) {
                    self.serialize(*child, raw, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    // ==================== Mutation ====================

    /// Replace the node's children with a parsed fragment, mirroring
    /// `innerHTML` assignment. Old children are detached, not freed.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) {
        let old: Vec<NodeId> = self.nodes[id.0].children.drain(..).collect();
        for child in old {
            self.nodes[child.0].parent = None;
        }
        SimpleHtmlParser::parse_into(self, id, html);
    }
}

// ==================== Tests ====================
