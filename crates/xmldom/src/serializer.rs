//! XML Outputter - render a tree back to XML text
//!
//! Reads the tree through the public accessors only. Namespace
//! declarations are emitted on the first element that needs them and
//! suppressed below it while the binding stays in scope.

use serde::{Deserialize, Serialize};

use crate::arena::XmlArena;
use crate::backing::ListRef;
use crate::error::Result;
use crate::namespace::Namespace;
use crate::types::{NodeData, NodeId, NodeKind};
use crate::utils::normalize_string;

/// How text nodes are treated on output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMode {
    /// Text exactly as stored
    #[default]
    Preserve,
    /// Leading and trailing whitespace removed
    Trim,
    /// Trimmed, internal whitespace runs collapsed to one space
    Normalize,
    /// Whitespace-only text dropped, everything else preserved
    TrimFullWhite,
}

/// Outputter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Format {
    /// Per-level indent; `None` keeps everything on one line
    pub indent: Option<String>,
    pub line_separator: String,
    pub omit_declaration: bool,
    /// Encoding named in the declaration
    pub encoding: String,
    /// `<a></a>` instead of `<a/>`
    pub expand_empty_elements: bool,
    pub text_mode: TextMode,
}

impl Format {
    /// Whitespace untouched, no indentation
    pub fn raw() -> Self {
        Self {
            indent: None,
            line_separator: "\n".to_string(),
            omit_declaration: false,
            encoding: "UTF-8".to_string(),
            expand_empty_elements: false,
            text_mode: TextMode::Preserve,
        }
    }

    /// Whitespace normalized, no indentation
    pub fn compact() -> Self {
        Self {
            text_mode: TextMode::Normalize,
            ..Self::raw()
        }
    }

    /// Two-space indentation, text trimmed
    pub fn pretty() -> Self {
        Self {
            indent: Some("  ".to_string()),
            text_mode: TextMode::Trim,
            ..Self::raw()
        }
    }
}

impl Default for Format {
    fn default() -> Self {
        Self::raw()
    }
}

/// Escape text content
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value for a double-quoted attribute
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}

/// Prefix bindings visible at the element being written
struct NamespaceScope {
    stack: Vec<Namespace>,
}

impl NamespaceScope {
    fn new() -> Self {
        Self {
            stack: vec![Namespace::none(), Namespace::xml()],
        }
    }

    fn in_scope(&self, ns: &Namespace) -> bool {
        self.stack
            .iter()
            .rev()
            .find(|bound| bound.prefix() == ns.prefix())
            .is_some_and(|bound| bound.uri() == ns.uri())
    }

    fn mark(&self) -> usize {
        self.stack.len()
    }

    fn reset(&mut self, mark: usize) {
        self.stack.truncate(mark);
    }
}

/// XML Outputter
pub struct XmlOutputter {
    format: Format,
}

impl XmlOutputter {
    pub fn new() -> Self {
        Self::with_config(Format::default())
    }

    pub fn with_config(format: Format) -> Self {
        Self { format }
    }

    pub fn format(&self) -> &Format {
        &self.format
    }

    /// Full document: declaration, then every top-level node on its own line
    pub fn output_document(&self, dom: &XmlArena, doc: NodeId) -> Result<String> {
        let mut output = String::with_capacity(4096);
        if !self.format.omit_declaration {
            output.push_str("<?xml version=\"1.0\" encoding=\"");
            output.push_str(&self.format.encoding);
            output.push_str("\"?>");
            output.push_str(&self.format.line_separator);
        }

        let mut scope = NamespaceScope::new();
        for child in dom.document(doc)?.content().iter() {
            if self.serialize_node(dom, child, 0, &mut scope, &mut output)? {
                output.push_str(&self.format.line_separator);
            }
        }
        Ok(output)
    }

    /// One element and its subtree, declaring every namespace it uses
    pub fn output_element(&self, dom: &XmlArena, element: NodeId) -> Result<String> {
        dom.element(element)?;
        self.output_node(dom, element)
    }

    /// Content of an element without its start and end tags
    pub fn output_element_content(&self, dom: &XmlArena, element: NodeId) -> Result<String> {
        let mut output = String::new();
        let mut scope = NamespaceScope::new();
        for child in dom.list(ListRef::content(element))?.iter() {
            self.serialize_node(dom, child, 0, &mut scope, &mut output)?;
        }
        Ok(output)
    }

    /// Any single node; documents include the declaration
    pub fn output_node(&self, dom: &XmlArena, id: NodeId) -> Result<String> {
        if dom.kind(id)? == NodeKind::Document {
            return self.output_document(dom, id);
        }
        let mut output = String::new();
        let mut scope = NamespaceScope::new();
        self.serialize_node(dom, id, 0, &mut scope, &mut output)?;
        Ok(output)
    }

    fn indent(&self, depth: usize, output: &mut String) {
        if let Some(indent) = &self.format.indent {
            output.push_str(&indent.repeat(depth));
        }
    }

    /// Text after the text mode is applied; `None` when nothing remains
    fn process_text(&self, text: &str) -> Option<String> {
        let processed = match self.format.text_mode {
            TextMode::Preserve => text.to_string(),
            TextMode::Trim => text.trim().to_string(),
            TextMode::Normalize => normalize_string(text),
            TextMode::TrimFullWhite => {
                if text.trim().is_empty() {
                    String::new()
                } else {
                    text.to_string()
                }
            }
        };
        (!processed.is_empty()).then_some(processed)
    }

    /// Write one node. Returns false when the node produced no output.
    fn serialize_node(
        &self,
        dom: &XmlArena,
        id: NodeId,
        depth: usize,
        scope: &mut NamespaceScope,
        output: &mut String,
    ) -> Result<bool> {
        let node = dom.node(id)?;
        match node.data() {
            NodeData::Element(_) => {
                self.serialize_element(dom, id, depth, scope, output)?;
            }
            NodeData::Text(text) => match self.process_text(text) {
                Some(text) => output.push_str(&escape_text(&text)),
                None => return Ok(false),
            },
            NodeData::CData(text) => {
                output.push_str("<![CDATA[");
                output.push_str(text);
                output.push_str("]]>");
            }
            NodeData::Comment(text) => {
                output.push_str("<!--");
                output.push_str(text);
                output.push_str("-->");
            }
            NodeData::ProcessingInstruction(pi) => {
                output.push_str("<?");
                output.push_str(pi.target());
                if !pi.data().is_empty() {
                    output.push(' ');
                    output.push_str(pi.data());
                }
                output.push_str("?>");
            }
            NodeData::EntityRef(entity) => {
                output.push('&');
                output.push_str(entity.name());
                output.push(';');
            }
            NodeData::DocType(doctype) => {
                output.push_str("<!DOCTYPE ");
                output.push_str(doctype.element_name());
                if let Some(public_id) = doctype.public_id() {
                    output.push_str(" PUBLIC \"");
                    output.push_str(public_id);
                    output.push('"');
                }
                if let Some(system_id) = doctype.system_id() {
                    if doctype.public_id().is_none() {
                        output.push_str(" SYSTEM");
                    }
                    // a system id holding a double quote is written single-quoted
                    let quote = if system_id.contains('"') { '\'' } else { '"' };
                    output.push(' ');
                    output.push(quote);
                    output.push_str(system_id);
                    output.push(quote);
                }
                if let Some(subset) = doctype.internal_subset().filter(|s| !s.is_empty()) {
                    output.push_str(" [");
                    output.push_str(&self.format.line_separator);
                    output.push_str(subset);
                    output.push(']');
                }
                output.push('>');
            }
            NodeData::Attribute(attr) => {
                output.push_str(&attr.qualified_name());
                output.push_str("=\"");
                output.push_str(&escape_attribute(attr.value()));
                output.push('"');
            }
            NodeData::Document(_) => {
                for child in dom.document(id)?.content().iter() {
                    if self.serialize_node(dom, child, depth, scope, output)? {
                        output.push_str(&self.format.line_separator);
                    }
                }
            }
        }
        Ok(true)
    }

    fn declare(&self, ns: &Namespace, scope: &mut NamespaceScope, output: &mut String) {
        if scope.in_scope(ns) {
            return;
        }
        output.push_str(" xmlns");
        if !ns.prefix().is_empty() {
            output.push(':');
            output.push_str(ns.prefix());
        }
        output.push_str("=\"");
        output.push_str(&escape_attribute(ns.uri()));
        output.push('"');
        scope.stack.push(ns.clone());
    }

    fn serialize_element(
        &self,
        dom: &XmlArena,
        id: NodeId,
        depth: usize,
        scope: &mut NamespaceScope,
        output: &mut String,
    ) -> Result<()> {
        let element = dom.element(id)?;
        let qualified = element.qualified_name();
        let mark = scope.mark();

        output.push('<');
        output.push_str(&qualified);
        self.declare(element.namespace(), scope, output);
        for ns in element.additional_namespaces() {
            self.declare(ns, scope, output);
        }
        for attr_id in element.attributes().iter() {
            let attr = dom.attribute_data(attr_id)?;
            // unprefixed attributes never take the default namespace
            if !attr.namespace().prefix().is_empty() {
                self.declare(attr.namespace(), scope, output);
            }
            output.push(' ');
            output.push_str(&attr.qualified_name());
            output.push_str("=\"");
            output.push_str(&escape_attribute(attr.value()));
            output.push('"');
        }

        let content = element.content();
        let structured = content.iter().any(|child| {
            !matches!(
                dom.kind(child),
                Ok(NodeKind::Text | NodeKind::CData | NodeKind::EntityRef)
            )
        });

        let mut body = String::new();
        if self.format.indent.is_some() && structured {
            // one child per line, text that trims away is skipped
            for child in content.iter() {
                let mut line = String::new();
                if self.serialize_node(dom, child, depth + 1, scope, &mut line)? {
                    body.push_str(&self.format.line_separator);
                    self.indent(depth + 1, &mut body);
                    body.push_str(&line);
                }
            }
            if !body.is_empty() {
                body.push_str(&self.format.line_separator);
                self.indent(depth, &mut body);
            }
        } else {
            for child in content.iter() {
                self.serialize_node(dom, child, depth + 1, scope, &mut body)?;
            }
        }

        if body.is_empty() && !self.format.expand_empty_elements {
            output.push_str("/>");
        } else {
            output.push('>');
            output.push_str(&body);
            output.push_str("</");
            output.push_str(&qualified);
            output.push('>');
        }

        scope.reset(mark);
        tracing::trace!("wrote element {} at depth {}", id, depth);
        Ok(())
    }
}

impl Default for XmlOutputter {
    fn default() -> Self {
        Self::new()
    }
}
