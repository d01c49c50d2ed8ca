//! Tree builder - turns a stream of SAX-style events into a document
//!
//! A parser (any parser) drives a [`ContentHandler`]. [`DomBuilder`] is the
//! handler that assembles nodes in an [`XmlArena`], using only the public
//! mutation API, so every rule the tree enforces applies while building.
//!
//! Events can also be recorded as [`SaxEvent`] values, stored as JSON and
//! replayed with [`build_document`]:
//!
//! ```json
//! [
//!   {"event": "start_document"},
//!   {"event": "start_element", "uri": "", "local_name": "root", "qname": "root"},
//!   {"event": "characters", "text": "hello"},
//!   {"event": "end_element"},
//!   {"event": "end_document"}
//! ]
//! ```

use serde::{Deserialize, Serialize};

use crate::arena::XmlArena;
use crate::backing::ListRef;
use crate::error::Result;
use crate::namespace::Namespace;
use crate::types::{AttributeType, NodeId};

/// Builder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Drop whitespace the parser reports as ignorable (DTD-validated
    /// element-only content)
    pub ignore_element_content_whitespace: bool,
    /// Drop text runs that are whitespace only
    pub ignore_boundary_whitespace: bool,
    /// Keep entity replacement text; when off, non-predefined entities
    /// become EntityRef nodes and their content is skipped
    pub expand_entities: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            ignore_element_content_whitespace: false,
            ignore_boundary_whitespace: false,
            expand_entities: true,
        }
    }
}

/// One attribute as a parser reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaxAttribute {
    #[serde(default)]
    pub uri: String,
    pub local_name: String,
    pub qname: String,
    pub value: String,
    #[serde(default)]
    pub attribute_type: AttributeType,
}

impl SaxAttribute {
    pub fn new(qname: &str, value: &str) -> Self {
        let local_name = qname.rsplit(':').next().unwrap_or(qname);
        Self {
            uri: String::new(),
            local_name: local_name.to_string(),
            qname: qname.to_string(),
            value: value.to_string(),
            attribute_type: AttributeType::Undeclared,
        }
    }
}

/// Callbacks a parser delivers, in document order
pub trait ContentHandler {
    fn start_document(&mut self) -> Result<()>;
    fn end_document(&mut self) -> Result<()>;
    fn doctype(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        internal_subset: Option<&str>,
    ) -> Result<()>;
    fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) -> Result<()>;
    fn start_element(
        &mut self,
        uri: &str,
        local_name: &str,
        qname: &str,
        attributes: &[SaxAttribute],
    ) -> Result<()>;
    fn end_element(&mut self) -> Result<()>;
    fn characters(&mut self, text: &str) -> Result<()>;
    fn ignorable_whitespace(&mut self, text: &str) -> Result<()>;
    fn start_cdata(&mut self) -> Result<()>;
    fn end_cdata(&mut self) -> Result<()>;
    fn comment(&mut self, text: &str) -> Result<()>;
    fn processing_instruction(&mut self, target: &str, data: &str) -> Result<()>;
    fn start_entity(&mut self, name: &str) -> Result<()>;
    fn end_entity(&mut self, name: &str) -> Result<()>;
}

/// Recorded form of the [`ContentHandler`] callbacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SaxEvent {
    StartDocument,
    EndDocument,
    DocType {
        name: String,
        public_id: Option<String>,
        system_id: Option<String>,
        internal_subset: Option<String>,
    },
    StartPrefixMapping { prefix: String, uri: String },
    StartElement {
        #[serde(default)]
        uri: String,
        local_name: String,
        qname: String,
        #[serde(default)]
        attributes: Vec<SaxAttribute>,
    },
    EndElement,
    Characters { text: String },
    IgnorableWhitespace { text: String },
    #[serde(rename = "start_cdata")]
    StartCData,
    #[serde(rename = "end_cdata")]
    EndCData,
    Comment { text: String },
    ProcessingInstruction {
        target: String,
        #[serde(default)]
        data: String,
    },
    StartEntity { name: String },
    EndEntity { name: String },
}

impl SaxEvent {
    /// Deliver this event to a handler
    pub fn replay<H: ContentHandler + ?Sized>(&self, handler: &mut H) -> Result<()> {
        match self {
            SaxEvent::StartDocument => handler.start_document(),
            SaxEvent::EndDocument => handler.end_document(),
            SaxEvent::DocType {
                name,
                public_id,
                system_id,
                internal_subset,
            } => handler.doctype(
                name,
                public_id.as_deref(),
                system_id.as_deref(),
                internal_subset.as_deref(),
            ),
            SaxEvent::StartPrefixMapping { prefix, uri } => {
                handler.start_prefix_mapping(prefix, uri)
            }
            SaxEvent::StartElement {
                uri,
                local_name,
                qname,
                attributes,
            } => handler.start_element(uri, local_name, qname, attributes),
            SaxEvent::EndElement => handler.end_element(),
            SaxEvent::Characters { text } => handler.characters(text),
            SaxEvent::IgnorableWhitespace { text } => handler.ignorable_whitespace(text),
            SaxEvent::StartCData => handler.start_cdata(),
            SaxEvent::EndCData => handler.end_cdata(),
            SaxEvent::Comment { text } => handler.comment(text),
            SaxEvent::ProcessingInstruction { target, data } => {
                handler.processing_instruction(target, data)
            }
            SaxEvent::StartEntity { name } => handler.start_entity(name),
            SaxEvent::EndEntity { name } => handler.end_entity(name),
        }
    }
}

const PREDEFINED_ENTITIES: &[&str] = &["amp", "lt", "gt", "quot", "apos"];

fn split_qname(qname: &str) -> (&str, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (prefix, local),
        None => ("", qname),
    }
}

fn is_whitespace_only(text: &str) -> bool {
    text.chars().all(|c| matches!(c, ' ' | '\t' | '\n' | '\r'))
}

/// [`ContentHandler`] that builds a document in an arena
pub struct DomBuilder<'a> {
    dom: &'a mut XmlArena,
    config: BuilderConfig,
    document: Option<NodeId>,
    /// Open elements, innermost last
    stack: Vec<NodeId>,
    text: String,
    in_cdata: bool,
    /// Declarations seen since the last start tag
    pending_namespaces: Vec<Namespace>,
    /// Depth of unexpanded entities whose content is being skipped
    suppress_depth: usize,
}

impl<'a> DomBuilder<'a> {
    pub fn new(dom: &'a mut XmlArena) -> Self {
        Self::with_config(dom, BuilderConfig::default())
    }

    pub fn with_config(dom: &'a mut XmlArena, config: BuilderConfig) -> Self {
        Self {
            dom,
            config,
            document: None,
            stack: Vec::new(),
            text: String::new(),
            in_cdata: false,
            pending_namespaces: Vec::new(),
            suppress_depth: 0,
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Document under construction, if one was started
    pub fn document(&self) -> Option<NodeId> {
        self.document
    }

    /// The finished document. A stream without `start_document` still
    /// yields one.
    pub fn finish(mut self) -> Result<NodeId> {
        self.flush_text()?;
        Ok(self.ensure_document())
    }

    fn ensure_document(&mut self) -> NodeId {
        match self.document {
            Some(doc) => doc,
            None => {
                let doc = self.dom.new_document();
                self.document = Some(doc);
                doc
            }
        }
    }

    /// Innermost open element, or the document at top level
    fn current_parent(&mut self) -> NodeId {
        match self.stack.last() {
            Some(&element) => element,
            None => self.ensure_document(),
        }
    }

    fn flush_text(&mut self) -> Result<()> {
        if self.text.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.text);

        let Some(&parent) = self.stack.last() else {
            if !is_whitespace_only(&text) {
                tracing::warn!("dropping text outside the root element: {:?}", text);
            }
            return Ok(());
        };

        let node = if self.in_cdata {
            self.dom.new_cdata(&text)?
        } else {
            if self.config.ignore_boundary_whitespace && is_whitespace_only(&text) {
                return Ok(());
            }
            self.dom.new_text(&text)?
        };
        self.dom.append(ListRef::content(parent), node)
    }

    fn add_to_parent(&mut self, node: NodeId) -> Result<()> {
        let parent = self.current_parent();
        self.dom.append(ListRef::content(parent), node)
    }

    fn suppressed(&self) -> bool {
        self.suppress_depth > 0
    }
}

impl ContentHandler for DomBuilder<'_> {
    fn start_document(&mut self) -> Result<()> {
        let doc = self.ensure_document();
        tracing::debug!("building document {}", doc);
        Ok(())
    }

    fn end_document(&mut self) -> Result<()> {
        self.flush_text()?;
        if let Some(doc) = self.document {
            tracing::debug!(
                "finished document {} ({} nodes in arena)",
                doc,
                self.dom.len()
            );
        }
        Ok(())
    }

    fn doctype(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        internal_subset: Option<&str>,
    ) -> Result<()> {
        let doc = self.ensure_document();
        let doctype = self.dom.new_doctype_ids(name, public_id, system_id)?;
        self.dom.set_internal_subset(doctype, internal_subset)?;
        self.dom.set_doctype(doc, doctype)?;
        Ok(())
    }

    fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) -> Result<()> {
        if self.suppressed() {
            return Ok(());
        }
        let ns = self.dom.namespace(prefix, uri)?;
        self.pending_namespaces.push(ns);
        Ok(())
    }

    fn start_element(
        &mut self,
        uri: &str,
        local_name: &str,
        qname: &str,
        attributes: &[SaxAttribute],
    ) -> Result<()> {
        if self.suppressed() {
            return Ok(());
        }
        self.flush_text()?;

        let (prefix, qlocal) = split_qname(qname);
        let name = if local_name.is_empty() {
            qlocal
        } else {
            local_name
        };
        let namespace = self.dom.namespace(prefix, uri)?;
        let element = self.dom.new_element_ns(name, &namespace)?;

        // xmlns attributes are declarations when the parser reports them
        // as attributes rather than prefix mappings
        for attr in attributes {
            if attr.qname == "xmlns" {
                let ns = self.dom.namespace("", &attr.value)?;
                self.pending_namespaces.push(ns);
            } else if let Some(declared) = attr.qname.strip_prefix("xmlns:") {
                let ns = self.dom.namespace(declared, &attr.value)?;
                self.pending_namespaces.push(ns);
            }
        }
        for ns in std::mem::take(&mut self.pending_namespaces) {
            if ns != namespace {
                self.dom.add_namespace_declaration(element, &ns)?;
            }
        }

        for attr in attributes {
            if attr.qname == "xmlns" || attr.qname.starts_with("xmlns:") {
                continue;
            }
            let (attr_prefix, attr_local) = split_qname(&attr.qname);
            let local = if attr.local_name.is_empty() {
                attr_local
            } else {
                attr.local_name.as_str()
            };
            let ns = if attr_prefix.is_empty() {
                Namespace::none()
            } else {
                self.dom.namespace(attr_prefix, &attr.uri)?
            };
            let (value, kind) = (attr.value.as_str(), attr.attribute_type);
            let node = self.dom.new_attribute_typed(local, value, &ns, kind)?;
            self.dom.append(ListRef::attributes(element), node)?;
        }

        self.add_to_parent(element)?;
        self.stack.push(element);
        Ok(())
    }

    fn end_element(&mut self) -> Result<()> {
        if self.suppressed() {
            return Ok(());
        }
        self.flush_text()?;
        self.stack.pop();
        Ok(())
    }

    fn characters(&mut self, text: &str) -> Result<()> {
        if !self.suppressed() {
            self.text.push_str(text);
        }
        Ok(())
    }

    fn ignorable_whitespace(&mut self, text: &str) -> Result<()> {
        if self.config.ignore_element_content_whitespace {
            return Ok(());
        }
        self.characters(text)
    }

    fn start_cdata(&mut self) -> Result<()> {
        if self.suppressed() {
            return Ok(());
        }
        self.flush_text()?;
        self.in_cdata = true;
        Ok(())
    }

    fn end_cdata(&mut self) -> Result<()> {
        if self.suppressed() {
            return Ok(());
        }
        self.flush_text()?;
        self.in_cdata = false;
        Ok(())
    }

    fn comment(&mut self, text: &str) -> Result<()> {
        if self.suppressed() {
            return Ok(());
        }
        self.flush_text()?;
        let node = self.dom.new_comment(text)?;
        self.add_to_parent(node)
    }

    fn processing_instruction(&mut self, target: &str, data: &str) -> Result<()> {
        if self.suppressed() {
            return Ok(());
        }
        self.flush_text()?;
        let node = self.dom.new_processing_instruction(target, data)?;
        self.add_to_parent(node)
    }

    fn start_entity(&mut self, name: &str) -> Result<()> {
        if self.suppressed() {
            self.suppress_depth += 1;
            return Ok(());
        }
        if self.config.expand_entities || PREDEFINED_ENTITIES.contains(&name) {
            return Ok(());
        }
        self.flush_text()?;
        match self.stack.last() {
            Some(&parent) => {
                let entity = self.dom.new_entity_ref(name)?;
                self.dom.append(ListRef::content(parent), entity)?;
            }
            None => tracing::warn!("dropping entity reference &{} outside the root", name),
        }
        self.suppress_depth = 1;
        Ok(())
    }

    fn end_entity(&mut self, _name: &str) -> Result<()> {
        self.suppress_depth = self.suppress_depth.saturating_sub(1);
        Ok(())
    }
}

/// Replay recorded events into a fresh document
pub fn build_document(
    dom: &mut XmlArena,
    config: &BuilderConfig,
    events: &[SaxEvent],
) -> Result<NodeId> {
    let mut builder = DomBuilder::with_config(dom, config.clone());
    for event in events {
        event.replay(&mut builder)?;
    }
    builder.finish()
}

/// Decode a JSON array of recorded events
pub fn events_from_json(json: &str) -> Result<Vec<SaxEvent>> {
    Ok(serde_json::from_str(json)?)
}
