//! Core node definitions
//!
//! Key design principles:
//! 1. Use u32 for node handles (index into the arena, never a pointer)
//! 2. One closed enum for node payloads, matched exhaustively
//! 3. Parent links are plain ids; the owning list is the source of truth
//! 4. Use SmallVec for small arrays (namespace declarations, child lists)

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::backing::{BackingList, SlotKind};
use crate::namespace::Namespace;

/// Node identifier (index into arena)
/// u32 allows 4 billion nodes, far more than any document resident in memory
pub type NodeId = u32;

/// Node kind, numbered like the DOM node-type constants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeKind {
    Element = 1,
    Attribute = 2,
    Text = 3,
    CData = 4,
    EntityRef = 5,
    ProcessingInstruction = 7,
    Comment = 8,
    Document = 9,
    DocType = 10,
}

impl NodeKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(NodeKind::Element),
            2 => Some(NodeKind::Attribute),
            3 => Some(NodeKind::Text),
            4 => Some(NodeKind::CData),
            5 => Some(NodeKind::EntityRef),
            7 => Some(NodeKind::ProcessingInstruction),
            8 => Some(NodeKind::Comment),
            9 => Some(NodeKind::Document),
            10 => Some(NodeKind::DocType),
            _ => None,
        }
    }

    /// Kinds that can sit in some content list (document or element)
    pub fn is_content(self) -> bool {
        !matches!(self, NodeKind::Attribute | NodeKind::Document)
    }

    /// Human-readable name used in rejection messages
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Element => "Element",
            NodeKind::Attribute => "Attribute",
            NodeKind::Text => "Text",
            NodeKind::CData => "CDATA",
            NodeKind::EntityRef => "EntityRef",
            NodeKind::ProcessingInstruction => "ProcessingInstruction",
            NodeKind::Comment => "Comment",
            NodeKind::Document => "Document",
            NodeKind::DocType => "DocType",
        }
    }
}

/// Declared attribute type (from a DTD, or undeclared)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttributeType {
    #[default]
    Undeclared,
    CData,
    Id,
    IdRef,
    IdRefs,
    Entity,
    Entities,
    NmToken,
    NmTokens,
    Notation,
    Enumerated,
}

#[derive(Debug)]
pub struct DocumentData {
    pub(crate) content: BackingList,
    pub(crate) base_uri: Option<String>,
}

impl DocumentData {
    pub(crate) fn new(owner: NodeId) -> Self {
        Self {
            content: BackingList::new(owner, SlotKind::DocumentContent),
            base_uri: None,
        }
    }

    pub fn content(&self) -> &BackingList {
        &self.content
    }

    pub fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref()
    }
}

#[derive(Debug)]
pub struct ElementData {
    pub(crate) name: String,
    pub(crate) namespace: Namespace,
    pub(crate) additional_namespaces: SmallVec<[Namespace; 2]>,
    pub(crate) attributes: BackingList,
    pub(crate) content: BackingList,
}

impl ElementData {
    pub(crate) fn new(owner: NodeId, name: String, namespace: Namespace) -> Self {
        Self {
            name,
            namespace,
            additional_namespaces: SmallVec::new(),
            attributes: BackingList::new(owner, SlotKind::Attributes),
            content: BackingList::new(owner, SlotKind::ElementContent),
        }
    }

    /// Local name, without prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// `prefix:name`, or just `name` when unprefixed
    pub fn qualified_name(&self) -> String {
        qualify(self.namespace.prefix(), &self.name)
    }

    pub fn additional_namespaces(&self) -> &[Namespace] {
        &self.additional_namespaces
    }

    pub fn attributes(&self) -> &BackingList {
        &self.attributes
    }

    pub fn content(&self) -> &BackingList {
        &self.content
    }
}

#[derive(Debug, Clone)]
pub struct AttributeData {
    pub(crate) name: String,
    pub(crate) namespace: Namespace,
    pub(crate) value: String,
    pub(crate) attribute_type: AttributeType,
}

impl AttributeData {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }

    pub fn qualified_name(&self) -> String {
        qualify(self.namespace.prefix(), &self.name)
    }

    /// Key used for uniqueness inside one element: local name + URI
    #[inline]
    pub fn has_key(&self, name: &str, namespace: &Namespace) -> bool {
        self.name == name && self.namespace.same_uri(namespace)
    }
}

#[derive(Debug, Clone)]
pub struct ProcessingInstructionData {
    pub(crate) target: String,
    pub(crate) data: String,
}

impl ProcessingInstructionData {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    /// Parse `name="value"` pairs out of the instruction data, in order.
    /// Malformed tails are ignored.
    pub fn pseudo_attributes(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut rest = self.data.trim_start();

        while let Some(eq) = rest.find('=') {
            let name = rest[..eq].trim();
            let after = rest[eq + 1..].trim_start();
            let Some(quote) = after.chars().next().filter(|c| *c == '"' || *c == '\'') else {
                break;
            };
            let body = &after[1..];
            let Some(close) = body.find(quote) else {
                break;
            };
            if name.is_empty() {
                break;
            }
            pairs.push((name.to_string(), body[..close].to_string()));
            rest = body[close + 1..].trim_start();
        }

        pairs
    }

    /// Value of one pseudo-attribute
    pub fn pseudo_attribute(&self, name: &str) -> Option<String> {
        self.pseudo_attributes()
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

#[derive(Debug, Clone)]
pub struct EntityRefData {
    pub(crate) name: String,
    pub(crate) public_id: Option<String>,
    pub(crate) system_id: Option<String>,
}

impl EntityRefData {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn public_id(&self) -> Option<&str> {
        self.public_id.as_deref()
    }

    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct DocTypeData {
    pub(crate) element_name: String,
    pub(crate) public_id: Option<String>,
    pub(crate) system_id: Option<String>,
    pub(crate) internal_subset: Option<String>,
}

impl DocTypeData {
    pub fn element_name(&self) -> &str {
        &self.element_name
    }

    pub fn public_id(&self) -> Option<&str> {
        self.public_id.as_deref()
    }

    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    pub fn internal_subset(&self) -> Option<&str> {
        self.internal_subset.as_deref()
    }
}

/// Node payload
#[derive(Debug)]
pub enum NodeData {
    Document(DocumentData),
    Element(ElementData),
    Attribute(AttributeData),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(ProcessingInstructionData),
    EntityRef(EntityRefData),
    DocType(DocTypeData),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Document(_) => NodeKind::Document,
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Attribute(_) => NodeKind::Attribute,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::CData(_) => NodeKind::CData,
            NodeData::Comment(_) => NodeKind::Comment,
            NodeData::ProcessingInstruction(_) => NodeKind::ProcessingInstruction,
            NodeData::EntityRef(_) => NodeKind::EntityRef,
            NodeData::DocType(_) => NodeKind::DocType,
        }
    }
}

/// One node in the arena
///
/// The parent link is a non-owning back-reference; it is only ever written
/// by the list operations that also move the id in or out of a list.
#[derive(Debug)]
pub struct XmlNode {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) data: NodeData,
}

impl XmlNode {
    pub(crate) fn new(id: NodeId, data: NodeData) -> Self {
        Self {
            id,
            parent: None,
            data,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    #[inline]
    pub fn is_document(&self) -> bool {
        matches!(self.data, NodeData::Document(_))
    }

    /// Text or CDATA
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_) | NodeData::CData(_))
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    pub(crate) fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&DocumentData> {
        match &self.data {
            NodeData::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_attribute(&self) -> Option<&AttributeData> {
        match &self.data {
            NodeData::Attribute(a) => Some(a),
            _ => None,
        }
    }

    /// Character content of Text, CDATA and Comment nodes
    pub fn text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(s) | NodeData::CData(s) | NodeData::Comment(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_processing_instruction(&self) -> Option<&ProcessingInstructionData> {
        match &self.data {
            NodeData::ProcessingInstruction(pi) => Some(pi),
            _ => None,
        }
    }

    pub fn as_entity_ref(&self) -> Option<&EntityRefData> {
        match &self.data {
            NodeData::EntityRef(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_doctype(&self) -> Option<&DocTypeData> {
        match &self.data {
            NodeData::DocType(d) => Some(d),
            _ => None,
        }
    }
}

pub(crate) fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}:{}", prefix, name)
    }
}
