//! Arena-based XML tree storage
//!
//! ## Memory Layout
//!
//! ```text
//! Arena: Vec<XmlNode>
//!        [Doc0][Elem1][Text2][Attr3]...
//!         ↑ 4-byte index, not 8-byte pointer
//! ```
//!
//! Nodes are never freed one by one. A detached node keeps its id and can
//! be re-inserted anywhere in the same arena, including under a different
//! document. Structure (who contains whom) lives only in the backing lists
//! of documents and elements; see [`crate::backing`].

use std::collections::VecDeque;

use crate::backing::ListRef;
use crate::error::{DomError, Result};
use crate::namespace::{Namespace, NamespaceTable};
use crate::types::{
    AttributeData, AttributeType, DocTypeData, DocumentData, ElementData, EntityRefData, NodeData,
    NodeId, NodeKind, ProcessingInstructionData, XmlNode,
};
use crate::verifier;

/// Arena allocator for XML nodes
///
/// Design:
/// - Single Vec<XmlNode> for sequential allocation
/// - Interned namespaces shared by every node in the arena
/// - No Rc/Arc between nodes: use indices everywhere
#[derive(Debug)]
pub struct XmlArena {
    /// All nodes stored sequentially (cache-friendly)
    nodes: Vec<XmlNode>,

    namespaces: NamespaceTable,
}

impl XmlArena {
    /// Create a new empty arena
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create arena with specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            namespaces: NamespaceTable::new(),
        }
    }

    fn alloc(&mut self, make: impl FnOnce(NodeId) -> NodeData) -> NodeId {
        let id = self.nodes.len() as NodeId;
        let data = make(id);
        self.nodes.push(XmlNode::new(id, data));
        id
    }

    /// Get node by ID (immutable)
    pub fn node(&self, id: NodeId) -> Result<&XmlNode> {
        self.nodes
            .get(id as usize)
            .ok_or(DomError::NodeNotFound(id))
    }

    /// Get node by ID (mutable). Crate-private: structure only changes
    /// through the backing-list operations.
    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut XmlNode> {
        self.nodes
            .get_mut(id as usize)
            .ok_or(DomError::NodeNotFound(id))
    }

    pub fn kind(&self, id: NodeId) -> Result<NodeKind> {
        Ok(self.node(id)?.kind())
    }

    /// Containing element or document, if attached
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent())
    }

    /// Containing element, `None` when detached or directly under a document
    pub fn parent_element(&self, id: NodeId) -> Result<Option<NodeId>> {
        match self.node(id)?.parent() {
            Some(parent) if self.node(parent)?.is_element() => Ok(Some(parent)),
            _ => Ok(None),
        }
    }

    /// Document at the top of this node's ancestor chain
    pub fn document_of(&self, id: NodeId) -> Result<Option<NodeId>> {
        let mut current = id;
        loop {
            let node = self.node(current)?;
            if node.is_document() {
                return Ok(Some(current));
            }
            match node.parent() {
                Some(parent) => current = parent,
                None => return Ok(None),
            }
        }
    }

    /// Is `ancestor` a proper ancestor of `id`?
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> Result<bool> {
        let mut current = self.node(id)?.parent();
        while let Some(parent) = current {
            if parent == ancestor {
                return Ok(true);
            }
            current = self.node(parent)?.parent();
        }
        Ok(false)
    }

    /// Shared copy of a validated namespace
    pub fn namespace(&mut self, prefix: &str, uri: &str) -> Result<Namespace> {
        self.namespaces.intern(prefix, uri)
    }

    pub(crate) fn intern(&mut self, ns: &Namespace) -> Result<Namespace> {
        self.namespaces.intern(ns.prefix(), ns.uri())
    }

    /// Total number of nodes ever allocated
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterator over all nodes, attached or not
    pub fn iter(&self) -> impl Iterator<Item = &XmlNode> {
        self.nodes.iter()
    }

    /// Find nodes matching predicate
    pub fn find<F>(&self, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&XmlNode) -> bool,
    {
        self.nodes
            .iter()
            .filter(|node| predicate(node))
            .map(|node| node.id())
            .collect()
    }

    /// Drop every node (reuse allocation). All outstanding ids become stale.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.namespaces = NamespaceTable::new();
    }

    // ----- construction -------------------------------------------------

    pub fn new_document(&mut self) -> NodeId {
        self.alloc(|id| NodeData::Document(DocumentData::new(id)))
    }

    pub fn new_element(&mut self, name: &str) -> Result<NodeId> {
        self.new_element_ns(name, &Namespace::none())
    }

    pub fn new_element_ns(&mut self, name: &str, namespace: &Namespace) -> Result<NodeId> {
        verifier::check_element_name(name)?;
        let namespace = self.intern(namespace)?;
        let name = name.to_string();
        Ok(self.alloc(|id| NodeData::Element(ElementData::new(id, name, namespace))))
    }

    pub fn new_attribute(&mut self, name: &str, value: &str) -> Result<NodeId> {
        self.new_attribute_typed(name, value, &Namespace::none(), AttributeType::Undeclared)
    }

    pub fn new_attribute_ns(
        &mut self,
        name: &str,
        value: &str,
        namespace: &Namespace,
    ) -> Result<NodeId> {
        self.new_attribute_typed(name, value, namespace, AttributeType::Undeclared)
    }

    pub fn new_attribute_typed(
        &mut self,
        name: &str,
        value: &str,
        namespace: &Namespace,
        attribute_type: AttributeType,
    ) -> Result<NodeId> {
        verifier::check_attribute_name(name)?;
        check_attribute_namespace(namespace)?;
        verifier::check_character_data(value, "attribute value")?;
        let data = AttributeData {
            name: name.to_string(),
            namespace: self.intern(namespace)?,
            value: value.to_string(),
            attribute_type,
        };
        Ok(self.alloc(|_| NodeData::Attribute(data)))
    }

    pub fn new_text(&mut self, text: &str) -> Result<NodeId> {
        verifier::check_character_data(text, "text")?;
        let text = text.to_string();
        Ok(self.alloc(|_| NodeData::Text(text)))
    }

    pub fn new_cdata(&mut self, text: &str) -> Result<NodeId> {
        verifier::check_cdata_section(text)?;
        let text = text.to_string();
        Ok(self.alloc(|_| NodeData::CData(text)))
    }

    pub fn new_comment(&mut self, text: &str) -> Result<NodeId> {
        verifier::check_comment_data(text)?;
        let text = text.to_string();
        Ok(self.alloc(|_| NodeData::Comment(text)))
    }

    pub fn new_processing_instruction(&mut self, target: &str, data: &str) -> Result<NodeId> {
        verifier::check_pi_target(target)?;
        verifier::check_pi_data(data)?;
        let pi = ProcessingInstructionData {
            target: target.to_string(),
            data: data.to_string(),
        };
        Ok(self.alloc(|_| NodeData::ProcessingInstruction(pi)))
    }

    pub fn new_entity_ref(&mut self, name: &str) -> Result<NodeId> {
        self.new_entity_ref_ids(name, None, None)
    }

    pub fn new_entity_ref_ids(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<NodeId> {
        verifier::check_xml_name(name, "entity reference")?;
        check_ids(public_id, system_id)?;
        let entity = EntityRefData {
            name: name.to_string(),
            public_id: public_id.map(str::to_string),
            system_id: system_id.map(str::to_string),
        };
        Ok(self.alloc(|_| NodeData::EntityRef(entity)))
    }

    pub fn new_doctype(&mut self, element_name: &str) -> Result<NodeId> {
        self.new_doctype_ids(element_name, None, None)
    }

    pub fn new_doctype_ids(
        &mut self,
        element_name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<NodeId> {
        verifier::check_xml_name(element_name, "DocType")?;
        check_ids(public_id, system_id)?;
        let doctype = DocTypeData {
            element_name: element_name.to_string(),
            public_id: public_id.map(str::to_string),
            system_id: system_id.map(str::to_string),
            internal_subset: None,
        };
        Ok(self.alloc(|_| NodeData::DocType(doctype)))
    }

    // ----- leaf mutation ------------------------------------------------

    /// Replace the character content of a Text, CDATA or Comment node
    pub fn set_character_data(&mut self, id: NodeId, text: &str) -> Result<()> {
        let node = self.node_mut(id)?;
        match &mut node.data {
            NodeData::Text(current) => {
                verifier::check_character_data(text, "text")?;
                *current = text.to_string();
            }
            NodeData::CData(current) => {
                verifier::check_cdata_section(text)?;
                *current = text.to_string();
            }
            NodeData::Comment(current) => {
                verifier::check_comment_data(text)?;
                *current = text.to_string();
            }
            other => return Err(DomError::wrong_kind("Text, CDATA or Comment", other.kind())),
        }
        Ok(())
    }

    /// Append to a Text or CDATA node
    pub fn append_character_data(&mut self, id: NodeId, more: &str) -> Result<()> {
        let node = self.node_mut(id)?;
        match &mut node.data {
            NodeData::Text(current) => {
                verifier::check_character_data(more, "text")?;
                current.push_str(more);
            }
            NodeData::CData(current) => {
                let mut joined = current.clone();
                joined.push_str(more);
                verifier::check_cdata_section(&joined)?;
                *current = joined;
            }
            other => return Err(DomError::wrong_kind("Text or CDATA", other.kind())),
        }
        Ok(())
    }

    pub fn set_processing_instruction_data(&mut self, id: NodeId, data: &str) -> Result<()> {
        verifier::check_pi_data(data)?;
        match &mut self.node_mut(id)?.data {
            NodeData::ProcessingInstruction(pi) => {
                pi.data = data.to_string();
                Ok(())
            }
            other => Err(DomError::wrong_kind("ProcessingInstruction", other.kind())),
        }
    }

    pub fn set_internal_subset(&mut self, id: NodeId, subset: Option<&str>) -> Result<()> {
        match &mut self.node_mut(id)?.data {
            NodeData::DocType(doctype) => {
                doctype.internal_subset = subset.map(str::to_string);
                Ok(())
            }
            other => Err(DomError::wrong_kind("DocType", other.kind())),
        }
    }

    // ----- whole-node operations ---------------------------------------

    /// Remove a node from whatever list holds it. No-op when detached.
    pub fn detach(&mut self, id: NodeId) -> Result<NodeId> {
        let node = self.node(id)?;
        if let Some(parent) = node.parent() {
            let list = if node.kind() == NodeKind::Attribute {
                ListRef::attributes(parent)
            } else {
                ListRef::content(parent)
            };
            self.remove_node(list, id)?;
        }
        Ok(id)
    }

    /// String value: concatenated descendant text for elements and
    /// documents, the node's own text otherwise
    pub fn value(&self, id: NodeId) -> Result<String> {
        let node = self.node(id)?;
        Ok(match &node.data {
            NodeData::Element(_) | NodeData::Document(_) => {
                let mut out = String::new();
                self.collect_text(id, &mut out)?;
                out
            }
            NodeData::Attribute(attr) => attr.value.clone(),
            NodeData::Text(s) | NodeData::CData(s) | NodeData::Comment(s) => s.clone(),
            NodeData::ProcessingInstruction(pi) => pi.data.clone(),
            NodeData::EntityRef(_) | NodeData::DocType(_) => String::new(),
        })
    }

    /// Iterative depth-first text collection
    fn collect_text(&self, id: NodeId, out: &mut String) -> Result<()> {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.node(current)?;
            match &node.data {
                NodeData::Text(s) | NodeData::CData(s) => out.push_str(s),
                NodeData::Element(el) => stack.extend(el.content.iter().rev()),
                NodeData::Document(doc) => stack.extend(doc.content.iter().rev()),
                _ => {}
            }
        }
        Ok(())
    }

    /// Copy of a node without its children or attributes. The copy is
    /// detached.
    fn shallow_clone(&mut self, id: NodeId) -> Result<NodeId> {
        let data = match &self.node(id)?.data {
            NodeData::Document(doc) => {
                let base_uri = doc.base_uri.clone();
                return Ok(self.alloc(|id| {
                    let mut copy = DocumentData::new(id);
                    copy.base_uri = base_uri;
                    NodeData::Document(copy)
                }));
            }
            NodeData::Element(el) => {
                let name = el.name.clone();
                let namespace = el.namespace.clone();
                let additional = el.additional_namespaces.clone();
                return Ok(self.alloc(|id| {
                    let mut copy = ElementData::new(id, name, namespace);
                    copy.additional_namespaces = additional;
                    NodeData::Element(copy)
                }));
            }
            NodeData::Attribute(attr) => NodeData::Attribute(attr.clone()),
            NodeData::Text(s) => NodeData::Text(s.clone()),
            NodeData::CData(s) => NodeData::CData(s.clone()),
            NodeData::Comment(s) => NodeData::Comment(s.clone()),
            NodeData::ProcessingInstruction(pi) => NodeData::ProcessingInstruction(pi.clone()),
            NodeData::EntityRef(e) => NodeData::EntityRef(e.clone()),
            NodeData::DocType(d) => NodeData::DocType(d.clone()),
        };
        Ok(self.alloc(|_| data))
    }

    /// Detached deep copy of a subtree (breadth-first, no recursion)
    pub fn deep_clone(&mut self, id: NodeId) -> Result<NodeId> {
        let copy = self.shallow_clone(id)?;
        let mut queue = VecDeque::new();
        queue.push_back((id, copy));

        while let Some((source, target)) = queue.pop_front() {
            let (attributes, children) = match &self.node(source)?.data {
                NodeData::Element(el) => (
                    el.attributes.as_slice().to_vec(),
                    el.content.as_slice().to_vec(),
                ),
                NodeData::Document(doc) => (Vec::new(), doc.content.as_slice().to_vec()),
                _ => continue,
            };

            let mut attribute_copies = Vec::with_capacity(attributes.len());
            for attr in attributes {
                attribute_copies.push(self.shallow_clone(attr)?);
            }
            if !attribute_copies.is_empty() {
                self.insert_all(ListRef::attributes(target), 0, attribute_copies)?;
            }

            let mut child_copies = Vec::with_capacity(children.len());
            for child in children {
                let child_copy = self.shallow_clone(child)?;
                if self.node(child)?.is_element() {
                    queue.push_back((child, child_copy));
                }
                child_copies.push(child_copy);
            }
            if !child_copies.is_empty() {
                self.insert_all(ListRef::content(target), 0, child_copies)?;
            }
        }

        Ok(copy)
    }
}

impl Default for XmlArena {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) const UNPREFIXED_ATTRIBUTE_NAMESPACE: &str =
    "An attribute namespace without a prefix can only be the no-namespace sentinel";

pub(crate) fn check_attribute_namespace(namespace: &Namespace) -> Result<()> {
    if namespace.prefix().is_empty() && !namespace.is_none() {
        return Err(DomError::IllegalName {
            name: namespace.uri().to_string(),
            construct: "attribute namespace",
            reason: UNPREFIXED_ATTRIBUTE_NAMESPACE.to_string(),
        });
    }
    Ok(())
}

fn check_ids(public_id: Option<&str>, system_id: Option<&str>) -> Result<()> {
    if let Some(public_id) = public_id {
        verifier::check_public_id(public_id)?;
    }
    if let Some(system_id) = system_id {
        verifier::check_system_id(system_id)?;
    }
    Ok(())
}
