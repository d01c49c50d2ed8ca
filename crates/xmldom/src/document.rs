//! Document operations
//!
//! A document's content list holds comments, processing instructions, at
//! most one DocType and at most one root element, DocType first. The
//! checker enforces that shape; these helpers find and swap the two
//! singletons without disturbing the surrounding content.

use crate::arena::XmlArena;
use crate::backing::ListRef;
use crate::error::{DomError, Result};
use crate::types::{DocumentData, NodeData, NodeId, NodeKind};

impl XmlArena {
    pub fn document(&self, id: NodeId) -> Result<&DocumentData> {
        let node = self.node(id)?;
        node.as_document()
            .ok_or_else(|| DomError::wrong_kind("Document", node.kind()))
    }

    /// New document holding `root` as its root element
    pub fn new_document_with_root(&mut self, root: NodeId) -> Result<NodeId> {
        // validate before allocating so a bad root leaves no orphan document
        self.element(root)?;
        if let Some(parent) = self.parent(root)? {
            return Err(DomError::illegal_add(
                root,
                parent,
                "The Element already has an existing parent",
            ));
        }
        let doc = self.new_document();
        self.append(ListRef::content(doc), root)?;
        Ok(doc)
    }

    fn position_of_kind(&self, doc: NodeId, kind: NodeKind) -> Result<Option<(usize, NodeId)>> {
        for (index, id) in self.document(doc)?.content().iter().enumerate() {
            if self.node(id)?.kind() == kind {
                return Ok(Some((index, id)));
            }
        }
        Ok(None)
    }

    /// The root element; fails with `RootNotSet` when there is none
    pub fn root_element(&self, doc: NodeId) -> Result<NodeId> {
        self.position_of_kind(doc, NodeKind::Element)?
            .map(|(_, id)| id)
            .ok_or(DomError::RootNotSet(doc))
    }

    pub fn has_root_element(&self, doc: NodeId) -> Result<bool> {
        Ok(self.position_of_kind(doc, NodeKind::Element)?.is_some())
    }

    /// Install `root`, replacing any current root at the same position.
    /// Returns the previous root, now detached; `None` when there was none
    /// or `root` already is the root.
    pub fn set_root_element(&mut self, doc: NodeId, root: NodeId) -> Result<Option<NodeId>> {
        self.element(root)?;
        let list = ListRef::content(doc);
        match self.position_of_kind(doc, NodeKind::Element)? {
            Some((_, current)) if current == root => Ok(None),
            Some((index, _)) => self.replace_at(list, index, root).map(Some),
            None => self.append(list, root).map(|_| None),
        }
    }

    pub fn detach_root_element(&mut self, doc: NodeId) -> Result<Option<NodeId>> {
        match self.position_of_kind(doc, NodeKind::Element)? {
            Some((index, _)) => self.remove_at(ListRef::content(doc), index).map(Some),
            None => Ok(None),
        }
    }

    pub fn doctype(&self, doc: NodeId) -> Result<Option<NodeId>> {
        let found = self.position_of_kind(doc, NodeKind::DocType)?;
        Ok(found.map(|(_, id)| id))
    }

    /// Install a DocType: replaces the current one in place, otherwise
    /// goes to the front. Returns the previous DocType, now detached.
    pub fn set_doctype(&mut self, doc: NodeId, doctype: NodeId) -> Result<Option<NodeId>> {
        let node = self.node(doctype)?;
        if node.kind() != NodeKind::DocType {
            return Err(DomError::wrong_kind("DocType", node.kind()));
        }
        let list = ListRef::content(doc);
        match self.position_of_kind(doc, NodeKind::DocType)? {
            Some((_, current)) if current == doctype => Ok(None),
            Some((index, _)) => self.replace_at(list, index, doctype).map(Some),
            None => self.insert_at(list, 0, doctype).map(|_| None),
        }
    }

    pub fn base_uri(&self, doc: NodeId) -> Result<Option<&str>> {
        Ok(self.document(doc)?.base_uri())
    }

    pub fn set_base_uri(&mut self, doc: NodeId, uri: Option<&str>) -> Result<()> {
        match &mut self.node_mut(doc)?.data {
            NodeData::Document(data) => {
                data.base_uri = uri.map(str::to_string);
                Ok(())
            }
            other => Err(DomError::wrong_kind("Document", other.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_not_set() {
        let mut dom = XmlArena::new();
        let doc = dom.new_document();
        let err = dom.root_element(doc).unwrap_err();
        assert!(matches!(err, DomError::RootNotSet(d) if d == doc));
        assert!(!dom.has_root_element(doc).unwrap());
        assert_eq!(dom.detach_root_element(doc).unwrap(), None);
    }

    #[test]
    fn test_set_root_replaces_in_place() {
        let mut dom = XmlArena::new();
        let first = dom.new_element("first").unwrap();
        let doc = dom.new_document_with_root(first).unwrap();
        let comment = dom.new_comment(" after ").unwrap();
        dom.append(ListRef::content(doc), comment).unwrap();
        let second = dom.new_element("second").unwrap();

        assert_eq!(dom.set_root_element(doc, second).unwrap(), Some(first));
        assert_eq!(dom.root_element(doc).unwrap(), second);
        assert_eq!(
            dom.list(ListRef::content(doc)).unwrap().as_slice(),
            &[second, comment]
        );
        assert_eq!(dom.parent(first).unwrap(), None);
    }

    #[test]
    fn test_doctype_goes_first() {
        let mut dom = XmlArena::new();
        let doc = dom.new_document();
        let list = ListRef::content(doc);
        let pi = dom.new_processing_instruction("pi", "data").unwrap();
        let root = dom.new_element("html").unwrap();
        dom.append(list, pi).unwrap();
        dom.set_root_element(doc, root).unwrap();

        let dt = dom.new_doctype("html").unwrap();
        assert_eq!(dom.set_doctype(doc, dt).unwrap(), None);
        assert_eq!(dom.list(list).unwrap().as_slice(), &[dt, pi, root]);

        let public_id = Some("-//W3C//DTD XHTML 1.0//EN");
        let dt2 = dom.new_doctype_ids("html", public_id, None).unwrap();
        assert_eq!(dom.set_doctype(doc, dt2).unwrap(), Some(dt));
        assert_eq!(dom.doctype(doc).unwrap(), Some(dt2));
    }

    #[test]
    fn test_setting_current_root_is_a_no_op() {
        let mut dom = XmlArena::new();
        let root = dom.new_element("r").unwrap();
        let doc = dom.new_document_with_root(root).unwrap();
        let dt = dom.new_doctype("r").unwrap();
        dom.set_doctype(doc, dt).unwrap();
        let list = ListRef::content(doc);
        let mods = dom.list(list).unwrap().mod_count();

        assert_eq!(dom.set_root_element(doc, root).unwrap(), None);
        assert_eq!(dom.set_doctype(doc, dt).unwrap(), None);
        assert_eq!(dom.parent(root).unwrap(), Some(doc));
        assert_eq!(dom.parent(dt).unwrap(), Some(doc));
        assert_eq!(dom.list(list).unwrap().mod_count(), mods);
    }

    #[test]
    fn test_with_root_rejects_parented_element() {
        let mut dom = XmlArena::new();
        let doc = dom.new_document();
        let root = dom.new_element("r").unwrap();
        dom.set_root_element(doc, root).unwrap();
        let nodes_before = dom.len();

        assert!(dom.new_document_with_root(root).is_err());
        assert_eq!(dom.len(), nodes_before);
    }

    #[test]
    fn test_base_uri() {
        let mut dom = XmlArena::new();
        let doc = dom.new_document();
        assert_eq!(dom.base_uri(doc).unwrap(), None);
        dom.set_base_uri(doc, Some("file:///tmp/a.xml")).unwrap();
        assert_eq!(dom.base_uri(doc).unwrap(), Some("file:///tmp/a.xml"));
    }
}
