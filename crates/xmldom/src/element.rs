//! Element operations
//!
//! Convenience API over an element's content list, namespace declarations
//! and text. Structural changes all go through the backing-list calls in
//! [`crate::backing`] or through a [`FilteredView`], so they obey the same
//! containment rules as everything else.

use crate::arena::XmlArena;
use crate::backing::ListRef;
use crate::checker;
use crate::error::{AddTarget, DomError, Result};
use crate::filter::{ContentKinds, Filter};
use crate::namespace::Namespace;
use crate::types::{ElementData, NodeData, NodeId};
use crate::utils::normalize_string;
use crate::verifier;
use crate::view::FilteredView;

impl XmlArena {
    pub fn element(&self, id: NodeId) -> Result<&ElementData> {
        let node = self.node(id)?;
        node.as_element()
            .ok_or_else(|| DomError::wrong_kind("Element", node.kind()))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData> {
        let node = self.node_mut(id)?;
        let kind = node.kind();
        node.as_element_mut()
            .ok_or_else(|| DomError::wrong_kind("Element", kind))
    }

    // ----- naming -------------------------------------------------------

    pub fn set_element_name(&mut self, id: NodeId, name: &str) -> Result<()> {
        verifier::check_element_name(name)?;
        self.element_mut(id)?.name = name.to_string();
        Ok(())
    }

    /// Move the element into another namespace. The new prefix may not
    /// clash with a declaration or attribute prefix already on the element.
    pub fn set_element_namespace(&mut self, id: NodeId, namespace: &Namespace) -> Result<()> {
        let element = self.element(id)?;
        let clash = |other: &Namespace| {
            other.prefix() == namespace.prefix() && other.uri() != namespace.uri()
        };
        let mut conflict = element.additional_namespaces().iter().any(clash);
        for attr in element.attributes().iter() {
            if let Some(attr) = self.node(attr)?.as_attribute() {
                conflict |= !namespace.prefix().is_empty() && clash(attr.namespace());
            }
        }
        if conflict {
            return Err(DomError::IllegalAdd {
                target: AddTarget::Namespace(namespace.clone()),
                parent: id,
                reason: format!(
                    "The namespace prefix \"{}\" is bound to another URI on this element",
                    namespace.prefix()
                ),
            });
        }
        let namespace = self.intern(namespace)?;
        self.element_mut(id)?.namespace = namespace;
        Ok(())
    }

    /// Resolve a prefix in scope at this element: `xml`, then the
    /// element's own prefix, then its extra declarations, then ancestors
    pub fn namespace_for_prefix(&self, id: NodeId, prefix: &str) -> Result<Option<Namespace>> {
        if prefix == "xml" {
            return Ok(Some(Namespace::xml()));
        }
        let mut current = Some(id);
        while let Some(el_id) = current {
            let node = self.node(el_id)?;
            let Some(element) = node.as_element() else {
                break;
            };
            if element.namespace().prefix() == prefix {
                return Ok(Some(element.namespace().clone()));
            }
            if let Some(ns) = element
                .additional_namespaces()
                .iter()
                .find(|ns| ns.prefix() == prefix)
            {
                return Ok(Some(ns.clone()));
            }
            current = node.parent();
        }
        Ok(None)
    }

    /// Declare an extra namespace on the element. `false` if that exact
    /// declaration is already present.
    pub fn add_namespace_declaration(&mut self, id: NodeId, namespace: &Namespace) -> Result<bool> {
        checker::check_namespace_declaration(self, id, namespace)?;
        let declared = self.element(id)?.additional_namespaces();
        if declared.contains(namespace) {
            return Ok(false);
        }
        let namespace = self.intern(namespace)?;
        self.element_mut(id)?.additional_namespaces.push(namespace);
        Ok(true)
    }

    pub fn remove_namespace_declaration(
        &mut self,
        id: NodeId,
        namespace: &Namespace,
    ) -> Result<bool> {
        let decls = &mut self.element_mut(id)?.additional_namespaces;
        match decls.iter().position(|ns| ns == namespace) {
            Some(pos) => {
                decls.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ----- text ---------------------------------------------------------

    /// Concatenated Text and CDATA children (direct children only)
    pub fn text(&self, id: NodeId) -> Result<String> {
        let mut out = String::new();
        for child in self.element(id)?.content().iter() {
            if let NodeData::Text(s) | NodeData::CData(s) = &self.node(child)?.data {
                out.push_str(s);
            }
        }
        Ok(out)
    }

    pub fn text_trim(&self, id: NodeId) -> Result<String> {
        Ok(self.text(id)?.trim().to_string())
    }

    pub fn text_normalize(&self, id: NodeId) -> Result<String> {
        Ok(normalize_string(&self.text(id)?))
    }

    /// Replace all content with a single text node (nothing when empty)
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<Vec<NodeId>> {
        self.element(id)?;
        let replacement = if text.is_empty() {
            Vec::new()
        } else {
            vec![self.new_text(text)?]
        };
        self.clear_and_set(ListRef::content(id), replacement)
    }

    /// Text of the first child element with this name and no namespace
    pub fn child_text(&self, id: NodeId, name: &str) -> Result<Option<String>> {
        self.child(id, name)?
            .map(|child| self.text(child))
            .transpose()
    }

    pub fn child_text_ns(
        &self,
        id: NodeId,
        name: &str,
        namespace: &Namespace,
    ) -> Result<Option<String>> {
        self.child_ns(id, name, namespace)?
            .map(|child| self.text(child))
            .transpose()
    }

    pub fn child_text_trim(&self, id: NodeId, name: &str) -> Result<Option<String>> {
        Ok(self.child_text(id, name)?.map(|t| t.trim().to_string()))
    }

    pub fn child_text_normalize(&self, id: NodeId, name: &str) -> Result<Option<String>> {
        Ok(self.child_text(id, name)?.map(|t| normalize_string(&t)))
    }

    // ----- child elements -----------------------------------------------

    /// Live view of the child elements
    pub fn children(&self, id: NodeId) -> Result<FilteredView> {
        self.element(id)?;
        Ok(FilteredView::new(ListRef::content(id), Filter::elements()))
    }

    /// Live view of the child elements with this name and no namespace
    pub fn children_named(&self, id: NodeId, name: &str) -> Result<FilteredView> {
        self.element(id)?;
        Ok(FilteredView::new(ListRef::content(id), Filter::element_named(name)))
    }

    pub fn children_named_ns(
        &self,
        id: NodeId,
        name: &str,
        namespace: &Namespace,
    ) -> Result<FilteredView> {
        self.element(id)?;
        Ok(FilteredView::new(
            ListRef::content(id),
            Filter::element_named_ns(name, namespace),
        ))
    }

    pub fn child(&self, id: NodeId, name: &str) -> Result<Option<NodeId>> {
        let view = self.children_named(id, name)?;
        let first = view.iter(self)?.next();
        Ok(first)
    }

    pub fn child_ns(
        &self,
        id: NodeId,
        name: &str,
        namespace: &Namespace,
    ) -> Result<Option<NodeId>> {
        let view = self.children_named_ns(id, name, namespace)?;
        let first = view.iter(self)?.next();
        Ok(first)
    }

    /// Remove the first child element with this name; `false` if none
    pub fn remove_child(&mut self, id: NodeId, name: &str) -> Result<bool> {
        match self.child(id, name)? {
            Some(child) => self.remove_node(ListRef::content(id), child),
            None => Ok(false),
        }
    }

    pub fn remove_child_ns(
        &mut self,
        id: NodeId,
        name: &str,
        namespace: &Namespace,
    ) -> Result<bool> {
        match self.child_ns(id, name, namespace)? {
            Some(child) => self.remove_node(ListRef::content(id), child),
            None => Ok(false),
        }
    }

    /// Remove every child element with this name; `true` if any went
    pub fn remove_children(&mut self, id: NodeId, name: &str) -> Result<bool> {
        let view = self.children_named(id, name)?;
        Ok(!view.clear(self)?.is_empty())
    }

    pub fn remove_children_ns(
        &mut self,
        id: NodeId,
        name: &str,
        namespace: &Namespace,
    ) -> Result<bool> {
        let view = self.children_named_ns(id, name, namespace)?;
        Ok(!view.clear(self)?.is_empty())
    }

    // ----- general content (elements and documents) ----------------------

    /// Live view of all content
    pub fn contents(&self, id: NodeId) -> Result<FilteredView> {
        self.contents_filtered(id, Filter::Any)
    }

    pub fn contents_filtered(&self, id: NodeId, filter: Filter) -> Result<FilteredView> {
        let list = ListRef::content(id);
        self.list(list)?;
        Ok(FilteredView::new(list, filter))
    }

    pub fn content_at(&self, id: NodeId, index: usize) -> Result<NodeId> {
        self.list(ListRef::content(id))?.get(index)
    }

    pub fn contents_len(&self, id: NodeId) -> Result<usize> {
        Ok(self.list(ListRef::content(id))?.len())
    }

    pub fn index_of(&self, id: NodeId, child: NodeId) -> Result<Option<usize>> {
        Ok(self.list(ListRef::content(id))?.index_of(child))
    }

    pub fn add_content(&mut self, id: NodeId, child: NodeId) -> Result<()> {
        self.append(ListRef::content(id), child)
    }

    pub fn add_content_at(&mut self, id: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.insert_at(ListRef::content(id), index, child)
    }

    pub fn add_contents<I>(&mut self, id: NodeId, children: I) -> Result<()>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let index = self.contents_len(id)?;
        self.insert_all(ListRef::content(id), index, children)
    }

    pub fn add_contents_at<I>(&mut self, id: NodeId, index: usize, children: I) -> Result<()>
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.insert_all(ListRef::content(id), index, children)
    }

    /// Append a new text node; returns its id
    pub fn add_text(&mut self, id: NodeId, text: &str) -> Result<NodeId> {
        self.element(id)?;
        let node = self.new_text(text)?;
        self.add_content(id, node)?;
        Ok(node)
    }

    pub fn set_content_at(&mut self, id: NodeId, index: usize, child: NodeId) -> Result<NodeId> {
        self.replace_at(ListRef::content(id), index, child)
    }

    /// Replace the node at `index` with a whole sequence, all or nothing
    pub fn replace_content_with<I>(
        &mut self,
        id: NodeId,
        index: usize,
        children: I,
    ) -> Result<NodeId>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let list = ListRef::content(id);
        let len = self.list(list)?.len();
        if index >= len {
            return Err(DomError::IndexOutOfRange { index, len });
        }
        let children: Vec<NodeId> = children.into_iter().collect();
        let removed = self.splice(list, index, 1, &children)?;
        Ok(removed[0])
    }

    pub fn set_contents<I>(&mut self, id: NodeId, children: I) -> Result<Vec<NodeId>>
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.clear_and_set(ListRef::content(id), children)
    }

    pub fn remove_content(&mut self, id: NodeId, child: NodeId) -> Result<bool> {
        self.remove_node(ListRef::content(id), child)
    }

    pub fn remove_content_at(&mut self, id: NodeId, index: usize) -> Result<NodeId> {
        self.remove_at(ListRef::content(id), index)
    }

    pub fn remove_contents(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        self.clear_and_set(ListRef::content(id), Vec::new())
    }

    pub fn remove_contents_filtered(&mut self, id: NodeId, filter: Filter) -> Result<Vec<NodeId>> {
        self.contents_filtered(id, filter)?.clear(self)
    }

    /// Detached deep copies of every content node, in order
    pub fn clone_contents(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        let children = self.list(ListRef::content(id))?.as_slice().to_vec();
        children
            .into_iter()
            .map(|child| self.deep_clone(child))
            .collect()
    }

    /// Is this element the root element of a document?
    pub fn is_root_element(&self, id: NodeId) -> Result<bool> {
        self.element(id)?;
        match self.node(id)?.parent() {
            Some(parent) => Ok(self.node(parent)?.is_document()),
            None => Ok(false),
        }
    }

    /// Child elements only, skipping text and everything else
    pub fn element_count(&self, id: NodeId) -> Result<usize> {
        let kinds = Filter::kinds(ContentKinds::ELEMENT);
        self.contents_filtered(id, kinds)?.len(self)
    }
}
