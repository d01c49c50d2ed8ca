//! Depth-first pre-order walk over everything below a node
//!
//! A stack of [`ViewCursor`]s, one per open content list. An element's
//! own list is only opened on the call after it was returned, so a
//! `remove()` right after returning an element drops the whole subtree
//! without ever visiting it.

use crate::arena::XmlArena;
use crate::backing::ListRef;
use crate::cursor::ViewCursor;
use crate::error::{DomError, Result};
use crate::filter::Filter;
use crate::types::NodeId;

#[derive(Debug, Clone)]
pub struct DescendantCursor {
    stack: Vec<ViewCursor>,
    /// Element returned last whose children have not been entered yet
    pending: Option<NodeId>,
    filter: Filter,
}

impl DescendantCursor {
    /// Walk every descendant of an element or document
    pub fn new(dom: &XmlArena, root: NodeId) -> Result<Self> {
        Self::with_filter(dom, root, Filter::Any)
    }

    /// Walk every descendant, returning only the ones `filter` matches.
    /// Non-matching elements are still descended into.
    pub fn with_filter(dom: &XmlArena, root: NodeId, filter: Filter) -> Result<Self> {
        let node = dom.node(root)?;
        if !(node.is_element() || node.is_document()) {
            return Err(DomError::wrong_kind("Element or Document", node.kind()));
        }
        Ok(Self {
            stack: vec![ViewCursor::new(dom, ListRef::content(root), Filter::Any)?],
            pending: None,
            filter,
        })
    }

    fn next_raw(&mut self, dom: &XmlArena) -> Result<Option<NodeId>> {
        if let Some(element) = self.pending.take() {
            if let Some(top) = self.stack.last() {
                top.verify(dom)?;
            }
            let children = ViewCursor::new(dom, ListRef::content(element), Filter::Any)?;
            self.stack.push(children);
        }

        while let Some(top) = self.stack.last_mut() {
            match top.next(dom)? {
                Some(id) => {
                    if dom.node(id)?.is_element() {
                        self.pending = Some(id);
                    }
                    return Ok(Some(id));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
        Ok(None)
    }

    /// Next matching descendant in document order. `Ok(None)` when done.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self, dom: &XmlArena) -> Result<Option<NodeId>> {
        while let Some(id) = self.next_raw(dom)? {
            if self.filter.matches(dom.node(id)?) {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    pub fn has_next(&self, dom: &XmlArena) -> Result<bool> {
        Ok(self.clone().next(dom)?.is_some())
    }

    /// Remove the node returned last (with its subtree) from its parent
    pub fn remove(&mut self, dom: &mut XmlArena) -> Result<NodeId> {
        let top = self
            .stack
            .last_mut()
            .ok_or(DomError::IllegalIteratorState("remove() after the walk has finished"))?;
        let removed = top.remove(dom)?;
        self.pending = None;
        Ok(removed)
    }

    /// Number of content lists currently open
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// Borrowing read-only walk; the arena cannot change underneath it
pub struct Descendants<'a> {
    dom: &'a XmlArena,
    cursor: DescendantCursor,
}

impl<'a> Descendants<'a> {
    pub fn new(dom: &'a XmlArena, root: NodeId, filter: Filter) -> Result<Self> {
        Ok(Self {
            dom,
            cursor: DescendantCursor::with_filter(dom, root, filter)?,
        })
    }
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        // no mutation is possible while `dom` is borrowed, so the only
        // failure left would be a dangling id, which the arena never makes
        self.cursor.next(self.dom).ok().flatten()
    }
}

impl XmlArena {
    /// All descendants of an element or document in document order
    pub fn descendants(&self, root: NodeId) -> Result<Descendants<'_>> {
        Descendants::new(self, root, Filter::Any)
    }

    pub fn descendants_filtered(&self, root: NodeId, filter: Filter) -> Result<Descendants<'_>> {
        Descendants::new(self, root, filter)
    }
}
