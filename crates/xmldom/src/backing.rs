//! Backing lists - the single authoritative store of a node's children
//!
//! Every document and element owns one content list; every element also
//! owns one attribute list. All structural mutation in the crate funnels
//! through [`XmlArena::splice`]:
//!
//! ```text
//! check (no state touched) → rewrite items → clear old parents
//!                          → set new parents → bump mod_count
//! ```
//!
//! Views and cursors never store nodes; they re-read these lists.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::arena::XmlArena;
use crate::checker;
use crate::error::{DomError, Result};
use crate::types::{NodeData, NodeId};

/// What a list is allowed to hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotKind {
    DocumentContent,
    ElementContent,
    Attributes,
}

/// Which of a node's lists is meant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Content,
    Attributes,
}

/// Names one backing list: its owner plus the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListRef {
    owner: NodeId,
    slot: Slot,
}

impl ListRef {
    /// Content list of an element or document
    pub fn content(owner: NodeId) -> Self {
        Self {
            owner,
            slot: Slot::Content,
        }
    }

    /// Attribute list of an element
    pub fn attributes(owner: NodeId) -> Self {
        Self {
            owner,
            slot: Slot::Attributes,
        }
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }
}

/// Ordered child storage with a structural-modification counter
#[derive(Debug, Clone)]
pub struct BackingList {
    owner: NodeId,
    kind: SlotKind,
    items: SmallVec<[NodeId; 4]>, // Most nodes have <4 children
    mod_count: u64,
}

impl BackingList {
    pub(crate) fn new(owner: NodeId, kind: SlotKind) -> Self {
        Self {
            owner,
            kind,
            items: SmallVec::new(),
            mod_count: 0,
        }
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<NodeId> {
        self.items
            .get(index)
            .copied()
            .ok_or(DomError::IndexOutOfRange {
                index,
                len: self.items.len(),
            })
    }

    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.items.iter().position(|&id| id == node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.items.contains(&node)
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.items
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = NodeId> + ExactSizeIterator + '_ {
        self.items.iter().copied()
    }

    /// Bumped by every successful structural change
    pub fn mod_count(&self) -> u64 {
        self.mod_count
    }
}

fn check_bounds(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(DomError::IndexOutOfRange { index, len })
    }
}

fn check_insert_bounds(index: usize, len: usize) -> Result<()> {
    if index <= len {
        Ok(())
    } else {
        Err(DomError::IndexOutOfRange { index, len })
    }
}

impl XmlArena {
    /// Resolve a list reference
    pub fn list(&self, list: ListRef) -> Result<&BackingList> {
        let node = self.node(list.owner)?;
        match (&node.data, list.slot) {
            (NodeData::Document(doc), Slot::Content) => Ok(&doc.content),
            (NodeData::Element(el), Slot::Content) => Ok(&el.content),
            (NodeData::Element(el), Slot::Attributes) => Ok(&el.attributes),
            (_, Slot::Content) => Err(DomError::wrong_kind("Element or Document", node.kind())),
            (_, Slot::Attributes) => Err(DomError::wrong_kind("Element", node.kind())),
        }
    }

    fn list_mut(&mut self, list: ListRef) -> Result<&mut BackingList> {
        let node = self.node_mut(list.owner)?;
        let kind = node.kind();
        match (&mut node.data, list.slot) {
            (NodeData::Document(doc), Slot::Content) => Ok(&mut doc.content),
            (NodeData::Element(el), Slot::Content) => Ok(&mut el.content),
            (NodeData::Element(el), Slot::Attributes) => Ok(&mut el.attributes),
            _ => Err(DomError::wrong_kind("Element or Document", kind)),
        }
    }

    /// Would appending `node` to `list` be accepted? Nothing is changed.
    pub fn can_add(&self, list: ListRef, node: NodeId) -> Result<()> {
        let backing = self.list(list)?;
        checker::check_splice(self, backing, backing.len(), 0, &[node])
    }

    pub fn append(&mut self, list: ListRef, node: NodeId) -> Result<()> {
        let len = self.list(list)?.len();
        self.splice(list, len, 0, &[node]).map(|_| ())
    }

    pub fn insert_at(&mut self, list: ListRef, index: usize, node: NodeId) -> Result<()> {
        check_insert_bounds(index, self.list(list)?.len())?;
        self.splice(list, index, 0, &[node]).map(|_| ())
    }

    /// Replace the node at `index`; the old node is detached and returned
    pub fn replace_at(&mut self, list: ListRef, index: usize, node: NodeId) -> Result<NodeId> {
        check_bounds(index, self.list(list)?.len())?;
        let removed = self.splice(list, index, 1, &[node])?;
        Ok(removed[0])
    }

    pub fn remove_at(&mut self, list: ListRef, index: usize) -> Result<NodeId> {
        check_bounds(index, self.list(list)?.len())?;
        let removed = self.splice(list, index, 1, &[])?;
        Ok(removed[0])
    }

    /// Remove `node` if present; `false` when it is not in this list
    pub fn remove_node(&mut self, list: ListRef, node: NodeId) -> Result<bool> {
        match self.list(list)?.index_of(node) {
            Some(index) => {
                self.splice(list, index, 1, &[])?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Insert every node at `index`, all or nothing
    pub fn insert_all<I>(&mut self, list: ListRef, index: usize, nodes: I) -> Result<()>
    where
        I: IntoIterator<Item = NodeId>,
    {
        check_insert_bounds(index, self.list(list)?.len())?;
        let nodes: Vec<NodeId> = nodes.into_iter().collect();
        if nodes.is_empty() {
            return Ok(());
        }
        self.splice(list, index, 0, &nodes).map(|_| ())
    }

    /// Replace the whole list, all or nothing. Returns the old children,
    /// now detached (unless they were part of the new set).
    pub fn clear_and_set<I>(&mut self, list: ListRef, nodes: I) -> Result<Vec<NodeId>>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let len = self.list(list)?.len();
        let nodes: Vec<NodeId> = nodes.into_iter().collect();
        self.splice(list, 0, len, &nodes)
    }

    /// Replace `items[start..start + remove_count]` with `candidates`.
    ///
    /// The checker sees the proposed final sequence before anything is
    /// touched; a rejection leaves list and candidates exactly as they were.
    pub(crate) fn splice(
        &mut self,
        list: ListRef,
        start: usize,
        remove_count: usize,
        candidates: &[NodeId],
    ) -> Result<Vec<NodeId>> {
        let backing = self.list(list)?;
        let end = start
            .checked_add(remove_count)
            .filter(|&end| end <= backing.len())
            .ok_or(DomError::IndexOutOfRange {
                index: start.saturating_add(remove_count),
                len: backing.len(),
            })?;

        if let Err(err) = checker::check_splice(self, backing, start, remove_count, candidates) {
            tracing::debug!("rejected change to node {}: {}", list.owner, err);
            return Err(err);
        }

        let backing = self.list_mut(list)?;
        let removed: Vec<NodeId> = backing.items.drain(start..end).collect();
        backing.items.insert_many(start, candidates.iter().copied());
        backing.mod_count += 1;

        for &old in &removed {
            if !candidates.contains(&old) {
                self.node_mut(old)?.parent = None;
            }
        }
        for &new in candidates {
            self.node_mut(new)?.parent = Some(list.owner);
        }

        tracing::trace!(
            "spliced {:?} list of node {} at {}: -{} +{}",
            list.slot,
            list.owner,
            start,
            removed.len(),
            candidates.len()
        );

        Ok(removed)
    }
}
