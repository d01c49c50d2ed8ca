//! Live filtered views over a backing list
//!
//! A view owns nothing but a list reference and a filter. Every call
//! re-reads the backing list, so a view is never stale: whatever changed
//! the list (another view, a cursor, a direct list call) shows up on the
//! next access. Positions are the positions among matching nodes.

use crate::arena::XmlArena;
use crate::backing::ListRef;
use crate::cursor::ViewCursor;
use crate::error::{DomError, Result};
use crate::filter::Filter;
use crate::types::NodeId;

/// Where a view position lands in the backing list
enum Position {
    At(usize),
    Past { matches: usize, backing_len: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilteredView {
    list: ListRef,
    filter: Filter,
}

impl FilteredView {
    pub fn new(list: ListRef, filter: Filter) -> Self {
        Self { list, filter }
    }

    pub fn list(&self) -> ListRef {
        self.list
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    fn matches(&self, dom: &XmlArena, id: NodeId) -> Result<bool> {
        Ok(self.filter.matches(dom.node(id)?))
    }

    fn require_match(&self, dom: &XmlArena, id: NodeId) -> Result<()> {
        if self.matches(dom, id)? {
            Ok(())
        } else {
            let kind = dom.kind(id)?.label();
            let reason = format!("Filter won't allow the {} to be added", kind);
            Err(DomError::illegal_add(id, self.list.owner(), reason))
        }
    }

    fn locate(&self, dom: &XmlArena, view_index: usize) -> Result<Position> {
        let backing = dom.list(self.list)?;
        let mut seen = 0;
        for (i, id) in backing.iter().enumerate() {
            if self.matches(dom, id)? {
                if seen == view_index {
                    return Ok(Position::At(i));
                }
                seen += 1;
            }
        }
        Ok(Position::Past {
            matches: seen,
            backing_len: backing.len(),
        })
    }

    pub fn len(&self, dom: &XmlArena) -> Result<usize> {
        let mut count = 0;
        for id in dom.list(self.list)?.iter() {
            if self.matches(dom, id)? {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn is_empty(&self, dom: &XmlArena) -> Result<bool> {
        for id in dom.list(self.list)?.iter() {
            if self.matches(dom, id)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn get(&self, dom: &XmlArena, index: usize) -> Result<NodeId> {
        match self.locate(dom, index)? {
            Position::At(i) => dom.list(self.list)?.get(i),
            Position::Past { matches, .. } => Err(DomError::IndexOutOfRange {
                index,
                len: matches,
            }),
        }
    }

    /// Position among matching nodes; `None` if absent or filtered out
    pub fn index_of(&self, dom: &XmlArena, node: NodeId) -> Result<Option<usize>> {
        let mut seen = 0;
        for id in dom.list(self.list)?.iter() {
            if self.matches(dom, id)? {
                if id == node {
                    return Ok(Some(seen));
                }
                seen += 1;
            }
        }
        Ok(None)
    }

    pub fn contains(&self, dom: &XmlArena, node: NodeId) -> Result<bool> {
        Ok(self.index_of(dom, node)?.is_some())
    }

    /// Replace the `index`th match; returns the node it displaced
    pub fn set(&self, dom: &mut XmlArena, index: usize, node: NodeId) -> Result<NodeId> {
        self.require_match(dom, node)?;
        match self.locate(dom, index)? {
            Position::At(i) => dom.replace_at(self.list, i, node),
            Position::Past { matches, .. } => Err(DomError::IndexOutOfRange {
                index,
                len: matches,
            }),
        }
    }

    pub fn remove_at(&self, dom: &mut XmlArena, index: usize) -> Result<NodeId> {
        match self.locate(dom, index)? {
            Position::At(i) => dom.remove_at(self.list, i),
            Position::Past { matches, .. } => Err(DomError::IndexOutOfRange {
                index,
                len: matches,
            }),
        }
    }

    /// Insert before the `index`th match. `index == len` appends to the
    /// end of the whole backing list, after any trailing non-matching
    /// nodes.
    pub fn insert(&self, dom: &mut XmlArena, index: usize, node: NodeId) -> Result<()> {
        self.require_match(dom, node)?;
        match self.locate(dom, index)? {
            Position::At(i) => dom.insert_at(self.list, i, node),
            Position::Past {
                matches,
                backing_len,
            } if index == matches => dom.insert_at(self.list, backing_len, node),
            Position::Past { matches, .. } => Err(DomError::IndexOutOfRange {
                index,
                len: matches,
            }),
        }
    }

    pub fn push(&self, dom: &mut XmlArena, node: NodeId) -> Result<()> {
        self.require_match(dom, node)?;
        dom.append(self.list, node)
    }

    /// Remove every matching node in one change, leaving the others in
    /// place. Returns what was removed, in order.
    pub fn clear(&self, dom: &mut XmlArena) -> Result<Vec<NodeId>> {
        let mut keep = Vec::new();
        let mut removed = Vec::new();
        for id in dom.list(self.list)?.iter() {
            if self.matches(dom, id)? {
                removed.push(id);
            } else {
                keep.push(id);
            }
        }
        if !removed.is_empty() {
            dom.clear_and_set(self.list, keep)?;
        }
        Ok(removed)
    }

    pub fn to_vec(&self, dom: &XmlArena) -> Result<Vec<NodeId>> {
        Ok(self.iter(dom)?.collect())
    }

    /// Borrowing read-only iterator. The arena cannot change while it is
    /// alive, so it needs no modification checks.
    pub fn iter<'a>(&'a self, dom: &'a XmlArena) -> Result<impl Iterator<Item = NodeId> + 'a> {
        let backing = dom.list(self.list)?;
        Ok(backing.iter().filter(move |&id| {
            dom.node(id)
                .map(|node| self.filter.matches(node))
                .unwrap_or(false)
        }))
    }

    /// Mutating cursor positioned before the first match
    pub fn cursor(&self, dom: &XmlArena) -> Result<ViewCursor> {
        ViewCursor::new(dom, self.list, self.filter.clone())
    }

    /// Mutating cursor positioned before the `index`th match
    pub fn cursor_at(&self, dom: &XmlArena, index: usize) -> Result<ViewCursor> {
        ViewCursor::at(dom, self.list, self.filter.clone(), index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ContentKinds;

    /// `<root>t0 <a/> t1 <b/> t2</root>` with text between elements
    fn mixed(dom: &mut XmlArena) -> (NodeId, Vec<NodeId>) {
        let root = dom.new_element("root").unwrap();
        let t0 = dom.new_text("t0").unwrap();
        let a = dom.new_element("a").unwrap();
        let t1 = dom.new_text("t1").unwrap();
        let b = dom.new_element("b").unwrap();
        let t2 = dom.new_text("t2").unwrap();
        let nodes = vec![t0, a, t1, b, t2];
        let content = ListRef::content(root);
        dom.insert_all(content, 0, nodes.clone()).unwrap();
        (root, nodes)
    }

    #[test]
    fn test_positional_access_skips_non_matching() {
        let mut dom = XmlArena::new();
        let (root, nodes) = mixed(&mut dom);
        let elements = FilteredView::new(ListRef::content(root), Filter::elements());

        assert_eq!(elements.len(&dom).unwrap(), 2);
        assert_eq!(elements.get(&dom, 0).unwrap(), nodes[1]);
        assert_eq!(elements.get(&dom, 1).unwrap(), nodes[3]);
        assert!(matches!(
            elements.get(&dom, 2),
            Err(DomError::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert_eq!(elements.index_of(&dom, nodes[3]).unwrap(), Some(1));
        assert_eq!(elements.index_of(&dom, nodes[0]).unwrap(), None);
    }

    #[test]
    fn test_insert_at_view_end_appends_to_backing() {
        let mut dom = XmlArena::new();
        let (root, nodes) = mixed(&mut dom);
        let list = ListRef::content(root);
        let elements = FilteredView::new(list, Filter::elements());
        let c = dom.new_element("c").unwrap();

        elements.insert(&mut dom, 2, c).unwrap();
        let backing = dom.list(list).unwrap().as_slice().to_vec();
        assert_eq!(backing.last(), Some(&c));
        assert_eq!(backing[4], nodes[4]);

        let d = dom.new_element("d").unwrap();
        assert!(matches!(
            elements.insert(&mut dom, 5, d),
            Err(DomError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_insert_before_match() {
        let mut dom = XmlArena::new();
        let (root, nodes) = mixed(&mut dom);
        let list = ListRef::content(root);
        let elements = FilteredView::new(list, Filter::elements());
        let c = dom.new_element("c").unwrap();

        elements.insert(&mut dom, 1, c).unwrap();
        assert_eq!(
            dom.list(list).unwrap().as_slice(),
            &[nodes[0], nodes[1], nodes[2], c, nodes[3], nodes[4]]
        );
    }

    #[test]
    fn test_filter_rejects_non_matching_insert() {
        let mut dom = XmlArena::new();
        let (root, _) = mixed(&mut dom);
        let elements = FilteredView::new(ListRef::content(root), Filter::elements());
        let text = dom.new_text("nope").unwrap();

        assert!(matches!(
            elements.push(&mut dom, text),
            Err(DomError::IllegalAdd { .. })
        ));
        assert_eq!(dom.parent(text).unwrap(), None);
    }

    #[test]
    fn test_set_and_remove_through_view() {
        let mut dom = XmlArena::new();
        let (root, nodes) = mixed(&mut dom);
        let list = ListRef::content(root);
        let elements = FilteredView::new(list, Filter::elements());
        let z = dom.new_element("z").unwrap();

        let old = elements.set(&mut dom, 1, z).unwrap();
        assert_eq!(old, nodes[3]);
        assert_eq!(dom.list(list).unwrap().get(3).unwrap(), z);

        let removed = elements.remove_at(&mut dom, 0).unwrap();
        assert_eq!(removed, nodes[1]);
        assert_eq!(elements.to_vec(&dom).unwrap(), vec![z]);
    }

    #[test]
    fn test_clear_keeps_non_matching() {
        let mut dom = XmlArena::new();
        let (root, nodes) = mixed(&mut dom);
        let list = ListRef::content(root);
        let text = FilteredView::new(list, Filter::kinds(ContentKinds::TEXT));

        let removed = text.clear(&mut dom).unwrap();
        assert_eq!(removed, vec![nodes[0], nodes[2], nodes[4]]);
        assert_eq!(dom.list(list).unwrap().as_slice(), &[nodes[1], nodes[3]]);
        assert_eq!(dom.parent(nodes[0]).unwrap(), None);
        assert!(text.is_empty(&dom).unwrap());
    }

    #[test]
    fn test_two_views_see_each_other() {
        let mut dom = XmlArena::new();
        let (root, _) = mixed(&mut dom);
        let list = ListRef::content(root);
        let all = FilteredView::new(list, Filter::any());
        let elements = FilteredView::new(list, Filter::elements());
        let c = dom.new_element("c").unwrap();

        all.insert(&mut dom, 0, c).unwrap();
        assert_eq!(elements.get(&dom, 0).unwrap(), c);
        assert_eq!(elements.len(&dom).unwrap(), 3);
        assert!(all.contains(&dom, c).unwrap());
    }
}
