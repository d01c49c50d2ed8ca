//! Bidirectional mutating cursor over a filtered view
//!
//! The cursor is a detached handle in the style of an edge walker: it
//! holds no borrow, so any number of cursors over the same list can live
//! side by side, and every call takes the arena.
//!
//! State is a gap in the backing list plus the number of matches before
//! it:
//!
//! ```text
//! backing:  [t0] [a] [t1] [b] [t2]
//! gap:             ^ 2            (after a)
//! view_index:      1              (one match before the gap)
//! ```
//!
//! Each call compares the list's modification counter with the value
//! recorded at the cursor's last own change and fails fast on mismatch.
//! A change made through the cursor re-records the counter.

use crate::arena::XmlArena;
use crate::backing::{BackingList, ListRef};
use crate::error::{DomError, Result};
use crate::filter::Filter;
use crate::types::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastReturned {
    /// Nothing returned since the cursor was made or last changed the list
    None,
    /// `next()` returned the node at this backing index
    Next(usize),
    /// `previous()` returned the node at this backing index
    Previous(usize),
}

#[derive(Debug, Clone)]
pub struct ViewCursor {
    list: ListRef,
    filter: Filter,
    gap: usize,
    view_index: usize,
    last: LastReturned,
    expected_mod_count: u64,
}

impl ViewCursor {
    /// Cursor before the first node of `list` that `filter` matches
    pub fn new(dom: &XmlArena, list: ListRef, filter: Filter) -> Result<Self> {
        let expected_mod_count = dom.list(list)?.mod_count();
        Ok(Self {
            list,
            filter,
            gap: 0,
            view_index: 0,
            last: LastReturned::None,
            expected_mod_count,
        })
    }

    /// Cursor before the `index`th match; `index == len` is the end
    pub fn at(dom: &XmlArena, list: ListRef, filter: Filter, index: usize) -> Result<Self> {
        let mut cursor = Self::new(dom, list, filter)?;
        let backing = dom.list(list)?;
        let mut seen = 0;
        let mut gap = backing.len();
        for (i, id) in backing.iter().enumerate() {
            if cursor.filter.matches(dom.node(id)?) {
                if seen == index {
                    gap = i;
                    break;
                }
                seen += 1;
            }
        }
        if seen < index {
            return Err(DomError::IndexOutOfRange { index, len: seen });
        }
        cursor.gap = gap;
        cursor.view_index = index;
        Ok(cursor)
    }

    pub fn list(&self) -> ListRef {
        self.list
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    fn checked<'d>(&self, dom: &'d XmlArena) -> Result<&'d BackingList> {
        let backing = dom.list(self.list)?;
        if backing.mod_count() != self.expected_mod_count {
            return Err(DomError::ConcurrentModification {
                owner: self.list.owner(),
                expected: self.expected_mod_count,
                actual: backing.mod_count(),
            });
        }
        Ok(backing)
    }

    /// Fail with `ConcurrentModification` if the list changed behind us
    pub(crate) fn verify(&self, dom: &XmlArena) -> Result<()> {
        self.checked(dom).map(|_| ())
    }

    fn resync(&mut self, dom: &XmlArena) -> Result<()> {
        self.expected_mod_count = dom.list(self.list)?.mod_count();
        Ok(())
    }

    fn find_forward(&self, dom: &XmlArena, backing: &BackingList) -> Result<Option<usize>> {
        for i in self.gap..backing.len() {
            if self.filter.matches(dom.node(backing.get(i)?)?) {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    fn find_backward(&self, dom: &XmlArena, backing: &BackingList) -> Result<Option<usize>> {
        for i in (0..self.gap.min(backing.len())).rev() {
            if self.filter.matches(dom.node(backing.get(i)?)?) {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    pub fn has_next(&self, dom: &XmlArena) -> Result<bool> {
        let backing = self.checked(dom)?;
        Ok(self.find_forward(dom, backing)?.is_some())
    }

    /// Advance over the next match. `Ok(None)` at the end.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self, dom: &XmlArena) -> Result<Option<NodeId>> {
        let backing = self.checked(dom)?;
        match self.find_forward(dom, backing)? {
            Some(i) => {
                self.gap = i + 1;
                self.view_index += 1;
                self.last = LastReturned::Next(i);
                Ok(Some(backing.get(i)?))
            }
            None => {
                self.gap = backing.len();
                self.last = LastReturned::None;
                Ok(None)
            }
        }
    }

    pub fn has_previous(&self, dom: &XmlArena) -> Result<bool> {
        let backing = self.checked(dom)?;
        Ok(self.find_backward(dom, backing)?.is_some())
    }

    /// Step back over the previous match. `Ok(None)` at the start.
    pub fn previous(&mut self, dom: &XmlArena) -> Result<Option<NodeId>> {
        let backing = self.checked(dom)?;
        match self.find_backward(dom, backing)? {
            Some(i) => {
                self.gap = i;
                self.view_index -= 1;
                self.last = LastReturned::Previous(i);
                Ok(Some(backing.get(i)?))
            }
            None => {
                self.gap = 0;
                self.last = LastReturned::None;
                Ok(None)
            }
        }
    }

    /// View index of the node `next()` would return
    pub fn next_index(&self) -> usize {
        self.view_index
    }

    /// View index of the node `previous()` would return
    pub fn previous_index(&self) -> Option<usize> {
        self.view_index.checked_sub(1)
    }

    fn last_index(&self, operation: &'static str) -> Result<usize> {
        match self.last {
            LastReturned::Next(i) | LastReturned::Previous(i) => Ok(i),
            LastReturned::None => Err(DomError::IllegalIteratorState(operation)),
        }
    }

    /// Remove the node last returned by `next()` or `previous()`
    pub fn remove(&mut self, dom: &mut XmlArena) -> Result<NodeId> {
        self.verify(dom)?;
        let at = self.last_index("remove() needs a preceding next() or previous()")?;
        let removed = dom.remove_at(self.list, at)?;
        if let LastReturned::Next(_) = self.last {
            self.gap -= 1;
            self.view_index -= 1;
        }
        self.last = LastReturned::None;
        self.resync(dom)?;
        Ok(removed)
    }

    /// Replace the node last returned; the cursor may `set` or `remove`
    /// again afterwards
    pub fn set(&mut self, dom: &mut XmlArena, node: NodeId) -> Result<NodeId> {
        self.verify(dom)?;
        let at = self.last_index("set() needs a preceding next() or previous()")?;
        self.require_match(dom, node)?;
        let old = dom.replace_at(self.list, at, node)?;
        self.resync(dom)?;
        Ok(old)
    }

    /// Insert at the gap; a following `next()` is unaffected and a
    /// following `previous()` returns the new node
    pub fn add(&mut self, dom: &mut XmlArena, node: NodeId) -> Result<()> {
        self.verify(dom)?;
        self.require_match(dom, node)?;
        dom.insert_at(self.list, self.gap, node)?;
        self.gap += 1;
        self.view_index += 1;
        self.last = LastReturned::None;
        self.resync(dom)
    }

    fn require_match(&self, dom: &XmlArena, node: NodeId) -> Result<()> {
        if self.filter.matches(dom.node(node)?) {
            Ok(())
        } else {
            let kind = dom.kind(node)?.label();
            let reason = format!("Filter won't allow the {} to be added", kind);
            Err(DomError::illegal_add(node, self.list.owner(), reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::FilteredView;

    fn setup(dom: &mut XmlArena) -> (ListRef, Vec<NodeId>) {
        let root = dom.new_element("root").unwrap();
        let t0 = dom.new_text("t0").unwrap();
        let a = dom.new_element("a").unwrap();
        let t1 = dom.new_text("t1").unwrap();
        let b = dom.new_element("b").unwrap();
        let nodes = vec![t0, a, t1, b];
        let list = ListRef::content(root);
        dom.insert_all(list, 0, nodes.clone()).unwrap();
        (list, nodes)
    }

    #[test]
    fn test_walk_both_directions() {
        let mut dom = XmlArena::new();
        let (list, nodes) = setup(&mut dom);
        let mut cursor = ViewCursor::new(&dom, list, Filter::elements()).unwrap();

        assert!(!cursor.has_previous(&dom).unwrap());
        assert_eq!(cursor.next(&dom).unwrap(), Some(nodes[1]));
        assert_eq!(cursor.next(&dom).unwrap(), Some(nodes[3]));
        assert_eq!(cursor.next_index(), 2);
        assert!(!cursor.has_next(&dom).unwrap());
        assert_eq!(cursor.next(&dom).unwrap(), None);

        assert_eq!(cursor.previous(&dom).unwrap(), Some(nodes[3]));
        assert_eq!(cursor.previous_index(), Some(0));
        assert_eq!(cursor.previous(&dom).unwrap(), Some(nodes[1]));
        assert_eq!(cursor.previous_index(), None);
        assert_eq!(cursor.previous(&dom).unwrap(), None);
    }

    #[test]
    fn test_remove_after_next_and_previous() {
        let mut dom = XmlArena::new();
        let (list, nodes) = setup(&mut dom);
        let mut cursor = ViewCursor::new(&dom, list, Filter::elements()).unwrap();

        cursor.next(&dom).unwrap();
        assert_eq!(cursor.remove(&mut dom).unwrap(), nodes[1]);
        assert_eq!(cursor.next_index(), 0);
        assert_eq!(cursor.next(&dom).unwrap(), Some(nodes[3]));

        assert_eq!(cursor.previous(&dom).unwrap(), Some(nodes[3]));
        cursor.remove(&mut dom).unwrap();
        assert_eq!(cursor.next_index(), 0);
        assert!(!cursor.has_next(&dom).unwrap());
        assert_eq!(dom.list(list).unwrap().as_slice(), &[nodes[0], nodes[2]]);
    }

    #[test]
    fn test_remove_twice_is_illegal() {
        let mut dom = XmlArena::new();
        let (list, _) = setup(&mut dom);
        let mut cursor = ViewCursor::new(&dom, list, Filter::elements()).unwrap();

        assert!(matches!(
            cursor.remove(&mut dom),
            Err(DomError::IllegalIteratorState(_))
        ));
        cursor.next(&dom).unwrap();
        cursor.remove(&mut dom).unwrap();
        assert!(matches!(
            cursor.remove(&mut dom),
            Err(DomError::IllegalIteratorState(_))
        ));
    }

    #[test]
    fn test_set_keeps_last_returned() {
        let mut dom = XmlArena::new();
        let (list, nodes) = setup(&mut dom);
        let mut cursor = ViewCursor::new(&dom, list, Filter::elements()).unwrap();
        let x = dom.new_element("x").unwrap();
        let y = dom.new_element("y").unwrap();

        cursor.next(&dom).unwrap();
        assert_eq!(cursor.set(&mut dom, x).unwrap(), nodes[1]);
        assert_eq!(cursor.set(&mut dom, y).unwrap(), x);
        assert_eq!(dom.parent(x).unwrap(), None);
        assert_eq!(cursor.next(&dom).unwrap(), Some(nodes[3]));
    }

    #[test]
    fn test_add_does_not_enable_remove_or_set() {
        let mut dom = XmlArena::new();
        let (list, nodes) = setup(&mut dom);
        let mut cursor = ViewCursor::new(&dom, list, Filter::elements()).unwrap();
        let x = dom.new_element("x").unwrap();
        let y = dom.new_element("y").unwrap();

        assert!(matches!(
            cursor.set(&mut dom, y),
            Err(DomError::IllegalIteratorState(_))
        ));
        assert_eq!(cursor.next(&dom).unwrap(), Some(nodes[1]));
        cursor.add(&mut dom, x).unwrap();
        assert!(matches!(
            cursor.remove(&mut dom),
            Err(DomError::IllegalIteratorState(_))
        ));
        assert!(matches!(
            cursor.set(&mut dom, y),
            Err(DomError::IllegalIteratorState(_))
        ));

        let expected = [nodes[0], nodes[1], x, nodes[2], nodes[3]];
        assert_eq!(dom.list(list).unwrap().as_slice(), &expected);
        assert_eq!(dom.parent(y).unwrap(), None);
        assert_eq!(cursor.next(&dom).unwrap(), Some(nodes[3]));
    }

    #[test]
    fn test_add_goes_before_next() {
        let mut dom = XmlArena::new();
        let (list, nodes) = setup(&mut dom);
        let mut cursor = ViewCursor::new(&dom, list, Filter::elements()).unwrap();
        let x = dom.new_element("x").unwrap();

        cursor.next(&dom).unwrap();
        cursor.add(&mut dom, x).unwrap();
        assert_eq!(cursor.next_index(), 2);
        assert_eq!(cursor.next(&dom).unwrap(), Some(nodes[3]));
        cursor.previous(&dom).unwrap();
        assert_eq!(cursor.previous(&dom).unwrap(), Some(x));
        assert_eq!(
            dom.list(list).unwrap().as_slice(),
            &[nodes[0], nodes[1], x, nodes[2], nodes[3]]
        );
    }

    #[test]
    fn test_foreign_change_fails_fast() {
        let mut dom = XmlArena::new();
        let (list, _) = setup(&mut dom);
        let mut first = ViewCursor::new(&dom, list, Filter::any()).unwrap();
        let mut second = ViewCursor::new(&dom, list, Filter::any()).unwrap();

        first.next(&dom).unwrap();
        second.next(&dom).unwrap();
        first.remove(&mut dom).unwrap();

        assert!(first.next(&dom).is_ok());
        assert!(matches!(
            second.next(&dom),
            Err(DomError::ConcurrentModification { .. })
        ));
        assert!(matches!(
            second.has_next(&dom),
            Err(DomError::ConcurrentModification { .. })
        ));
    }

    #[test]
    fn test_cursor_at_and_bounds() {
        let mut dom = XmlArena::new();
        let (list, nodes) = setup(&mut dom);
        let view = FilteredView::new(list, Filter::elements());

        let mut cursor = view.cursor_at(&dom, 1).unwrap();
        assert_eq!(cursor.next(&dom).unwrap(), Some(nodes[3]));
        let mut end = view.cursor_at(&dom, 2).unwrap();
        assert_eq!(end.previous(&dom).unwrap(), Some(nodes[3]));
        assert!(matches!(
            view.cursor_at(&dom, 3),
            Err(DomError::IndexOutOfRange { index: 3, len: 2 })
        ));
    }

    #[test]
    fn test_add_rejects_filtered_out_node() {
        let mut dom = XmlArena::new();
        let (list, _) = setup(&mut dom);
        let mut cursor = ViewCursor::new(&dom, list, Filter::elements()).unwrap();
        let text = dom.new_text("no").unwrap();

        let rejected = cursor.add(&mut dom, text);
        assert!(matches!(rejected, Err(DomError::IllegalAdd { .. })));
        // a rejected add changes nothing, so the cursor stays valid
        assert!(cursor.has_next(&dom).unwrap());
    }
}
