//! End-to-end behaviour of content lists, views and cursors

use xmldom::{
    ContentKinds, DescendantCursor, DomError, Filter, FilteredView, ListRef, NodeId, NodeKind,
    XmlArena,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// Document `<root><a/>text<b/></root>`
fn small_document(dom: &mut XmlArena) -> (NodeId, NodeId, NodeId, NodeId, NodeId) {
    let root = dom.new_element("root").unwrap();
    let doc = dom.new_document_with_root(root).unwrap();
    let a = dom.new_element("a").unwrap();
    let text = dom.new_text("text").unwrap();
    let b = dom.new_element("b").unwrap();
    dom.add_contents(root, [a, text, b]).unwrap();
    (doc, root, a, text, b)
}

#[test]
fn test_descendants_then_remove() {
    init_tracing();
    let mut dom = XmlArena::new();
    let (doc, root, a, text, b) = small_document(&mut dom);

    let walked: Vec<_> = dom.descendants(doc).unwrap().collect();
    assert_eq!(walked, vec![root, a, text, b]);

    let mut cursor = DescendantCursor::new(&dom, doc).unwrap();
    assert_eq!(cursor.next(&dom).unwrap(), Some(root));
    assert_eq!(cursor.next(&dom).unwrap(), Some(a));
    assert_eq!(cursor.remove(&mut dom).unwrap(), a);
    assert_eq!(cursor.next(&dom).unwrap(), Some(text));
    assert_eq!(cursor.next(&dom).unwrap(), Some(b));
    assert_eq!(cursor.next(&dom).unwrap(), None);

    let content = dom.list(ListRef::content(root)).unwrap();
    assert_eq!(content.as_slice(), &[text, b]);
    let children = dom.children(root).unwrap();
    assert_eq!(children.to_vec(&dom).unwrap(), vec![b]);
    assert_eq!(dom.parent(a).unwrap(), None);
}

#[test]
fn test_root_from_other_document_rejected() {
    init_tracing();
    let mut dom = XmlArena::new();
    let (_, root, ..) = small_document(&mut dom);
    let other = dom.new_document();

    let err = dom.set_root_element(other, root).unwrap_err();
    assert!(matches!(err, DomError::IllegalAdd { .. }));
    assert!(!dom.has_root_element(other).unwrap());
    assert!(dom.list(ListRef::content(other)).unwrap().is_empty());
}

#[test]
fn test_single_parent() {
    let mut dom = XmlArena::new();
    let first = dom.new_element("first").unwrap();
    let second = dom.new_element("second").unwrap();
    let child = dom.new_element("child").unwrap();
    dom.add_content(first, child).unwrap();
    let before = dom.list(ListRef::content(first)).unwrap().clone();

    for _ in 0..2 {
        assert!(matches!(
            dom.add_content(second, child),
            Err(DomError::IllegalAdd { .. })
        ));
    }
    let after = dom.list(ListRef::content(first)).unwrap();
    assert_eq!(after.as_slice(), before.as_slice());
    assert!(dom.list(ListRef::content(second)).unwrap().is_empty());
    assert_eq!(dom.parent(child).unwrap(), Some(first));

    // detaching first makes the move legal
    dom.detach(child).unwrap();
    dom.add_content(second, child).unwrap();
    assert_eq!(dom.parent(child).unwrap(), Some(second));
}

#[test]
fn test_append_order_round_trip() {
    let mut dom = XmlArena::new();
    let owner = dom.new_element("owner").unwrap();
    let list = ListRef::content(owner);
    let nodes: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|name| dom.new_element(name).unwrap())
        .collect();
    for &node in &nodes {
        dom.append(list, node).unwrap();
    }

    let backing = dom.list(list).unwrap();
    let read: Vec<_> = (0..3).map(|i| backing.get(i).unwrap()).collect();
    assert_eq!(read, nodes);

    assert!(dom.remove_node(list, nodes[1]).unwrap());
    assert_eq!(dom.list(list).unwrap().as_slice(), &[nodes[0], nodes[2]]);
}

#[test]
fn test_attribute_upsert_keeps_position() {
    let mut dom = XmlArena::new();
    let el = dom.new_element("el").unwrap();
    let first = dom.set_attribute(el, "a", "1").unwrap();
    dom.set_attribute(el, "b", "2").unwrap();
    let again = dom.set_attribute(el, "a", "3").unwrap();

    assert_eq!(first, again);
    let attrs = dom.list(ListRef::attributes(el)).unwrap();
    assert_eq!(attrs.len(), 2);
    assert_eq!(attrs.index_of(first), Some(0));
    assert_eq!(dom.attribute_value(el, "a").unwrap(), Some("3"));
}

#[test]
fn test_cursor_fail_fast() {
    let mut dom = XmlArena::new();
    let (_, root, a, _, _) = small_document(&mut dom);
    let view = dom.children(root).unwrap();

    let mut cursor = view.cursor(&dom).unwrap();
    assert_eq!(cursor.next(&dom).unwrap(), Some(a));

    let extra = dom.new_comment("outside").unwrap();
    dom.add_content(root, extra).unwrap();

    assert!(matches!(
        cursor.next(&dom),
        Err(DomError::ConcurrentModification { .. })
    ));
    assert!(matches!(
        cursor.remove(&mut dom),
        Err(DomError::ConcurrentModification { .. })
    ));
    let replacement = dom.new_element("c").unwrap();
    assert!(matches!(
        cursor.set(&mut dom, replacement),
        Err(DomError::ConcurrentModification { .. })
    ));

    // a fresh cursor sees the new state
    let mut fresh = view.cursor(&dom).unwrap();
    assert_eq!(fresh.next(&dom).unwrap(), Some(a));
}

#[test]
fn test_two_cursors_one_list() {
    let mut dom = XmlArena::new();
    let (_, root, a, text, b) = small_document(&mut dom);
    let elements = dom.children(root).unwrap();
    let texts = FilteredView::new(ListRef::content(root), Filter::kinds(ContentKinds::TEXT));

    let mut first = elements.cursor(&dom).unwrap();
    let mut second = texts.cursor(&dom).unwrap();
    assert_eq!(first.next(&dom).unwrap(), Some(a));
    assert_eq!(second.next(&dom).unwrap(), Some(text));

    // removal through one cursor invalidates the other
    first.remove(&mut dom).unwrap();
    assert!(second.next(&dom).is_err());
    assert_eq!(first.next(&dom).unwrap(), Some(b));
    assert_eq!(texts.to_vec(&dom).unwrap(), vec![text]);
}

/// Deterministic pseudo-random source for the mutation run
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

/// A fresh node the view's filter accepts
fn matching_node(dom: &mut XmlArena, view: usize, rng: &mut Lcg) -> NodeId {
    match view {
        0 => {
            let name = if rng.below(2) == 0 { "a" } else { "b" };
            dom.new_element(name).unwrap()
        }
        1 => dom.new_text(&format!("t{}", rng.below(100))).unwrap(),
        2 => dom.new_element("b").unwrap(),
        _ => match rng.below(3) {
            0 => dom.new_comment("c").unwrap(),
            1 => dom.new_text("x").unwrap(),
            _ => dom.new_element("a").unwrap(),
        },
    }
}

fn assert_consistent(dom: &XmlArena, root: NodeId, views: &[FilteredView], removed: &[NodeId]) {
    let backing = dom.list(ListRef::content(root)).unwrap();
    for &id in backing.as_slice() {
        assert_eq!(dom.parent(id).unwrap(), Some(root));
    }
    for view in views {
        let expected: Vec<_> = backing
            .iter()
            .filter(|&id| view.filter().matches(dom.node(id).unwrap()))
            .collect();
        assert_eq!(view.to_vec(dom).unwrap(), expected);
        assert_eq!(view.len(dom).unwrap(), expected.len());
    }
    for &id in removed {
        assert_eq!(dom.parent(id).unwrap(), None);
    }
}

#[test]
fn test_random_mutations_keep_views_consistent() {
    init_tracing();
    let mut dom = XmlArena::new();
    let root = dom.new_element("root").unwrap();
    let list = ListRef::content(root);
    let views = vec![
        dom.children(root).unwrap(),
        FilteredView::new(list, Filter::kinds(ContentKinds::TEXT)),
        dom.children_named(root, "b").unwrap(),
        FilteredView::new(list, Filter::any()),
    ];
    let mut rng = Lcg(0x5eed);
    let mut removed = Vec::new();

    for _ in 0..400 {
        let v = rng.below(views.len());
        let view = &views[v];
        let len = view.len(&dom).unwrap();
        match rng.below(8) {
            0 => {
                let node = matching_node(&mut dom, 3, &mut rng);
                dom.append(list, node).unwrap();
            }
            1 => {
                let node = matching_node(&mut dom, v, &mut rng);
                let index = rng.below(len + 1);
                view.insert(&mut dom, index, node).unwrap();
                assert_eq!(view.get(&dom, index).unwrap(), node);
            }
            2 if len > 0 => {
                removed.push(view.remove_at(&mut dom, rng.below(len)).unwrap());
            }
            3 if len > 0 => {
                let node = matching_node(&mut dom, v, &mut rng);
                let index = rng.below(len);
                removed.push(view.set(&mut dom, index, node).unwrap());
                assert_eq!(view.get(&dom, index).unwrap(), node);
            }
            4 if len > 0 => {
                let mut cursor = view.cursor(&dom).unwrap();
                let steps = rng.below(len) + 1;
                let mut last = None;
                for _ in 0..steps {
                    last = cursor.next(&dom).unwrap();
                }
                assert!(last.is_some());
                removed.push(cursor.remove(&mut dom).unwrap());
            }
            5 => {
                let node = matching_node(&mut dom, v, &mut rng);
                let index = rng.below(len + 1);
                let mut cursor = view.cursor_at(&dom, index).unwrap();
                cursor.add(&mut dom, node).unwrap();
                assert_eq!(cursor.previous(&dom).unwrap(), Some(node));
            }
            6 if dom.list(list).unwrap().len() > 12 => {
                removed.extend(view.clear(&mut dom).unwrap());
                assert!(view.is_empty(&dom).unwrap());
            }
            7 => {
                let first = matching_node(&mut dom, 3, &mut rng);
                let second = matching_node(&mut dom, 3, &mut rng);
                let index = rng.below(dom.list(list).unwrap().len() + 1);
                dom.insert_all(list, index, [first, second]).unwrap();
            }
            _ => {}
        }
        assert_consistent(&dom, root, &views, &removed);
    }

    // whatever is left is still reachable in document order
    let walked: Vec<_> = dom.descendants(root).unwrap().collect();
    let kinds_ok = walked
        .iter()
        .all(|&id| dom.kind(id).unwrap() != NodeKind::Attribute);
    assert!(kinds_ok);
    assert_eq!(walked.len(), dom.list(list).unwrap().len());
}
