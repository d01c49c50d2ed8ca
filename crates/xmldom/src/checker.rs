//! Containment rules
//!
//! Every structural change is validated here against the sequence the list
//! would hold afterwards. Nothing in this module mutates the arena.

use crate::arena::{XmlArena, UNPREFIXED_ATTRIBUTE_NAMESPACE};
use crate::backing::{BackingList, SlotKind};
use crate::error::{AddTarget, DomError, Result};
use crate::namespace::Namespace;
use crate::types::{ElementData, NodeId, NodeKind, XmlNode};

/// Validate replacing `list[start..start + remove_count]` with `candidates`
pub(crate) fn check_splice(
    dom: &XmlArena,
    list: &BackingList,
    start: usize,
    remove_count: usize,
    candidates: &[NodeId],
) -> Result<()> {
    let owner = list.owner();
    let replaced = &list.as_slice()[start..start + remove_count];

    for (i, &candidate) in candidates.iter().enumerate() {
        let node = dom.node(candidate)?;
        check_kind(list.kind(), node, owner)?;

        if let Some(parent) = node.parent() {
            // re-inserting a node that this very splice takes out is fine
            if !(parent == owner && replaced.contains(&candidate)) {
                return Err(DomError::illegal_add(
                    candidate,
                    owner,
                    format!(
                        "The {} already has an existing parent (node {})",
                        node.kind().label(),
                        parent
                    ),
                ));
            }
        }

        if candidates[..i].contains(&candidate) {
            return Err(DomError::illegal_add(
                candidate,
                owner,
                "The node appears more than once in the same batch",
            ));
        }

        if node.is_element() {
            check_not_ancestor(dom, candidate, owner)?;
        }
    }

    match list.kind() {
        SlotKind::ElementContent => Ok(()),
        SlotKind::DocumentContent => {
            let proposed = proposed_sequence(list, start, remove_count, candidates);
            check_document_order(dom, owner, &proposed, candidates)
        }
        SlotKind::Attributes => {
            let proposed = proposed_sequence(list, start, remove_count, candidates);
            check_attributes(dom, owner, &proposed, candidates)
        }
    }
}

fn proposed_sequence(
    list: &BackingList,
    start: usize,
    remove_count: usize,
    candidates: &[NodeId],
) -> Vec<NodeId> {
    let items = list.as_slice();
    let mut proposed = Vec::with_capacity(items.len() + candidates.len() - remove_count);
    proposed.extend_from_slice(&items[..start]);
    proposed.extend_from_slice(candidates);
    proposed.extend_from_slice(&items[start + remove_count..]);
    proposed
}

fn check_kind(slot: SlotKind, node: &XmlNode, owner: NodeId) -> Result<()> {
    let id = node.id();
    let reason = match (slot, node.kind()) {
        (SlotKind::Attributes, NodeKind::Attribute) => {
            let attr = node.as_attribute().map(|a| a.namespace());
            return match attr {
                Some(ns) if ns.prefix().is_empty() && !ns.is_none() => {
                    Err(DomError::illegal_add(id, owner, UNPREFIXED_ATTRIBUTE_NAMESPACE))
                }
                _ => Ok(()),
            };
        }
        (SlotKind::Attributes, kind) => {
            format!("A {} cannot be added to an attribute list", kind.label())
        }
        (_, NodeKind::Attribute) => {
            "An Attribute is not content; add it to the element's attributes".to_string()
        }
        (_, NodeKind::Document) => "A Document cannot be added as content".to_string(),
        (SlotKind::ElementContent, NodeKind::DocType) => {
            "A DocType is not allowed except at the document level".to_string()
        }
        (SlotKind::DocumentContent, kind @ (NodeKind::Text | NodeKind::CData)) => {
            format!("A {} is not allowed at the document root", kind.label())
        }
        (SlotKind::DocumentContent, NodeKind::EntityRef) => {
            "An EntityRef is not allowed at the document root".to_string()
        }
        _ => return Ok(()),
    };
    Err(DomError::illegal_add(id, owner, reason))
}

/// An element may not end up inside itself
fn check_not_ancestor(dom: &XmlArena, candidate: NodeId, owner: NodeId) -> Result<()> {
    let mut current = Some(owner);
    while let Some(id) = current {
        if id == candidate {
            let reason = if id == owner {
                "The Element cannot be added to itself"
            } else {
                "The Element cannot be added as a descendant of itself"
            };
            return Err(DomError::illegal_add(candidate, owner, reason));
        }
        current = dom.node(id)?.parent();
    }
    Ok(())
}

/// At most one root element, at most one DocType, DocType before root
fn check_document_order(
    dom: &XmlArena,
    owner: NodeId,
    proposed: &[NodeId],
    candidates: &[NodeId],
) -> Result<()> {
    let mut root: Option<(usize, NodeId)> = None;
    let mut doctype: Option<(usize, NodeId)> = None;

    for (pos, &id) in proposed.iter().enumerate() {
        match dom.node(id)?.kind() {
            NodeKind::Element => {
                if let Some((_, first)) = root {
                    let culprit = if candidates.contains(&id) { id } else { first };
                    return Err(DomError::illegal_add(
                        culprit,
                        owner,
                        "Cannot add a second root element, only one is allowed",
                    ));
                }
                root = Some((pos, id));
            }
            NodeKind::DocType => {
                if let Some((_, first)) = doctype {
                    let culprit = if candidates.contains(&id) { id } else { first };
                    return Err(DomError::illegal_add(
                        culprit,
                        owner,
                        "Cannot add a second DocType, only one is allowed",
                    ));
                }
                doctype = Some((pos, id));
            }
            _ => {}
        }
    }

    if let (Some((root_pos, root_id)), Some((doctype_pos, doctype_id))) = (root, doctype) {
        if doctype_pos > root_pos {
            return Err(if candidates.contains(&doctype_id) {
                DomError::illegal_add(
                    doctype_id,
                    owner,
                    "A DocType cannot be added after the root element",
                )
            } else {
                DomError::illegal_add(
                    root_id,
                    owner,
                    "A root element cannot be added before the DocType",
                )
            });
        }
    }

    Ok(())
}

/// Unique keys and non-conflicting prefixes across the final attribute set
fn check_attributes(
    dom: &XmlArena,
    owner: NodeId,
    proposed: &[NodeId],
    candidates: &[NodeId],
) -> Result<()> {
    let node = dom.node(owner)?;
    let element = node
        .as_element()
        .ok_or_else(|| DomError::wrong_kind("Element", node.kind()))?;

    for &candidate in candidates {
        let Some(attr) = dom.node(candidate)?.as_attribute() else {
            continue;
        };

        for &other in proposed.iter().filter(|&&id| id != candidate) {
            let Some(existing) = dom.node(other)?.as_attribute() else {
                continue;
            };
            if existing.has_key(attr.name(), attr.namespace()) {
                return Err(DomError::illegal_add(
                    candidate,
                    owner,
                    format!(
                        "An attribute \"{}\" already exists on the element",
                        attr.qualified_name()
                    ),
                ));
            }
            if prefix_collides(attr.namespace(), existing.namespace()) {
                return Err(DomError::illegal_add(
                    candidate,
                    owner,
                    format!(
                        "The attribute namespace prefix \"{}\" collides with another attribute",
                        attr.namespace().prefix()
                    ),
                ));
            }
        }

        if let Some(reason) = element_prefix_conflict(element, attr.namespace()) {
            return Err(DomError::illegal_add(candidate, owner, reason));
        }
    }

    Ok(())
}

/// Same non-empty prefix bound to two different URIs
#[inline]
fn prefix_collides(a: &Namespace, b: &Namespace) -> bool {
    !a.prefix().is_empty() && a.prefix() == b.prefix() && a.uri() != b.uri()
}

/// Why an attribute in `ns` would rebind a prefix the element itself uses
fn element_prefix_conflict(element: &ElementData, ns: &Namespace) -> Option<String> {
    let declared = element.additional_namespaces();
    let clash = if prefix_collides(ns, element.namespace()) {
        "the element namespace prefix"
    } else if declared.iter().any(|decl| prefix_collides(ns, decl)) {
        "a namespace declaration on the element"
    } else {
        return None;
    };
    Some(format!(
        "The attribute namespace prefix \"{}\" collides with {}",
        ns.prefix(),
        clash
    ))
}

/// Can an attribute in `ns` be placed on `element`? `skip` is an attribute
/// of the element that is being changed and so does not count.
pub(crate) fn check_attribute_prefix(
    dom: &XmlArena,
    element: NodeId,
    ns: &Namespace,
    skip: Option<NodeId>,
) -> Result<()> {
    let node = dom.node(element)?;
    let data = node
        .as_element()
        .ok_or_else(|| DomError::wrong_kind("Element", node.kind()))?;

    let reject = |reason: String| DomError::IllegalAdd {
        target: AddTarget::Namespace(ns.clone()),
        parent: element,
        reason,
    };

    if let Some(reason) = element_prefix_conflict(data, ns) {
        return Err(reject(reason));
    }
    for attr_id in data.attributes().iter().filter(|&id| Some(id) != skip) {
        if let Some(attr) = dom.node(attr_id)?.as_attribute() {
            if prefix_collides(ns, attr.namespace()) {
                return Err(reject(format!(
                    "The attribute namespace prefix \"{}\" collides with another attribute",
                    ns.prefix()
                )));
            }
        }
    }
    Ok(())
}

/// Can `ns` be declared on `element` without clashing with the prefixes
/// already in use there?
pub(crate) fn check_namespace_declaration(
    dom: &XmlArena,
    element: NodeId,
    ns: &Namespace,
) -> Result<()> {
    let node = dom.node(element)?;
    let data = node
        .as_element()
        .ok_or_else(|| DomError::wrong_kind("Element", node.kind()))?;

    let reject = |reason: String| DomError::IllegalAdd {
        target: AddTarget::Namespace(ns.clone()),
        parent: element,
        reason,
    };

    let own = data.namespace();
    if own.prefix() == ns.prefix() && own.uri() != ns.uri() {
        return Err(reject(format!(
            "The namespace prefix \"{}\" collides with the element namespace prefix",
            ns.prefix()
        )));
    }
    if data
        .additional_namespaces()
        .iter()
        .any(|decl| decl.prefix() == ns.prefix() && decl.uri() != ns.uri())
    {
        return Err(reject(format!(
            "The namespace prefix \"{}\" collides with another declaration on the element",
            ns.prefix()
        )));
    }
    for attr_id in data.attributes().iter() {
        if let Some(attr) = dom.node(attr_id)?.as_attribute() {
            if prefix_collides(ns, attr.namespace()) {
                return Err(reject(format!(
                    "The namespace prefix \"{}\" collides with an attribute on the element",
                    ns.prefix()
                )));
            }
        }
    }
    Ok(())
}
