//! Utility functions for XML tree processing

use crate::arena::XmlArena;
use crate::backing::ListRef;
use crate::error::Result;
use crate::types::{NodeData, NodeId};

/// Cap text length (in chars) for one-line renderings
pub fn cap_text_length(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}...", &text[..cut]),
    }
}

/// Trim, then collapse every internal whitespace run to one space
pub fn normalize_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r')) {
        if word.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// All descendant Text/CDATA of a node, trimmed
pub fn text_content(dom: &XmlArena, id: NodeId) -> Result<String> {
    Ok(dom.value(id)?.trim().to_string())
}

/// XPath-style location of an element, e.g. `/root[1]/item[2]`.
/// Positions count same-named element siblings, 1-based.
pub fn location_path(dom: &XmlArena, id: NodeId) -> Result<String> {
    let mut path_parts = Vec::new();
    let mut current_id = Some(id);

    while let Some(node_id) = current_id {
        let node = dom.node(node_id)?;
        let Some(element) = node.as_element() else {
            break;
        };
        let qualified = element.qualified_name();

        // Position among siblings with the same name
        let mut position = 1;
        if let Some(parent_id) = node.parent() {
            for sibling in dom.list(ListRef::content(parent_id))?.iter() {
                if sibling == node_id {
                    break;
                }
                if let Some(other) = dom.node(sibling)?.as_element() {
                    if other.qualified_name() == qualified {
                        position += 1;
                    }
                }
            }
        }

        path_parts.push(format!("{}[{}]", qualified, position));
        current_id = node.parent();
    }

    path_parts.reverse();
    Ok(format!("/{}", path_parts.join("/")))
}

/// One-line debug rendering of a node
pub fn describe(dom: &XmlArena, id: NodeId) -> Result<String> {
    let node = dom.node(id)?;
    Ok(match node.data() {
        NodeData::Element(el) => {
            let ns = if el.namespace().uri().is_empty() {
                String::new()
            } else {
                format!(" [Namespace: {}]", el.namespace().uri())
            };
            format!("[Element: <{}{}/>]", el.qualified_name(), ns)
        }
        NodeData::Attribute(attr) => {
            let name = attr.qualified_name();
            format!("[Attribute: {}=\"{}\"]", name, attr.value())
        }
        NodeData::Text(text) => format!("[Text: {}]", cap_text_length(text, 64)),
        NodeData::CData(text) => format!("[CDATA: {}]", cap_text_length(text, 64)),
        NodeData::Comment(text) => format!("[Comment: <!--{}-->]", text),
        NodeData::ProcessingInstruction(pi) => {
            if pi.data().is_empty() {
                format!("[ProcessingInstruction: <?{}?>]", pi.target())
            } else {
                format!("[ProcessingInstruction: <?{} {}?>]", pi.target(), pi.data())
            }
        }
        NodeData::EntityRef(entity) => format!("[EntityRef: &{};]", entity.name()),
        NodeData::DocType(doctype) => {
            let mut out = format!("[DocType: <!DOCTYPE {}", doctype.element_name());
            if let Some(public_id) = doctype.public_id() {
                out.push_str(&format!(" PUBLIC \"{}\"", public_id));
            }
            if let Some(system_id) = doctype.system_id() {
                if doctype.public_id().is_none() {
                    out.push_str(" SYSTEM");
                }
                out.push_str(&format!(" \"{}\"", system_id));
            }
            out.push_str(">]");
            out
        }
        NodeData::Document(_) => {
            let doctype = match dom.doctype(id)? {
                Some(dt) => describe(dom, dt)?,
                None => "No DOCTYPE declaration".to_string(),
            };
            let root = match dom.root_element(id) {
                Ok(root) => format!("Root is {}", describe(dom, root)?),
                Err(_) => "No root element".to_string(),
            };
            format!("[Document: {}, {}]", doctype, root)
        }
    })
}
