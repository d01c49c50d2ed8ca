//! Content filters
//!
//! A filter is a pure predicate over one node. Filtered views and cursors
//! evaluate it on every access, so a filter must not depend on anything
//! that changes while a view is in use, except the node it is handed.

use std::fmt;
use std::sync::Arc;

use crate::namespace::Namespace;
use crate::types::{NodeData, NodeKind, XmlNode};

bitflags::bitflags! {
    /// Node kinds a [`Filter::Kinds`] lets through.
    ///
    /// Combine with bitwise OR: `ContentKinds::ELEMENT | ContentKinds::TEXT`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ContentKinds: u8 {
        const ELEMENT = 1 << 0;
        const CDATA = 1 << 1;
        const TEXT = 1 << 2;
        const COMMENT = 1 << 3;
        const PI = 1 << 4;
        const ENTITY_REF = 1 << 5;
        const DOCUMENT = 1 << 6;
        const DOCTYPE = 1 << 7;
    }
}

impl ContentKinds {
    /// Everything legal in a document's content list
    pub const DOCUMENT_CONTENT: Self = Self::ELEMENT
        .union(Self::COMMENT)
        .union(Self::PI)
        .union(Self::DOCTYPE);

    /// Everything legal in an element's content list
    pub const ELEMENT_CONTENT: Self = Self::ELEMENT
        .union(Self::CDATA)
        .union(Self::TEXT)
        .union(Self::COMMENT)
        .union(Self::PI)
        .union(Self::ENTITY_REF);

    /// Bit for one node kind. Attributes never appear in content.
    pub fn of(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Element => Self::ELEMENT,
            NodeKind::CData => Self::CDATA,
            NodeKind::Text => Self::TEXT,
            NodeKind::Comment => Self::COMMENT,
            NodeKind::ProcessingInstruction => Self::PI,
            NodeKind::EntityRef => Self::ENTITY_REF,
            NodeKind::Document => Self::DOCUMENT,
            NodeKind::DocType => Self::DOCTYPE,
            NodeKind::Attribute => Self::empty(),
        }
    }
}

/// Shared predicate for [`Filter::Custom`]
pub type NodePredicate = Arc<dyn Fn(&XmlNode) -> bool + Send + Sync>;

/// Which children a view exposes
#[derive(Clone)]
pub enum Filter {
    /// Every node
    Any,
    /// Nodes whose kind is in the mask
    Kinds(ContentKinds),
    /// Elements, optionally restricted by local name and/or namespace URI
    Element {
        name: Option<String>,
        namespace: Option<Namespace>,
    },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
    Custom(NodePredicate),
}

impl Filter {
    pub fn any() -> Self {
        Filter::Any
    }

    /// Every element, any name, any namespace
    pub fn elements() -> Self {
        Filter::Element {
            name: None,
            namespace: None,
        }
    }

    /// Elements with this local name and no namespace
    pub fn element_named(name: &str) -> Self {
        Filter::Element {
            name: Some(name.to_string()),
            namespace: Some(Namespace::none()),
        }
    }

    /// Elements with this local name in the namespace (matched by URI)
    pub fn element_named_ns(name: &str, namespace: &Namespace) -> Self {
        Filter::Element {
            name: Some(name.to_string()),
            namespace: Some(namespace.clone()),
        }
    }

    /// Elements of any name in the namespace
    pub fn elements_in(namespace: &Namespace) -> Self {
        Filter::Element {
            name: None,
            namespace: Some(namespace.clone()),
        }
    }

    pub fn kinds(kinds: ContentKinds) -> Self {
        Filter::Kinds(kinds)
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&XmlNode) -> bool + Send + Sync + 'static,
    {
        Filter::Custom(Arc::new(predicate))
    }

    pub fn and(self, other: Filter) -> Self {
        Filter::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Filter) -> Self {
        Filter::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Filter::Not(Box::new(self))
    }

    pub fn matches(&self, node: &XmlNode) -> bool {
        match self {
            Filter::Any => true,
            Filter::Kinds(kinds) => kinds.intersects(ContentKinds::of(node.kind())),
            Filter::Element { name, namespace } => match &node.data {
                NodeData::Element(el) => {
                    name.as_deref().map_or(true, |n| el.name() == n)
                        && namespace.iter().all(|ns| el.namespace().same_uri(ns))
                }
                _ => false,
            },
            Filter::And(a, b) => a.matches(node) && b.matches(node),
            Filter::Or(a, b) => a.matches(node) || b.matches(node),
            Filter::Not(inner) => !inner.matches(node),
            Filter::Custom(predicate) => predicate(node),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::Any
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Any => write!(f, "Any"),
            Filter::Kinds(kinds) => f.debug_tuple("Kinds").field(kinds).finish(),
            Filter::Element { name, namespace } => f
                .debug_struct("Element")
                .field("name", name)
                .field("namespace", &namespace.as_ref().map(|ns| ns.uri()))
                .finish(),
            Filter::And(a, b) => f.debug_tuple("And").field(a).field(b).finish(),
            Filter::Or(a, b) => f.debug_tuple("Or").field(a).field(b).finish(),
            Filter::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
            Filter::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Structural equality; namespaces compare by URI, closures by identity
impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Filter::Any, Filter::Any) => true,
            (Filter::Kinds(a), Filter::Kinds(b)) => a == b,
            (
                Filter::Element {
                    name: n1,
                    namespace: ns1,
                },
                Filter::Element {
                    name: n2,
                    namespace: ns2,
                },
            ) => {
                n1 == n2
                    && match (ns1, ns2) {
                        (Some(a), Some(b)) => a.same_uri(b),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (Filter::And(a1, b1), Filter::And(a2, b2))
            | (Filter::Or(a1, b1), Filter::Or(a2, b2)) => a1 == a2 && b1 == b2,
            (Filter::Not(a), Filter::Not(b)) => a == b,
            (Filter::Custom(a), Filter::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
