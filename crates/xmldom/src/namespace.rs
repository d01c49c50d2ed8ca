//! Namespaces and the interning table
//!
//! A namespace is a (prefix, URI) pair. The arena keeps one shared copy
//! of every pair it has handed out, so equal pairs share storage and
//! compare by value.

use std::fmt;
use std::sync::Arc;

use ahash::AHashSet;

use crate::error::{DomError, Result};
use crate::verifier;

/// Well-known namespace URIs
pub mod uri {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    prefix: Arc<str>,
    uri: Arc<str>,
}

impl Namespace {
    /// The "no namespace" sentinel: empty prefix, empty URI
    pub fn none() -> Self {
        Self {
            prefix: Arc::from(""),
            uri: Arc::from(""),
        }
    }

    /// The always-bound `xml` namespace
    pub fn xml() -> Self {
        Self {
            prefix: Arc::from("xml"),
            uri: Arc::from(uri::XML),
        }
    }

    /// Build a validated namespace.
    ///
    /// An empty prefix with a non-empty URI is a default namespace. A
    /// non-empty prefix needs a non-empty URI. The `xml` prefix and the
    /// XML namespace URI may only be bound to each other.
    pub fn new(prefix: &str, uri: &str) -> Result<Self> {
        if prefix.is_empty() && uri.is_empty() {
            return Ok(Self::none());
        }

        if prefix == "xml" {
            if uri == uri::XML {
                return Ok(Self::xml());
            }
            return Err(DomError::IllegalName {
                name: uri.to_string(),
                construct: "namespace URI",
                reason: format!("The xml prefix can only be bound to {}", uri::XML),
            });
        }

        if uri == uri::XML {
            return Err(DomError::IllegalName {
                name: prefix.to_string(),
                construct: "namespace prefix",
                reason: format!("The {} namespace must be bound to the xml prefix", uri::XML),
            });
        }

        verifier::check_namespace_prefix(prefix)?;

        if !prefix.is_empty() && uri.is_empty() {
            return Err(DomError::IllegalName {
                name: uri.to_string(),
                construct: "namespace URI",
                reason: "Namespace URIs must be non-empty when a prefix is given".to_string(),
            });
        }

        verifier::check_namespace_uri(uri)?;

        Ok(Self {
            prefix: Arc::from(prefix),
            uri: Arc::from(uri),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// True for the "no namespace" sentinel
    pub fn is_none(&self) -> bool {
        self.prefix.is_empty() && self.uri.is_empty()
    }

    /// Namespaces are matched by URI when used as a key
    #[inline]
    pub fn same_uri(&self, other: &Namespace) -> bool {
        self.uri == other.uri
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "xmlns=\"{}\"", self.uri)
        } else {
            write!(f, "xmlns:{}=\"{}\"", self.prefix, self.uri)
        }
    }
}

/// Interning table for namespaces handed out by one arena
#[derive(Debug, Default)]
pub struct NamespaceTable {
    entries: AHashSet<Namespace>,
}

impl NamespaceTable {
    pub fn new() -> Self {
        let mut table = Self {
            entries: AHashSet::with_capacity(16),
        };
        table.entries.insert(Namespace::none());
        table.entries.insert(Namespace::xml());
        table
    }

    /// Validate and return the shared copy of `(prefix, uri)`
    pub fn intern(&mut self, prefix: &str, uri: &str) -> Result<Namespace> {
        let candidate = Namespace::new(prefix, uri)?;
        if let Some(existing) = self.entries.get(&candidate) {
            return Ok(existing.clone());
        }
        self.entries.insert(candidate.clone());
        Ok(candidate)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
