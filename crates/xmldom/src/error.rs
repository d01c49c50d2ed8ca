//! Error types for tree operations
//!
//! Simple, flat error hierarchy. Every failure is local and recoverable;
//! nothing here is retried automatically.

use std::fmt;

use thiserror::Error;

use crate::namespace::Namespace;
use crate::types::NodeId;

pub type Result<T> = std::result::Result<T, DomError>;

/// What a rejected add was trying to place
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddTarget {
    Node(NodeId),
    Namespace(Namespace),
}

impl fmt::Display for AddTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddTarget::Node(id) => write!(f, "node {}", id),
            AddTarget::Namespace(ns) => write!(f, "namespace {}", ns),
        }
    }
}

#[derive(Debug, Error)]
pub enum DomError {
    #[error("The name \"{name}\" is not legal for {construct}: {reason}")]
    IllegalName {
        name: String,
        construct: &'static str,
        reason: String,
    },

    #[error("The data \"{data}\" is not legal for {construct}: {reason}")]
    IllegalData {
        data: String,
        construct: &'static str,
        reason: String,
    },

    #[error("The {target} could not be added to node {parent}: {reason}")]
    IllegalAdd {
        target: AddTarget,
        parent: NodeId,
        reason: String,
    },

    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("List of node {owner} changed under the iterator (version {expected}, now {actual})")]
    ConcurrentModification {
        owner: NodeId,
        expected: u64,
        actual: u64,
    },

    #[error("Illegal iterator state: {0}")]
    IllegalIteratorState(&'static str),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Invalid node type: expected {expected}, got {actual}")]
    InvalidNodeType { expected: String, actual: String },

    #[error("Root element not set on document {0}")]
    RootNotSet(NodeId),

    #[error("Attribute \"{name}\" cannot be converted to {target}")]
    DataConversion { name: String, target: &'static str },

    #[error("Event stream decode error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl DomError {
    pub(crate) fn illegal_add(node: NodeId, parent: NodeId, reason: impl Into<String>) -> Self {
        DomError::IllegalAdd {
            target: AddTarget::Node(node),
            parent,
            reason: reason.into(),
        }
    }

    pub(crate) fn wrong_kind(expected: &str, actual: impl fmt::Debug) -> Self {
        DomError::InvalidNodeType {
            expected: expected.to_string(),
            actual: format!("{:?}", actual),
        }
    }
}
