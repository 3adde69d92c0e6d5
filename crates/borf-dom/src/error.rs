#![forbid(unsafe_code)]

use thiserror::Error;

use crate::NodeId;

/// Tree mutations the document refuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("node {0:?} is not an element and cannot have children")]
    NotAContainer(NodeId),

    #[error("reference node {reference:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, reference: NodeId },

    #[error("inserting {node:?} into {parent:?} would make a node its own ancestor")]
    HierarchyCycle { parent: NodeId, node: NodeId },

    #[error("node {0:?} is not a text node")]
    NotText(NodeId),

    #[error("node {0:?} is not an element")]
    NotElement(NodeId),
}

pub type Result<T> = std::result::Result<T, DomError>;
