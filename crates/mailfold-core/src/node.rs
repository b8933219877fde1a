//! Decomposition tree nodes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where a node sits in the container hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Top-level message selected by the caller.
    RootMessage,
    /// Message embedded inside another message or archive.
    NestedMessage,
    /// Regular mail attachment.
    Attachment,
    /// Entry enumerated from an archive container.
    ArchiveEntry,
    /// Object recovered from a compound-binary stream inside an office
    /// document.
    EmbeddedObject,
}

/// A node's payload: bytes owned in memory until materialized to a temp path.
#[derive(Debug, Clone)]
pub enum NodeContent {
    /// Raw extracted bytes, owned by the node.
    Bytes(Vec<u8>),
    /// Already materialized on disk.
    File(PathBuf),
}

/// One node in the decomposition tree.
///
/// Created when its parent is enumerated. Temp artifacts produced for a node
/// are owned by the traversal invocation (the walk context), not by the node
/// itself; they are deleted only after the final fragment list has been
/// consumed.
#[derive(Debug, Clone)]
pub struct ContainerNode {
    /// Display name used in placeholders and hierarchy breadcrumbs.
    pub label: String,
    /// Hierarchy position.
    pub kind: NodeKind,
    /// Payload.
    pub content: NodeContent,
    /// Ordered ancestor labels, root first.
    pub parent_chain: Vec<String>,
    /// Nesting depth, bounded by [`crate::MAX_NESTING_DEPTH`].
    pub depth: usize,
}

impl ContainerNode {
    /// Create a child node under `parent_chain` at `depth`.
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        kind: NodeKind,
        content: NodeContent,
        parent_chain: Vec<String>,
        depth: usize,
    ) -> Self {
        Self {
            label: label.into(),
            kind,
            content,
            parent_chain,
            depth,
        }
    }

    /// Hierarchy breadcrumb, e.g. `inbox.msg > invoices.zip > march.pdf`.
    #[must_use]
    pub fn breadcrumb(&self) -> String {
        if self.parent_chain.is_empty() {
            self.label.clone()
        } else {
            format!("{} > {}", self.parent_chain.join(" > "), self.label)
        }
    }

    /// Ancestor chain extended with this node, for creating children.
    #[must_use]
    pub fn child_chain(&self) -> Vec<String> {
        let mut chain = self.parent_chain.clone();
        chain.push(self.label.clone());
        chain
    }

    /// Borrow the payload bytes if they are held in memory.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.content {
            NodeContent::Bytes(b) => Some(b),
            NodeContent::File(_) => None,
        }
    }
}
