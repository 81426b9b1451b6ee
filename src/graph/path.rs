//! Diagnostic path labels (`obj['a'][0].weight`)

use std::fmt;

use serde::Serialize;

use super::node::Key;

/// Textual route from the walk root to a node.
///
/// Used for display only, never for identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NodePath(String);

impl NodePath {
    pub fn root(label: &str) -> Self {
        NodePath(label.to_string())
    }

    /// `path[repr(key)]`
    pub fn key(&self, key: &Key) -> Self {
        NodePath(format!("{}[{}]", self.0, key.repr()))
    }

    /// `path[index]`
    pub fn index(&self, index: usize) -> Self {
        NodePath(format!("{}[{}]", self.0, index))
    }

    /// `path.name`, or bare `name` at an unlabeled root.
    pub fn attr(&self, name: &str) -> Self {
        if self.0.is_empty() {
            NodePath(name.to_string())
        } else {
            NodePath(format!("{}.{}", self.0, name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<NodePath> for String {
    fn from(path: NodePath) -> Self {
        path.0
    }
}
