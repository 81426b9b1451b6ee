//! Node identity and the structural classification the walker dispatches on

use std::fmt;

use crate::error::NodeError;

use super::tensor::TensorLike;

/// Reference identity of a node.
///
/// Two handles to the same allocation share a `NodeId`; equal values in
/// separate allocations do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Identity of the allocation `ptr` points into.
    pub fn of<T: ?Sized>(ptr: *const T) -> Self {
        NodeId(ptr.cast::<()>() as usize)
    }

    /// Identity from a caller-assigned handle (arena index, node ID).
    pub fn from_raw(raw: usize) -> Self {
        NodeId(raw)
    }

    pub fn as_raw(self) -> usize {
        self.0
    }
}

/// Mapping key, rendered like a Python `repr` in paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    /// Already-rendered representation for keys of any other kind.
    Repr(String),
}

impl Key {
    pub fn repr(&self) -> String {
        match self {
            Key::None => "None".to_string(),
            Key::Bool(true) => "True".to_string(),
            Key::Bool(false) => "False".to_string(),
            Key::Int(i) => i.to_string(),
            Key::Str(s) => quote(s),
            Key::Repr(r) => r.clone(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<bool> for Key {
    fn from(b: bool) -> Self {
        Key::Bool(b)
    }
}

/// Single-quoted unless the text holds a single quote and no double quote.
fn quote(s: &str) -> String {
    let delim = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() || matches!(c, '\u{a0}' | '\u{ad}') => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            '\u{2028}' | '\u{2029}' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

/// Structural kind of a node, decided once per visit.
pub enum NodeKind<N: Node> {
    Tensor(N::Tensor),
    /// Keyed entries in iteration order.
    Mapping(Vec<(Key, N)>),
    /// Ordered or unordered collection.
    Sequence(Vec<N>),
    /// Named attributes of an arbitrary object.
    Attributes(Vec<(String, N)>),
    Opaque,
}

impl<N: Node> NodeKind<N> {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Tensor(_) => "tensor",
            NodeKind::Mapping(_) => "mapping",
            NodeKind::Sequence(_) => "sequence",
            NodeKind::Attributes(_) => "object",
            NodeKind::Opaque => "opaque",
        }
    }
}

/// Anything the walker can inspect.
///
/// Implement this for your own graph types to make them walkable: report a
/// stable identity for shared values, and expose children through
/// [`NodeKind`].
pub trait Node: Sized {
    type Tensor: TensorLike;

    /// `None` for inline values that cannot be shared (scalars).
    fn identity(&self) -> Option<NodeId>;

    fn classify(&self) -> Result<NodeKind<Self>, NodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_repr_like_python() {
        assert_eq!(Key::from("a").repr(), "'a'");
        assert_eq!(Key::from("it's").repr(), "\"it's\"");
        assert_eq!(Key::from("both ' and \"").repr(), "'both \\' and \"'");
        assert_eq!(Key::from("tab\there").repr(), "'tab\\there'");
        assert_eq!(Key::Int(-3).repr(), "-3");
        assert_eq!(Key::Bool(true).repr(), "True");
        assert_eq!(Key::None.repr(), "None");
        assert_eq!(Key::Repr("(1, 2)".to_string()).repr(), "(1, 2)");
    }

    #[test]
    fn test_key_repr_escapes_control_characters() {
        assert_eq!(Key::from("a\x01b").repr(), "'a\\x01b'");
        assert_eq!(Key::from("\x1b[0m").repr(), "'\\x1b[0m'");
        assert_eq!(Key::from("del\x7f").repr(), "'del\\x7f'");
        assert_eq!(Key::from("nb\u{a0}sp").repr(), "'nb\\xa0sp'");
        assert_eq!(Key::from("line\u{2028}sep").repr(), "'line\\u2028sep'");
        assert_eq!(Key::from("caf\u{e9}").repr(), "'caf\u{e9}'");
    }

    #[test]
    fn test_node_id_tracks_allocation_not_value() {
        let a = Box::new(1u32);
        let b = Box::new(1u32);
        let pa: *const u32 = &*a;
        let pb: *const u32 = &*b;
        assert_eq!(NodeId::of(pa), NodeId::of(pa));
        assert_ne!(NodeId::of(pa), NodeId::of(pb));
    }
}
