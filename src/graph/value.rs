//! Dynamic object graphs built from shared, mutable containers
//!
//! `Value` is the in-memory shape of a model/optimizer snapshot: dicts,
//! lists, tuples, sets, and attributed objects holding tensors. Containers
//! are reference-counted, so the same container can be reachable from
//! several places, and a container can (directly or indirectly) hold itself.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::error::NodeError;

use super::node::{Key, Node, NodeId, NodeKind};
use super::path::NodePath;
use super::tensor::Tensor;

/// Insertion-ordered mapping with unique keys.
#[derive(Default)]
pub struct Dict {
    entries: Vec<(Key, Value)>,
}

impl Dict {
    /// Insert or replace in place, keeping the original position.
    pub fn insert(&mut self, key: Key, value: Value) -> Option<Value> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn entries(&self) -> &[(Key, Value)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An arbitrary object: a type name and ordered attributes.
pub struct Object {
    type_name: String,
    attrs: Vec<(String, Value)>,
}

impl Object {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            attrs: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn set_attr(&mut self, name: &str, value: Value) -> Option<Value> {
        match self.attrs.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.attrs.push((name.to_string(), value));
                None
            }
        }
    }

    pub fn get_attr(&self, name: &str) -> Option<&Value> {
        self.attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn attrs(&self) -> &[(String, Value)] {
        &self.attrs
    }
}

/// A node in a dynamic object graph.
///
/// Cloning a `Value` clones the handle, not the container: the clone has
/// the same [`NodeId`].
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Tensor(Rc<Tensor>),
    Dict(Rc<RefCell<Dict>>),
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<[Value]>),
    Set(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<Object>>),
}

impl Value {
    pub fn tensor(tensor: Tensor) -> Self {
        Value::Tensor(Rc::new(tensor))
    }

    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn dict() -> Self {
        Value::Dict(Rc::new(RefCell::new(Dict::default())))
    }

    pub fn dict_from<K: Into<Key>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let mut dict = Dict::default();
        for (k, v) in entries {
            dict.insert(k.into(), v);
        }
        Value::Dict(Rc::new(RefCell::new(dict)))
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn tuple(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Tuple(items.into_iter().collect())
    }

    /// Sets keep their elements in insertion order; membership is by identity.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        let mut unique: Vec<Value> = Vec::new();
        for item in items {
            if !unique.iter().any(|u| u.same_as(&item)) {
                unique.push(item);
            }
        }
        Value::Set(Rc::new(RefCell::new(unique)))
    }

    pub fn object(type_name: impl Into<String>) -> Self {
        Value::Object(Rc::new(RefCell::new(Object::new(type_name))))
    }

    pub fn object_with(
        type_name: impl Into<String>,
        attrs: impl IntoIterator<Item = (&'static str, Value)>,
    ) -> Self {
        let mut object = Object::new(type_name);
        for (name, value) in attrs {
            object.set_attr(name, value);
        }
        Value::Object(Rc::new(RefCell::new(object)))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Tensor(_) => "tensor",
            Value::Dict(_) => "dict",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Object(_) => "object",
        }
    }

    /// Type name of an object value.
    pub fn type_name(&self) -> Option<String> {
        match self {
            Value::Object(o) => o.try_borrow().ok().map(|o| o.type_name.clone()),
            _ => None,
        }
    }

    /// Identity of the shared allocation behind this handle.
    pub fn id(&self) -> Option<NodeId> {
        match self {
            Value::Tensor(t) => Some(NodeId::of(Rc::as_ptr(t))),
            Value::Dict(d) => Some(NodeId::of(Rc::as_ptr(d))),
            Value::List(l) | Value::Set(l) => Some(NodeId::of(Rc::as_ptr(l))),
            Value::Tuple(t) => Some(NodeId::of(Rc::as_ptr(t))),
            Value::Object(o) => Some(NodeId::of(Rc::as_ptr(o))),
            Value::None | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_) => None,
        }
    }

    /// True when both handles point at the same allocation.
    pub fn same_as(&self, other: &Value) -> bool {
        matches!((self.id(), other.id()), (Some(a), Some(b)) if a == b)
    }

    /// Set an attribute on an object value.
    pub fn set_attr(&self, name: &str, value: Value) -> Result<(), NodeError> {
        let Value::Object(object) = self else {
            return Err(self.wrong_kind("object"));
        };
        object
            .try_borrow_mut()
            .map_err(|_| NodeError::Borrowed { kind: "object" })?
            .set_attr(name, value);
        Ok(())
    }

    pub fn get_attr(&self, name: &str) -> Result<Option<Value>, NodeError> {
        let Value::Object(object) = self else {
            return Err(self.wrong_kind("object"));
        };
        let object = object
            .try_borrow()
            .map_err(|_| NodeError::Borrowed { kind: "object" })?;
        Ok(object.get_attr(name).cloned())
    }

    /// Insert into a dict value.
    pub fn insert(&self, key: impl Into<Key>, value: Value) -> Result<(), NodeError> {
        let Value::Dict(dict) = self else {
            return Err(self.wrong_kind("dict"));
        };
        dict.try_borrow_mut()
            .map_err(|_| NodeError::Borrowed { kind: "dict" })?
            .insert(key.into(), value);
        Ok(())
    }

    /// Append to a list, or add to a set if not already a member.
    pub fn push(&self, value: Value) -> Result<(), NodeError> {
        match self {
            Value::List(items) => {
                items
                    .try_borrow_mut()
                    .map_err(|_| NodeError::Borrowed { kind: "list" })?
                    .push(value);
                Ok(())
            }
            Value::Set(items) => {
                let mut items = items
                    .try_borrow_mut()
                    .map_err(|_| NodeError::Borrowed { kind: "set" })?;
                if !items.iter().any(|i| i.same_as(&value)) {
                    items.push(value);
                }
                Ok(())
            }
            _ => Err(self.wrong_kind("list or set")),
        }
    }

    /// Objects reachable from this object's attributes without passing
    /// through another object, labeled relative to this object.
    ///
    /// Containers between the object and its children (a `_modules` dict,
    /// a list of layers) are looked through, so `_modules['fc']` counts as
    /// a child.
    pub fn named_children(&self) -> Result<Vec<(NodePath, Value)>, NodeError> {
        let attrs = match self.classify()? {
            NodeKind::Attributes(attrs) => attrs,
            _ => return Ok(Vec::new()),
        };
        let mut seen = HashSet::new();
        if let Some(id) = self.id() {
            seen.insert(id);
        }
        let mut children = Vec::new();
        let root = NodePath::root("");
        for (name, value) in attrs {
            collect_children(&value, root.attr(&name), &mut seen, &mut children)?;
        }
        Ok(children)
    }

    fn wrong_kind(&self, expected: &'static str) -> NodeError {
        NodeError::WrongKind {
            expected,
            found: self.kind_name(),
        }
    }
}

fn collect_children(
    value: &Value,
    path: NodePath,
    seen: &mut HashSet<NodeId>,
    out: &mut Vec<(NodePath, Value)>,
) -> Result<(), NodeError> {
    if let Some(id) = value.id() {
        if !seen.insert(id) {
            return Ok(());
        }
    }
    match value {
        Value::Object(_) => out.push((path, value.clone())),
        _ => match value.classify()? {
            NodeKind::Mapping(entries) => {
                for (key, child) in entries {
                    collect_children(&child, path.key(&key), seen, out)?;
                }
            }
            NodeKind::Sequence(items) => {
                for (i, child) in items.into_iter().enumerate() {
                    collect_children(&child, path.index(i), seen, out)?;
                }
            }
            _ => {}
        },
    }
    Ok(())
}

impl Node for Value {
    type Tensor = Rc<Tensor>;

    fn identity(&self) -> Option<NodeId> {
        self.id()
    }

    fn classify(&self) -> Result<NodeKind<Self>, NodeError> {
        Ok(match self {
            Value::Tensor(t) => NodeKind::Tensor(Rc::clone(t)),
            Value::Dict(d) => {
                let d = d
                    .try_borrow()
                    .map_err(|_| NodeError::Borrowed { kind: "dict" })?;
                NodeKind::Mapping(d.entries.clone())
            }
            Value::List(items) | Value::Set(items) => {
                let items = items.try_borrow().map_err(|_| NodeError::Borrowed {
                    kind: self.kind_name(),
                })?;
                NodeKind::Sequence(items.clone())
            }
            Value::Tuple(items) => NodeKind::Sequence(items.to_vec()),
            Value::Object(o) => {
                let o = o
                    .try_borrow()
                    .map_err(|_| NodeError::Borrowed { kind: "object" })?;
                NodeKind::Attributes(o.attrs.clone())
            }
            Value::None | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_) => {
                NodeKind::Opaque
            }
        })
    }
}

// Shallow on purpose: graphs may be cyclic.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Tensor(t) => write!(f, "Tensor{:?}", t.shape),
            Value::Object(o) => match o.try_borrow() {
                Ok(o) => write!(f, "<{} object>", o.type_name),
                Err(_) => f.write_str("<object (borrowed)>"),
            },
            other => {
                let len = match other.classify() {
                    Ok(NodeKind::Mapping(e)) => e.len(),
                    Ok(NodeKind::Sequence(s)) => s.len(),
                    _ => 0,
                };
                write!(f, "<{} of {}>", other.kind_name(), len)
            }
        }
    }
}

impl From<Tensor> for Value {
    fn from(tensor: Tensor) -> Self {
        Value::tensor(tensor)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}
