//! JSON snapshots of object graphs
//!
//! A snapshot names its shared nodes up front so that references between
//! them can express aliasing and cycles:
//!
//! ```json
//! {
//!   "root": {"object": {"type": "Net", "attrs": [["fc", {"ref": "fc"}]]}},
//!   "shared": {
//!     "fc": {"object": {"type": "Linear", "attrs": [
//!       ["weight", {"tensor": {"shape": [5, 10], "requires_grad": true}}],
//!       ["parent", {"ref": "fc"}]
//!     ]}}
//!   }
//! }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

use super::node::Key;
use super::tensor::{Device, Tensor};
use super::value::Value;

/// Top-level snapshot document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub root: ValueSpec,
    #[serde(default)]
    pub shared: BTreeMap<String, ValueSpec>,
}

/// One value in a snapshot.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ValueSpec {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Ref {
        #[serde(rename = "ref")]
        target: String,
    },
    Tensor {
        tensor: TensorSpec,
    },
    Dict {
        dict: Vec<(KeySpec, ValueSpec)>,
    },
    List {
        list: Vec<ValueSpec>,
    },
    Tuple {
        tuple: Vec<ValueSpec>,
    },
    Set {
        set: Vec<ValueSpec>,
    },
    Object {
        object: ObjectSpec,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum KeySpec {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<&KeySpec> for Key {
    fn from(spec: &KeySpec) -> Self {
        match spec {
            KeySpec::Null => Key::None,
            KeySpec::Bool(b) => Key::Bool(*b),
            KeySpec::Int(i) => Key::Int(*i),
            KeySpec::Str(s) => Key::Str(s.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TensorSpec {
    #[serde(default)]
    pub shape: Vec<usize>,
    #[serde(default = "default_true")]
    pub is_leaf: bool,
    #[serde(default)]
    pub requires_grad: bool,
    #[serde(default)]
    pub grad_fn: Option<String>,
    #[serde(default = "default_device")]
    pub device: String,
}

fn default_true() -> bool {
    true
}

fn default_device() -> String {
    "cpu".to_string()
}

impl From<&TensorSpec> for Tensor {
    fn from(spec: &TensorSpec) -> Self {
        let device = spec.device.parse::<Device>().unwrap_or(Device::Cpu);
        Tensor {
            shape: spec.shape.clone(),
            is_leaf: spec.is_leaf,
            requires_grad: spec.requires_grad,
            grad_fn: spec.grad_fn.clone(),
            device,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectSpec {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub attrs: Vec<(String, ValueSpec)>,
}

impl Snapshot {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Materialize the snapshot into a live graph.
    pub fn build(&self) -> Result<Value> {
        let mut builder = Builder::new(&self.shared);
        builder.fill_shared()?;
        builder.build(&self.root)
    }
}

/// Load and build a snapshot file in one step.
pub fn load_graph(path: &Path) -> Result<Value> {
    Snapshot::from_file(path)?.build()
}

struct Builder<'a> {
    shared: &'a BTreeMap<String, ValueSpec>,
    built: HashMap<String, Value>,
    /// Shared containers allocated up front and not yet filled.
    shells: Vec<(Value, &'a ValueSpec)>,
    /// Shared immutable ids currently being built.
    pending: HashSet<String>,
}

impl<'a> Builder<'a> {
    /// Every shared container gets its empty shell before anything is built,
    /// so a cycle resolves the same way whichever node it is entered from.
    fn new(shared: &'a BTreeMap<String, ValueSpec>) -> Self {
        let mut built = HashMap::new();
        let mut shells = Vec::new();
        for (id, spec) in shared {
            if let Some(shell) = shell(spec) {
                built.insert(id.clone(), shell.clone());
                shells.push((shell, spec));
            }
        }
        Self {
            shared,
            built,
            shells,
            pending: HashSet::new(),
        }
    }

    fn fill_shared(&mut self) -> Result<()> {
        for (shell, spec) in std::mem::take(&mut self.shells) {
            self.fill(&shell, spec)?;
        }
        Ok(())
    }

    fn build(&mut self, spec: &ValueSpec) -> Result<Value> {
        if let Some(shell) = shell(spec) {
            self.fill(&shell, spec)?;
            return Ok(shell);
        }
        Ok(match spec {
            ValueSpec::Null => Value::None,
            ValueSpec::Bool(b) => Value::Bool(*b),
            ValueSpec::Int(i) => Value::Int(*i),
            ValueSpec::Float(x) => Value::Float(*x),
            ValueSpec::Str(s) => Value::str(s),
            ValueSpec::Ref { target } => self.resolve(target)?,
            ValueSpec::Tensor { tensor } => Value::tensor(Tensor::from(tensor)),
            ValueSpec::Tuple { tuple } => {
                let items = tuple
                    .iter()
                    .map(|item| self.build(item))
                    .collect::<Result<Vec<_>>>()?;
                Value::tuple(items)
            }
            ValueSpec::Dict { .. }
            | ValueSpec::List { .. }
            | ValueSpec::Set { .. }
            | ValueSpec::Object { .. } => unreachable!("containers always have a shell"),
        })
    }

    fn resolve(&mut self, id: &str) -> Result<Value> {
        if let Some(value) = self.built.get(id) {
            return Ok(value.clone());
        }
        let spec = self
            .shared
            .get(id)
            .ok_or_else(|| Error::snapshot(format!("unknown reference '{}'", id)))?;

        // Containers are already in `built`, so only immutable nodes get here.
        if !self.pending.insert(id.to_string()) {
            return Err(Error::snapshot(format!(
                "reference cycle through '{}' has no mutable container",
                id
            )));
        }
        let value = self.build(spec)?;
        self.pending.remove(id);
        self.built.insert(id.to_string(), value.clone());
        Ok(value)
    }

    fn fill(&mut self, shell: &Value, spec: &ValueSpec) -> Result<()> {
        let fill_err = |e: crate::error::NodeError| Error::snapshot(e.to_string());
        match spec {
            ValueSpec::Dict { dict } => {
                for (key, value) in dict {
                    let value = self.build(value)?;
                    shell.insert(Key::from(key), value).map_err(fill_err)?;
                }
            }
            ValueSpec::List { list: items } | ValueSpec::Set { set: items } => {
                for item in items {
                    let item = self.build(item)?;
                    shell.push(item).map_err(fill_err)?;
                }
            }
            ValueSpec::Object { object } => {
                for (name, value) in &object.attrs {
                    let value = self.build(value)?;
                    shell.set_attr(name, value).map_err(fill_err)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Empty container for specs that can take part in cycles.
fn shell(spec: &ValueSpec) -> Option<Value> {
    match spec {
        ValueSpec::Dict { .. } => Some(Value::dict()),
        ValueSpec::List { .. } => Some(Value::list([])),
        ValueSpec::Set { .. } => Some(Value::set([])),
        ValueSpec::Object { object } => Some(Value::object(object.type_name.as_str())),
        _ => None,
    }
}
