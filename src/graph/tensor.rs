//! Tensor-like leaves and their metadata

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Compute resource a tensor's data lives on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Device {
    Cpu,
    Cuda(Option<usize>),
    Mps,
    Meta,
    Other(String),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Cuda(None) => f.write_str("cuda"),
            Device::Cuda(Some(index)) => write!(f, "cuda:{}", index),
            Device::Mps => f.write_str("mps"),
            Device::Meta => f.write_str("meta"),
            Device::Other(name) => f.write_str(name),
        }
    }
}

impl FromStr for Device {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s {
            "cpu" => Device::Cpu,
            "cuda" => Device::Cuda(None),
            "mps" => Device::Mps,
            "meta" => Device::Meta,
            _ => match s.strip_prefix("cuda:").map(str::parse::<usize>) {
                Some(Ok(index)) => Device::Cuda(Some(index)),
                _ => Device::Other(s.to_string()),
            },
        })
    }
}

/// Read-only view of the autograd-relevant state of a tensor.
///
/// The walker treats anything implementing this as a terminal node: it is
/// handed to the visitor and never descended into.
pub trait TensorLike {
    fn shape(&self) -> &[usize];

    /// False for values computed by tracked operations.
    fn is_leaf(&self) -> bool;

    fn requires_grad(&self) -> bool;

    /// Name of the operation that produced this tensor, if any.
    fn grad_fn(&self) -> Option<&str>;

    fn device(&self) -> Device;
}

impl<T: TensorLike + ?Sized> TensorLike for Rc<T> {
    fn shape(&self) -> &[usize] {
        (**self).shape()
    }

    fn is_leaf(&self) -> bool {
        (**self).is_leaf()
    }

    fn requires_grad(&self) -> bool {
        (**self).requires_grad()
    }

    fn grad_fn(&self) -> Option<&str> {
        (**self).grad_fn()
    }

    fn device(&self) -> Device {
        (**self).device()
    }
}

/// Plain tensor metadata record, used by [`Value`](super::Value) graphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub is_leaf: bool,
    pub requires_grad: bool,
    pub grad_fn: Option<String>,
    pub device: Device,
}

impl Tensor {
    /// A user-created tensor (parameter, buffer, constant).
    pub fn leaf(shape: impl Into<Vec<usize>>) -> Self {
        Self {
            shape: shape.into(),
            is_leaf: true,
            requires_grad: false,
            grad_fn: None,
            device: Device::Cpu,
        }
    }

    /// A trainable parameter.
    pub fn parameter(shape: impl Into<Vec<usize>>) -> Self {
        Self {
            requires_grad: true,
            ..Self::leaf(shape)
        }
    }

    /// An intermediate produced by `grad_fn`.
    pub fn computed(shape: impl Into<Vec<usize>>, grad_fn: impl Into<String>) -> Self {
        Self {
            shape: shape.into(),
            is_leaf: false,
            requires_grad: true,
            grad_fn: Some(grad_fn.into()),
            device: Device::Cpu,
        }
    }

    pub fn on(mut self, device: Device) -> Self {
        self.device = device;
        self
    }
}

impl TensorLike for Tensor {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    fn grad_fn(&self) -> Option<&str> {
        self.grad_fn.as_deref()
    }

    fn device(&self) -> Device {
        self.device.clone()
    }
}

/// Render a shape the way a Python tuple prints: `()`, `(3,)`, `(10, 5)`.
pub fn format_shape(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [single] => format!("({},)", single),
        dims => {
            let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            format!("({})", parts.join(", "))
        }
    }
}

/// Render a producing-operation reference, `None` for leaves.
pub fn format_grad_fn(grad_fn: Option<&str>) -> String {
    match grad_fn {
        Some(name) => format!("<{}>", name),
        None => "None".to_string(),
    }
}
