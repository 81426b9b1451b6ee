//! Fixture graphs shaped like small models and optimizer states.
//!
//! This module is only compiled for tests and benchmarks.

use crate::graph::{Tensor, Value};

/// A module-like object: `training = true` followed by `attrs`.
pub fn module(
    type_name: &str,
    attrs: impl IntoIterator<Item = (&'static str, Value)>,
) -> Value {
    let module = Value::object(type_name);
    module
        .set_attr("training", Value::Bool(true))
        .expect("Failed to set training flag");
    for (name, value) in attrs {
        module
            .set_attr(name, value)
            .expect("Failed to set module attribute");
    }
    module
}

/// `Linear(in_features, out_features)` with weight and bias parameters.
pub fn linear(in_features: usize, out_features: usize) -> Value {
    module(
        "Linear",
        [
            (
                "weight",
                Value::tensor(Tensor::parameter(vec![out_features, in_features])),
            ),
            ("bias", Value::tensor(Tensor::parameter(vec![out_features]))),
            ("in_features", Value::Int(in_features as i64)),
            ("out_features", Value::Int(out_features as i64)),
        ],
    )
}

/// `Sequential(Linear(10, 10), ReLU(), Linear(10, 5))`: four parameters.
pub fn linear_model() -> Value {
    let layers = Value::dict_from([
        ("0", linear(10, 10)),
        ("1", module("ReLU", [])),
        ("2", linear(10, 5)),
    ]);
    module("Sequential", [("_modules", layers)])
}

/// Attach two cached intermediates to `model`, one of them also held by
/// the last layer.
pub fn with_activation_cache(model: Value) -> Value {
    let hidden = Value::tensor(Tensor::computed(vec![10], "ReluBackward0"));
    let output = Value::tensor(Tensor::computed(vec![5], "AddmmBackward0"));
    model
        .set_attr(
            "_cache",
            Value::dict_from([("hidden", hidden), ("output", output.clone())]),
        )
        .expect("Failed to attach activation cache");
    let modules = model.get_attr("_modules").expect("Failed to read _modules");
    if let Some(Value::Dict(layers)) = modules {
        if let Some(last) = layers.borrow().get(&"2".into()) {
            last.set_attr("last_output", output).expect("Failed to attach output");
        }
    }
    model
}

/// Optimizer-like state referencing every parameter of `model` again.
pub fn optimizer_state(model: &Value) -> Value {
    let params = Value::list([]);
    for_each_parameter(model, &mut |p| {
        params.push(p).expect("Failed to push parameter");
    });
    Value::dict_from([
        ("model", model.clone()),
        (
            "param_groups",
            Value::list([Value::dict_from([("params", params), ("lr", Value::Float(0.01))])]),
        ),
    ])
}

fn for_each_parameter(value: &Value, f: &mut dyn FnMut(Value)) {
    match value {
        Value::Tensor(t) if t.is_leaf && t.requires_grad => f(value.clone()),
        Value::Object(o) => {
            for (_, child) in o.borrow().attrs() {
                for_each_parameter(child, f);
            }
        }
        Value::Dict(d) => {
            for (_, child) in d.borrow().entries() {
                for_each_parameter(child, f);
            }
        }
        _ => {}
    }
}

/// Two objects pointing at each other, each holding one leaf tensor.
pub fn cyclic_pair() -> (Value, Value) {
    let a = module("A", [("t", Value::tensor(Tensor::leaf(vec![1])))]);
    let b = module("B", [("t", Value::tensor(Tensor::leaf(vec![2])))]);
    a.set_attr("peer", b.clone()).expect("Failed to link a -> b");
    b.set_attr("peer", a.clone()).expect("Failed to link b -> a");
    (a, b)
}

/// A straight attribute chain `depth` objects long with a tensor at the end.
pub fn deep_chain(depth: usize) -> Value {
    let mut current = Value::object_with("Tail", [("t", Value::tensor(Tensor::leaf(vec![1])))]);
    for _ in 0..depth {
        current = Value::object_with("Link", [("next", current)]);
    }
    current
}

/// A wide model: `layers` linear layers plus one cached activation each.
pub fn wide_model(layers: usize) -> Value {
    let modules = Value::dict();
    let cache = Value::list([]);
    for i in 0..layers {
        modules
            .insert(i.to_string(), linear(16, 16))
            .expect("Failed to insert layer");
        cache
            .push(Value::tensor(Tensor::computed(vec![16], "AddmmBackward0")))
            .expect("Failed to push activation");
    }
    module("Sequential", [("_modules", modules), ("_cache", cache)])
}
