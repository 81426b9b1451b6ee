//! Evaluation mode with dropout left on (Monte Carlo dropout)

use log::debug;

use crate::error::{Error, Result};
use crate::graph::{NodePath, Value, VisitedSet};

/// Module type names treated as dropout layers.
pub const DROPOUT_TYPES: &[&str] = &[
    "Dropout",
    "Dropout1d",
    "Dropout2d",
    "Dropout3d",
    "AlphaDropout",
    "FeatureAlphaDropout",
];

pub fn is_dropout(type_name: &str) -> bool {
    DROPOUT_TYPES.contains(&type_name)
}

/// An object carrying a boolean `training` attribute.
pub fn is_module(value: &Value) -> bool {
    matches!(value.get_attr("training"), Ok(Some(Value::Bool(_))))
}

/// Put every module under `model` into evaluation mode, then switch dropout
/// submodules back to training mode. `model` itself always ends up in
/// evaluation mode.
///
/// Returns the number of dropout modules left training.
pub fn set_dropout_train_only(model: &Value, label: &str) -> Result<usize> {
    let path = NodePath::root(label);
    if !is_module(model) {
        return Err(Error::NotAModule {
            path: path.to_string(),
        });
    }
    let mut visited = VisitedSet::new();
    if let Some(id) = model.id() {
        visited.insert(id);
    }
    set_training(model, &path, false)?;
    let enabled = apply(model, &path, &mut visited)?;
    debug!("'{}': {} dropout modules left in training mode", label, enabled);
    Ok(enabled)
}

fn apply(module: &Value, path: &NodePath, visited: &mut VisitedSet) -> Result<usize> {
    let children = module
        .named_children()
        .map_err(|e| Error::traversal(path.as_str(), e.to_string()))?;

    let mut enabled = 0;
    for (name, child) in children {
        if !is_module(&child) {
            continue;
        }
        if let Some(id) = child.id() {
            if !visited.insert(id) {
                continue;
            }
        }
        let child_path = path.attr(name.as_str());
        let dropout = child.type_name().is_some_and(|t| is_dropout(&t));
        set_training(&child, &child_path, dropout)?;
        if dropout {
            enabled += 1;
        }
        enabled += apply(&child, &child_path, visited)?;
    }
    Ok(enabled)
}

fn set_training(module: &Value, path: &NodePath, training: bool) -> Result<()> {
    module
        .set_attr("training", Value::Bool(training))
        .map_err(|e| Error::traversal(path.as_str(), e.to_string()))
}
