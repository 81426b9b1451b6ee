//! Output configuration types

const DEFAULT_LABEL: &str = "obj";

/// Configuration for scan output.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
    /// Path label given to the walk root.
    pub label: String,
    pub json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            use_color: true,
            label: DEFAULT_LABEL.to_string(),
            json: false,
        }
    }
}
