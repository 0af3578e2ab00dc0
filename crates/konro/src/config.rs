use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifies which model backend a worker should construct.
///
/// Backends form a closed set: a configuration naming a backend this build
/// does not support fails when the model is constructed, never silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Deterministic prompt-to-response table, read from `model_config`.
    ///
    /// Useful for tests and for exercising pool plumbing without loading a
    /// real model.
    Lookup,
    /// Returns every prompt unchanged. Smoke-testing backend.
    Echo,
    /// A model served by a local Ollama instance. Requires the `ollama`
    /// feature.
    Ollama,
}

/// Everything needed to construct one model instance.
///
/// The pool treats this structure as opaque data: it is handed verbatim to
/// the model factory and compared for deep equality during
/// [`reset`](crate::LlmPool::reset). `model_config` holds free-form,
/// backend-specific loader parameters; nested maps compare recursively by
/// value.
///
/// # Example
///
/// ```
/// use konro::{BackendKind, InstanceConfig};
///
/// let config = InstanceConfig::new(BackendKind::Ollama, "gemma3n")
///     .with_param("base_url", "http://localhost:11434");
/// assert_eq!(config.model_path, "gemma3n");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Which backend implementation to construct.
    pub backend: BackendKind,
    /// Model locator. Its meaning belongs to the backend: a file path, a
    /// model name known to a server, or a table name for the lookup
    /// backend.
    pub model_path: String,
    /// Free-form loader parameters, opaque to the pool.
    #[serde(default)]
    pub model_config: Map<String, Value>,
}

impl InstanceConfig {
    /// Creates a configuration with an empty parameter map.
    pub fn new(backend: BackendKind, model_path: impl Into<String>) -> Self {
        Self {
            backend,
            model_path: model_path.into(),
            model_config: Map::new(),
        }
    }

    /// Sets one loader parameter, consuming and returning the configuration.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.model_config.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lookup_config(table: Value) -> InstanceConfig {
        let mut config = InstanceConfig::new(BackendKind::Lookup, "table");
        if let Value::Object(map) = table {
            config.model_config = map;
        }
        config
    }

    #[test]
    fn equality_is_recursive_over_nested_maps() {
        let a = lookup_config(json!({"outer": {"inner": {"leaf": 1}}}));
        let b = lookup_config(json!({"outer": {"inner": {"leaf": 1}}}));
        assert_eq!(a, b);

        let c = lookup_config(json!({"outer": {"inner": {"leaf": 2}}}));
        assert_ne!(a, c);
    }

    #[test]
    fn equality_ignores_parameter_insertion_order() {
        let a = InstanceConfig::new(BackendKind::Echo, "m")
            .with_param("x", 1)
            .with_param("y", 2);
        let b = InstanceConfig::new(BackendKind::Echo, "m")
            .with_param("y", 2)
            .with_param("x", 1);
        assert_eq!(a, b);
    }

    #[test]
    fn differing_model_path_is_unequal() {
        let a = InstanceConfig::new(BackendKind::Echo, "one");
        let b = InstanceConfig::new(BackendKind::Echo, "two");
        assert_ne!(a, b);
    }

    #[test]
    fn backend_tag_round_trips_as_snake_case() {
        let config = InstanceConfig::new(BackendKind::Lookup, "t");
        let text = serde_json::to_string(&config).unwrap();
        assert!(text.contains("\"lookup\""));
        let back: InstanceConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
