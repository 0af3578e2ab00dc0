use serde_json::{Map, Value};

use super::LanguageModel;
use crate::InstanceConfig;
use crate::error::GenerationError;

/// Deterministic table-driven model.
///
/// Reads its prompt-to-response table directly from the configuration's
/// `model_config` map, so a scripted worker can be described entirely by
/// data, including across a process boundary. Primarily a test and
/// diagnostics backend.
pub struct LookupModel {
    responses: Map<String, Value>,
}

impl LookupModel {
    /// Builds the table from `config.model_config`.
    pub fn from_config(config: &InstanceConfig) -> Self {
        Self {
            responses: config.model_config.clone(),
        }
    }
}

impl LanguageModel for LookupModel {
    fn generate(&mut self, prompt: &str) -> Result<Value, GenerationError> {
        self.responses
            .get(prompt)
            .cloned()
            .ok_or_else(|| GenerationError::MissingResponse(prompt.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BackendKind;

    #[test]
    fn returns_scripted_response() {
        let config = InstanceConfig::new(BackendKind::Lookup, "table")
            .with_param("prompt_a", "response_a");
        let mut model = LookupModel::from_config(&config);
        assert_eq!(
            model.generate("prompt_a").unwrap(),
            Value::String("response_a".into())
        );
    }

    #[test]
    fn unscripted_prompt_is_an_error() {
        let config = InstanceConfig::new(BackendKind::Lookup, "table");
        let mut model = LookupModel::from_config(&config);
        assert!(matches!(
            model.generate("unknown"),
            Err(GenerationError::MissingResponse(_))
        ));
    }

    #[test]
    fn responses_may_be_structured() {
        let config = InstanceConfig::new(BackendKind::Lookup, "table")
            .with_param("q", serde_json::json!({"text": "a", "tokens": 3}));
        let mut model = LookupModel::from_config(&config);
        let response = model.generate("q").unwrap();
        assert_eq!(response["tokens"], 3);
    }
}
