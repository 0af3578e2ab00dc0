use serde_json::Value;

use super::LanguageModel;
use crate::error::GenerationError;

/// Model that answers every prompt with the prompt itself.
///
/// Exists to exercise pool and channel plumbing without any model state.
#[derive(Debug, Default)]
pub struct EchoModel;

impl EchoModel {
    pub fn new() -> Self {
        Self
    }
}

impl LanguageModel for EchoModel {
    fn generate(&mut self, prompt: &str) -> Result<Value, GenerationError> {
        Ok(Value::String(prompt.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_the_prompt() {
        let mut model = EchoModel::new();
        assert_eq!(
            model.generate("anything").unwrap(),
            Value::String("anything".into())
        );
    }
}
