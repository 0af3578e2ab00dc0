use ollama_rs::Ollama;
use ollama_rs::generation::completion::request::GenerationRequest;
use serde_json::Value;

use super::LanguageModel;
use crate::InstanceConfig;
use crate::error::{GenerationError, SpawnError};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Model served by a local Ollama instance.
///
/// `model_path` is the Ollama model name (e.g. `"gemma3n"`). Recognized
/// `model_config` parameters:
///
/// - `base_url`: server URL, defaults to `http://localhost:11434`
///
/// The [`LanguageModel`] contract is synchronous while the Ollama client is
/// async, so each instance owns a current-thread runtime and drives requests
/// to completion on it. Workers host exactly one model, so the extra runtime
/// stays one-per-worker.
pub struct OllamaModel {
    runtime: tokio::runtime::Runtime,
    client: Ollama,
    model: String,
}

impl OllamaModel {
    /// Connects the client and claims a private runtime.
    ///
    /// Construction does not contact the server; a dead or missing server
    /// surfaces on the first generation instead.
    pub fn from_config(config: &InstanceConfig) -> Result<Self, SpawnError> {
        let base_url = config
            .model_config
            .get("base_url")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_BASE_URL);
        let client = Ollama::try_new(base_url)
            .map_err(|e| SpawnError::InvalidConfig(format!("base_url `{base_url}`: {e}")))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            runtime,
            client,
            model: config.model_path.clone(),
        })
    }
}

impl LanguageModel for OllamaModel {
    fn generate(&mut self, prompt: &str) -> Result<Value, GenerationError> {
        let request = GenerationRequest::new(self.model.clone(), prompt.to_string());
        let response = self
            .runtime
            .block_on(self.client.generate(request))
            .map_err(|e| GenerationError::Backend(e.to_string()))?;
        Ok(Value::String(response.response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BackendKind;

    #[test]
    fn rejects_unparseable_base_url() {
        let config = InstanceConfig::new(BackendKind::Ollama, "gemma3n")
            .with_param("base_url", "not a url");
        assert!(matches!(
            OllamaModel::from_config(&config),
            Err(SpawnError::InvalidConfig(_))
        ));
    }

    #[test]
    fn defaults_to_local_server() {
        let config = InstanceConfig::new(BackendKind::Ollama, "gemma3n");
        assert!(OllamaModel::from_config(&config).is_ok());
    }
}
