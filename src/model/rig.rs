//! rig-core backed model client (feature `rig`, default-off).
//!
//! Currently supports the `ollama` provider. Other providers map to
//! [`ModelError::UnsupportedProvider`]; callers needing a different backend
//! can supply their own [`ModelConnector`].

use std::sync::Arc;

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::CompletionModel;
use rig::providers::ollama;
use serde_json::json;
use tracing::instrument;

use crate::message::{Message, Role};
use crate::model::{FormattedPrompt, ModelClient, ModelConnector, ModelError, Result};

/// Connector for rig-core provider clients.
#[derive(Debug, Default)]
pub struct RigConnector;

impl RigConnector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModelConnector for RigConnector {
    #[instrument(skip(self))]
    async fn connect(&self, model_id: &str, provider: &str) -> Result<Arc<dyn ModelClient>> {
        match provider {
            "ollama" => {
                let client = ollama::Client::new();
                Ok(Arc::new(RigOllamaClient {
                    model: client.completion_model(model_id),
                    model_id: model_id.to_string(),
                }))
            }
            other => Err(ModelError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Ollama-backed completion client.
pub struct RigOllamaClient {
    model: ollama::CompletionModel,
    model_id: String,
}

impl std::fmt::Debug for RigOllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RigOllamaClient")
            .field("model_id", &self.model_id)
            .finish()
    }
}

#[async_trait]
impl ModelClient for RigOllamaClient {
    #[instrument(skip(self, prompt), err)]
    async fn invoke(&self, prompt: &FormattedPrompt) -> Result<Message> {
        let latest = prompt
            .latest_user_content()
            .ok_or_else(|| ModelError::Invocation {
                provider: "ollama".to_string(),
                message: "prompt contains no user message".to_string(),
            })?;

        // Everything before the latest user message travels as chat history.
        let history: Vec<rig::completion::Message> = prompt
            .messages
            .iter()
            .take(prompt.messages.len().saturating_sub(1))
            .map(|m| match m.role {
                Role::User => rig::completion::Message::user(m.content.clone()),
                Role::Assistant => rig::completion::Message::assistant(m.content.clone()),
            })
            .collect();

        let request = self
            .model
            .completion_request(rig::completion::Message::user(latest.to_owned()))
            .preamble(prompt.system.clone())
            .messages(history)
            .build();

        let response =
            self.model
                .completion(request)
                .await
                .map_err(|e| ModelError::Invocation {
                    provider: "ollama".to_string(),
                    message: e.to_string(),
                })?;

        let content = response
            .choice
            .into_iter()
            .map(|choice| format!("{choice:?}"))
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Message::assistant(&content)
            .with_metadata(json!({"provider": "ollama", "model_id": self.model_id})))
    }
}
