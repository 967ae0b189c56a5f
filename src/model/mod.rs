//! Model client abstraction: a stateless, synchronous-per-call wrapper around
//! a remote text-generation endpoint.
//!
//! Two seams live here:
//! - [`ModelClient`]: one formatted prompt in, one assistant [`Message`] out.
//!   No retry policy is implemented at this layer; retries, if any, belong to
//!   a surrounding collaborator.
//! - [`ModelConnector`]: the handshake that produces a client for a given
//!   model id and provider. The conversation service runs it exactly once
//!   during initialization; a handshake failure is fatal to that attempt.

pub mod mock;
#[cfg(feature = "rig")]
pub mod rig;

use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::message::Message;

/// A prompt ready to be sent to a model: the rendered system preamble plus
/// the full chronological message history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormattedPrompt {
    /// Rendered system instructions, including any user context block.
    pub system: String,
    /// Complete message history for the thread, oldest first.
    pub messages: Vec<Message>,
}

impl FormattedPrompt {
    /// The most recent user message, if any. Providers that take a single
    /// prompt plus chat history use this as the prompt.
    #[must_use]
    pub fn latest_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.has_role(crate::message::Role::User))
            .map(|m| m.content.as_str())
    }
}

/// Errors from model connection or invocation.
#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    /// The provider handshake failed; fatal to service initialization.
    #[error("model handshake failed ({provider}): {message}")]
    #[diagnostic(
        code(chatweave::model::handshake),
        help("Check provider credentials and endpoint availability.")
    )]
    Handshake { provider: String, message: String },

    /// A per-call invocation failed; surfaced to the caller of the turn.
    #[error("model invocation failed ({provider}): {message}")]
    #[diagnostic(code(chatweave::model::invocation))]
    Invocation { provider: String, message: String },

    /// No client implementation exists for the requested provider.
    #[error("unsupported model provider: {0}")]
    #[diagnostic(
        code(chatweave::model::unsupported_provider),
        help("Enable the matching provider feature or supply a custom connector.")
    )]
    UnsupportedProvider(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Stateless wrapper around a remote text-generation endpoint.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Invoke the model with a formatted prompt, producing the assistant's
    /// reply. Transport and provider errors map to [`ModelError::Invocation`].
    async fn invoke(&self, prompt: &FormattedPrompt) -> Result<Message>;
}

/// Factory seam for model clients, run once during service initialization.
#[async_trait]
pub trait ModelConnector: Send + Sync {
    /// Perform the provider handshake and return a ready client.
    async fn connect(&self, model_id: &str, provider: &str) -> Result<Arc<dyn ModelClient>>;
}
