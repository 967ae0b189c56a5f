//! Checkpoint storage for conversation state.
//!
//! Two interchangeable variants sit behind the [`Checkpointer`] trait:
//!
//! - [`SqliteCheckpointer`](sqlite::SqliteCheckpointer): durable, bound to
//!   the pooled connection, requires a successful `setup()` before use.
//! - [`InMemoryCheckpointer`]: process-local fallback used when the durable
//!   path is unavailable; state does not survive a restart.
//!
//! The store is keyed solely by thread id. `load` followed by `save` is not
//! atomic at this layer; the turn pipeline serializes turns per thread id on
//! top of it (see [`crate::graph`]).

pub mod persistence;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::state::ConversationState;

/// Errors from checkpoint load/save operations.
#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointerError {
    /// Backing store failure (connection, SQL, migration).
    #[error("checkpoint backend error: {message}")]
    #[diagnostic(
        code(chatweave::checkpoint::backend),
        help("Ensure the backing store is reachable and its schema is set up.")
    )]
    Backend { message: String },

    /// Persisted payload could not be (de)serialized.
    #[error("checkpoint serialization failed: {source}")]
    #[diagnostic(
        code(chatweave::checkpoint::serde),
        help("The persisted JSON does not match the current state shape.")
    )]
    Serde {
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, CheckpointerError>;

/// Capability contract for checkpoint stores.
///
/// `load` returns `None` for an unknown thread id (the "new conversation"
/// case). `save` replaces the thread's snapshot wholesale.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>>;
    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<()>;
    /// All thread ids with a stored snapshot, most recently updated first
    /// where the backend tracks that.
    async fn list_threads(&self) -> Result<Vec<String>>;
}

/// Volatile in-memory checkpoint store.
///
/// The ephemeral fallback: a map from thread id to the latest state snapshot.
/// Suitable for tests and for degraded operation when the durable store is
/// unavailable.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointer {
    threads: RwLock<FxHashMap<String, ConversationState>>,
}

impl InMemoryCheckpointer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>> {
        Ok(self.threads.read().await.get(thread_id).cloned())
    }

    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<()> {
        self.threads
            .write()
            .await
            .insert(thread_id.to_string(), state.clone());
        Ok(())
    }

    async fn list_threads(&self) -> Result<Vec<String>> {
        Ok(self.threads.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[tokio::test]
    async fn unknown_thread_loads_as_none() {
        let store = InMemoryCheckpointer::new();
        assert!(store.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = InMemoryCheckpointer::new();
        let mut state = ConversationState::new_with_user_message("hi");
        state.append_messages(vec![Message::assistant("hello")]);
        store.save("t1", &state).await.unwrap();
        let loaded = store.load("t1").await.unwrap().unwrap();
        assert_eq!(loaded, state);
    }
}
