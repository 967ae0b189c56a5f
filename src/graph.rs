//! The turn pipeline: the execution engine behind one conversation turn.
//!
//! The topology is fixed (load state, merge input, call the model, append
//! the reply, persist), so it is expressed as an explicit ordered pipeline
//! rather than a general graph of nodes. [`TurnPipeline::compile`] binds that
//! sequence to a specific checkpoint store and model client; the resulting
//! handle is what the service invokes per turn.
//!
//! Turns on the same thread id are serialized through a per-thread async
//! mutex, so a `load`/`save` pair can never interleave with another turn on
//! the same thread and lose an update. Turns on different thread ids never
//! block one another.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::checkpoint::{Checkpointer, CheckpointerError};
use crate::message::Message;
use crate::model::{ModelClient, ModelError};
use crate::prompt::PromptFormatter;
use crate::state::ConversationState;

/// Errors from one turn execution.
#[derive(Debug, Error, Diagnostic)]
pub enum TurnError {
    /// Model invocation failed; nothing was persisted for this turn.
    #[error(transparent)]
    #[diagnostic(code(chatweave::graph::upstream))]
    Upstream(#[from] ModelError),

    /// Prior state could not be restored for the thread.
    #[error("checkpoint restore failed: {source}")]
    #[diagnostic(code(chatweave::graph::restore))]
    Restore {
        #[source]
        source: CheckpointerError,
    },

    /// The checkpoint write failed after a successful model response. The
    /// answer was produced but may not be visible to future loads.
    #[error("checkpoint save failed after model response: {source}")]
    #[diagnostic(
        code(chatweave::graph::persistence),
        help("The turn's reply was generated but may be lost to future loads.")
    )]
    Persistence {
        #[source]
        source: CheckpointerError,
    },
}

/// Compiled turn pipeline bound to a checkpoint store.
pub struct TurnPipeline {
    model: Arc<dyn ModelClient>,
    formatter: Arc<dyn PromptFormatter>,
    checkpointer: Arc<dyn Checkpointer>,
    /// Per-thread turn locks; entries are created on first use and kept for
    /// the life of the pipeline.
    thread_locks: Mutex<FxHashMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for TurnPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnPipeline").finish()
    }
}

impl TurnPipeline {
    /// Bind the fixed turn sequence to its collaborators.
    ///
    /// Compilation is cheap and infallible; the service compiles once during
    /// initialization and reuses the returned handle, so recompiling an
    /// already-initialized service never happens.
    #[must_use]
    pub fn compile(
        model: Arc<dyn ModelClient>,
        formatter: Arc<dyn PromptFormatter>,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Arc<Self> {
        info!("turn pipeline compiled");
        Arc::new(Self {
            model,
            formatter,
            checkpointer,
            thread_locks: Mutex::new(FxHashMap::default()),
        })
    }

    /// The checkpoint store this pipeline is bound to.
    #[must_use]
    pub fn checkpointer(&self) -> &Arc<dyn Checkpointer> {
        &self.checkpointer
    }

    async fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.thread_locks.lock().await;
        locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Execute one turn against the thread's state.
    ///
    /// Restores prior state (empty for a new thread), appends
    /// `initial_messages` in order, invokes the model on the formatted
    /// history, appends the reply, persists, and returns the full updated
    /// state. The checkpoint write happens only after a successful model
    /// response; a failed invocation leaves the stored state untouched.
    #[instrument(skip(self, initial_messages, user_context), err)]
    pub async fn invoke(
        &self,
        thread_id: &str,
        initial_messages: Vec<Message>,
        user_context: Option<String>,
    ) -> Result<ConversationState, TurnError> {
        let lock = self.thread_lock(thread_id).await;
        let _turn = lock.lock().await;

        let mut state = self
            .checkpointer
            .load(thread_id)
            .await
            .map_err(|source| TurnError::Restore { source })?
            .unwrap_or_default();
        debug!(
            thread_id,
            restored_messages = state.messages.len(),
            "state restored"
        );

        state.user_context = user_context;
        state.append_messages(initial_messages);

        let prompt = self
            .formatter
            .format(&state.messages, state.user_context.as_deref());
        let reply = self.model.invoke(&prompt).await?;
        state.append_messages(vec![reply]);

        self.checkpointer
            .save(thread_id, &state)
            .await
            .map_err(|source| TurnError::Persistence { source })?;
        debug!(
            thread_id,
            total_messages = state.messages.len(),
            "turn persisted"
        );

        Ok(state)
    }
}
