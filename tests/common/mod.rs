#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chatweave::checkpoint::{Checkpointer, CheckpointerError, InMemoryCheckpointer};
use chatweave::config::ServiceConfig;
use chatweave::state::ConversationState;

/// Unopenable database URL: the parent directory does not exist and sqlite
/// will not create intermediate directories, so pool open fails and the
/// service degrades to the in-memory store.
pub const BAD_DB_URL: &str = "sqlite:///no/such/dir/chatweave-tests.db";

pub fn degraded_config() -> ServiceConfig {
    ServiceConfig::default()
        .with_model("test-model", "mock")
        .with_database_url(BAD_DB_URL)
}

/// A throwaway on-disk database. Keep the `TempDir` alive for the duration
/// of the test; dropping it deletes the file.
#[cfg(feature = "sqlite")]
pub fn temp_db() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().expect("create tempdir");
    let url = format!("sqlite://{}/threads.db", dir.path().display());
    (dir, url)
}

/// Checkpoint store with scriptable load/save failures, delegating to an
/// in-memory store otherwise. Counts operations so tests can assert ordering.
pub struct FailingCheckpointer {
    inner: InMemoryCheckpointer,
    fail_loads: bool,
    fail_saves: bool,
    pub loads: AtomicUsize,
    pub saves: AtomicUsize,
}

impl FailingCheckpointer {
    pub fn fail_loads() -> Self {
        Self {
            inner: InMemoryCheckpointer::new(),
            fail_loads: true,
            fail_saves: false,
            loads: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn fail_saves() -> Self {
        Self {
            inner: InMemoryCheckpointer::new(),
            fail_loads: false,
            fail_saves: true,
            loads: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn save_attempts(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Checkpointer for FailingCheckpointer {
    async fn load(
        &self,
        thread_id: &str,
    ) -> Result<Option<ConversationState>, CheckpointerError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads {
            return Err(CheckpointerError::Backend {
                message: "scripted load failure".to_string(),
            });
        }
        self.inner.load(thread_id).await
    }

    async fn save(
        &self,
        thread_id: &str,
        state: &ConversationState,
    ) -> Result<(), CheckpointerError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves {
            return Err(CheckpointerError::Backend {
                message: "scripted save failure".to_string(),
            });
        }
        self.inner.save(thread_id, state).await
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointerError> {
        self.inner.list_threads().await
    }
}

/// Shared-checkpointer handle for pipeline tests.
pub fn shared_memory_store() -> Arc<InMemoryCheckpointer> {
    Arc::new(InMemoryCheckpointer::new())
}
