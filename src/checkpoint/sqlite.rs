/*!
SQLite checkpoint store.

Durable [`Checkpointer`] variant bound to the shared connection pool. One row
per thread id, latest snapshot only; `save` replaces the row in place.

## Behavior

- `setup()` must succeed before the store is considered usable. With the
  `sqlite-migrations` feature (default) it runs the embedded migrations
  (`sqlx::migrate!("./migrations")`); without it, a readiness probe verifies
  that the schema was applied externally.
- Pure serialization lives in [`crate::checkpoint::persistence`]; this module
  stays focused on database I/O.

## Database schema

- `threads.id` ← thread id (primary key)
- `threads.state_json` ← serialized [`PersistedThreadState`]
- `threads.updated_at` ← last save time (UTC text)
*/

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument};

use crate::checkpoint::persistence::PersistedThreadState;
use crate::checkpoint::{Checkpointer, CheckpointerError, Result};
use crate::state::ConversationState;

/// SQLite-backed checkpoint store.
pub struct SqliteCheckpointer {
    /// Shared pool owned by the service's pool manager.
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteCheckpointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCheckpointer").finish()
    }
}

impl SqliteCheckpointer {
    /// Bind the store to an already-opened pool. Call [`setup`](Self::setup)
    /// before first use.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Prepare the schema and verify readiness.
    ///
    /// The store must not be used if this returns an error; the service falls
    /// back to the in-memory variant in that case.
    #[instrument(skip(self), err)]
    pub async fn setup(&self) -> Result<()> {
        #[cfg(feature = "sqlite-migrations")]
        {
            sqlx::migrate!("./migrations")
                .run(&self.pool)
                .await
                .map_err(|e| CheckpointerError::Backend {
                    message: format!("migration failure: {e}"),
                })?;
        }
        #[cfg(not(feature = "sqlite-migrations"))]
        {
            // External migration orchestration: probe that the table exists.
            sqlx::query("SELECT 1 FROM threads LIMIT 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| CheckpointerError::Backend {
                    message: format!("readiness probe failed: {e}"),
                })?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Checkpointer for SqliteCheckpointer {
    #[instrument(skip(self), err)]
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>> {
        let row = sqlx::query("SELECT state_json, updated_at FROM threads WHERE id = ?1")
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CheckpointerError::Backend {
                message: format!("select thread: {e}"),
            })?;

        let row = match row {
            Some(r) => r,
            None => return Ok(None),
        };

        let state_json: String = row.get("state_json");
        let updated_at_str: String = row.get("updated_at");
        let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        debug!(thread_id, %updated_at, "restored checkpoint");

        let persisted = PersistedThreadState::from_json_str(&state_json)?;
        Ok(Some(ConversationState::from(persisted)))
    }

    #[instrument(skip(self, state), err)]
    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<()> {
        let state_json = PersistedThreadState::from(state).to_json_string()?;
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO threads (id, state_json, updated_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(thread_id)
        .bind(&state_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| CheckpointerError::Backend {
            message: format!("upsert thread: {e}"),
        })?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_threads(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT id FROM threads ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CheckpointerError::Backend {
                message: format!("list threads: {e}"),
            })?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>("id")).collect())
    }
}
