//! Service configuration, resolved once at construction time.
//!
//! The service never re-reads configuration after its first successful
//! initialization; whatever [`ServiceConfig`] it was constructed with is the
//! configuration for the life of the process (first-writer-wins).

use std::time::Duration;

/// Immutable configuration for the conversation service.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Model identifier passed to the model connector.
    pub model_id: String,
    /// Provider name passed to the model connector (e.g. "ollama").
    pub model_provider: String,
    /// Connection string for the durable checkpoint backing store.
    pub database_url: String,
    /// Upper bound on open pool connections.
    pub pool_max_size: u32,
    /// How long an idle pooled connection is kept before being reaped.
    pub pool_max_idle: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_id: "gemma3:270m".to_string(),
            model_provider: "ollama".to_string(),
            database_url: "sqlite://chatweave.db".to_string(),
            pool_max_size: 20,
            pool_max_idle: Duration::from_secs(60),
        }
    }
}

impl ServiceConfig {
    /// Resolve configuration from the environment, falling back to defaults.
    ///
    /// Reads `.env` first (if present), then:
    /// - `CHATWEAVE_MODEL_ID`
    /// - `CHATWEAVE_MODEL_PROVIDER`
    /// - `DATABASE_URL`
    /// - `CHATWEAVE_POOL_MAX_SIZE`
    /// - `CHATWEAVE_POOL_MAX_IDLE_SECS`
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            model_id: std::env::var("CHATWEAVE_MODEL_ID").unwrap_or(defaults.model_id),
            model_provider: std::env::var("CHATWEAVE_MODEL_PROVIDER")
                .unwrap_or(defaults.model_provider),
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            pool_max_size: std::env::var("CHATWEAVE_POOL_MAX_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.pool_max_size),
            pool_max_idle: std::env::var("CHATWEAVE_POOL_MAX_IDLE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.pool_max_idle),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model_id: impl Into<String>, provider: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self.model_provider = provider.into();
        self
    }

    #[must_use]
    pub fn with_database_url(mut self, database_url: impl Into<String>) -> Self {
        self.database_url = database_url.into();
        self
    }

    #[must_use]
    pub fn with_pool_bounds(mut self, max_size: u32, max_idle: Duration) -> Self {
        self.pool_max_size = max_size;
        self.pool_max_idle = max_idle;
        self
    }
}
