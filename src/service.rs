//! The conversation service: lifecycle, initialization ordering, and the
//! public `converse` operation.
//!
//! One [`ConversationService`] is constructed per process and shared via
//! `Arc`: an explicitly owned object passed to callers, not an ambient
//! global. Construction is cheap; the expensive resources (model client,
//! connection pool, checkpoint store, turn pipeline) are built lazily on the
//! first [`initialize`](ConversationService::initialize) and reused by every
//! later call.
//!
//! # Initialization protocol
//!
//! Double-checked locking: a lock-free-ish read of the published runtime is
//! the fast path for the warm case; racers that find it empty serialize on a
//! single async mutex, re-check, and at most one of them runs the ordered
//! sequence model → pool → checkpointer → pipeline. The runtime is published
//! as one `Arc` swap, so readers either see the complete
//! `{model, checkpointer, pipeline}` triple or nothing, never a torn state.
//! The read check is only an optimization; the mutex is the correctness
//! mechanism.
//!
//! # Degraded mode
//!
//! A model handshake failure is fatal to the attempt (the next call retries
//! from scratch). A pool or durable-checkpoint setup failure is not: it is
//! logged, partially opened pool resources are released, and the service
//! comes up on the in-memory checkpoint store instead. Conversations then
//! work normally but history does not survive a restart.

use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::checkpoint::{Checkpointer, CheckpointerError, InMemoryCheckpointer};
use crate::config::ServiceConfig;
use crate::graph::{TurnError, TurnPipeline};
use crate::message::Message;
use crate::model::{ModelClient, ModelConnector, ModelError};
use crate::prompt::PromptFormatter;
use crate::state::ConversationState;

#[cfg(feature = "sqlite")]
use crate::checkpoint::sqlite::SqliteCheckpointer;
#[cfg(feature = "sqlite")]
use crate::pool::PoolManager;

/// Errors surfaced by the conversation service.
#[derive(Debug, Error, Diagnostic)]
pub enum ServiceError {
    /// Model handshake failed during initialization; the service remains
    /// uninitialized and the next call retries from scratch.
    #[error("service initialization failed: {source}")]
    #[diagnostic(
        code(chatweave::service::initialization),
        help("Check model provider configuration; pool failures degrade instead of failing.")
    )]
    Initialization {
        #[source]
        source: ModelError,
    },

    /// Defensive guard: `converse` was called before initialization
    /// completed. Unreachable when the service is obtained via
    /// [`ConversationService::connect`].
    #[error("conversation service not initialized")]
    #[diagnostic(
        code(chatweave::service::not_initialized),
        help("Call initialize() (or construct via connect()) before converse().")
    )]
    NotInitialized,

    /// Model invocation failed during a turn; nothing was persisted.
    #[error("model invocation failed: {source}")]
    #[diagnostic(code(chatweave::service::upstream))]
    Upstream {
        #[source]
        source: ModelError,
    },

    /// Checkpoint load or save failed. For a save failure the reply was
    /// produced but may not be visible to future loads; treated as a hard
    /// failure so callers can decide what to tell the user.
    #[error("checkpoint persistence failed: {source}")]
    #[diagnostic(code(chatweave::service::persistence))]
    Persistence {
        #[source]
        source: CheckpointerError,
    },
}

/// Fully initialized resources, published atomically as one `Arc`.
struct Runtime {
    #[allow(dead_code)] // retained so the handle's lifetime matches the pipeline's
    model: Arc<dyn ModelClient>,
    checkpointer: Arc<dyn Checkpointer>,
    pipeline: Arc<TurnPipeline>,
    durable: bool,
}

/// Process-wide conversation orchestration service.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use chatweave::config::ServiceConfig;
/// use chatweave::model::mock::MockConnector;
/// use chatweave::prompt::TemplateFormatter;
/// use chatweave::service::ConversationService;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = ConversationService::connect(
///     ServiceConfig::from_env(),
///     Arc::new(MockConnector::with_reply("Hi there!")),
///     Arc::new(TemplateFormatter::default()),
/// )
/// .await?;
///
/// let reply = service.converse("thread-1", "Hello", None).await?;
/// println!("{}", reply.content);
///
/// service.close_pool().await;
/// # Ok(())
/// # }
/// ```
pub struct ConversationService {
    config: ServiceConfig,
    connector: Arc<dyn ModelConnector>,
    formatter: Arc<dyn PromptFormatter>,
    #[cfg(feature = "sqlite")]
    pool: Mutex<PoolManager>,
    /// Published runtime; `None` until initialization completes.
    runtime: RwLock<Option<Arc<Runtime>>>,
    /// Serializes the initialization sequence across racing callers.
    init_lock: Mutex<()>,
}

impl ConversationService {
    /// Construct an uninitialized service. Configuration is fixed here and
    /// never re-read (first-writer-wins).
    #[must_use]
    pub fn new(
        config: ServiceConfig,
        connector: Arc<dyn ModelConnector>,
        formatter: Arc<dyn PromptFormatter>,
    ) -> Self {
        debug!("conversation service created");
        Self {
            config,
            connector,
            formatter,
            #[cfg(feature = "sqlite")]
            pool: Mutex::new(PoolManager::new()),
            runtime: RwLock::new(None),
            init_lock: Mutex::new(()),
        }
    }

    /// Construct and fully initialize, returning a shared handle.
    ///
    /// This is the intended entry point: the returned service is guaranteed
    /// ready, so [`converse`](Self::converse) on it can never observe
    /// [`ServiceError::NotInitialized`].
    pub async fn connect(
        config: ServiceConfig,
        connector: Arc<dyn ModelConnector>,
        formatter: Arc<dyn PromptFormatter>,
    ) -> Result<Arc<Self>, ServiceError> {
        let service = Arc::new(Self::new(config, connector, formatter));
        service.initialize().await?;
        Ok(service)
    }

    /// Run the initialization sequence if it has not completed yet.
    ///
    /// Safe to call from any number of concurrent tasks: the sequence runs
    /// at most once per service lifetime, and every caller returns only once
    /// a fully populated runtime is visible. A failed attempt leaves the
    /// service uninitialized so the next call retries from scratch.
    #[instrument(skip(self), err)]
    pub async fn initialize(&self) -> Result<(), ServiceError> {
        // Fast path for the warm case; the flag alone proves nothing, the
        // mutex below is the correctness mechanism.
        if self.runtime.read().await.is_some() {
            return Ok(());
        }

        let _guard = self.init_lock.lock().await;
        if self.runtime.read().await.is_some() {
            debug!("initialization already completed by a racing caller");
            return Ok(());
        }

        info!(
            model_id = %self.config.model_id,
            provider = %self.config.model_provider,
            "initializing conversation service"
        );

        let model = self
            .connector
            .connect(&self.config.model_id, &self.config.model_provider)
            .await
            .map_err(|source| {
                error!(%source, "model handshake failed");
                ServiceError::Initialization { source }
            })?;
        info!("model client ready");

        let (checkpointer, durable) = self.open_checkpointer().await;
        let pipeline = TurnPipeline::compile(
            model.clone(),
            self.formatter.clone(),
            checkpointer.clone(),
        );

        *self.runtime.write().await = Some(Arc::new(Runtime {
            model,
            checkpointer,
            pipeline,
            durable,
        }));
        info!(durable, "conversation service ready");
        Ok(())
    }

    /// Open the pool and durable checkpoint store, falling back to the
    /// in-memory store on any failure along that path. Never fatal.
    #[cfg(feature = "sqlite")]
    async fn open_checkpointer(&self) -> (Arc<dyn Checkpointer>, bool) {
        let mut pool = self.pool.lock().await;
        match pool.open(&self.config).await {
            Ok(handle) => {
                let durable = SqliteCheckpointer::new(handle);
                match durable.setup().await {
                    Ok(()) => {
                        info!("durable checkpoint store ready");
                        return (Arc::new(durable), true);
                    }
                    Err(e) => {
                        warn!(error = %e, "checkpoint setup failed, falling back to in-memory store");
                        // Release the partially-opened pool before degrading.
                        pool.close().await;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "pool open failed, falling back to in-memory store");
            }
        }
        (Arc::new(InMemoryCheckpointer::new()), false)
    }

    #[cfg(not(feature = "sqlite"))]
    async fn open_checkpointer(&self) -> (Arc<dyn Checkpointer>, bool) {
        info!("built without a durable backend, using in-memory store");
        (Arc::new(InMemoryCheckpointer::new()), false)
    }

    async fn runtime(&self) -> Result<Arc<Runtime>, ServiceError> {
        self.runtime
            .read()
            .await
            .clone()
            .ok_or(ServiceError::NotInitialized)
    }

    /// Execute one conversation turn and return the assistant's reply.
    ///
    /// Requires a completed initialization (see [`connect`](Self::connect));
    /// the `NotInitialized` branch is a defensive guard. Model failures
    /// surface as [`ServiceError::Upstream`] with nothing persisted; a save
    /// failure after a successful model call surfaces as
    /// [`ServiceError::Persistence`].
    #[instrument(skip(self, user_input, user_context), err)]
    pub async fn converse(
        &self,
        thread_id: &str,
        user_input: &str,
        user_context: Option<&str>,
    ) -> Result<Message, ServiceError> {
        let runtime = self.runtime().await?;
        let state = runtime
            .pipeline
            .invoke(
                thread_id,
                vec![Message::user(user_input)],
                user_context.map(str::to_string),
            )
            .await
            .map_err(|e| match e {
                TurnError::Upstream(source) => ServiceError::Upstream { source },
                TurnError::Restore { source } | TurnError::Persistence { source } => {
                    ServiceError::Persistence { source }
                }
            })?;

        match state.last_message() {
            Some(reply) => Ok(reply.clone()),
            // The pipeline always appends the model reply last; an empty
            // result here means the upstream produced nothing usable.
            None => Err(ServiceError::Upstream {
                source: ModelError::Invocation {
                    provider: self.config.model_provider.clone(),
                    message: "turn produced no messages".to_string(),
                },
            }),
        }
    }

    /// The stored history for a thread, if any. Reads through the same
    /// checkpoint store the pipeline persists to.
    pub async fn history(
        &self,
        thread_id: &str,
    ) -> Result<Option<ConversationState>, ServiceError> {
        let runtime = self.runtime().await?;
        runtime
            .checkpointer
            .load(thread_id)
            .await
            .map_err(|source| ServiceError::Persistence { source })
    }

    /// Whether the service came up on the durable checkpoint store (`false`
    /// in degraded, in-memory mode). Requires a completed initialization.
    pub async fn is_durable(&self) -> Result<bool, ServiceError> {
        Ok(self.runtime().await?.durable)
    }

    /// Whether initialization has completed.
    pub async fn is_initialized(&self) -> bool {
        self.runtime.read().await.is_some()
    }

    /// Close the connection pool if present and clear the handle.
    /// Idempotent: calling again (or without a pool) is a logged no-op.
    /// Called once at process shutdown.
    #[instrument(skip(self))]
    pub async fn close_pool(&self) {
        #[cfg(feature = "sqlite")]
        {
            self.pool.lock().await.close().await;
        }
        #[cfg(not(feature = "sqlite"))]
        {
            info!("built without a durable backend, no pool to close");
        }
    }
}

impl std::fmt::Debug for ConversationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationService")
            .field("config", &self.config)
            .finish()
    }
}
