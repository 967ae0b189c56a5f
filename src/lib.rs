//! # Chatweave: Conversation Orchestration Service
//!
//! Chatweave wires a chat model, a prompt template, and a per-thread
//! checkpoint store into one owned service object with a lazy, race-safe
//! initialization protocol and a single `converse` operation per user turn.
//!
//! ## Core Concepts
//!
//! - **Service**: Owned lifecycle object; initializes once, then serves turns
//! - **Turn pipeline**: The fixed load → merge → invoke → persist sequence
//! - **Checkpointer**: Pluggable thread-state store (SQLite or in-memory)
//! - **Model client**: Trait seam over the upstream chat model
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use chatweave::config::ServiceConfig;
//! use chatweave::message::Role;
//! use chatweave::model::mock::MockConnector;
//! use chatweave::prompt::TemplateFormatter;
//! use chatweave::service::ConversationService;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // An in-memory store is used when the database is unavailable, so a
//! // mock-backed service needs no external setup at all.
//! let service = ConversationService::connect(
//!     ServiceConfig::default().with_database_url("sqlite:///no/such/dir/chatweave.db"),
//!     Arc::new(MockConnector::with_reply("Hi! How can I help?")),
//!     Arc::new(TemplateFormatter::default()),
//! )
//! .await?;
//!
//! let reply = service.converse("thread-1", "Hello", Some("Name: Ada")).await?;
//! assert!(reply.has_role(Role::Assistant));
//!
//! service.close_pool().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`service`] - Lifecycle, initialization, and the `converse` operation
//! - [`graph`] - The compiled per-turn pipeline
//! - [`checkpoint`] - Checkpoint store trait and backends
//! - [`model`] - Model client traits, mock, and provider bindings
//! - [`prompt`] - System preamble and user-context templating
//! - [`pool`] - Connection pool lifecycle (with the `sqlite` feature)
//! - [`config`] - Environment-driven service configuration
//! - [`telemetry`] - Tracing bootstrap for binaries and tests

pub mod checkpoint;
pub mod config;
pub mod graph;
pub mod message;
pub mod model;
#[cfg(feature = "sqlite")]
pub mod pool;
pub mod prompt;
pub mod service;
pub mod state;
pub mod telemetry;
