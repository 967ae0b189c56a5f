//! Serde shapes for persisted checkpoints.
//!
//! Persisted payloads are decoupled from the in-memory types so the stored
//! format can evolve independently (unknown future fields default cleanly on
//! read). Conversion lives here; the backends stay focused on I/O.

use serde::{Deserialize, Serialize};

use crate::checkpoint::CheckpointerError;
use crate::message::Message;
use crate::state::ConversationState;

/// Current persisted format revision.
pub const FORMAT_REVISION: u32 = 1;

fn default_revision() -> u32 {
    FORMAT_REVISION
}

/// Persisted shape of one thread's [`ConversationState`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedThreadState {
    /// Format revision stamped at write time.
    #[serde(default = "default_revision")]
    pub revision: u32,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub user_context: Option<String>,
}

impl From<&ConversationState> for PersistedThreadState {
    fn from(state: &ConversationState) -> Self {
        Self {
            revision: FORMAT_REVISION,
            messages: state.messages.clone(),
            user_context: state.user_context.clone(),
        }
    }
}

impl From<PersistedThreadState> for ConversationState {
    fn from(persisted: PersistedThreadState) -> Self {
        Self {
            messages: persisted.messages,
            user_context: persisted.user_context,
        }
    }
}

impl PersistedThreadState {
    pub fn to_json_string(&self) -> Result<String, CheckpointerError> {
        serde_json::to_string(self).map_err(|source| CheckpointerError::Serde { source })
    }

    pub fn from_json_str(payload: &str) -> Result<Self, CheckpointerError> {
        serde_json::from_str(payload).map_err(|source| CheckpointerError::Serde { source })
    }
}
