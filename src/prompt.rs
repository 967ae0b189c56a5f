//! Prompt formatting seam.
//!
//! The turn pipeline delegates prompt construction to a [`PromptFormatter`] so
//! the template text itself stays outside the core. [`TemplateFormatter`] is
//! the default implementation: a fixed preamble plus a user-information block,
//! with the message history passed through untouched.

use crate::message::Message;
use crate::model::FormattedPrompt;

/// Builds a [`FormattedPrompt`] from the full message history and the
/// caller-supplied context.
pub trait PromptFormatter: Send + Sync {
    fn format(&self, messages: &[Message], user_context: Option<&str>) -> FormattedPrompt;
}

/// Default preamble used when no template is supplied.
pub const DEFAULT_PREAMBLE: &str =
    "You are a supportive conversational assistant. Answer clearly and \
     considerately, taking the user's situation into account.";

/// Preamble-plus-context formatter.
///
/// # Examples
///
/// ```
/// use chatweave::message::Message;
/// use chatweave::prompt::{PromptFormatter, TemplateFormatter};
///
/// let formatter = TemplateFormatter::new("You are a test assistant.");
/// let prompt = formatter.format(&[Message::user("hi")], Some("returning user"));
/// assert!(prompt.system.contains("returning user"));
/// assert_eq!(prompt.messages.len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct TemplateFormatter {
    preamble: String,
}

impl TemplateFormatter {
    #[must_use]
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            preamble: preamble.into(),
        }
    }
}

impl Default for TemplateFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_PREAMBLE)
    }
}

impl PromptFormatter for TemplateFormatter {
    fn format(&self, messages: &[Message], user_context: Option<&str>) -> FormattedPrompt {
        let system = format!(
            "{}\n\n## User Information\n- User Context: {}",
            self.preamble,
            user_context.unwrap_or("No additional context provided.")
        );
        FormattedPrompt {
            system,
            messages: messages.to_vec(),
        }
    }
}
