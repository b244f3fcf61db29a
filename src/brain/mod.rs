//! Malik's brain: local command routing plus a language-model fallback

mod completion;
mod router;

pub use completion::{Completion, OpenAiCompletion, SYSTEM_PROMPT};
pub use router::{
    COMPLETION_FAILED_REPLY, Clock, CommandRouter, EMPTY_REPLY, Intent, LocalClock,
    NOT_CONFIGURED_REPLY, Reply, format_time_reply,
};
