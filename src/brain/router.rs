//! Command router
//!
//! A handful of phrases get fixed local replies; everything else is forwarded
//! verbatim to the completion backend.

use std::sync::Arc;

use chrono::NaiveTime;

use super::Completion;

/// Reply when no completion backend is configured
pub const NOT_CONFIGURED_REPLY: &str =
    "My OpenAI brain isn't configured yet. Please add a valid API key.";

/// Reply when the completion backend fails
pub const COMPLETION_FAILED_REPLY: &str =
    "My OpenAI brain had trouble thinking. Try again in a moment.";

/// Reply to an empty request
pub const EMPTY_REPLY: &str = "Say something so I can help you.";

/// Which rule produced a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Name,
    Time,
    Joke,
    Shutdown,
    Empty,
    Completion,
}

/// An assistant reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub intent: Intent,
}

impl Reply {
    fn new(text: impl Into<String>, intent: Intent) -> Self {
        Self {
            text: text.into(),
            intent,
        }
    }

    /// Whether the front-end should exit after delivering this reply
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.intent == Intent::Shutdown
    }
}

/// Source of the current wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveTime;
}

/// Local system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveTime {
        chrono::Local::now().time()
    }
}

/// A fixed local reply guarded by substring keywords
struct Rule {
    intent: Intent,
    keywords: &'static [&'static str],
    reply: fn(&dyn Clock) -> String,
}

impl Rule {
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k))
    }
}

/// Checked in order, first match wins
const RULES: &[Rule] = &[
    Rule {
        intent: Intent::Name,
        keywords: &["your name", "who are you"],
        reply: |_| "I am Malik, your intelligent assistant.".to_string(),
    },
    Rule {
        intent: Intent::Time,
        keywords: &["time"],
        reply: |clock| format_time_reply(clock.now()),
    },
    Rule {
        intent: Intent::Joke,
        keywords: &["joke"],
        reply: |_| "Why did the AI go broke? Because it had too many neural debts!".to_string(),
    },
    Rule {
        intent: Intent::Shutdown,
        keywords: &["exit", "quit", "shut down", "shutdown"],
        reply: |_| "Shutting down. Goodbye.".to_string(),
    },
];

/// Format the time reply using a 12-hour clock (`07:05 PM`)
#[must_use]
pub fn format_time_reply(time: NaiveTime) -> String {
    format!("The current time is {}.", time.format("%I:%M %p"))
}

/// Routes requests to local replies or the completion backend
#[derive(Clone)]
pub struct CommandRouter {
    completion: Option<Arc<dyn Completion>>,
    clock: Arc<dyn Clock>,
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl CommandRouter {
    /// Create a router; `None` means every non-local request gets the
    /// not-configured reply
    #[must_use]
    pub fn new(completion: Option<Arc<dyn Completion>>) -> Self {
        Self {
            completion,
            clock: Arc::new(LocalClock),
        }
    }

    /// Replace the clock used for time replies
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Whether a completion backend is attached
    #[must_use]
    pub fn has_completion(&self) -> bool {
        self.completion.is_some()
    }

    /// Reply without contacting the completion backend, if a local rule applies
    #[must_use]
    pub fn local_reply(&self, input: &str) -> Option<Reply> {
        let text = input.trim();
        let lowered = text.to_lowercase();

        if let Some(rule) = RULES.iter().find(|r| r.matches(&lowered)) {
            return Some(Reply::new((rule.reply)(self.clock.as_ref()), rule.intent));
        }

        text.is_empty().then(|| Reply::new(EMPTY_REPLY, Intent::Empty))
    }

    /// Produce a reply for a request
    pub async fn respond(&self, input: &str) -> Reply {
        if let Some(reply) = self.local_reply(input) {
            tracing::debug!(intent = ?reply.intent, "local reply");
            return reply;
        }

        let Some(completion) = &self.completion else {
            tracing::warn!("no completion backend configured");
            return Reply::new(NOT_CONFIGURED_REPLY, Intent::Completion);
        };

        match completion.complete(input.trim()).await {
            Ok(text) => Reply::new(text, Intent::Completion),
            Err(e) => {
                tracing::error!(error = %e, "completion failed");
                Reply::new(COMPLETION_FAILED_REPLY, Intent::Completion)
            }
        }
    }
}
