//! Wake phrase matching on transcripts

/// A wake phrase such as "hey malik"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeWord {
    phrase: String,
}

impl WakeWord {
    /// Create a wake word; the phrase is lower-cased and trimmed
    #[must_use]
    pub fn new(phrase: &str) -> Self {
        Self {
            phrase: phrase.trim().to_lowercase(),
        }
    }

    #[must_use]
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Case-insensitive containment check
    #[must_use]
    pub fn matches(&self, transcript: &str) -> bool {
        !self.phrase.is_empty() && transcript.to_lowercase().contains(&self.phrase)
    }

    /// Text following the wake phrase, lower-cased, with leading
    /// whitespace and punctuation stripped
    ///
    /// `None` when the phrase is absent; `Some("")` when nothing follows it.
    #[must_use]
    pub fn extract_command(&self, transcript: &str) -> Option<String> {
        if self.phrase.is_empty() {
            return None;
        }

        let lower = transcript.to_lowercase();
        let pos = lower.find(&self.phrase)?;
        let rest = &lower[pos + self.phrase.len()..];

        Some(
            rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',' || c == '.')
                .trim_end()
                .to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_phrase() {
        assert_eq!(WakeWord::new("  Hey MALIK ").phrase(), "hey malik");
    }

    #[test]
    fn matches_case_insensitively() {
        let wake = WakeWord::new("hey malik");
        assert!(wake.matches("HEY MALIK"));
        assert!(wake.matches("oh, hey Malik, are you there"));
        assert!(!wake.matches("hello world"));
    }

    #[test]
    fn extracts_trailing_command() {
        let wake = WakeWord::new("hey malik");
        assert_eq!(
            wake.extract_command("Hey Malik, what's the time?").as_deref(),
            Some("what's the time?")
        );
        assert_eq!(wake.extract_command("hey malik").as_deref(), Some(""));
        assert_eq!(wake.extract_command("hey malik...  ").as_deref(), Some(""));
        assert!(wake.extract_command("what's the time").is_none());
    }

    #[test]
    fn empty_phrase_never_matches() {
        let wake = WakeWord::new("   ");
        assert!(!wake.matches("anything"));
        assert!(wake.extract_command("anything").is_none());
    }
}
