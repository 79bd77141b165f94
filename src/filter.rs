/// Words rejected in prompts when no custom list is configured.
pub const DEFAULT_BLOCKED_WORDS: &[&str] = &[
    "explicit",
    "nudity",
    "porn",
    "pornography",
    "sex",
    "sexual",
    "violence",
    "gore",
    "blood",
    "hate",
    "racist",
    "terrorism",
];

/// Case-insensitive substring blocklist for prompt text.
///
/// Matching is deliberately substring-based, not token-based: a blocked word
/// embedded inside a longer word still rejects the prompt. Callers relying on
/// this should expect false positives on benign words that happen to contain
/// a blocked entry.
#[derive(Clone, Debug)]
pub struct ProfanityFilter {
    blocked: Vec<String>,
}

impl ProfanityFilter {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blocked = words
            .into_iter()
            .map(|word| word.as_ref().to_lowercase())
            .collect();

        ProfanityFilter { blocked }
    }

    pub fn is_safe(&self, prompt: &str) -> bool {
        let lowered = prompt.to_lowercase();
        !self
            .blocked
            .iter()
            .any(|word| lowered.contains(word.as_str()))
    }
}

impl Default for ProfanityFilter {
    fn default() -> Self {
        ProfanityFilter::new(DEFAULT_BLOCKED_WORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_prompt_passes() {
        let filter = ProfanityFilter::default();
        assert!(filter.is_safe("a futuristic city at night"));
        assert!(filter.is_safe(""));
    }

    #[test]
    fn blocked_word_rejects_any_case() {
        let filter = ProfanityFilter::default();
        assert!(!filter.is_safe("graphic violence in the streets"));
        assert!(!filter.is_safe("GRAPHIC VIOLENCE"));
        assert!(!filter.is_safe("ViOlEnCe"));
    }

    #[test]
    fn embedded_substring_still_rejects() {
        // "sex" inside "Essex" trips the filter; documented behavior.
        let filter = ProfanityFilter::default();
        assert!(!filter.is_safe("a quiet village in Essex"));
        assert!(!filter.is_safe("bloodhound running across a field"));
    }

    #[test]
    fn custom_list_replaces_default() {
        let filter = ProfanityFilter::new(["dragon"]);
        assert!(!filter.is_safe("a Dragon over the castle"));
        assert!(filter.is_safe("graphic violence"));
    }
}
