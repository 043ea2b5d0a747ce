//! Transcription prompt assembly
//!
//! The remote Whisper API accepts a short free-text prompt that biases the
//! decoder toward expected vocabulary. We build it from the configured
//! initial prompt plus whatever context the harvester recovered from the
//! focused field, then truncate under two budgets: a word cap (keep the most
//! recent words, which are the most relevant context) and a character cap
//! required by the API.

/// Merge the static initial prompt with harvested context and truncate.
///
/// Either side may be empty; a single space separates them when both are
/// present. The word cap runs first and unconditionally keeps the *last*
/// `max_words` whitespace-separated tokens. If the result still exceeds
/// `max_chars`, the oldest remaining token is dropped one at a time until it
/// fits or nothing is left.
pub fn assemble(initial_prompt: &str, context: &str, max_words: usize, max_chars: usize) -> String {
    let combined = match (initial_prompt.is_empty(), context.is_empty()) {
        (true, true) => return String::new(),
        (false, true) => initial_prompt.to_string(),
        (true, false) => context.to_string(),
        (false, false) => format!("{} {}", initial_prompt, context),
    };
    truncate(&combined, max_words, max_chars)
}

/// Two-stage truncation: tail word cap, then front-dropping char cap.
pub fn truncate(prompt: &str, max_words: usize, max_chars: usize) -> String {
    let words: Vec<&str> = prompt.split_whitespace().collect();
    let start = words.len().saturating_sub(max_words);
    let mut tail = &words[start..];
    let mut truncated = tail.join(" ");

    while truncated.len() > max_chars && !tail.is_empty() {
        tail = &tail[1..];
        truncated = tail.join(" ");
    }

    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_WORDS: usize = 128;
    const MAX_CHARS: usize = 896;

    #[test]
    fn test_assemble_both_empty() {
        assert_eq!(assemble("", "", MAX_WORDS, MAX_CHARS), "");
    }

    #[test]
    fn test_assemble_omits_empty_side() {
        assert_eq!(assemble("hello", "", MAX_WORDS, MAX_CHARS), "hello");
        assert_eq!(assemble("", "world", MAX_WORDS, MAX_CHARS), "world");
        assert_eq!(assemble("hello", "world", MAX_WORDS, MAX_CHARS), "hello world");
    }

    #[test]
    fn test_word_cap_keeps_last_words_in_order() {
        let words: Vec<String> = (0..130).map(|i| format!("w{}", i)).collect();
        let prompt = words.join(" ");
        let result = truncate(&prompt, 128, 100_000);
        let expected = words[2..].join(" ");
        assert_eq!(result, expected);
    }

    #[test]
    fn test_short_prompt_unchanged() {
        let prompt = "just a few words";
        assert_eq!(truncate(prompt, MAX_WORDS, MAX_CHARS), prompt);
    }

    #[test]
    fn test_whitespace_runs_collapse_to_single_spaces() {
        assert_eq!(truncate("a\t b\n\n c", MAX_WORDS, MAX_CHARS), "a b c");
    }

    #[test]
    fn test_char_cap_drops_oldest_tokens_first() {
        // 10 words of 6 chars each -> 69 chars joined. Cap at 30.
        let words: Vec<String> = (0..10).map(|i| format!("word{:02}", i)).collect();
        let prompt = words.join(" ");
        let result = truncate(&prompt, MAX_WORDS, 30);
        // 4 words of 6 chars + 3 separators = 27 <= 30; 5 words would be 34.
        assert_eq!(result, "word06 word07 word08 word09");
    }

    #[test]
    fn test_char_cap_can_empty_the_prompt() {
        let result = truncate("averyveryveryverylongsingletoken", MAX_WORDS, 10);
        assert_eq!(result, "");
    }

    #[test]
    fn test_truncation_is_idempotent() {
        let words: Vec<String> = (0..200).map(|i| format!("token{}", i)).collect();
        let prompt = words.join(" ");
        let once = truncate(&prompt, 128, 400);
        let twice = truncate(&once, 128, 400);
        assert_eq!(once, twice);

        let assembled = assemble("intro prompt", &prompt, 128, 400);
        assert_eq!(truncate(&assembled, 128, 400), assembled);
    }
}
