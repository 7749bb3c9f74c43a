// File: src/services/classifier.rs
//
// Pure text classification: persona mentions and greeting intent.

/// Tokens that mark a message as a greeting once the text is lowercased.
const GREETING_LEXICON: &[&str] = &["hey", "hi", "hello", "sup", "yo", "what's up"];

/// Result of classifying one chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Mentioned persona names, unique, in roster order (not text order).
    pub mentions: Vec<String>,
    pub is_greeting: bool,
}

/// Classify `text` against the active persona roster. Deterministic, no
/// side effects.
///
/// Mention detection is a case-insensitive `@name` substring match, so
/// `@alice` and `@ALICE` both count for persona "Alice". Iterating the
/// roster (rather than the text) keeps the output order stable and makes
/// duplicates impossible.
pub fn classify(text: &str, active_persona_names: &[String]) -> Classification {
    let lowered = text.to_lowercase();

    let mentions = active_persona_names
        .iter()
        .filter(|name| lowered.contains(&format!("@{}", name.to_lowercase())))
        .cloned()
        .collect();

    Classification { mentions, is_greeting: is_greeting(&lowered) }
}

/// Single-word lexicon entries must match a whole token ("this" is not
/// "hi"); multi-word entries match as substrings. Apostrophes stay inside
/// tokens so "what's" survives splitting.
fn is_greeting(lowered: &str) -> bool {
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|t| !t.is_empty())
        .collect();

    GREETING_LEXICON.iter().any(|entry| {
        if entry.contains(' ') {
            lowered.contains(entry)
        } else {
            tokens.iter().any(|t| t == entry)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<String> {
        vec!["Alice".to_string(), "Bob".to_string(), "Carol".to_string()]
    }

    #[test]
    fn detects_mentions_case_insensitively() {
        let c = classify("hey @ALICE and @bob, look at this", &roster());
        assert_eq!(c.mentions, vec!["Alice".to_string(), "Bob".to_string()]);
    }

    #[test]
    fn mention_order_follows_roster_not_text() {
        let c = classify("@carol then @alice", &roster());
        assert_eq!(c.mentions, vec!["Alice".to_string(), "Carol".to_string()]);
    }

    #[test]
    fn duplicate_mentions_collapse() {
        let c = classify("@bob @bob @BOB", &roster());
        assert_eq!(c.mentions, vec!["Bob".to_string()]);
    }

    #[test]
    fn plain_name_without_at_is_not_a_mention() {
        let c = classify("alice is great", &roster());
        assert!(c.mentions.is_empty());
    }

    #[test]
    fn greeting_detection() {
        assert!(classify("hello everyone", &roster()).is_greeting);
        assert!(classify("YO what is happening", &roster()).is_greeting);
        assert!(classify("what's up chat", &roster()).is_greeting);
        assert!(classify("hi!", &roster()).is_greeting);
        assert!(!classify("nice play there", &roster()).is_greeting);
    }

    #[test]
    fn greeting_tokens_match_whole_words_only() {
        // "this" contains "hi" and "you" contains "yo"; neither is a
        // greeting.
        assert!(!classify("this game is hard", &roster()).is_greeting);
        assert!(!classify("are you serious", &roster()).is_greeting);
        assert!(!classify("supper was good", &roster()).is_greeting);
    }

    #[test]
    fn empty_text_classifies_to_nothing() {
        let c = classify("", &roster());
        assert!(c.mentions.is_empty());
        assert!(!c.is_greeting);
    }
}
