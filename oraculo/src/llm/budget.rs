//! Response-size policy: how many completion tokens a question may spend.

pub const SHORT_ANSWER_TOKENS: u32 = 200;
pub const MEDIUM_ANSWER_TOKENS: u32 = 400;
pub const LONG_ANSWER_TOKENS: u32 = 600;

/// Ceiling for the single follow-up request that completes a truncated answer.
pub const CONTINUATION_TOKENS: u32 = 300;

pub const SHORT_QUESTION_WORDS: usize = 10;
pub const MEDIUM_QUESTION_WORDS: usize = 30;

/// Maximum completion tokens for a question, by whitespace-separated word count.
///
/// Three bands: fewer than 10 words, fewer than 30, everything else. The result
/// never decreases as the question grows.
///
/// ```
/// use oraculo::llm::budget::estimate_max_tokens;
///
/// assert_eq!(estimate_max_tokens("¿Qué me depara Venus?"), 200);
/// ```
pub fn estimate_max_tokens(question: &str) -> u32 {
    match question.split_whitespace().count() {
        n if n < SHORT_QUESTION_WORDS => SHORT_ANSWER_TOKENS,
        n if n < MEDIUM_QUESTION_WORDS => MEDIUM_ANSWER_TOKENS,
        _ => LONG_ANSWER_TOKENS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        vec!["palabra"; n].join(" ")
    }

    #[test]
    fn band_boundaries() {
        assert_eq!(estimate_max_tokens(&words(9)), SHORT_ANSWER_TOKENS);
        assert_eq!(estimate_max_tokens(&words(10)), MEDIUM_ANSWER_TOKENS);
        assert_eq!(estimate_max_tokens(&words(29)), MEDIUM_ANSWER_TOKENS);
        assert_eq!(estimate_max_tokens(&words(30)), LONG_ANSWER_TOKENS);
    }

    #[test]
    fn budget_is_monotonic_in_word_count() {
        let budgets: Vec<u32> = (0..80).map(|n| estimate_max_tokens(&words(n))).collect();
        assert!(budgets.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(estimate_max_tokens(&words(5)) < estimate_max_tokens(&words(20)));
        assert!(estimate_max_tokens(&words(20)) < estimate_max_tokens(&words(50)));
    }

    #[test]
    fn repeated_whitespace_does_not_inflate_word_count() {
        assert_eq!(
            estimate_max_tokens("hola    \n\t  mundo"),
            estimate_max_tokens("hola mundo")
        );
    }
}
