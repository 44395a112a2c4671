use regex::Regex;

/// Precompiled query tokens for token-overlap scoring.
///
/// A token contributes 1.0 when it matches on a word boundary and 0.5 when
/// it only appears as a substring.
pub struct TokenMatcher {
    tokens: Vec<String>,
    word_patterns: Vec<Option<Regex>>,
}

impl TokenMatcher {
    pub fn new(tokens: &[String]) -> Self {
        let lowered: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        let word_patterns = lowered
            .iter()
            .map(|t| Regex::new(&format!(r"\b{}\b", regex::escape(t))).ok())
            .collect();
        Self {
            tokens: lowered,
            word_patterns,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Overlap score of a chunk against the query tokens. `text` is the
    /// concatenation of breadcrumb and display code.
    pub fn overlap(&self, text: &str) -> f64 {
        if self.tokens.is_empty() {
            return 0.0;
        }
        let haystack = text.to_lowercase();
        let mut score = 0.0;
        for (token, pattern) in self.tokens.iter().zip(&self.word_patterns) {
            let word_hit = pattern
                .as_ref()
                .map(|re| re.is_match(&haystack))
                .unwrap_or(false);
            if word_hit {
                score += 1.0;
            } else if haystack.contains(token.as_str()) {
                score += 0.5;
            }
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(tokens: &[&str]) -> TokenMatcher {
        let owned: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        TokenMatcher::new(&owned)
    }

    #[test]
    fn word_boundary_scores_full_point() {
        let m = matcher(&["key"]);
        assert_eq!(m.overlap("the api key is here"), 1.0);
    }

    #[test]
    fn substring_scores_half_point() {
        let m = matcher(&["key"]);
        assert_eq!(m.overlap("apikey"), 0.5);
    }

    #[test]
    fn missing_token_scores_zero() {
        let m = matcher(&["token"]);
        assert_eq!(m.overlap("nothing relevant"), 0.0);
    }

    #[test]
    fn case_insensitive() {
        let m = matcher(&["apikey"]);
        assert_eq!(m.overlap("const apiKey = 1"), 1.0);
    }

    #[test]
    fn multiple_tokens_sum() {
        let m = matcher(&["api", "key", "missing"]);
        assert_eq!(m.overlap("api key"), 2.0);
    }

    #[test]
    fn empty_matcher() {
        let m = matcher(&[]);
        assert!(m.is_empty());
        assert_eq!(m.overlap("anything"), 0.0);
    }
}
