use unicode_segmentation::UnicodeSegmentation;

/// Characters with operator meaning inside an FTS MATCH expression.
const FTS_OPERATOR_CHARS: &str = "()\":*^.\\/:@#$%&=+[]{}<>|~`!?,;";

/// Segment a free-form query into lexical search tokens.
///
/// The same token set drives BM25 recall, token-overlap scoring, and
/// import-expansion chunk selection, so it is deliberately generous:
/// - code-looking tokens from the raw query (`api_key`, `fooBar`, `a/b.ts`)
///   are expanded into lowercase, separator-stripped, and camel/snake
///   variants;
/// - the sanitized query is word-segmented (UAX-29, so CJK text splits into
///   words rather than one giant token) and each word gets the same variant
///   expansion;
/// - adjacent word pairs are joined into compound variants so that a query
///   like `api key` also matches `apiKey` and `api_key` identifiers.
///
/// Returns a deduplicated set in first-seen order.
pub fn segment_query(query: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();

    // Code-feature pass over the original, unsanitized query.
    for raw in query.split_whitespace() {
        if is_code_token(raw) {
            push_variants(&mut out, raw);
        }
    }

    // Natural-language pass over the sanitized query.
    let sanitized = sanitize(query);
    let words: Vec<&str> = sanitized.unicode_words().collect();
    for word in &words {
        push_variants(&mut out, word);
    }

    // Compound variants for adjacent word pairs.
    for pair in words.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a.chars().all(|c| c.is_ascii_alphanumeric()) && b.chars().all(|c| c.is_ascii_alphanumeric())
        {
            push_unique(&mut out, format!("{}{}", a, b).to_lowercase());
            push_unique(&mut out, format!("{}_{}", a, b).to_lowercase());
            push_unique(&mut out, snake_to_camel(&format!("{}_{}", a, b).to_lowercase()));
        }
    }

    out
}

/// Strip FTS operator characters and operator words, collapse whitespace.
fn sanitize(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .map(|c| if FTS_OPERATOR_CHARS.contains(c) { ' ' } else { c })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|w| {
            let upper = w.to_ascii_uppercase();
            !matches!(upper.as_str(), "AND" | "OR" | "NOT" | "NEAR")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A token is code-like if it carries a separator or a camelCase boundary.
fn is_code_token(token: &str) -> bool {
    if token.contains('.') || token.contains('_') || token.contains('/') {
        return true;
    }
    let chars: Vec<char> = token.chars().collect();
    chars
        .windows(2)
        .any(|w| w[0].is_ascii_lowercase() && w[1].is_ascii_uppercase())
}

fn push_variants(out: &mut Vec<String>, token: &str) {
    let lower = token.to_lowercase();
    if !lower.is_empty() {
        push_unique(out, lower.clone());
    }

    let stripped: String = lower.chars().filter(|c| !matches!(c, '.' | '_' | '/' | '-')).collect();
    if !stripped.is_empty() && stripped != lower {
        push_unique(out, stripped);
    }

    if token.contains('_') {
        let camel = snake_to_camel(&lower);
        if camel != lower {
            push_unique(out, camel);
        }
    } else {
        let snake = camel_to_snake(token);
        if snake != lower && !snake.is_empty() {
            push_unique(out, snake);
        }
    }
}

fn push_unique(out: &mut Vec<String>, token: String) {
    if !token.is_empty() && !out.contains(&token) {
        out.push(token);
    }
}

/// `apiKey` → `api_key`, `parseHTTPResponse` → `parse_http_response`.
fn camel_to_snake(token: &str) -> String {
    let mut out = String::with_capacity(token.len() + 4);
    let chars: Vec<char> = token.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = i + 1 < chars.len() && chars[i + 1].is_ascii_lowercase();
            let prev_upper = i > 0 && chars[i - 1].is_ascii_uppercase();
            if prev_lower || (prev_upper && next_lower) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `api_key` → `apiKey`. Leading/trailing underscores are dropped.
fn snake_to_camel(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut first = true;
    for part in token.split('_').filter(|p| !p.is_empty()) {
        if first {
            out.push_str(part);
            first = false;
        } else {
            let mut chars = part.chars();
            if let Some(head) = chars.next() {
                out.extend(head.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_scenario() {
        let tokens = segment_query("api key");
        for expected in ["api", "key", "apikey", "api_key", "apiKey"] {
            assert!(tokens.contains(&expected.to_string()), "missing {expected} in {tokens:?}");
        }
    }

    #[test]
    fn code_token_variants() {
        let tokens = segment_query("getUserName");
        assert!(tokens.contains(&"getusername".to_string()));
        assert!(tokens.contains(&"get_user_name".to_string()));
    }

    #[test]
    fn snake_to_camel_variant() {
        let tokens = segment_query("user_service");
        assert!(tokens.contains(&"user_service".to_string()));
        assert!(tokens.contains(&"userservice".to_string()));
        assert!(tokens.contains(&"userService".to_string()));
    }

    #[test]
    fn operators_stripped() {
        let tokens = segment_query("foo AND bar OR (baz)");
        assert!(tokens.contains(&"foo".to_string()));
        assert!(tokens.contains(&"bar".to_string()));
        assert!(tokens.contains(&"baz".to_string()));
        assert!(!tokens.iter().any(|t| t == "and" && tokens.len() == 1));
        assert!(!tokens.iter().any(|t| t.contains('(')));
    }

    #[test]
    fn path_token() {
        let tokens = segment_query("src/auth.ts");
        assert!(tokens.contains(&"src/auth.ts".to_string()));
        assert!(tokens.contains(&"srcauthts".to_string()));
    }

    #[test]
    fn cjk_segmentation() {
        let tokens = segment_query("如何 读取 配置");
        // Each CJK run survives as its own token rather than being dropped.
        assert!(tokens.iter().any(|t| t.contains('读') || t.contains('配') || t.contains('如')));
    }

    #[test]
    fn dedup_preserves_first_seen() {
        let tokens = segment_query("api api api");
        assert_eq!(tokens.iter().filter(|t| t.as_str() == "api").count(), 1);
    }

    #[test]
    fn camel_to_snake_acronyms() {
        assert_eq!(camel_to_snake("parseHTTPResponse"), "parse_http_response");
        assert_eq!(camel_to_snake("apiKey"), "api_key");
        assert_eq!(camel_to_snake("simple"), "simple");
    }

    #[test]
    fn empty_query() {
        assert!(segment_query("").is_empty());
        assert!(segment_query("   ").is_empty());
    }
}
