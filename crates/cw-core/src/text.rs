/// Truncate a string to at most `max_bytes` bytes on a valid UTF-8 boundary.
pub fn truncate_utf8_bytes(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Truncate to `max_chars` characters by cutting the middle out, keeping the
/// head and tail. Breadcrumbs carry their signal at both ends (file path and
/// leaf symbol), so middle elision loses the least.
pub fn truncate_middle(s: &str, max_chars: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 1 {
        return "…".to_string();
    }
    let keep = max_chars - 1;
    let head = keep / 2 + keep % 2;
    let tail = keep / 2;
    let mut out = String::with_capacity(max_chars * 4);
    out.extend(&chars[..head]);
    out.push('…');
    out.extend(&chars[chars.len() - tail..]);
    out
}

/// Extract a window of at most `max_chars` characters around the first
/// occurrence of any query token, case-insensitively. Falls back to the
/// prefix when no token matches.
pub fn extract_around_hit(text: &str, tokens: &[String], max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }

    let lower: String = text.to_lowercase();
    let lower_chars: Vec<char> = lower.chars().collect();

    let mut hit: Option<usize> = None;
    for token in tokens {
        let needle: Vec<char> = token.to_lowercase().chars().collect();
        if needle.is_empty() || needle.len() > lower_chars.len() {
            continue;
        }
        let pos = lower_chars
            .windows(needle.len())
            .position(|w| w == needle.as_slice());
        if let Some(p) = pos {
            hit = Some(match hit {
                Some(existing) => existing.min(p),
                None => p,
            });
        }
    }

    let center = hit.unwrap_or(0);
    let half = max_chars / 2;
    let start = center.saturating_sub(half);
    let end = (start + max_chars).min(chars.len());
    let start = end.saturating_sub(max_chars);

    chars[start..end].iter().collect()
}
