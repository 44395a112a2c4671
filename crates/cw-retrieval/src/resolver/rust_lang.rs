use std::sync::OnceLock;

use regex::Regex;

use super::{dir_of, ImportResolver, PathSet};

fn import_patterns() -> &'static (Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            // mod x;
            Regex::new(r"(?m)^\s*(?:pub\s+)?mod\s+(\w+)\s*;").unwrap(),
            // use crate::a::b::…;  /  use super::x;  /  use self::y;
            Regex::new(r"(?m)^\s*(?:pub\s+)?use\s+((?:crate|super|self)::[\w:{}*, ]+)\s*;").unwrap(),
        )
    })
}

/// Rust import resolver: `mod` declarations resolve next to the current
/// file; `use` paths re-anchor at the crate's src root, the parent module
/// directory, or the current directory.
pub struct RustResolver;

impl ImportResolver for RustResolver {
    fn supports(&self, path: &str) -> bool {
        path.ends_with(".rs")
    }

    fn extract(&self, content: &str) -> Vec<String> {
        let (mod_re, use_re) = import_patterns();
        let mut out = Vec::new();
        for cap in mod_re.captures_iter(content) {
            let spec = format!("mod {}", &cap[1]);
            if !out.contains(&spec) {
                out.push(spec);
            }
        }
        for cap in use_re.captures_iter(content) {
            let spec = cap[1].trim().to_string();
            if !out.contains(&spec) {
                out.push(spec);
            }
        }
        out
    }

    fn resolve(&self, import: &str, current_file: &str, paths: &PathSet) -> Option<String> {
        let dir = dir_of(current_file);

        if let Some(name) = import.strip_prefix("mod ") {
            return try_module(dir, &[name], paths);
        }

        let (anchor, rest) = if let Some(rest) = import.strip_prefix("crate::") {
            (crate_src_root(current_file), rest)
        } else if let Some(rest) = import.strip_prefix("super::") {
            (dir_of(dir).to_string(), rest)
        } else if let Some(rest) = import.strip_prefix("self::") {
            (dir.to_string(), rest)
        } else {
            return None;
        };

        // Keep module-looking segments; the trailing item, glob, or brace
        // group is not part of the file path.
        let segments: Vec<&str> = rest
            .split("::")
            .take_while(|s| {
                !s.is_empty()
                    && !s.contains('{')
                    && !s.contains('*')
                    && s.chars().next().map(|c| c.is_ascii_lowercase() || c == '_').unwrap_or(false)
            })
            .collect();
        if segments.is_empty() {
            return None;
        }

        // Longest module path first, then back off one segment at a time.
        for end in (1..=segments.len()).rev() {
            if let Some(hit) = try_module(&anchor, &segments[..end], paths) {
                return Some(hit);
            }
        }
        None
    }
}

/// Try `<base>/<segs>.rs` then `<base>/<segs>/mod.rs`.
fn try_module(base: &str, segments: &[&str], paths: &PathSet) -> Option<String> {
    let joined = segments.join("/");
    let prefix = if base.is_empty() { String::new() } else { format!("{base}/") };
    let file = format!("{prefix}{joined}.rs");
    if paths.contains(&file) {
        return Some(file);
    }
    let module = format!("{prefix}{joined}/mod.rs");
    if paths.contains(&module) {
        return Some(module);
    }
    None
}

/// The crate source root for a file: the path up to and including its last
/// `src` directory component, or the file's own directory as a fallback.
fn crate_src_root(current_file: &str) -> String {
    let dir = dir_of(current_file);
    let parts: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for i in (0..parts.len()).rev() {
        if parts[i] == "src" {
            return parts[..=i].join("/");
        }
    }
    dir.to_string()
}
