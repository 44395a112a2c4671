use std::sync::OnceLock;

use regex::Regex;

use super::{ImportResolver, PathSet};

fn import_patterns() -> &'static (Regex, Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            // import "pkg/path"
            Regex::new(r#"(?m)^\s*import\s+(?:\w+\s+)?"([^"]+)""#).unwrap(),
            // import ( … ) block
            Regex::new(r"(?s)import\s*\(([^)]*)\)").unwrap(),
            // one spec line inside a block, with optional alias
            Regex::new(r#"(?m)^\s*(?:[\w.]+\s+)?"([^"]+)""#).unwrap(),
        )
    })
}

/// Go import resolver: package paths are matched by their last segment
/// against directories containing `.go` files.
pub struct GoResolver;

impl ImportResolver for GoResolver {
    fn supports(&self, path: &str) -> bool {
        path.ends_with(".go")
    }

    fn extract(&self, content: &str) -> Vec<String> {
        let (single_re, block_re, spec_re) = import_patterns();
        let mut out = Vec::new();
        for cap in single_re.captures_iter(content) {
            let spec = cap[1].to_string();
            if !out.contains(&spec) {
                out.push(spec);
            }
        }
        for block in block_re.captures_iter(content) {
            for cap in spec_re.captures_iter(&block[1]) {
                let spec = cap[1].to_string();
                if !out.contains(&spec) {
                    out.push(spec);
                }
            }
        }
        out
    }

    fn resolve(&self, import: &str, _current_file: &str, paths: &PathSet) -> Option<String> {
        // Standard-library-looking imports carry no dot and no slash.
        if !import.contains('.') && !import.contains('/') {
            return None;
        }
        let pkg = import.rsplit('/').next()?;
        if pkg.is_empty() {
            return None;
        }

        let needle = format!("/{pkg}/");
        let mut fallback: Option<String> = None;
        for path in paths.iter() {
            if !path.ends_with(".go") {
                continue;
            }
            let in_pkg_dir = path.contains(&needle) || path.starts_with(&format!("{pkg}/"));
            if !in_pkg_dir {
                continue;
            }
            if path.ends_with("_test.go") {
                if fallback.is_none() {
                    fallback = Some(path.to_string());
                }
            } else {
                return Some(path.to_string());
            }
        }
        fallback
    }
}
