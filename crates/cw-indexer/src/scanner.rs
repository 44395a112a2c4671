use std::collections::HashSet;
use std::path::Path;

use cw_core::Language;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::WalkBuilder;

/// Environment variable holding newline-separated extra ignore patterns.
const IGNORE_PATTERNS_VAR: &str = "IGNORE_PATTERNS";

/// Custom per-project ignore file, applied after `.gitignore`.
const CUSTOM_IGNORE_FILE: &str = ".contextweaverignore";

/// Crawl a project for indexable source files.
///
/// Filters apply in order: `$IGNORE_PATTERNS`, `.gitignore`,
/// `.contextweaverignore`, then the extension whitelist. Returned paths are
/// project-relative and forward-slash normalized; when two files collide on
/// the normalized path the first seen wins.
pub fn crawl_files(project_root: &Path) -> Vec<(String, Language)> {
    let env_matcher = env_pattern_matcher(project_root);

    let mut builder = WalkBuilder::new(project_root);
    builder
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .follow_links(false)
        .add_custom_ignore_filename(CUSTOM_IGNORE_FILE);

    if let Some(matcher) = env_matcher.clone() {
        let root = project_root.to_path_buf();
        builder.filter_entry(move |entry| {
            let is_dir = entry.file_type().map_or(false, |ft| ft.is_dir());
            let rel = match entry.path().strip_prefix(&root) {
                Ok(r) => r,
                Err(_) => return true,
            };
            if rel.as_os_str().is_empty() {
                return true;
            }
            !matcher.matched_path_or_any_parents(rel, is_dir).is_ignore()
        });
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut files: Vec<(String, Language)> = Vec::new();

    for entry in builder.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        if !entry.file_type().map_or(false, |ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let language = match Language::from_extension(&ext) {
            Some(l) => l,
            None => continue,
        };

        let rel = match path.strip_prefix(project_root) {
            Ok(r) => r,
            Err(_) => continue,
        };
        let normalized = rel.to_string_lossy().replace('\\', "/");
        if seen.insert(normalized.clone()) {
            files.push((normalized, language));
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    files
}

/// Compile `$IGNORE_PATTERNS` (newline-separated gitignore syntax) into a
/// matcher anchored at the project root.
fn env_pattern_matcher(project_root: &Path) -> Option<Gitignore> {
    let raw = std::env::var(IGNORE_PATTERNS_VAR).ok()?;
    let mut builder = GitignoreBuilder::new(project_root);
    let mut any = false;
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if builder.add_line(None, line).is_ok() {
            any = true;
        }
    }
    if !any {
        return None;
    }
    builder.build().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn crawl_empty_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(crawl_files(tmp.path()).is_empty());
    }

    #[test]
    fn crawl_finds_whitelisted_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("main.py"), "print('hello')").unwrap();
        fs::write(src.join("lib.rs"), "fn main() {}").unwrap();
        fs::write(src.join("blob.bin"), [1u8, 2, 3]).unwrap();

        let files = crawl_files(tmp.path());
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|(p, l)| p == "src/main.py" && *l == Language::Python));
        assert!(files.iter().any(|(p, l)| p == "src/lib.rs" && *l == Language::Rust));
    }

    #[test]
    fn crawl_respects_gitignore() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::process::Command::new("git")
            .args(["init"])
            .current_dir(tmp.path())
            .output()
            .ok();
        fs::write(tmp.path().join(".gitignore"), "build/\n").unwrap();
        fs::write(tmp.path().join("app.py"), "x = 1").unwrap();
        let build = tmp.path().join("build");
        fs::create_dir_all(&build).unwrap();
        fs::write(build.join("output.js"), "var x").unwrap();

        let files = crawl_files(tmp.path());
        assert!(files.iter().any(|(p, _)| p == "app.py"));
        assert!(!files.iter().any(|(p, _)| p.contains("output.js")));
    }

    #[test]
    fn crawl_respects_custom_ignore_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join(CUSTOM_IGNORE_FILE), "generated/\n").unwrap();
        fs::write(tmp.path().join("app.py"), "x = 1").unwrap();
        let gen = tmp.path().join("generated");
        fs::create_dir_all(&gen).unwrap();
        fs::write(gen.join("schema.py"), "x = 2").unwrap();

        let files = crawl_files(tmp.path());
        assert!(files.iter().any(|(p, _)| p == "app.py"));
        assert!(!files.iter().any(|(p, _)| p.contains("schema.py")));
    }

    #[test]
    fn crawl_skips_hidden_dirs() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("app.py"), "x = 1").unwrap();
        let hidden = tmp.path().join(".secret");
        fs::create_dir_all(&hidden).unwrap();
        fs::write(hidden.join("key.py"), "KEY = 42").unwrap();

        let files = crawl_files(tmp.path());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "app.py");
    }

    #[test]
    fn crawl_output_is_sorted() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("zz.py"), "x = 1").unwrap();
        fs::write(tmp.path().join("aa.py"), "x = 2").unwrap();
        fs::write(tmp.path().join("mm.py"), "x = 3").unwrap();

        let files = crawl_files(tmp.path());
        let paths: Vec<&str> = files.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["aa.py", "mm.py", "zz.py"]);
    }
}
