use std::sync::OnceLock;

use regex::Regex;

use super::{dir_of, ImportResolver, PathSet};

fn import_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // from a.b import x  /  from ..a import x
            Regex::new(r"(?m)^\s*from\s+([.\w]+)\s+import\s").unwrap(),
            // import a.b, c.d
            Regex::new(r"(?m)^\s*import\s+([\w.]+(?:\s*,\s*[\w.]+)*)").unwrap(),
        ]
    })
}

/// Python import resolver: relative `from .x import …` forms walk the
/// directory tree; absolute forms suffix-match against the path set with
/// longest-common-prefix tie-breaking.
pub struct PythonResolver;

impl ImportResolver for PythonResolver {
    fn supports(&self, path: &str) -> bool {
        path.ends_with(".py")
    }

    fn extract(&self, content: &str) -> Vec<String> {
        let [from_re, import_re] = import_patterns();
        let mut out = Vec::new();
        for cap in from_re.captures_iter(content) {
            let spec = cap[1].to_string();
            if !out.contains(&spec) {
                out.push(spec);
            }
        }
        for cap in import_re.captures_iter(content) {
            for part in cap[1].split(',') {
                let spec = part.trim().to_string();
                if !spec.is_empty() && !out.contains(&spec) {
                    out.push(spec);
                }
            }
        }
        out
    }

    fn resolve(&self, import: &str, current_file: &str, paths: &PathSet) -> Option<String> {
        let dots = import.chars().take_while(|&c| c == '.').count();
        let rest = &import[dots..];
        let segments: Vec<&str> = rest.split('.').filter(|s| !s.is_empty()).collect();

        if dots > 0 {
            // Relative: one directory up per leading dot beyond the first.
            let mut base = dir_of(current_file).to_string();
            for _ in 1..dots {
                base = dir_of(&base).to_string();
            }
            if segments.is_empty() {
                return None;
            }
            let joined = segments.join("/");
            let prefix = if base.is_empty() { String::new() } else { format!("{base}/") };
            let module = format!("{prefix}{joined}.py");
            if paths.contains(&module) {
                return Some(module);
            }
            let package = format!("{prefix}{joined}/__init__.py");
            if paths.contains(&package) {
                return Some(package);
            }
            return None;
        }

        if segments.is_empty() {
            return None;
        }

        // Absolute: suffix-match `/a/b.py` or `/a/b/__init__.py` anywhere in
        // the project; prefer the candidate sharing the longest directory
        // prefix with the importer.
        let joined = segments.join("/");
        let module_suffix = format!("{joined}.py");
        let package_suffix = format!("{joined}/__init__.py");

        let mut best: Option<(usize, &str)> = None;
        for path in paths.iter() {
            let matches = path == module_suffix
                || path == package_suffix
                || path.ends_with(&format!("/{module_suffix}"))
                || path.ends_with(&format!("/{package_suffix}"));
            if !matches {
                continue;
            }
            let common = common_dir_prefix(path, current_file);
            match best {
                Some((len, _)) if len >= common => {}
                _ => best = Some((common, path)),
            }
        }
        best.map(|(_, p)| p.to_string())
    }
}

/// Number of shared leading directory components.
fn common_dir_prefix(a: &str, b: &str) -> usize {
    let a_dirs = dir_of(a).split('/');
    let b_dirs: Vec<&str> = dir_of(b).split('/').collect();
    a_dirs
        .zip(b_dirs.iter())
        .take_while(|(x, y)| x == *y)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(list: &[&str]) -> PathSet {
        PathSet::new(list.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn extracts_from_and_import_forms() {
        let content = "from app.models import User\nimport os\nimport app.utils, app.config\nfrom ..shared import helpers\n";
        let found = PythonResolver.extract(content);
        assert!(found.contains(&"app.models".to_string()));
        assert!(found.contains(&"os".to_string()));
        assert!(found.contains(&"app.utils".to_string()));
        assert!(found.contains(&"app.config".to_string()));
        assert!(found.contains(&"..shared".to_string()));
    }

    #[test]
    fn resolves_absolute_module() {
        let set = paths(&["app/models.py", "app/views.py"]);
        let hit = PythonResolver.resolve("app.models", "app/main.py", &set);
        assert_eq!(hit.as_deref(), Some("app/models.py"));
    }

    #[test]
    fn resolves_absolute_package() {
        let set = paths(&["app/utils/__init__.py"]);
        let hit = PythonResolver.resolve("app.utils", "app/main.py", &set);
        assert_eq!(hit.as_deref(), Some("app/utils/__init__.py"));
    }

    #[test]
    fn resolves_single_dot_relative() {
        let set = paths(&["app/helpers.py"]);
        let hit = PythonResolver.resolve(".helpers", "app/main.py", &set);
        assert_eq!(hit.as_deref(), Some("app/helpers.py"));
    }

    #[test]
    fn resolves_double_dot_relative() {
        // Two dots walk one directory up from app/sub.
        let set = paths(&["app/shared/helpers.py"]);
        let hit = PythonResolver.resolve("..shared.helpers", "app/sub/main.py", &set);
        assert_eq!(hit.as_deref(), Some("app/shared/helpers.py"));
    }

    #[test]
    fn ambiguity_broken_by_common_prefix() {
        let set = paths(&["service_a/app/models.py", "service_b/app/models.py"]);
        let hit = PythonResolver.resolve("app.models", "service_b/app/main.py", &set);
        assert_eq!(hit.as_deref(), Some("service_b/app/models.py"));
    }

    #[test]
    fn unresolvable_stdlib_returns_none() {
        let set = paths(&["app/main.py"]);
        assert!(PythonResolver.resolve("os", "app/main.py", &set).is_none());
    }
}
