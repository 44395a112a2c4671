use std::sync::OnceLock;

use regex::Regex;

use super::{ImportResolver, PathSet};

fn import_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^\s*import\s+(?:static\s+)?([\w.]+(?:\.\*)?)\s*;").unwrap()
    })
}

/// Java import resolver: dotted names are matched by path suffix; wildcard
/// imports match any `.java` file under the package directory.
pub struct JavaResolver;

impl ImportResolver for JavaResolver {
    fn supports(&self, path: &str) -> bool {
        path.ends_with(".java")
    }

    fn extract(&self, content: &str) -> Vec<String> {
        let mut out = Vec::new();
        for cap in import_pattern().captures_iter(content) {
            let spec = cap[1].to_string();
            if !out.contains(&spec) {
                out.push(spec);
            }
        }
        out
    }

    fn resolve(&self, import: &str, _current_file: &str, paths: &PathSet) -> Option<String> {
        if let Some(package) = import.strip_suffix(".*") {
            let dir = package.replace('.', "/");
            let needle = format!("/{dir}/");
            let prefix = format!("{dir}/");
            return paths
                .iter()
                .find(|p| {
                    p.ends_with(".java") && (p.contains(&needle) || p.starts_with(&prefix))
                })
                .map(str::to_string);
        }

        let suffix = format!("{}.java", import.replace('.', "/"));
        let needle = format!("/{suffix}");
        paths
            .iter()
            .find(|p| *p == suffix || p.ends_with(&needle))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(list: &[&str]) -> PathSet {
        PathSet::new(list.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn extracts_plain_static_and_wildcard() {
        let content = "package com.acme;\n\nimport com.acme.db.Store;\nimport static com.acme.util.Assert;\nimport com.acme.model.*;\n";
        let found = JavaResolver.extract(content);
        assert_eq!(
            found,
            vec![
                "com.acme.db.Store".to_string(),
                "com.acme.util.Assert".to_string(),
                "com.acme.model.*".to_string(),
            ]
        );
    }

    #[test]
    fn resolves_class_by_suffix() {
        let set = paths(&["src/main/java/com/acme/db/Store.java"]);
        let hit = JavaResolver.resolve("com.acme.db.Store", "src/main/java/com/acme/App.java", &set);
        assert_eq!(hit.as_deref(), Some("src/main/java/com/acme/db/Store.java"));
    }

    #[test]
    fn resolves_wildcard_to_any_file_in_package() {
        let set = paths(&[
            "src/main/java/com/acme/model/User.java",
            "src/main/java/com/acme/model/Order.java",
        ]);
        let hit = JavaResolver.resolve("com.acme.model.*", "src/main/java/com/acme/App.java", &set);
        assert!(hit.unwrap().contains("/com/acme/model/"));
    }

    #[test]
    fn unknown_class_unresolved() {
        let set = paths(&["src/main/java/com/acme/App.java"]);
        assert!(JavaResolver.resolve("java.util.List", "src/main/java/com/acme/App.java", &set).is_none());
    }
}
