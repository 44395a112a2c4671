use std::sync::OnceLock;

use regex::Regex;

use super::{dir_of, join_normalize, ImportResolver, PathSet};

const EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mts", "mjs", "cts", "cjs"];

/// Candidate source extensions tried when an import carries a compiled-JS
/// extension (TypeScript emits `./x.js` for `./x.ts`).
fn mapped_extensions(ext: &str) -> &'static [&'static str] {
    match ext {
        "js" => &["ts", "tsx", "js", "jsx"],
        "mjs" => &["mts", "mjs"],
        "cjs" => &["cts", "cjs"],
        "jsx" => &["tsx", "jsx"],
        _ => &[],
    }
}

fn import_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // import … from '…'; / export … from '…'
            Regex::new(r#"(?:import|export)\s[^'"]*?from\s*['"]([^'"]+)['"]"#).unwrap(),
            // dynamic import('…')
            Regex::new(r#"import\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap(),
            // require('…')
            Regex::new(r#"require\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap(),
        ]
    })
}

/// TypeScript / JavaScript import resolver. Only relative specifiers are
/// resolved; bare package imports are external by definition.
pub struct TypeScriptResolver;

impl ImportResolver for TypeScriptResolver {
    fn supports(&self, path: &str) -> bool {
        path.rsplit('.')
            .next()
            .map(|ext| EXTENSIONS.contains(&ext))
            .unwrap_or(false)
    }

    fn extract(&self, content: &str) -> Vec<String> {
        let mut out = Vec::new();
        for pattern in import_patterns() {
            for cap in pattern.captures_iter(content) {
                let spec = cap[1].to_string();
                if !out.contains(&spec) {
                    out.push(spec);
                }
            }
        }
        out
    }

    fn resolve(&self, import: &str, current_file: &str, paths: &PathSet) -> Option<String> {
        if !import.starts_with("./") && !import.starts_with("../") {
            return None;
        }
        let base = join_normalize(dir_of(current_file), import)?;

        // 1. The literal path, when it already names a known extension.
        if paths.contains(&base) {
            return Some(base);
        }

        // 2. Compiled-extension mapping (./x.js → ./x.ts …).
        if let Some(dot) = base.rfind('.') {
            let (stem, ext) = (&base[..dot], &base[dot + 1..]);
            for candidate_ext in mapped_extensions(ext) {
                let candidate = format!("{stem}.{candidate_ext}");
                if paths.contains(&candidate) {
                    return Some(candidate);
                }
            }
        }

        // 3. Extensionless specifier: append each candidate extension.
        for ext in EXTENSIONS {
            let candidate = format!("{base}.{ext}");
            if paths.contains(&candidate) {
                return Some(candidate);
            }
        }

        // 4. Directory import: …/index.<ext>.
        for ext in EXTENSIONS {
            let candidate = format!("{base}/index.{ext}");
            if paths.contains(&candidate) {
                return Some(candidate);
            }
        }

        None
    }
}
