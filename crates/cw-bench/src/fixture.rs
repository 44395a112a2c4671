use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use cw_remote::{Embedder, RemoteError, RerankResult, Reranker};

/// Install a fmt subscriber for test runs. Safe to call repeatedly; only the
/// first caller wins.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Create a fixture project spanning the five AST languages plus plain-text
/// files, with known identifiers and cross-file imports.
pub fn create_fixture_project(root: &Path) {
    let src = root.join("src");
    let util = src.join("util");
    let py = root.join("py");
    let core = root.join("core").join("src");
    let pkg = root.join("pkg").join("server");
    let java = root.join("java").join("com").join("acme");

    for dir in [&src, &util, &py, &core, &pkg, &java] {
        fs::create_dir_all(dir).unwrap();
    }

    // --- TypeScript ---
    fs::write(
        src.join("config.ts"),
        r#"export const apiKey: string = process.env.API_KEY ?? "";

export interface AppConfig {
    host: string;
    port: number;
}

export function loadConfig(): AppConfig {
    return { host: "localhost", port: 8080 };
}
"#,
    )
    .unwrap();

    fs::write(
        src.join("app.ts"),
        r#"import { apiKey, loadConfig } from "./config";
import { formatGreeting } from "./util";

export function main(): void {
    const config = loadConfig();
    console.log(formatGreeting(config.host), apiKey.length);
}
"#,
    )
    .unwrap();

    fs::write(
        util.join("index.ts"),
        "export { formatGreeting } from \"./helpers\";\n",
    )
    .unwrap();

    fs::write(
        util.join("helpers.ts"),
        r#"export function formatGreeting(host: string): string {
    return `running on ${host}`;
}
"#,
    )
    .unwrap();

    // File with a CJK comment, exercising the segmenter and tokenizer.
    fs::write(
        src.join("locale.ts"),
        "// 配置读取辅助模块\nexport function localeName(): string {\n    return \"zh-CN\";\n}\n",
    )
    .unwrap();

    // --- Python ---
    fs::write(
        py.join("models.py"),
        r#"class User:
    """A user in the system."""

    def __init__(self, name, email):
        self.name = name
        self.email = email

    def display_name(self):
        return f"{self.name} <{self.email}>"
"#,
    )
    .unwrap();

    fs::write(
        py.join("service.py"),
        r#"from models import User


def create_user(name, email):
    return User(name, email)
"#,
    )
    .unwrap();

    // --- Rust ---
    fs::write(
        core.join("lib.rs"),
        "mod engine;\n\npub use engine::start_engine;\n",
    )
    .unwrap();

    fs::write(
        core.join("engine.rs"),
        r#"pub fn start_engine(threads: usize) -> Result<(), String> {
    if threads == 0 {
        return Err("need at least one thread".to_string());
    }
    Ok(())
}
"#,
    )
    .unwrap();

    // --- Go ---
    fs::write(
        pkg.join("server.go"),
        r#"package server

import "fmt"

func Listen(port int) error {
    fmt.Println("listening", port)
    return nil
}
"#,
    )
    .unwrap();

    // --- Java ---
    fs::write(
        java.join("App.java"),
        r#"package com.acme;

public class App {
    public static void main(String[] args) {
        System.out.println("started");
    }
}
"#,
    )
    .unwrap();

    // --- Plain text and skip cases ---
    fs::write(
        root.join("README.md"),
        "# Fixture project\n\nA tiny corpus used by the end-to-end suites.\n",
    )
    .unwrap();

    fs::write(
        root.join("package-lock.json"),
        "{\"lockfileVersion\": 3, \"packages\": {}}\n",
    )
    .unwrap();

    fs::write(root.join("blob.sql"), b"SELECT 1;\x00\x00binary garbage").unwrap();

    let big = "-- filler line for the oversized fixture\n".repeat(4000);
    fs::write(root.join("big.sql"), big).unwrap();
}

/// Crawled fixture files that classify as `unchanged` on a second scan:
/// everything except the oversized file, which is re-skipped from its stat
/// alone on every scan. (Binary and lock-file rows turn unchanged after the
/// first scan because their stat snapshot is recorded.)
pub const FIXTURE_UNCHANGED_ON_RESCAN: usize = 14;

/// Deterministic, network-free embedder: a byte histogram folded into the
/// configured dimension, L2-normalized. Counts calls so tests can assert
/// "zero network traffic".
pub struct MockEmbedder {
    dimensions: usize,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for MockEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| embed_text(t, self.dimensions)).collect())
    }
}

fn embed_text(text: &str, dimensions: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dimensions];
    for (i, b) in text.bytes().enumerate() {
        v[i % dimensions] += f32::from(b) / 255.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// Word-overlap reranker: relevance is the fraction of query words found in
/// the document, case-insensitively.
pub struct MockReranker {
    calls: AtomicUsize,
}

impl MockReranker {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockReranker {
    fn default() -> Self {
        Self::new()
    }
}

impl Reranker for MockReranker {
    fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankResult>, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let words: Vec<String> = query
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();

        let mut results: Vec<RerankResult> = documents
            .iter()
            .enumerate()
            .map(|(index, doc)| {
                let haystack = doc.to_lowercase();
                let hits = words.iter().filter(|w| haystack.contains(w.as_str())).count();
                let relevance_score = if words.is_empty() {
                    0.0
                } else {
                    hits as f64 / words.len() as f64
                };
                RerankResult {
                    index,
                    relevance_score,
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.index.cmp(&b.index))
        });
        results.truncate(top_n);
        Ok(results)
    }
}
