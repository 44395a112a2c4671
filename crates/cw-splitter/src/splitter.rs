use std::collections::VecDeque;

use cw_core::{Language, ProcessedChunk};
use tree_sitter::Node;

use crate::adapter::{IndexDomain, SourceAdapter};
use crate::error::SplitterError;
use crate::profile::LanguageProfile;
use crate::registry::ParserRegistry;

/// Configuration for the semantic windowing algorithm. All sizes are
/// non-whitespace character counts except `max_raw_chars`, which bounds the
/// raw span of a chunk in native index units.
#[derive(Debug, Clone)]
pub struct SplitterConfig {
    pub max_chunk_size: u32,
    pub min_chunk_size: u32,
    pub chunk_overlap: u32,
    pub max_raw_chars: u32,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            min_chunk_size: 50,
            chunk_overlap: 100,
            max_raw_chars: 4000,
        }
    }
}

/// Context-boundary penalty applied to both budgets when two windows belong
/// to diverging scopes.
const BOUNDARY_PENALTY: f64 = 0.7;

/// Fraction of `max_raw_chars` the backward overlap extension may occupy.
const OVERLAP_RAW_CAP: f64 = 0.25;

/// A node span accumulated into a window. Offsets are native (AST) units.
#[derive(Debug, Clone, Copy)]
struct NodeSpan {
    start: usize,
    end: usize,
    is_comment: bool,
}

/// A run of consecutive sibling nodes destined to become one chunk.
#[derive(Debug)]
struct Window {
    nodes: VecDeque<NodeSpan>,
    path: Vec<String>,
}

impl Window {
    fn single(span: NodeSpan, path: Vec<String>) -> Self {
        let mut nodes = VecDeque::with_capacity(1);
        nodes.push_back(span);
        Self { nodes, path }
    }

    fn start(&self) -> usize {
        self.nodes.front().map(|n| n.start).unwrap_or(0)
    }

    fn end(&self) -> usize {
        self.nodes.back().map(|n| n.end).unwrap_or(0)
    }
}

/// Split-then-merge semantic windowing over a parsed AST.
///
/// Scoped per-call state: the adapter, profile, and config live only for the
/// duration of one file. The output chunks are immutable.
pub struct SemanticSplitter<'a> {
    adapter: &'a SourceAdapter<'a>,
    profile: &'static LanguageProfile,
    config: &'a SplitterConfig,
    language: Language,
    file_path: &'a str,
}

/// Chunk a source file via its AST. Falls back to plain-text line splitting
/// when the AST's index domain cannot be identified.
pub fn split_file(
    file_path: &str,
    source: &str,
    language: Language,
    ext: &str,
    config: &SplitterConfig,
) -> Result<Vec<ProcessedChunk>, SplitterError> {
    let tree = ParserRegistry::parse(language, ext, file_path, source)?;
    let root = tree.root_node();
    let adapter = SourceAdapter::new(source, root.end_byte());

    if adapter.domain() == IndexDomain::Unknown {
        tracing::debug!(path = %file_path, "index domain unknown, plain-text fallback");
        return Ok(split_plain_text(file_path, source, language, config));
    }

    let profile =
        LanguageProfile::for_language(language).ok_or_else(|| SplitterError::UnsupportedLanguage {
            language: language.tag().to_string(),
        })?;

    let splitter = SemanticSplitter {
        adapter: &adapter,
        profile,
        config,
        language,
        file_path,
    };
    Ok(splitter.split(root))
}

impl<'a> SemanticSplitter<'a> {
    fn split(&self, root: Node<'_>) -> Vec<ProcessedChunk> {
        let mut windows = Vec::new();
        let base = vec![self.file_path.to_string()];

        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            self.visit(child, &base, &mut windows);
        }

        let merged = self.merge(windows);
        self.emit(merged)
    }

    /// Recursive visit: a node within budget becomes a one-node window; an
    /// oversized node recurses into its children; an oversized leaf (huge
    /// string literal) becomes a single over-budget window.
    fn visit(&self, node: Node<'_>, path: &Vec<String>, windows: &mut Vec<Window>) {
        let start = node.start_byte();
        let end = node.end_byte();
        let size = self.adapter.nws(start, end);
        if size == 0 {
            return;
        }

        let owned;
        let path = if let Some(component) = self.context_component(node) {
            owned = {
                let mut p = path.clone();
                p.push(component);
                p
            };
            &owned
        } else {
            path
        };

        if size <= self.config.max_chunk_size {
            let span = NodeSpan {
                start,
                end,
                is_comment: self.profile.is_comment(node.kind()),
            };
            windows.push(Window::single(span, path.clone()));
        } else if node.child_count() > 0 {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                self.visit(child, path, windows);
            }
        } else {
            let span = NodeSpan {
                start,
                end,
                is_comment: false,
            };
            windows.push(Window::single(span, path.clone()));
        }
    }

    /// `"<type-prefix><name>"` for hierarchy nodes with a name-bearing child.
    fn context_component(&self, node: Node<'_>) -> Option<String> {
        let prefix = self.profile.hierarchy_prefix(node.kind())?;
        let source = self.adapter.source().as_bytes();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if self.profile.is_name_kind(child.kind()) {
                if let Ok(name) = child.utf8_text(source) {
                    return Some(format!("{prefix}{name}"));
                }
            }
        }
        None
    }

    /// Left-to-right sibling merge with forward comment absorption.
    fn merge(&self, windows: Vec<Window>) -> Vec<Window> {
        let mut out = Vec::new();
        let mut iter = windows.into_iter();
        let mut current = match iter.next() {
            Some(w) => w,
            None => return out,
        };

        for mut next in iter {
            // Trailing comments always travel forward so docstrings stay
            // attached to the code they describe.
            while current.nodes.back().map(|n| n.is_comment).unwrap_or(false) {
                let span = current.nodes.pop_back().unwrap();
                next.nodes.push_front(span);
            }
            if current.nodes.is_empty() {
                current = next;
                continue;
            }

            let cur_size = self.adapter.nws(current.start(), current.end());
            let next_size = self.adapter.nws(next.start(), next.end());
            let gap = self.adapter.nws(current.end(), next.start());
            let combined_nws = (cur_size + gap + next_size) as f64;
            let combined_raw = (next.end() - current.start()) as f64;

            let common = common_prefix_len(&current.path, &next.path);
            let same_context = common >= current.path.len().min(next.path.len());
            let penalty = if same_context { 1.0 } else { BOUNDARY_PENALTY };

            let max_nws = self.config.max_chunk_size as f64 * penalty;
            let fits_nws = combined_nws <= max_nws
                || (cur_size < self.config.min_chunk_size && combined_nws < 1.5 * max_nws);
            let fits_raw = combined_raw <= self.config.max_raw_chars as f64 * penalty;

            if fits_nws && fits_raw {
                current.path = merge_paths(current.path, next.path, common);
                current.nodes.extend(next.nodes);
            } else {
                out.push(current);
                current = next;
            }
        }

        out.push(current);
        out
    }

    /// Turn merged windows into chunks with gap-owning raw spans and a
    /// backward-extended embedding window.
    fn emit(&self, windows: Vec<Window>) -> Vec<ProcessedChunk> {
        let file_end = self.adapter.native_len();
        let n = windows.len();
        let mut chunks = Vec::with_capacity(n);
        let mut prev_sem_end = 0usize;

        for (i, w) in windows.iter().enumerate() {
            let start = w.start();
            let end = w.end();
            let raw_start = prev_sem_end;
            let raw_end = if i + 1 == n { file_end } else { end };
            let vec_start = if i == 0 { start } else { self.overlap_start(start) };

            let breadcrumb = w.path.join(" > ");
            let display_code = self.adapter.slice(start, end).to_string();
            let vector_text = format!(
                "// Context: {}\n{}",
                breadcrumb,
                self.adapter.slice(vec_start, end)
            );

            chunks.push(ProcessedChunk {
                display_code,
                vector_text,
                breadcrumb,
                language: self.language,
                chunk_index: i as u32,
                start_index: self.adapter.to_char(start),
                end_index: self.adapter.to_char(end),
                raw_start: self.adapter.to_byte(raw_start),
                raw_end: self.adapter.to_byte(raw_end),
                vec_start: self.adapter.to_byte(vec_start),
                vec_end: self.adapter.to_byte(end),
            });
            prev_sem_end = end;
        }

        chunks
    }

    /// Largest position before `start` whose NWS distance to `start` reaches
    /// the configured overlap, found by binary search over the prefix sums.
    /// The extension is discarded entirely when it would exceed a quarter of
    /// `max_raw_chars` in raw length.
    fn overlap_start(&self, start: usize) -> usize {
        let overlap = self.config.chunk_overlap;
        if overlap == 0 || start == 0 {
            return start;
        }

        let pos = if self.adapter.nws(0, start) < overlap {
            0
        } else {
            let (mut lo, mut hi) = (0usize, start);
            while lo < hi {
                let mid = (lo + hi + 1) / 2;
                if self.adapter.nws(mid, start) >= overlap {
                    lo = mid;
                } else {
                    hi = mid - 1;
                }
            }
            lo
        };

        let raw_extension = (start - pos) as f64;
        if raw_extension > OVERLAP_RAW_CAP * self.config.max_raw_chars as f64 {
            start
        } else {
            pos
        }
    }
}

fn common_prefix_len(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Keep the more specific path when one scope contains the other; collapse to
/// the shared ancestor when scopes diverge.
fn merge_paths(a: Vec<String>, b: Vec<String>, common: usize) -> Vec<String> {
    if common >= a.len().min(b.len()) {
        if b.len() > a.len() {
            b
        } else {
            a
        }
    } else {
        a[..common].to_vec()
    }
}

/// Plain-text fallback: accumulate whole lines under the NWS budget. No
/// overlap; the context header is just the file path.
pub fn split_plain_text(
    file_path: &str,
    source: &str,
    language: Language,
    config: &SplitterConfig,
) -> Vec<ProcessedChunk> {
    let adapter = SourceAdapter::for_bytes(source);
    if source.is_empty() || adapter.total_nws() == 0 {
        return Vec::new();
    }

    let mut windows: Vec<(usize, usize)> = Vec::new();
    let mut win_start = 0usize;
    let mut win_nws = 0u32;
    let mut pos = 0usize;

    for line in source.split_inclusive('\n') {
        let line_start = pos;
        let line_end = pos + line.len();
        let line_nws = adapter.nws(line_start, line_end);
        if win_nws > 0 && win_nws + line_nws > config.max_chunk_size {
            windows.push((win_start, line_start));
            win_start = line_start;
            win_nws = 0;
        }
        win_nws += line_nws;
        pos = line_end;
    }
    if pos > win_start {
        windows.push((win_start, pos));
    }

    let n = windows.len();
    let mut chunks = Vec::with_capacity(n);
    for (i, &(start, end)) in windows.iter().enumerate() {
        let raw_end = if i + 1 == n { source.len() } else { end };
        let display_code = adapter.slice(start, end).to_string();
        chunks.push(ProcessedChunk {
            vector_text: format!("// Context: {}\n{}", file_path, display_code),
            display_code,
            breadcrumb: file_path.to_string(),
            language,
            chunk_index: i as u32,
            start_index: adapter.to_char(start),
            end_index: adapter.to_char(end),
            raw_start: adapter.to_byte(start),
            raw_end: adapter.to_byte(raw_end),
            vec_start: adapter.to_byte(start),
            vec_end: adapter.to_byte(end),
        });
    }
    chunks
}
