use std::collections::HashMap;

use cw_core::{extract_around_hit, segment_query, truncate_middle};
use cw_remote::{Embedder, Reranker};
use cw_storage::vector::StoredChunk;
use cw_storage::{RowStore, VectorStore};

use crate::error::RetrievalError;
use crate::expand::{ExpandConfig, GraphExpander};
use crate::packer::{pack_context, PackConfig, PackedFile};
use crate::score::TokenMatcher;

/// Which signal produced (or dominated) a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSource {
    Vector,
    Lexical,
    Neighbor,
    Breadcrumb,
    Import,
}

/// A chunk with a retrieval score attached.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: StoredChunk,
    pub score: f64,
    pub source: SeedSource,
}

impl ScoredChunk {
    pub fn file_path(&self) -> &str {
        &self.chunk.file_path
    }

    pub fn key(&self) -> (&str, u32) {
        (&self.chunk.file_path, self.chunk.chunk.chunk_index)
    }
}

/// Retrieval constants. Defaults follow the tuned production values.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub vector_top_k: usize,
    pub vector_top_m: usize,
    pub lex_total_chunks: usize,
    pub fts_top_k_files: usize,
    pub lex_chunks_per_file: usize,
    pub rrf_k0: f64,
    pub w_vec: f64,
    pub w_lex: f64,
    pub fused_top_m: usize,
    pub rerank_top_n: usize,
    pub smart_min_score: f64,
    pub smart_top_score_ratio: f64,
    pub smart_top_score_delta_abs: f64,
    pub smart_min_k: usize,
    pub smart_max_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            vector_top_k: 80,
            vector_top_m: 60,
            lex_total_chunks: 40,
            fts_top_k_files: 20,
            lex_chunks_per_file: 2,
            rrf_k0: 20.0,
            w_vec: 0.6,
            w_lex: 0.4,
            fused_top_m: 60,
            rerank_top_n: 10,
            smart_min_score: 0.25,
            smart_top_score_ratio: 0.5,
            smart_top_score_delta_abs: 0.25,
            smart_min_k: 2,
            smart_max_k: 8,
        }
    }
}

/// Diagnostics carried on every context pack.
#[derive(Debug, Clone)]
pub struct SearchDebug {
    pub tokens: Vec<String>,
    pub w_vec: f64,
    pub w_lex: f64,
    pub vector_candidates: usize,
    pub lexical_candidates: usize,
    pub fused_candidates: usize,
    pub seed_count: usize,
    pub expanded_count: usize,
}

/// The final answer for one query.
#[derive(Debug, Clone)]
pub struct ContextPack {
    pub query: String,
    pub seeds: Vec<ScoredChunk>,
    pub expanded: Vec<ScoredChunk>,
    pub files: Vec<PackedFile>,
    pub debug: SearchDebug,
}

/// Hybrid retrieval: vector + lexical recall, RRF fusion, rerank, smart
/// top-K cutoff, graph expansion, and packing.
pub struct SearchService<'a> {
    row: &'a RowStore,
    vector: &'a VectorStore,
    embedder: &'a dyn Embedder,
    reranker: &'a dyn Reranker,
    expander: GraphExpander,
    config: SearchConfig,
    pack_config: PackConfig,
}

impl<'a> SearchService<'a> {
    pub fn new(
        row: &'a RowStore,
        vector: &'a VectorStore,
        embedder: &'a dyn Embedder,
        reranker: &'a dyn Reranker,
    ) -> Result<Self, RetrievalError> {
        let expander = GraphExpander::new(row.list_paths()?, ExpandConfig::default());
        Ok(Self {
            row,
            vector,
            embedder,
            reranker,
            expander,
            config: SearchConfig::default(),
            pack_config: PackConfig::default(),
        })
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the full retrieval pipeline for one query.
    #[tracing::instrument(skip(self), fields(seed_count, file_count))]
    pub fn build_context_pack(&self, query: &str) -> Result<ContextPack, RetrievalError> {
        let tokens = segment_query(query);
        let matcher = TokenMatcher::new(&tokens);

        // The two recall branches run concurrently: the embedding call on a
        // scoped thread, lexical recall here. The k-NN lookup itself is
        // local and cheap, so it runs after the join.
        let query_owned = query.to_string();
        let embedder = self.embedder;
        let (embed_result, lexical_result) = std::thread::scope(|scope| {
            let handle = scope.spawn(move || embedder.embed(std::slice::from_ref(&query_owned)));
            let lexical = self.lexical_recall(&tokens, &matcher);
            let embed = handle.join().map_err(|_| RetrievalError::QueryFailed {
                reason: "embedding thread panicked".to_string(),
            });
            (embed, lexical)
        });
        let lexical = lexical_result?;
        let query_vector = embed_result?
            .map_err(RetrievalError::from)?
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::QueryFailed {
                reason: "embedder returned no vector for the query".to_string(),
            })?;

        let vector_hits = self
            .vector
            .search(&query_vector, self.config.vector_top_k, None)?;
        let vector_ranked: Vec<(StoredChunk, f64)> = vector_hits
            .into_iter()
            .take(self.config.vector_top_m)
            .map(|h| {
                let similarity = 1.0 / (1.0 + f64::from(h.distance));
                (h.record, similarity)
            })
            .collect();

        tracing::debug!(
            vector = vector_ranked.len(),
            lexical = lexical.len(),
            "recall branches joined"
        );

        let fused = fuse_rrf(&vector_ranked, &lexical, &self.config);
        let fused_count = fused.len();

        let mut debug = SearchDebug {
            tokens: tokens.clone(),
            w_vec: self.config.w_vec,
            w_lex: self.config.w_lex,
            vector_candidates: vector_ranked.len(),
            lexical_candidates: lexical.len(),
            fused_candidates: fused_count,
            seed_count: 0,
            expanded_count: 0,
        };

        if fused.is_empty() {
            return Ok(ContextPack {
                query: query.to_string(),
                seeds: Vec::new(),
                expanded: Vec::new(),
                files: Vec::new(),
                debug,
            });
        }

        let reranked = self.rerank(query, &tokens, fused)?;
        let seeds = smart_cutoff(&reranked, &self.config);
        debug.seed_count = seeds.len();

        let expanded = self
            .expander
            .expand(&seeds, self.row, self.vector, &matcher)?;
        debug.expanded_count = expanded.len();

        let mut all: Vec<ScoredChunk> = seeds.clone();
        all.extend(expanded.iter().cloned());
        let files = pack_context(&all, self.row, &self.pack_config)?;

        let span = tracing::Span::current();
        span.record("seed_count", seeds.len());
        span.record("file_count", files.len());
        tracing::info!(
            seeds = seeds.len(),
            expanded = expanded.len(),
            files = files.len(),
            "context pack built"
        );

        Ok(ContextPack {
            query: query.to_string(),
            seeds,
            expanded,
            files,
            debug,
        })
    }

    /// Lexical recall: direct chunk BM25, falling back to file BM25 plus
    /// per-file token-overlap chunk selection.
    fn lexical_recall(
        &self,
        tokens: &[String],
        matcher: &TokenMatcher,
    ) -> Result<Vec<(StoredChunk, f64)>, RetrievalError> {
        let chunk_hits = self
            .row
            .search_chunks_bm25(tokens, self.config.lex_total_chunks)?;

        if !chunk_hits.is_empty() {
            let mut paths: Vec<String> = chunk_hits.iter().map(|h| h.file_path.clone()).collect();
            paths.sort();
            paths.dedup();
            let grouped = self.vector.get_files_chunks(&paths)?;

            let mut out = Vec::with_capacity(chunk_hits.len());
            for hit in &chunk_hits {
                let Some(chunks) = grouped.get(&hit.file_path) else { continue };
                if let Some(stored) = chunks.iter().find(|c| c.chunk.chunk_index == hit.chunk_index)
                {
                    out.push((stored.clone(), hit.score));
                }
            }
            return Ok(out);
        }

        // Fallback: file-level BM25, then pick chunks by token overlap.
        let file_hits = self
            .row
            .search_files_bm25(tokens, self.config.fts_top_k_files)?;
        if file_hits.is_empty() {
            return Ok(Vec::new());
        }

        let paths: Vec<String> = file_hits.iter().map(|h| h.path.clone()).collect();
        let grouped = self.vector.get_files_chunks(&paths)?;

        let mut out: Vec<(StoredChunk, f64)> = Vec::new();
        for hit in &file_hits {
            if out.len() >= self.config.lex_total_chunks {
                break;
            }
            let Some(chunks) = grouped.get(&hit.path) else { continue };

            let mut scored: Vec<(&StoredChunk, f64)> = chunks
                .iter()
                .map(|c| {
                    let text = format!("{} {}", c.chunk.breadcrumb, c.chunk.display_code);
                    (c, matcher.overlap(&text))
                })
                .collect();
            let best = scored.iter().map(|(_, s)| *s).fold(0.0, f64::max);
            if best <= 0.0 {
                continue;
            }
            scored.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.chunk.chunk_index.cmp(&b.0.chunk.chunk_index))
            });
            for (chunk, overlap) in scored.into_iter().take(self.config.lex_chunks_per_file) {
                if out.len() >= self.config.lex_total_chunks {
                    break;
                }
                out.push((chunk.clone(), overlap));
            }
        }
        Ok(out)
    }

    /// Score fused candidates with the external reranker. Out-of-range
    /// indices from the service are dropped.
    fn rerank(
        &self,
        query: &str,
        tokens: &[String],
        fused: Vec<ScoredChunk>,
    ) -> Result<Vec<ScoredChunk>, RetrievalError> {
        let documents: Vec<String> = fused.iter().map(|c| rerank_payload(c, tokens)).collect();
        let results = self
            .reranker
            .rerank(query, &documents, self.config.rerank_top_n)?;

        let mut out: Vec<ScoredChunk> = Vec::with_capacity(results.len());
        for result in results {
            let Some(candidate) = fused.get(result.index) else {
                tracing::warn!(index = result.index, "reranker returned out-of-range index");
                continue;
            };
            out.push(ScoredChunk {
                chunk: candidate.chunk.clone(),
                score: result.relevance_score,
                source: candidate.source,
            });
        }
        sort_by_score(&mut out);
        Ok(out)
    }
}

/// Rerank payload: elided breadcrumb header plus a window of the display
/// code around the first query-token hit, within a 1000-char budget.
fn rerank_payload(candidate: &ScoredChunk, tokens: &[String]) -> String {
    let breadcrumb = truncate_middle(&candidate.chunk.chunk.breadcrumb, 250);
    let budget = 1000usize.saturating_sub(breadcrumb.chars().count() + 1);
    let body = extract_around_hit(&candidate.chunk.chunk.display_code, tokens, budget);
    format!("{breadcrumb}\n{body}")
}

/// Reciprocal Rank Fusion over the two ranked recall lists.
/// `score = weight / (k0 + rank)`, summed per `(file_path, chunk_index)`;
/// the dominant branch is retained as the source label.
pub(crate) fn fuse_rrf(
    vector_ranked: &[(StoredChunk, f64)],
    lexical_ranked: &[(StoredChunk, f64)],
    config: &SearchConfig,
) -> Vec<ScoredChunk> {
    struct Entry {
        chunk: StoredChunk,
        score: f64,
        vector_part: f64,
        lexical_part: f64,
    }

    let mut entries: HashMap<(String, u32), Entry> = HashMap::new();

    for (rank, (chunk, _)) in vector_ranked.iter().enumerate() {
        let contribution = config.w_vec / (config.rrf_k0 + rank as f64);
        let key = (chunk.file_path.clone(), chunk.chunk.chunk_index);
        let entry = entries.entry(key).or_insert_with(|| Entry {
            chunk: chunk.clone(),
            score: 0.0,
            vector_part: 0.0,
            lexical_part: 0.0,
        });
        entry.score += contribution;
        entry.vector_part += contribution;
    }

    for (rank, (chunk, _)) in lexical_ranked.iter().enumerate() {
        let contribution = config.w_lex / (config.rrf_k0 + rank as f64);
        let key = (chunk.file_path.clone(), chunk.chunk.chunk_index);
        let entry = entries.entry(key).or_insert_with(|| Entry {
            chunk: chunk.clone(),
            score: 0.0,
            vector_part: 0.0,
            lexical_part: 0.0,
        });
        entry.score += contribution;
        entry.lexical_part += contribution;
    }

    let mut fused: Vec<ScoredChunk> = entries
        .into_values()
        .map(|e| ScoredChunk {
            source: if e.vector_part >= e.lexical_part {
                SeedSource::Vector
            } else {
                SeedSource::Lexical
            },
            chunk: e.chunk,
            score: e.score,
        })
        .collect();
    sort_by_score(&mut fused);
    fused.truncate(config.fused_top_m);
    fused
}

/// Dynamic top-K selection anchored on ratio, delta, and floor thresholds.
pub(crate) fn smart_cutoff(candidates: &[ScoredChunk], config: &SearchConfig) -> Vec<ScoredChunk> {
    let Some(top) = candidates.first() else {
        return Vec::new();
    };
    let floor = config.smart_min_score;
    if top.score < floor {
        return vec![top.clone()];
    }

    let ratio_threshold = top.score * config.smart_top_score_ratio;
    let delta_threshold = top.score - config.smart_top_score_delta_abs;
    let dynamic = floor.max(ratio_threshold.min(delta_threshold));

    let mut selected: Vec<ScoredChunk> = Vec::new();
    let mut seen: std::collections::HashSet<(String, u32)> = std::collections::HashSet::new();

    for (i, candidate) in candidates.iter().enumerate() {
        let threshold = if i < config.smart_min_k { floor } else { dynamic };
        if candidate.score < threshold {
            break;
        }
        let key = (candidate.chunk.file_path.clone(), candidate.chunk.chunk.chunk_index);
        if seen.insert(key) {
            selected.push(candidate.clone());
        }
        if selected.len() >= config.smart_max_k {
            return selected;
        }
    }

    // Top up to the minimum from the remaining floor-clearing candidates.
    let target = config.smart_min_k.min(config.smart_max_k);
    if selected.len() < target {
        for candidate in candidates {
            let key = (candidate.chunk.file_path.clone(), candidate.chunk.chunk.chunk_index);
            if seen.contains(&key) || candidate.score < floor {
                continue;
            }
            seen.insert(key);
            selected.push(candidate.clone());
            if selected.len() >= target {
                break;
            }
        }
    }
    selected
}

/// Stable descending score order; equal scores break on
/// `(file_path, chunk_index)`.
fn sort_by_score(chunks: &mut [ScoredChunk]) {
    chunks.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk.file_path.cmp(&b.chunk.file_path))
            .then_with(|| a.chunk.chunk.chunk_index.cmp(&b.chunk.chunk.chunk_index))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use cw_core::{ChunkId, Language, ProcessedChunk};

    fn stored(path: &str, index: u32) -> StoredChunk {
        StoredChunk {
            chunk_id: ChunkId::generate(path, "h1", index),
            file_path: path.to_string(),
            file_hash: "h1".to_string(),
            chunk: ProcessedChunk {
                display_code: format!("fn part{index}() {{}}"),
                vector_text: String::new(),
                breadcrumb: format!("{path} > fn part{index}"),
                language: Language::Rust,
                chunk_index: index,
                start_index: 0,
                end_index: 10,
                raw_start: 0,
                raw_end: 10,
                vec_start: 0,
                vec_end: 10,
            },
        }
    }

    fn scored(path: &str, index: u32, score: f64) -> ScoredChunk {
        ScoredChunk {
            chunk: stored(path, index),
            score,
            source: SeedSource::Vector,
        }
    }

    // --- RRF fusion ---

    #[test]
    fn fusion_sums_across_branches() {
        let config = SearchConfig::default();
        let both = stored("a.rs", 0);
        let vec_only = stored("b.rs", 0);
        let lex_only = stored("c.rs", 0);

        let fused = fuse_rrf(
            &[(both.clone(), 0.9), (vec_only, 0.5)],
            &[(both, 3.0), (lex_only, 2.0)],
            &config,
        );

        assert_eq!(fused.len(), 3);
        // a.rs got contributions from both branches at rank 0.
        assert_eq!(fused[0].chunk.file_path, "a.rs");
        let expected = 0.6 / 20.0 + 0.4 / 20.0;
        assert!((fused[0].score - expected).abs() < 1e-12);
    }

    #[test]
    fn fusion_weights_favor_vector() {
        let config = SearchConfig::default();
        let fused = fuse_rrf(
            &[(stored("vec.rs", 0), 0.9)],
            &[(stored("lex.rs", 0), 5.0)],
            &config,
        );
        // Same rank, different weights: 0.6/20 > 0.4/20.
        assert_eq!(fused[0].chunk.file_path, "vec.rs");
        assert_eq!(fused[0].source, SeedSource::Vector);
        assert_eq!(fused[1].source, SeedSource::Lexical);
    }

    #[test]
    fn fusion_tie_breaks_are_deterministic() {
        let config = SearchConfig::default();
        // Two disjoint candidates at the same rank in different branches
        // with equal weights would tie; here equal scores arise from
        // identical single-branch ranks within one branch ordering.
        let fused_a = fuse_rrf(
            &[(stored("x.rs", 0), 0.9), (stored("y.rs", 0), 0.9)],
            &[],
            &config,
        );
        let fused_b = fuse_rrf(
            &[(stored("x.rs", 0), 0.9), (stored("y.rs", 0), 0.9)],
            &[],
            &config,
        );
        let keys_a: Vec<_> = fused_a.iter().map(|c| c.chunk.file_path.clone()).collect();
        let keys_b: Vec<_> = fused_b.iter().map(|c| c.chunk.file_path.clone()).collect();
        assert_eq!(keys_a, keys_b);
    }

    #[test]
    fn fusion_truncates_to_top_m() {
        let mut config = SearchConfig::default();
        config.fused_top_m = 3;
        let vector: Vec<(StoredChunk, f64)> =
            (0..10).map(|i| (stored("a.rs", i), 0.5)).collect();
        let fused = fuse_rrf(&vector, &[], &config);
        assert_eq!(fused.len(), 3);
    }

    // --- Smart cutoff ---

    #[test]
    fn cutoff_low_top_returns_single() {
        let config = SearchConfig::default();
        let candidates = vec![scored("a.rs", 0, 0.2), scored("b.rs", 0, 0.19)];
        let selected = smart_cutoff(&candidates, &config);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].chunk.file_path, "a.rs");
    }

    #[test]
    fn cutoff_dynamic_threshold_stops_walk() {
        let config = SearchConfig::default();
        // top=0.9 → dyn = max(0.25, min(0.45, 0.65)) = 0.45
        let candidates = vec![
            scored("a.rs", 0, 0.9),
            scored("b.rs", 0, 0.5),
            scored("c.rs", 0, 0.4), // below dyn at i=2 → stop
            scored("d.rs", 0, 0.39),
        ];
        let selected = smart_cutoff(&candidates, &config);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn cutoff_min_k_uses_floor() {
        let config = SearchConfig::default();
        // Second candidate is below dyn (0.45) but above floor and i < 2.
        let candidates = vec![
            scored("a.rs", 0, 0.9),
            scored("b.rs", 0, 0.3),
            scored("c.rs", 0, 0.28),
        ];
        let selected = smart_cutoff(&candidates, &config);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn cutoff_caps_at_max_k() {
        let config = SearchConfig::default();
        let candidates: Vec<ScoredChunk> =
            (0..20).map(|i| scored("a.rs", i, 0.9)).collect();
        let selected = smart_cutoff(&candidates, &config);
        assert_eq!(selected.len(), config.smart_max_k);
    }

    #[test]
    fn cutoff_dedups_by_key() {
        let config = SearchConfig::default();
        let candidates = vec![
            scored("a.rs", 0, 0.9),
            scored("a.rs", 0, 0.85), // duplicate key
            scored("b.rs", 0, 0.8),
        ];
        let selected = smart_cutoff(&candidates, &config);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn cutoff_scale_invariant_when_ratio_binds() {
        let config = SearchConfig::default();
        let base = vec![
            scored("a.rs", 0, 0.9),
            scored("b.rs", 0, 0.5),
            scored("c.rs", 0, 0.2),
        ];
        let selected_base: Vec<_> = smart_cutoff(&base, &config)
            .iter()
            .map(|c| c.chunk.file_path.clone())
            .collect();

        for factor in [1.5, 2.0, 3.0] {
            let scaled: Vec<ScoredChunk> = base
                .iter()
                .map(|c| scored(&c.chunk.file_path, 0, c.score * factor))
                .collect();
            let selected_scaled: Vec<_> = smart_cutoff(&scaled, &config)
                .iter()
                .map(|c| c.chunk.file_path.clone())
                .collect();
            assert_eq!(selected_base, selected_scaled, "factor {factor}");
        }
    }

    #[test]
    fn cutoff_empty_input() {
        let config = SearchConfig::default();
        assert!(smart_cutoff(&[], &config).is_empty());
    }

    // --- Rerank payload ---

    #[test]
    fn payload_within_budget() {
        let mut chunk = stored("a.rs", 0);
        chunk.chunk.breadcrumb = "b".repeat(400);
        chunk.chunk.display_code = "c".repeat(5000);
        let candidate = ScoredChunk {
            chunk,
            score: 0.0,
            source: SeedSource::Vector,
        };
        let payload = rerank_payload(&candidate, &[]);
        assert!(payload.chars().count() <= 1000);
        assert!(payload.contains('\n'));
        // Breadcrumb was middle-elided to 250 chars.
        let header = payload.lines().next().unwrap();
        assert_eq!(header.chars().count(), 250);
        assert!(header.contains('…'));
    }
}
