use std::collections::{HashMap, HashSet, VecDeque};

use cw_storage::vector::StoredChunk;
use cw_storage::{RowStore, VectorStore};

use crate::error::RetrievalError;
use crate::resolver::{default_resolvers, ImportResolver, PathSet};
use crate::score::TokenMatcher;
use crate::service::{ScoredChunk, SeedSource};

/// Expansion limits and score decays.
#[derive(Debug, Clone)]
pub struct ExpandConfig {
    pub neighbor_hops: u32,
    pub decay_neighbor: f64,
    pub breadcrumb_expand_limit: usize,
    pub decay_breadcrumb: f64,
    pub import_files_per_seed: usize,
    pub chunks_per_import_file: usize,
    pub decay_import: f64,
    pub decay_depth: f64,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            neighbor_hops: 1,
            decay_neighbor: 0.8,
            breadcrumb_expand_limit: 1,
            decay_breadcrumb: 0.7,
            import_files_per_seed: 5,
            chunks_per_import_file: 2,
            decay_import: 0.6,
            decay_depth: 0.7,
        }
    }
}

/// Follows intra-file, breadcrumb-sibling, and import-graph edges out from
/// the seeds. The project's path set is loaded once and cached here; the
/// resolvers are a fixed, priority-ordered list.
pub struct GraphExpander {
    paths: PathSet,
    resolvers: Vec<Box<dyn ImportResolver>>,
    config: ExpandConfig,
}

impl GraphExpander {
    pub fn new(paths: Vec<String>, config: ExpandConfig) -> Self {
        Self {
            paths: PathSet::new(paths),
            resolvers: default_resolvers(),
            config,
        }
    }

    /// Run all three expansions. Results never duplicate a seed or each
    /// other (dedup key: `(file_path, chunk_index)`).
    pub fn expand(
        &self,
        seeds: &[ScoredChunk],
        row: &RowStore,
        vector: &VectorStore,
        matcher: &TokenMatcher,
    ) -> Result<Vec<ScoredChunk>, RetrievalError> {
        if seeds.is_empty() {
            return Ok(Vec::new());
        }

        let mut taken: HashSet<(String, u32)> = seeds
            .iter()
            .map(|s| (s.chunk.file_path.clone(), s.chunk.chunk.chunk_index))
            .collect();
        let mut out: Vec<ScoredChunk> = Vec::new();

        let mut seed_files: Vec<String> = seeds.iter().map(|s| s.chunk.file_path.clone()).collect();
        seed_files.sort();
        seed_files.dedup();
        let file_chunks = vector.get_files_chunks(&seed_files)?;

        self.expand_neighbors(seeds, &file_chunks, &mut taken, &mut out);
        self.expand_breadcrumb_siblings(seeds, &file_chunks, &mut taken, &mut out);
        self.expand_imports(seeds, row, vector, matcher, &mut taken, &mut out)?;

        tracing::debug!(expanded = out.len(), "graph expansion done");
        Ok(out)
    }

    /// E1: same-file neighbors at `chunk_index ± 1…hops`, scored from the
    /// best seed in the file with exponential decay per hop.
    fn expand_neighbors(
        &self,
        seeds: &[ScoredChunk],
        file_chunks: &HashMap<String, Vec<StoredChunk>>,
        taken: &mut HashSet<(String, u32)>,
        out: &mut Vec<ScoredChunk>,
    ) {
        let mut best_per_file: HashMap<&str, f64> = HashMap::new();
        for seed in seeds {
            let entry = best_per_file.entry(seed.file_path()).or_insert(f64::MIN);
            *entry = entry.max(seed.score);
        }

        for seed in seeds {
            let Some(chunks) = file_chunks.get(seed.file_path()) else { continue };
            let by_index: HashMap<u32, &StoredChunk> =
                chunks.iter().map(|c| (c.chunk.chunk_index, c)).collect();
            let base = best_per_file[seed.file_path()];

            for distance in 1..=self.config.neighbor_hops {
                let score = base * self.config.decay_neighbor.powi(distance as i32);
                let index = seed.chunk.chunk.chunk_index;
                let mut candidates: Vec<u32> = Vec::with_capacity(2);
                if let Some(lower) = index.checked_sub(distance) {
                    candidates.push(lower);
                }
                candidates.push(index + distance);

                for neighbor_index in candidates {
                    let Some(neighbor) = by_index.get(&neighbor_index) else { continue };
                    let key = (neighbor.file_path.clone(), neighbor_index);
                    if taken.insert(key) {
                        out.push(ScoredChunk {
                            chunk: (*neighbor).clone(),
                            score,
                            source: SeedSource::Neighbor,
                        });
                    }
                }
            }
        }
    }

    /// E2: chunks sharing a seed's parent breadcrumb prefix within the same
    /// file, up to the configured limit per prefix.
    fn expand_breadcrumb_siblings(
        &self,
        seeds: &[ScoredChunk],
        file_chunks: &HashMap<String, Vec<StoredChunk>>,
        taken: &mut HashSet<(String, u32)>,
        out: &mut Vec<ScoredChunk>,
    ) {
        // prefix → (file, best seed score)
        let mut groups: HashMap<String, (String, f64)> = HashMap::new();
        for seed in seeds {
            let Some(prefix) = parent_prefix(&seed.chunk.chunk.breadcrumb) else { continue };
            let entry = groups
                .entry(prefix)
                .or_insert_with(|| (seed.chunk.file_path.clone(), f64::MIN));
            entry.1 = entry.1.max(seed.score);
        }

        let mut ordered: Vec<(String, (String, f64))> = groups.into_iter().collect();
        ordered.sort_by(|a, b| a.0.cmp(&b.0));

        for (prefix, (file, best)) in ordered {
            let Some(chunks) = file_chunks.get(&file) else { continue };
            let score = best * self.config.decay_breadcrumb;
            let mut added = 0usize;
            for chunk in chunks {
                if added >= self.config.breadcrumb_expand_limit {
                    break;
                }
                if parent_prefix(&chunk.chunk.breadcrumb).as_deref() != Some(prefix.as_str()) {
                    continue;
                }
                let key = (chunk.file_path.clone(), chunk.chunk.chunk_index);
                if taken.insert(key) {
                    out.push(ScoredChunk {
                        chunk: chunk.clone(),
                        score,
                        source: SeedSource::Breadcrumb,
                    });
                    added += 1;
                }
            }
        }
    }

    /// E3: two-hop BFS over the import graph. Depth-0 files expand up to
    /// `import_files_per_seed` targets; depth-1 expansion happens only
    /// through barrel files and with a tighter budget.
    fn expand_imports(
        &self,
        seeds: &[ScoredChunk],
        row: &RowStore,
        vector: &VectorStore,
        matcher: &TokenMatcher,
        taken: &mut HashSet<(String, u32)>,
        out: &mut Vec<ScoredChunk>,
    ) -> Result<(), RetrievalError> {
        let mut best_per_file: HashMap<String, f64> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for seed in seeds {
            let path = seed.chunk.file_path.clone();
            if !best_per_file.contains_key(&path) {
                order.push(path.clone());
            }
            let entry = best_per_file.entry(path).or_insert(f64::MIN);
            *entry = entry.max(seed.score);
        }

        let mut visited: HashSet<String> = order.iter().cloned().collect();
        let mut queue: VecDeque<(String, u32, f64)> = order
            .iter()
            .map(|p| (p.clone(), 0u32, best_per_file[p]))
            .collect();

        while let Some((file, depth, seed_score)) = queue.pop_front() {
            if depth >= 2 {
                continue;
            }
            if depth == 1 && !is_barrel_file(&file) {
                continue;
            }
            let budget = if depth == 0 {
                self.config.import_files_per_seed
            } else {
                self.config.import_files_per_seed.min(2)
            };

            let Some(resolver) = self.resolvers.iter().find(|r| r.supports(&file)) else {
                continue;
            };
            let Some(record) = row.get_file(&file)? else { continue };
            let Some(content) = record.content else { continue };

            let mut expanded = 0usize;
            for import in resolver.extract(&content) {
                if expanded >= budget {
                    break;
                }
                let Some(target) = resolver.resolve(&import, &file, &self.paths) else {
                    continue;
                };
                if !visited.insert(target.clone()) {
                    continue;
                }
                expanded += 1;

                let chunks = vector.get_file_chunks(&target)?;
                let selected =
                    select_import_chunks(&chunks, matcher, self.config.chunks_per_import_file);
                let factor = self.config.decay_import
                    * if depth == 0 { 1.0 } else { self.config.decay_depth };
                for chunk in selected {
                    let key = (chunk.file_path.clone(), chunk.chunk.chunk_index);
                    if taken.insert(key) {
                        out.push(ScoredChunk {
                            chunk,
                            score: seed_score * factor,
                            source: SeedSource::Import,
                        });
                    }
                }

                queue.push_back((target, depth + 1, seed_score));
            }
        }
        Ok(())
    }
}

/// `"a > b > c"` → `"a > b"`; `None` when there is no parent scope.
fn parent_prefix(breadcrumb: &str) -> Option<String> {
    let parts: Vec<&str> = breadcrumb.split(" > ").collect();
    if parts.len() <= 1 {
        return None;
    }
    Some(parts[..parts.len() - 1].join(" > "))
}

/// Module re-export entry points get a second BFS hop.
fn is_barrel_file(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    if name == "__init__.py" || name == "mod.rs" {
        return true;
    }
    matches!(
        name,
        "index.ts" | "index.tsx" | "index.js" | "index.jsx" | "index.mts" | "index.mjs"
            | "index.cts" | "index.cjs"
    )
}

/// Up to `limit` chunks per import target: best token overlap first when
/// tokens exist (zero-overlap chunks excluded), else leading chunks; output
/// in file order.
fn select_import_chunks(
    chunks: &[StoredChunk],
    matcher: &TokenMatcher,
    limit: usize,
) -> Vec<StoredChunk> {
    if matcher.is_empty() {
        return chunks.iter().take(limit).cloned().collect();
    }

    let mut scored: Vec<(&StoredChunk, f64)> = chunks
        .iter()
        .map(|c| {
            let text = format!("{} {}", c.chunk.breadcrumb, c.chunk.display_code);
            (c, matcher.overlap(&text))
        })
        .filter(|(_, s)| *s > 0.0)
        .collect();

    if scored.is_empty() {
        return chunks.iter().take(limit).cloned().collect();
    }

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.chunk.chunk_index.cmp(&b.0.chunk.chunk_index))
    });
    let mut picked: Vec<StoredChunk> = scored
        .into_iter()
        .take(limit)
        .map(|(c, _)| c.clone())
        .collect();
    picked.sort_by_key(|c| c.chunk.chunk_index);
    picked
}
