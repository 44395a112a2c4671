use std::collections::HashMap;

use cw_storage::RowStore;

use crate::error::RetrievalError;
use crate::service::ScoredChunk;

/// Packing limits.
#[derive(Debug, Clone)]
pub struct PackConfig {
    pub max_segments_per_file: usize,
    pub max_total_chars: usize,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            max_segments_per_file: 3,
            max_total_chars: 48_000,
        }
    }
}

/// A merged, line-annotated slice of one file.
#[derive(Debug, Clone)]
pub struct Segment {
    pub raw_start: u32,
    pub raw_end: u32,
    /// 1-based.
    pub start_line: u32,
    /// 1-based.
    pub end_line: u32,
    pub score: f64,
    pub breadcrumb: String,
    pub text: String,
}

/// All packed segments of one file.
#[derive(Debug, Clone)]
pub struct PackedFile {
    pub file_path: String,
    pub segments: Vec<Segment>,
}

/// Assemble the final answer snippets: group chunks by file, merge
/// overlapping raw spans, slice the stored file contents, and enforce the
/// character budget.
pub fn pack_context(
    chunks: &[ScoredChunk],
    row: &RowStore,
    config: &PackConfig,
) -> Result<Vec<PackedFile>, RetrievalError> {
    // Group by file and order files by their best chunk score.
    let mut by_file: HashMap<&str, Vec<&ScoredChunk>> = HashMap::new();
    for chunk in chunks {
        by_file.entry(chunk.file_path()).or_default().push(chunk);
    }

    let mut file_order: Vec<(&str, f64)> = by_file
        .iter()
        .map(|(path, list)| {
            let best = list.iter().map(|c| c.score).fold(f64::MIN, f64::max);
            (*path, best)
        })
        .collect();
    file_order.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    let paths: Vec<String> = file_order.iter().map(|(p, _)| p.to_string()).collect();
    let contents = row.get_contents(&paths)?;

    let mut out = Vec::new();
    let mut total_chars = 0usize;

    'files: for (path, _) in &file_order {
        let Some(content) = contents.get(*path) else { continue };

        let mut merged = merge_intervals(&by_file[path]);

        // Top segments by score, then back in source order for output.
        merged.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.raw_start.cmp(&b.raw_start))
        });
        merged.truncate(config.max_segments_per_file);
        merged.sort_by_key(|m| m.raw_start);

        let mut segments = Vec::with_capacity(merged.len());
        for interval in merged {
            if total_chars > config.max_total_chars {
                break 'files;
            }
            let Some(segment) = slice_segment(content, &interval) else { continue };
            total_chars += segment.text.chars().count();
            segments.push(segment);
        }

        if !segments.is_empty() {
            out.push(PackedFile {
                file_path: path.to_string(),
                segments,
            });
        }

        if total_chars > config.max_total_chars {
            break;
        }
    }

    Ok(out)
}

#[derive(Debug, Clone)]
struct Interval {
    raw_start: u32,
    raw_end: u32,
    score: f64,
    breadcrumb: String,
}

/// Linear merge of raw spans sorted by start; overlapping or touching spans
/// collapse, keeping the max score and the first breadcrumb.
fn merge_intervals(chunks: &[&ScoredChunk]) -> Vec<Interval> {
    let mut sorted: Vec<&ScoredChunk> = chunks.to_vec();
    sorted.sort_by_key(|c| c.chunk.chunk.raw_start);

    let mut merged: Vec<Interval> = Vec::new();
    for chunk in sorted {
        let start = chunk.chunk.chunk.raw_start;
        let end = chunk.chunk.chunk.raw_end;
        match merged.last_mut() {
            Some(last) if start <= last.raw_end => {
                last.raw_end = last.raw_end.max(end);
                last.score = last.score.max(chunk.score);
            }
            _ => merged.push(Interval {
                raw_start: start,
                raw_end: end,
                score: chunk.score,
                breadcrumb: chunk.chunk.chunk.breadcrumb.clone(),
            }),
        }
    }
    merged
}

/// Slice an interval out of the file, computing 1-based line numbers by
/// counting newlines up to each offset.
fn slice_segment(content: &str, interval: &Interval) -> Option<Segment> {
    let len = content.len();
    let start = (interval.raw_start as usize).min(len);
    let end = (interval.raw_end as usize).min(len);
    if start >= end {
        return None;
    }
    let text = content.get(start..end)?.to_string();

    let start_line = content[..start].matches('\n').count() as u32 + 1;
    let end_line = content[..end].matches('\n').count() as u32 + 1;

    Some(Segment {
        raw_start: start as u32,
        raw_end: end as u32,
        start_line,
        end_line,
        score: interval.score,
        breadcrumb: interval.breadcrumb.clone(),
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cw_core::{ChunkId, Language, ProcessedChunk};
    use cw_storage::row::FileRecord;
    use cw_storage::vector::StoredChunk;
    use crate::service::{ScoredChunk, SeedSource};

    fn stored(path: &str, index: u32, raw_start: u32, raw_end: u32) -> StoredChunk {
        StoredChunk {
            chunk_id: ChunkId::generate(path, "h1", index),
            file_path: path.to_string(),
            file_hash: "h1".to_string(),
            chunk: ProcessedChunk {
                display_code: String::new(),
                vector_text: String::new(),
                breadcrumb: format!("{path} > part{index}"),
                language: Language::TypeScript,
                chunk_index: index,
                start_index: raw_start,
                end_index: raw_end,
                raw_start,
                raw_end,
                vec_start: raw_start,
                vec_end: raw_end,
            },
        }
    }

    fn scored(path: &str, index: u32, raw_start: u32, raw_end: u32, score: f64) -> ScoredChunk {
        ScoredChunk {
            chunk: stored(path, index, raw_start, raw_end),
            score,
            source: SeedSource::Vector,
        }
    }

    fn store_with(files: &[(&str, &str)]) -> RowStore {
        let mut row = RowStore::open_in_memory().unwrap();
        let records: Vec<FileRecord> = files
            .iter()
            .map(|(path, content)| FileRecord {
                path: path.to_string(),
                hash: "h1".to_string(),
                mtime: 0,
                size: content.len() as i64,
                content: Some(content.to_string()),
                language: "typescript".to_string(),
                vector_index_hash: Some("h1".to_string()),
            })
            .collect();
        row.upsert_files(&records).unwrap();
        row
    }

    #[test]
    fn overlapping_spans_merge() {
        let content = "line one\nline two\nline three\nline four\n";
        let row = store_with(&[("a.ts", content)]);

        let chunks = vec![
            scored("a.ts", 0, 0, 18, 0.9),
            scored("a.ts", 1, 9, 29, 0.5),
        ];
        let packed = pack_context(&chunks, &row, &PackConfig::default()).unwrap();

        assert_eq!(packed.len(), 1);
        assert_eq!(packed[0].segments.len(), 1);
        let seg = &packed[0].segments[0];
        assert_eq!(seg.raw_start, 0);
        assert_eq!(seg.raw_end, 29);
        assert_eq!(seg.score, 0.9);
        assert_eq!(seg.start_line, 1);
        assert_eq!(seg.text, &content[0..29]);
    }

    #[test]
    fn merge_is_idempotent() {
        let content = "alpha\nbeta\ngamma\ndelta\n";
        let row = store_with(&[("a.ts", content)]);

        let chunks = vec![
            scored("a.ts", 0, 0, 6, 0.9),
            scored("a.ts", 1, 10, 17, 0.8),
        ];
        let once = pack_context(&chunks, &row, &PackConfig::default()).unwrap();

        // Re-pack the merged output as if it were chunks again.
        let rechunks: Vec<ScoredChunk> = once[0]
            .segments
            .iter()
            .enumerate()
            .map(|(i, s)| scored("a.ts", i as u32, s.raw_start, s.raw_end, s.score))
            .collect();
        let twice = pack_context(&rechunks, &row, &PackConfig::default()).unwrap();

        let fingerprint = |files: &[PackedFile]| -> Vec<(u32, u32, String)> {
            files
                .iter()
                .flat_map(|f| f.segments.iter().map(|s| (s.raw_start, s.raw_end, format!("{:.6}", s.score))))
                .collect()
        };
        assert_eq!(fingerprint(&once), fingerprint(&twice));
    }

    #[test]
    fn files_ordered_by_best_score() {
        let row = store_with(&[("low.ts", "aaa\n"), ("high.ts", "bbb\n")]);
        let chunks = vec![
            scored("low.ts", 0, 0, 4, 0.2),
            scored("high.ts", 0, 0, 4, 0.9),
        ];
        let packed = pack_context(&chunks, &row, &PackConfig::default()).unwrap();
        assert_eq!(packed[0].file_path, "high.ts");
        assert_eq!(packed[1].file_path, "low.ts");
    }

    #[test]
    fn per_file_segment_cap() {
        let content = "0123456789".repeat(20);
        let row = store_with(&[("a.ts", &content)]);

        // Five disjoint spans with ascending scores.
        let chunks: Vec<ScoredChunk> = (0..5)
            .map(|i| scored("a.ts", i, i * 40, i * 40 + 10, 0.1 * f64::from(i + 1)))
            .collect();
        let packed = pack_context(&chunks, &row, &PackConfig::default()).unwrap();

        let segments = &packed[0].segments;
        assert_eq!(segments.len(), 3, "top-3 segments kept");
        // Output back in source order.
        assert!(segments.windows(2).all(|w| w[0].raw_start < w[1].raw_start));
        // The lowest-scored spans were dropped.
        assert!(segments.iter().all(|s| s.score > 0.2));
    }

    #[test]
    fn char_budget_stops_packing() {
        let big = "x".repeat(600);
        let row = store_with(&[("a.ts", &big), ("b.ts", &big), ("c.ts", &big)]);
        let chunks = vec![
            scored("a.ts", 0, 0, 600, 0.9),
            scored("b.ts", 0, 0, 600, 0.8),
            scored("c.ts", 0, 0, 600, 0.7),
        ];
        let config = PackConfig {
            max_segments_per_file: 3,
            max_total_chars: 1000,
        };
        let packed = pack_context(&chunks, &row, &config).unwrap();

        // a fits (600), b crosses the budget (1200 > 1000), c never starts.
        let files: Vec<&str> = packed.iter().map(|f| f.file_path.as_str()).collect();
        assert_eq!(files, vec!["a.ts", "b.ts"]);
    }

    #[test]
    fn line_numbers_are_one_based() {
        let content = "first\nsecond\nthird\n";
        let row = store_with(&[("a.ts", content)]);
        let chunks = vec![scored("a.ts", 0, 6, 12, 0.9)]; // "second"
        let packed = pack_context(&chunks, &row, &PackConfig::default()).unwrap();

        let seg = &packed[0].segments[0];
        assert_eq!(seg.start_line, 2);
        assert_eq!(seg.end_line, 2);
        assert_eq!(seg.text, "second");
    }
}
