use criterion::{criterion_group, criterion_main, Criterion};
use cw_core::{Language, ProcessedChunk};
use cw_storage::RowStore;

fn make_chunk(index: u32, file: &str) -> ProcessedChunk {
    let code = format!(
        "function handler_{index}(data) {{ return validateAndProcess(data, {index}); }}"
    );
    ProcessedChunk {
        display_code: code.clone(),
        vector_text: code.clone(),
        breadcrumb: format!("{file} > function handler_{index}"),
        language: Language::JavaScript,
        chunk_index: index,
        start_index: 0,
        end_index: code.len() as u32,
        raw_start: 0,
        raw_end: code.len() as u32,
        vec_start: 0,
        vec_end: code.len() as u32,
    }
}

fn bench_chunks_bm25(c: &mut Criterion) {
    let mut store = RowStore::open_in_memory().unwrap();

    // 200 files x 25 chunks = 5000 chunk FTS rows.
    for f in 0..200 {
        let file = format!("src/mod_{f}.js");
        let chunks: Vec<ProcessedChunk> = (0..25).map(|i| make_chunk(i, &file)).collect();
        store.commit_file_index(&file, "hash", &chunks).unwrap();
    }

    let mut group = c.benchmark_group("chunks_bm25");

    group.bench_function("strict_single_token", |b| {
        let tokens = vec!["handler_12".to_string()];
        b.iter(|| store.search_chunks_bm25(&tokens, 40).unwrap());
    });

    group.bench_function("two_pass_multi_token", |b| {
        let tokens = vec![
            "validateandprocess".to_string(),
            "handler_7".to_string(),
            "missing_token".to_string(),
        ];
        b.iter(|| store.search_chunks_bm25(&tokens, 40).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_chunks_bm25);
criterion_main!(benches);
