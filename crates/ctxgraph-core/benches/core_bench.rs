//! Criterion benchmarks for ctxgraph-core.
//!
//! ## Benchmark groups
//!
//! 1. **symbol_index**: building the bare-name index over synthetic records.
//! 2. **graph_build**: the full two-phase build at several codebase sizes.
//! 3. **import_resolution**: include lookup against a populated store.
//!
//! ## Running
//!
//! ```sh
//! cargo bench --manifest-path crates/ctxgraph-core/Cargo.toml
//! # Only the build group:
//! cargo bench --manifest-path crates/ctxgraph-core/Cargo.toml -- graph_build
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ctxgraph_core::config::BuildOptions;
use ctxgraph_core::indexer::imports::ImportResolver;
use ctxgraph_core::indexer::pipeline::build_from_records;
use ctxgraph_core::indexer::records::RecordStore;
use ctxgraph_core::indexer::symbols::SymbolIndex;
use ctxgraph_core::models::{ClassEntry, ExtractionRecord, FunctionEntry};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `n` header records, each declaring one class that extends and uses the
/// previous file's class, with a few methods and an include of its
/// predecessor. Every tenth file also includes a system header.
fn synthetic_records(n: usize) -> Vec<ExtractionRecord> {
    (0..n)
        .map(|i| {
            let mut class = ClassEntry::named(&format!("Node{i}"));
            if i > 0 {
                class.extends.push(format!("Node{}", i - 1));
                class.dependencies.push(format!("Node{}", i - 1));
            }
            for m in 0..4 {
                let mut method = FunctionEntry::named(&format!("op{m}"));
                method.dependencies.push(format!("Node{}", (i + m) % n));
                class.methods.push(method);
            }
            let mut imports = String::new();
            if i > 0 {
                imports.push_str(&format!("#include \"node{}.h\"\n", i - 1));
            }
            if i % 10 == 0 {
                imports.push_str("#include <vector>\n");
            }
            ExtractionRecord {
                source_path: format!("/bench/src/node{i}.h"),
                classes: vec![class],
                functions: vec![FunctionEntry::named(&format!("helper{i}"))],
                imports: Some(imports),
                ..ExtractionRecord::default()
            }
        })
        .collect()
}

fn populated_store(n: usize) -> RecordStore {
    let mut store = RecordStore::new(Some("/bench"));
    store.load_all(synthetic_records(n));
    store
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_symbol_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("symbol_index");
    for size in [100usize, 1_000] {
        let records = synthetic_records(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| SymbolIndex::build(black_box(records.iter())))
        });
    }
    group.finish();
}

fn bench_graph_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");
    group.sample_size(20);
    let options = BuildOptions {
        represent_external_imports: true,
        ..BuildOptions::default()
    };
    for size in [100usize, 1_000, 5_000] {
        let records = synthetic_records(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| build_from_records(black_box(records.clone()), &options))
        });
    }
    group.finish();
}

fn bench_import_resolution(c: &mut Criterion) {
    let store = populated_store(1_000);
    let resolver = ImportResolver::new(&store);
    let mut group = c.benchmark_group("import_resolution");
    group.bench_function("sibling_hit", |b| {
        b.iter(|| {
            resolver.resolve_import(
                black_box("#include \"node499.h\""),
                black_box("/bench/src/node500.h"),
            )
        })
    });
    group.bench_function("system_miss", |b| {
        b.iter(|| {
            resolver.resolve_import(black_box("#include <vector>"), black_box("/bench/src/node0.h"))
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_symbol_index,
    bench_graph_build,
    bench_import_resolution
);
criterion_main!(benches);
