//! Benchmarks for box tree operations.
//!
//! Run with: cargo bench

use boxy_core::{BoxKind, Document};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

/// Generates a document of `rows` rows, each holding a plain and a code box.
fn generate_document(rows: usize) -> String {
    (0..rows)
        .map(|i| format!("row {} [note {} (f x)] and more text\n", i, i))
        .collect()
}

/// Benchmarks parsing serialized text.
fn bench_deserialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("deserialize");

    for size in [100, 1000, 10000].iter() {
        let text = generate_document(*size);
        group.bench_with_input(BenchmarkId::new("from_text", size), &text, |b, text| {
            b.iter(|| black_box(Document::from_text(black_box(text)).unwrap()))
        });
    }

    group.finish();
}

/// Benchmarks serializing a parsed document.
fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize");

    for size in [100, 1000, 10000].iter() {
        let doc = Document::from_text(&generate_document(*size)).unwrap();
        group.bench_with_input(BenchmarkId::new("text", size), &doc, |b, doc| {
            b.iter(|| black_box(doc.text()))
        });
    }

    group.finish();
}

/// Benchmarks typing and box insertion.
fn bench_editing(c: &mut Criterion) {
    let mut group = c.benchmark_group("editing");
    let base = generate_document(1000);

    group.bench_function("type_line", |b| {
        b.iter_with_setup(
            || Document::from_text(&base).unwrap(),
            |mut doc| {
                for ch in "typed at the start of the document".chars() {
                    doc.insert_char(black_box(ch)).unwrap();
                }
                black_box(doc)
            },
        )
    });

    group.bench_function("nested_boxes", |b| {
        b.iter(|| {
            let mut doc = Document::new();
            for _ in 0..50 {
                doc.insert_box_and_enter(BoxKind::Plain).unwrap();
                doc.insert_text("x").unwrap();
            }
            black_box(doc)
        })
    });

    group.finish();
}

/// Benchmarks cursor motion across a document.
fn bench_navigation(c: &mut Criterion) {
    let mut group = c.benchmark_group("navigation");
    let base = generate_document(200);

    group.bench_function("forward_to_end", |b| {
        b.iter_with_setup(
            || Document::from_text(&base).unwrap(),
            |mut doc| {
                while doc.move_forward() {}
                black_box(doc)
            },
        )
    });

    group.bench_function("down_to_end", |b| {
        b.iter_with_setup(
            || Document::from_text(&base).unwrap(),
            |mut doc| {
                while doc.move_down() {}
                black_box(doc)
            },
        )
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_deserialize,
    bench_serialize,
    bench_editing,
    bench_navigation
);
criterion_main!(benches);
