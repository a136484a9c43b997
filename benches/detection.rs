//! Redundancy Detection Benchmarks
//!
//! Detection is quadratic in catalog size, so this tracks how it behaves on
//! realistic (50 fields) and heavy (200 fields) catalogs.
//!
//! Run with: `cargo bench --bench detection`

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use formfill_server::catalog::{Field, FieldKind, FieldRole};
use formfill_server::dedup::{detect, DetectOptions};

/// Synthetic catalog: a handful of logical inputs repeated across pages with
/// name variants, plus unique filler fields.
fn synthetic_catalog(size: usize) -> Vec<Field> {
    let variants = [
        ("fullname", "full_name"),
        ("dateofbirth", "date_of_birth"),
        ("email", "e-mail"),
        ("phone", "phone_number"),
        ("address", "address_line"),
    ];

    (0..size)
        .map(|i| {
            let page = (i / 10 + 1) as u32;
            let name = if i % 3 == 0 {
                let (a, b) = variants[i % variants.len()];
                if i % 2 == 0 { a.to_string() } else { b.to_string() }
            } else {
                format!("field_{i}")
            };

            Field {
                id: format!("f{i}"),
                template_id: "bench".to_string(),
                name,
                kind: FieldKind::Text,
                page,
                x: (i % 5) as f64 * 100.0,
                y: (i % 10) as f64 * 80.0,
                font_size: 12.0,
                required: false,
                validation_pattern: None,
                role: FieldRole::Unmerged,
            }
        })
        .collect()
}

fn bench_detection(c: &mut Criterion) {
    let opts = DetectOptions::default();

    let small = synthetic_catalog(50);
    c.bench_function("detect_50_fields", |b| {
        b.iter(|| detect(black_box(&small), black_box(&opts)))
    });

    let large = synthetic_catalog(200);
    c.bench_function("detect_200_fields", |b| {
        b.iter(|| detect(black_box(&large), black_box(&opts)))
    });

    let exact_only = DetectOptions {
        exact_match_only: true,
        ..DetectOptions::default()
    };
    c.bench_function("detect_200_fields_exact_only", |b| {
        b.iter(|| detect(black_box(&large), black_box(&exact_only)))
    });
}

criterion_group!(benches, bench_detection);
criterion_main!(benches);
