//! Validation Benchmarks
//!
//! Schema compilation through the cache and checking of typical bodies.
//!
//! Run with: cargo bench --bench validation_benchmarks

use arbor::arbor_validation::{CompiledSchema, Schema, SchemaCache};
use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;

fn signup() -> Arc<Schema> {
    Schema::object([
        ("name", Schema::string().min_length(1).max_length(64)),
        ("email", Schema::string().email()),
        ("age", Schema::integer().minimum(0.0).maximum(150.0)),
        ("tags", Schema::array(Schema::string()).max_items(10).optional()),
        ("role", Schema::string().one_of(["admin", "member"]).default("member")),
    ])
    .shared()
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("schema_compile");
    let schema = signup();

    group.bench_function("uncached", |b| {
        b.iter(|| CompiledSchema::new(black_box(&schema)).unwrap())
    });

    group.bench_function("cache_hit", |b| {
        let cache = SchemaCache::new();
        cache.get_or_compile(&schema).unwrap();
        b.iter(|| cache.get_or_compile(black_box(&schema)).unwrap())
    });

    group.finish();
}

fn bench_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("schema_check");
    let checker = CompiledSchema::new(&signup()).unwrap();

    let typed = json!({
        "name": "Al",
        "email": "al@example.com",
        "age": 25,
        "tags": ["a", "b"],
    });
    let stringly = json!({
        "name": "Al",
        "email": "al@example.com",
        "age": "25",
        "tags": "a",
    });
    let invalid = json!({
        "name": "",
        "email": "not-an-email",
        "age": "old",
    });

    group.bench_function("valid_typed", |b| {
        b.iter(|| checker.check(black_box(typed.clone())))
    });
    group.bench_function("valid_coerced", |b| {
        b.iter(|| checker.check(black_box(stringly.clone())))
    });
    group.bench_function("invalid", |b| {
        b.iter(|| checker.check(black_box(invalid.clone())))
    });

    group.finish();
}

criterion_group!(benches, bench_compile, bench_check);
criterion_main!(benches);
