use criterion::{black_box, criterion_group, criterion_main, Criterion};
use enso_parser::{parse_module, ParseCache};

const SMALL: &str = r#"main =
    x = 1
    y = x + 2
    y
"#;

const MEDIUM: &str = r#"## Loads the data and shows a summary.
   The summary is recomputed on every change.
main =
    data = Data.read 'data.csv'
    filtered = data.filter (x -> x.age > 18)
    summary = filtered.aggregate [Aggregate_Column.Count, Aggregate_Column.Average 'age']
    table = Table.input [['Column #1', ['1', '3']], ['Column #2', ['2', Nothing]]]
    ## Joined result
    joined = summary.join table
    joined

helper a b = (a + b) * -1
"#;

fn parse_small_module(c: &mut Criterion) {
    c.bench_function("parse_small_module", |b| b.iter(|| parse_module(black_box(SMALL))));
}

fn parse_medium_module(c: &mut Criterion) {
    c.bench_function("parse_medium_module", |b| b.iter(|| parse_module(black_box(MEDIUM))));
}

fn parse_large_module(c: &mut Criterion) {
    let source = MEDIUM.repeat(50);
    c.bench_function("parse_large_module", |b| b.iter(|| parse_module(black_box(&source))));
}

fn parse_cached(c: &mut Criterion) {
    let mut cache = ParseCache::new();
    c.bench_function("parse_cached_hit", |b| b.iter(|| cache.parse(black_box(MEDIUM))));
}

criterion_group!(
    benches,
    parse_small_module,
    parse_medium_module,
    parse_large_module,
    parse_cached
);
criterion_main!(benches);
