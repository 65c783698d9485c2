//! Benchmarks for automapper runs
//!
//! Run with: cargo bench --bench automapper_bench

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use collection_automapper::automapper::headers::preprocess_headers;
use collection_automapper::automapper::{Automapper, AutomapperParams, MapOptions, ResultsCache};
use collection_automapper::schema::{
    Cardinality, FieldInfo, SchemaDescription, SchemaGraph, Table, TreeRank,
};

const HEADERS: [&str; 10] = [
    "Catalog Number",
    "Remarks",
    "Start Date",
    "Locality Name",
    "Latitude",
    "Collector Last Name",
    "Collector 2 Last Name",
    "Kingdom",
    "Species Author",
    "Unrelated Column",
];

/// Build a schema with the core tables plus `extra` filler tables hanging off the base
fn build_schema(extra: usize) -> SchemaGraph {
    let mut base = Table::new("collectionobject", "Collection Object")
        .with_field("catalognumber", FieldInfo::literal("Catalog Number"))
        .with_field("remarks", FieldInfo::literal("Remarks"))
        .with_field(
            "collectingevent",
            FieldInfo::relationship("Collecting Event", "collectingevent", Cardinality::ManyToOne, None),
        )
        .with_field(
            "determinations",
            FieldInfo::relationship("Determinations", "determination", Cardinality::OneToMany, None),
        );

    let mut description = SchemaDescription::new();
    for index in 0..extra {
        let name = format!("attachment{}", index);
        base = base.with_field(
            name.clone(),
            FieldInfo::relationship("Attachment", name.clone(), Cardinality::ManyToOne, None),
        );
        description = description.with_table(
            Table::new(name, "Attachment")
                .with_field("title", FieldInfo::literal("Title"))
                .with_field("mimetype", FieldInfo::literal("Mime Type")),
        );
    }

    let description = description
        .with_table(base)
        .with_table(
            Table::new("collectingevent", "Collecting Event")
                .with_field("startdate", FieldInfo::literal("Start Date"))
                .with_field(
                    "collectors",
                    FieldInfo::relationship("Collectors", "collector", Cardinality::OneToMany, None),
                )
                .with_field(
                    "locality",
                    FieldInfo::relationship("Locality", "locality", Cardinality::ManyToOne, None),
                ),
        )
        .with_table(
            Table::new("collector", "Collector")
                .with_field("lastname", FieldInfo::literal("Last Name")),
        )
        .with_table(
            Table::new("locality", "Locality")
                .with_field("latitude1", FieldInfo::literal("Latitude"))
                .with_field("localityname", FieldInfo::literal("Locality Name")),
        )
        .with_table(Table::new("determination", "Determination").with_field(
            "taxon",
            FieldInfo::relationship("Taxon", "taxon", Cardinality::ManyToOne, None),
        ))
        .with_table(
            Table::new("taxon", "Taxon")
                .with_field("author", FieldInfo::literal("Author"))
                .with_field("name", FieldInfo::literal("Name")),
        )
        .with_tree_ranks(
            "taxon",
            vec![TreeRank::new("Kingdom", true), TreeRank::new("Species", false)],
        );

    SchemaGraph::from_description(description).unwrap()
}

/// Build `count` record tables that all reference `agent`, which links back to each of them
fn build_cyclic_schema(count: usize) -> SchemaGraph {
    let mut agent = Table::new("agent", "Agent")
        .with_field("firstname", FieldInfo::literal("First Name"))
        .with_field("lastname", FieldInfo::literal("Last Name"));
    let mut description = SchemaDescription::new();

    for index in 0..count {
        let name = format!("record{}", index);
        let next = format!("record{}", (index + 1) % count);
        let back_reference = format!("{}s", name);
        agent = agent.with_field(
            back_reference.clone(),
            FieldInfo::relationship("Records", name.clone(), Cardinality::OneToMany, Some("createdby")),
        );
        description = description.with_table(
            Table::new(name, "Record")
                .with_field("remarks", FieldInfo::literal("Remarks"))
                .with_field(
                    "createdby",
                    FieldInfo::relationship("Created By", "agent", Cardinality::ManyToOne, Some(&back_reference)),
                )
                .with_field(
                    "modifiedby",
                    FieldInfo::relationship("Modified By", "agent", Cardinality::ManyToOne, None),
                )
                .with_field(
                    "next",
                    FieldInfo::relationship("Next", next, Cardinality::ManyToOne, None),
                ),
        );
    }

    SchemaGraph::from_description(description.with_table(agent)).unwrap()
}

/// Benchmark header normalization
fn bench_preprocess_headers(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocess_headers");
    group.throughput(Throughput::Elements(HEADERS.len() as u64));
    group.bench_function("ten_headers", |b| {
        b.iter(|| black_box(preprocess_headers(HEADERS)));
    });
    group.finish();
}

/// Benchmark full uncached runs for growing schemas
fn bench_map_uncached(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_uncached");

    for extra in [0, 50, 200] {
        let schema = build_schema(extra);
        group.bench_with_input(BenchmarkId::new("extra_tables", extra), &schema, |b, schema| {
            b.iter(|| {
                let params = AutomapperParams::new(HEADERS, "collectionobject");
                let results = Automapper::new(schema, params)
                    .map(MapOptions::uncached())
                    .unwrap();
                black_box(results)
            });
        });
    }

    group.finish();
}

/// Benchmark uncached runs over schemas where every table reaches every other
fn bench_map_cyclic(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_cyclic");

    for count in [4, 16, 64] {
        let schema = build_cyclic_schema(count);
        group.bench_with_input(BenchmarkId::new("record_tables", count), &schema, |b, schema| {
            b.iter(|| {
                let params = AutomapperParams::new(HEADERS, "record0");
                let results = Automapper::new(schema, params)
                    .map(MapOptions::uncached())
                    .unwrap();
                black_box(results)
            });
        });
    }

    group.finish();
}

/// Benchmark repeated runs served from a warm cache
fn bench_map_cached(c: &mut Criterion) {
    let schema = build_schema(50);
    let cache = ResultsCache::new(8);

    c.bench_function("map_cached", |b| {
        b.iter(|| {
            let params = AutomapperParams::new(HEADERS, "collectionobject");
            let results = Automapper::new(&schema, params)
                .with_cache(&cache)
                .map(MapOptions::default())
                .unwrap();
            black_box(results)
        });
    });
}

criterion_group!(
    benches,
    bench_preprocess_headers,
    bench_map_uncached,
    bench_map_cyclic,
    bench_map_cached
);
criterion_main!(benches);
