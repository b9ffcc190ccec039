//! Benchmarks for the generation pipeline.
//!
//! Run with: cargo bench --bench generation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use grotto::{
    classify_tiles, generate_dungeon, grow_caves, Alea, CaveTile, Circle, GenerationConfig,
    Generator, GraphGenerator, MapGraph, RoomCarver, TileGrid, TileType,
};
use rand::SeedableRng;

fn benchmark_graph(c: &mut Criterion) {
    let config = GenerationConfig::default();
    let generator = GraphGenerator::new();

    c.bench_function("graph_500x500_15_rooms", |b| {
        let mut seed = 0u64;
        b.iter(|| {
            seed = seed.wrapping_add(1);
            black_box(generator.generate(&config, &mut Alea::seed_from_u64(seed)))
        });
    });
}

fn benchmark_room_carving(c: &mut Criterion) {
    let mut group = c.benchmark_group("room_carving");
    let carver = RoomCarver::new();

    for radius in [10, 50, 100] {
        let mut graph = MapGraph::new();
        let vertex = graph.add_vertex(Circle::new(radius + 1, radius + 1, radius));
        group.bench_with_input(BenchmarkId::from_parameter(radius), &radius, |b, _| {
            let mut rng = Alea::seed_from_u64(7);
            b.iter(|| black_box(carver.carve(&graph, vertex, &mut rng)));
        });
    }

    group.finish();
}

fn benchmark_automaton(c: &mut Criterion) {
    let mut tiles = TileGrid::square(201, CaveTile::Floor);
    for y in 0..201 {
        for x in 0..201 {
            if (x * 31 + y * 17) % 7 == 0 {
                tiles.set(x, y, CaveTile::Rock);
            }
        }
    }

    c.bench_function("automaton_201x201_one_step", |b| {
        b.iter(|| black_box(grow_caves(tiles.clone(), 1)));
    });
}

fn benchmark_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("dungeon");
    group.sample_size(10);

    let config = GenerationConfig::default().with_random_state("!rnd,1,0.1,0.2,0.3");
    group.bench_function("500x500_15_rooms", |b| {
        b.iter(|| black_box(generate_dungeon(&config)));
    });

    group.finish();
}

fn benchmark_classification(c: &mut Criterion) {
    let config = GenerationConfig::for_testing();
    let tiles = match generate_dungeon(&config) {
        Ok(dungeon) => dungeon.tiles,
        Err(_) => TileGrid::new(200, 200, TileType::Wall),
    };
    let groups = TileType::default_tile_groups();

    c.bench_function("classify_200x200", |b| {
        b.iter(|| black_box(classify_tiles(&tiles, &groups, 0)));
    });
}

criterion_group!(
    benches,
    benchmark_graph,
    benchmark_room_carving,
    benchmark_automaton,
    benchmark_full_pipeline,
    benchmark_classification,
);
criterion_main!(benches);
