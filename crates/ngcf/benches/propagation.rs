//! Benchmarks for propagation and scoring
//!
//! Run with: cargo bench --package ngcf
//!
//! Uses a synthetic model so no artifact directory is needed.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ndarray::{Array1, Array2};
use ngcf::{
    Attention, EmbeddingStore, FrozenNorm, LayerParams, Linear, ModelParams, Propagator,
    SparseAdjacency, scorer,
};

const NUM_USERS: usize = 600;
const NUM_ITEMS: usize = 400;
const DIM: usize = 64;
const LAYERS: usize = 3;

fn pseudo(i: usize, salt: usize) -> f32 {
    ((i * 31 + salt * 17) as f32 * 0.013).sin() * 0.1
}

fn synthetic_model() -> (ModelParams, SparseAdjacency) {
    let users = Array2::from_shape_fn((NUM_USERS, DIM), |(r, c)| pseudo(r * DIM + c, 1));
    let items = Array2::from_shape_fn((NUM_ITEMS, DIM), |(r, c)| pseudo(r * DIM + c, 2));
    let layers = (0..LAYERS)
        .map(|k| LayerParams {
            w: Linear::new(
                Array2::from_shape_fn((DIM, DIM), |(r, c)| pseudo(r * DIM + c, 3 + k)),
                Array1::zeros(DIM),
            )
            .expect("w shape"),
            w_self: Linear::new(
                Array2::from_shape_fn((DIM, DIM), |(r, c)| pseudo(r * DIM + c, 7 + k)),
                Array1::zeros(DIM),
            )
            .expect("w_self shape"),
            attn: Attention::new(
                Array1::from_shape_fn(DIM, |i| pseudo(i, 11)),
                Array1::from_shape_fn(DIM, |i| pseudo(i, 13)),
                0.0,
            )
            .expect("attn shape"),
            norm: FrozenNorm::identity(DIM),
        })
        .collect();
    let params = ModelParams::new(users, items, layers).expect("synthetic model");

    // every user interacts with ~20 items
    let interactions =
        (0..NUM_USERS).flat_map(|u| (0..20).map(move |j| (u, (u * 7 + j * 13) % NUM_ITEMS)));
    let adjacency =
        SparseAdjacency::from_interactions(NUM_USERS, NUM_ITEMS, interactions).expect("graph");
    (params, adjacency)
}

fn bench_propagation(c: &mut Criterion) {
    let (params, adjacency) = synthetic_model();
    let propagator = Propagator::new(params);

    c.bench_function("propagate_full_model", |b| {
        b.iter(|| {
            let store = propagator.run(black_box(&adjacency)).unwrap();
            black_box(store)
        })
    });
}

fn bench_scoring(c: &mut Criterion) {
    let (params, adjacency) = synthetic_model();
    let store: EmbeddingStore = Propagator::new(params).run(&adjacency).unwrap();

    c.bench_function("score_user_top_10", |b| {
        b.iter(|| {
            let user = store.user_vector(black_box(42)).unwrap();
            black_box(scorer::score_user_against_items(user, store.items(), 10).unwrap())
        })
    });
}

criterion_group!(benches, bench_propagation, bench_scoring);
criterion_main!(benches);
