//! Criterion benchmarks for the step function and path scoring.
//!
//! Run with:
//!   cargo bench
//!
//! Results are saved to target/criterion/

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use gridplay::env::Session;
use gridplay::grid::{Direction, Grid, GridMap, Pos};
use gridplay::policy::{greedy_path, score_path, QTable};
use gridplay::rules::RuleSet;

/// Open `size`x`size` floor, start top-left, goal bottom-right, a collectible
/// on every fifth cell of the diagonal.
fn make_map(size: usize) -> Arc<GridMap> {
    let text: Vec<String> = (0..size)
        .map(|i| {
            (0..size)
                .map(|j| match (i, j) {
                    (0, 0) => 'S',
                    _ if i == size - 1 && j == size - 1 => 'G',
                    _ if i == j && i % 5 == 0 => 'R',
                    _ => '0',
                })
                .collect()
        })
        .collect();
    let grid = Grid::from_text(&text.join("\n")).unwrap();
    Arc::new(GridMap::new("bench", grid).unwrap())
}

fn rules() -> RuleSet {
    RuleSet {
        step_decay: 0.999,
        max_steps: 10_000,
        ..RuleSet::default()
    }
}

/// Staircase Q-table: right on even diagonals, down on odd ones.
fn staircase(size: usize) -> QTable {
    let mut q = QTable::default();
    for i in 0..size {
        for j in 0..size {
            let dir = if (i + j) % 2 == 0 { Direction::Right } else { Direction::Down };
            q.insert(Pos::new(i, j), dir, 1.0);
            q.insert(Pos::new(i, j), Direction::Up, 0.0);
        }
    }
    q
}

/// Benchmark step() bouncing along the first row.
fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");

    for size in [8usize, 32, 128].iter() {
        group.bench_with_input(BenchmarkId::new("walk", size), size, |b, &size| {
            let mut session = Session::new(make_map(size), rules()).unwrap();
            let mut dir = Direction::Right;
            b.iter(|| {
                if session.is_terminated() {
                    session.restart();
                }
                let r = session.step(dir).unwrap();
                if r.position.col == size - 1 || r.position.col == 0 {
                    dir = if dir == Direction::Right { Direction::Left } else { Direction::Right };
                }
                black_box(r.score)
            });
        });
    }

    group.finish();
}

/// Benchmark greedy rollout and scoring of the resulting path.
fn bench_rollout(c: &mut Criterion) {
    let mut group = c.benchmark_group("rollout");

    for size in [8usize, 32, 50].iter() {
        let map = make_map(*size);
        let q = staircase(*size);
        group.throughput(Throughput::Elements(greedy_path(&map, &q).len() as u64));

        group.bench_with_input(BenchmarkId::new("greedy_path", size), size, |b, _| {
            b.iter(|| black_box(greedy_path(&map, &q).len()));
        });
        group.bench_with_input(BenchmarkId::new("score_path", size), size, |b, _| {
            let path = greedy_path(&map, &q);
            b.iter(|| black_box(score_path(Arc::clone(&map), rules(), &path).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_step, bench_rollout);
criterion_main!(benches);
