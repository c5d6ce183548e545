//! Benchmark: keyed list reconciliation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tive_core::patcher::longest_increasing_subsequence;
use tive_core::{Dom, Key, KeyedListPatcher, NodeGroup};

fn mounted_patcher(dom: &Dom) -> KeyedListPatcher<i64> {
    let list = dom.create_element("ul");
    let anchor = dom.create_comment("");
    dom.append_child(list, anchor);
    let tree = dom.clone();
    let mut patcher = KeyedListPatcher::new(
        dom.clone(),
        move |n: &i64| {
            let li = tree.create_element("li");
            tree.append_child(li, tree.create_text(&n.to_string()));
            Ok(NodeGroup::new([li]))
        },
        |n: &i64| Key::from(*n),
    );
    patcher.mount(list, anchor);
    patcher
}

fn benchmark_lis(c: &mut Criterion) {
    let mut group = c.benchmark_group("lis");
    for size in [100usize, 1_000, 10_000] {
        // Interleave two sorted halves: the worst case for a naive diff.
        let sources: Vec<Option<usize>> = (0..size)
            .map(|i| Some(if i % 2 == 0 { i / 2 } else { size / 2 + i / 2 }))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &sources, |b, sources| {
            b.iter(|| longest_increasing_subsequence(black_box(sources)))
        });
    }
    group.finish();
}

fn benchmark_patch(c: &mut Criterion) {
    let mut group = c.benchmark_group("patch");
    for size in [100i64, 1_000] {
        let forward: Vec<i64> = (0..size).collect();
        let reversed: Vec<i64> = forward.iter().rev().copied().collect();
        let rotated: Vec<i64> = forward[1..].iter().chain(&forward[..1]).copied().collect();

        group.bench_with_input(BenchmarkId::new("unchanged", size), &forward, |b, items| {
            let dom = Dom::new();
            let mut patcher = mounted_patcher(&dom);
            patcher.patch(items).unwrap();
            b.iter(|| patcher.patch(black_box(items)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("rotate", size), &size, |b, _| {
            let dom = Dom::new();
            let mut patcher = mounted_patcher(&dom);
            patcher.patch(&forward).unwrap();
            b.iter(|| {
                patcher.patch(black_box(&rotated)).unwrap();
                patcher.patch(black_box(&forward)).unwrap()
            })
        });
        group.bench_with_input(BenchmarkId::new("reverse", size), &size, |b, _| {
            let dom = Dom::new();
            let mut patcher = mounted_patcher(&dom);
            patcher.patch(&forward).unwrap();
            b.iter(|| {
                patcher.patch(black_box(&reversed)).unwrap();
                patcher.patch(black_box(&forward)).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_lis, benchmark_patch);
criterion_main!(benches);
