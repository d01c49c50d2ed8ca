use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use xmldom::{NodeId, XmlArena};

/// Element with `size` children alternating element / text
fn wide_element(dom: &mut XmlArena, size: usize) -> NodeId {
    let root = dom.new_element("root").unwrap();
    let mut children = Vec::with_capacity(size);
    for i in 0..size {
        let child = if i % 2 == 0 {
            dom.new_element("item").unwrap()
        } else {
            dom.new_text("filler").unwrap()
        };
        children.push(child);
    }
    dom.add_contents(root, children).unwrap();
    root
}

fn benchmark_views(c: &mut Criterion) {
    let mut group = c.benchmark_group("children_view");
    for size in [16usize, 256, 4096] {
        let mut dom = XmlArena::new();
        let root = wide_element(&mut dom, size);
        let view = dom.children(root).unwrap();
        let len = view.len(&dom).unwrap();

        group.bench_with_input(BenchmarkId::new("positional_get", size), &size, |b, _| {
            b.iter(|| {
                for i in 0..len {
                    black_box(view.get(&dom, i).unwrap());
                }
            })
        });

        group.bench_with_input(BenchmarkId::new("cursor", size), &size, |b, _| {
            b.iter(|| {
                let mut cursor = view.cursor(&dom).unwrap();
                while let Some(id) = cursor.next(&dom).unwrap() {
                    black_box(id);
                }
            })
        });

        group.bench_with_input(BenchmarkId::new("iter", size), &size, |b, _| {
            b.iter(|| black_box(view.iter(&dom).unwrap().count()))
        });
    }
    group.finish();
}

fn benchmark_descendants(c: &mut Criterion) {
    let mut dom = XmlArena::new();
    let root = wide_element(&mut dom, 64);
    let items: Vec<_> = dom.children(root).unwrap().to_vec(&dom).unwrap();
    for item in items {
        let nested = wide_element(&mut dom, 64);
        dom.add_content(item, nested).unwrap();
    }

    c.bench_function("descendants_4k", |b| {
        b.iter(|| black_box(dom.descendants(root).unwrap().count()))
    });
}

criterion_group!(benches, benchmark_views, benchmark_descendants);
criterion_main!(benches);
