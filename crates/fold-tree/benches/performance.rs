use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use fold_tree::{BraceLexer, FoldedDocument, FoldingTree};

fn large_source(function_count: usize) -> String {
    let mut out = String::with_capacity(function_count * 96);
    for i in 0..function_count {
        out.push_str(&format!("fn function_{i:05}() {{\n"));
        out.push_str("    if ready {\n");
        out.push_str("        work();\n");
        out.push_str("    } else {\n");
        out.push_str("        wait();\n");
        out.push_str("    }\n");
        out.push_str("}\n");
    }
    out
}

fn bench_initial_scan(c: &mut Criterion) {
    let text = large_source(5_000);
    c.bench_function("initial_scan/35k_lines", |b| {
        b.iter(|| {
            let doc = FoldedDocument::new(black_box(&text), BraceLexer);
            black_box(doc.tree().region_count());
        })
    });
}

fn bench_typing_braces_in_middle(c: &mut Criterion) {
    let text = large_source(5_000);
    c.bench_function("typing_middle/50_brace_pairs", |b| {
        b.iter_batched(
            || FoldedDocument::new(&text, BraceLexer),
            |mut doc| {
                let mut offset = doc.text().len() / 2;
                for _ in 0..50 {
                    doc.insert(offset, "{\n").unwrap();
                    offset += 2;
                    doc.insert(offset, "}\n").unwrap();
                    offset += 2;
                }
                black_box(doc.tree().region_count());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_line_translation(c: &mut Criterion) {
    let text = large_source(5_000);
    let mut doc = FoldedDocument::new(&text, BraceLexer);
    for function in (0..5_000).step_by(2) {
        doc.tree_mut().toggle_region_visibility(function * 7);
    }
    let tree: &mut FoldingTree = doc.tree_mut();

    c.bench_function("translation/virtual_and_real", |b| {
        b.iter(|| {
            for real in (0..35_000).step_by(97) {
                let virtual_line = tree.virtual_line(black_box(real));
                black_box(tree.real_line(virtual_line));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_initial_scan,
    bench_typing_braces_in_middle,
    bench_line_translation
);
criterion_main!(benches);
