use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scribe_core::{Document, DocumentHandle, DocumentOptions, EditModel, Loader, ViewOptions};

fn large_text(line_count: usize) -> String {
    let mut out = String::with_capacity(line_count * 64);
    for i in 0..line_count {
        out.push_str(&format!(
            "{i:06} the quick brown fox jumps over the lazy dog (scribe-core benchmark line)\n"
        ));
    }
    // No trailing empty line.
    out.pop();
    out
}

fn bench_large_file_load(c: &mut Criterion) {
    let text = large_text(50_000);
    c.bench_function("large_file_load/50k_lines", |b| {
        b.iter(|| {
            let mut loader = Loader::new(text.len(), DocumentOptions::default());
            for chunk in text.as_bytes().chunks(64 * 1024) {
                loader.add_data(chunk);
            }
            let doc = loader.convert_to_document().unwrap();
            black_box(doc.borrow().line_count());
        })
    });
}

fn bench_typing_in_middle(c: &mut Criterion) {
    let text = large_text(50_000);
    c.bench_function("typing_middle/100_chars", |b| {
        b.iter_batched(
            || {
                let doc = DocumentHandle::new(Document::from_text(&text));
                let mut view = EditModel::new(doc.add_ref(), &ViewOptions::default());
                let middle = doc.borrow().line_start(25_000).unwrap();
                view.set_empty_selection(middle).unwrap();
                (doc, view)
            },
            |(doc, mut view)| {
                for _ in 0..100 {
                    view.insert_character('x').unwrap();
                }
                black_box(doc.borrow().length());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_random_edits(c: &mut Criterion) {
    let text = large_text(10_000);
    c.bench_function("random_edits/200_insert_delete", |b| {
        b.iter_batched(
            || (Document::from_text(&text), StdRng::seed_from_u64(1)),
            |(mut doc, mut rng)| {
                for _ in 0..100 {
                    let position = rng.gen_range(0..doc.length());
                    doc.insert_string(position, "edit\n").unwrap();
                    let position = rng.gen_range(0..doc.length() - 5);
                    doc.delete_chars(position, 5).unwrap();
                }
                black_box(doc.line_count());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_line_lookups(c: &mut Criterion) {
    let mut doc = Document::from_text(&large_text(50_000));
    // Leave a pending step in the line table.
    doc.insert_string(10, "\n").unwrap();
    let length = doc.length();
    c.bench_function("line_lookup/1000_positions", |b| {
        b.iter(|| {
            for i in 0..1000 {
                let line = doc.line_from_position(i * length / 1000);
                black_box(doc.line_start(line).unwrap());
            }
        })
    });
}

fn bench_style_fills(c: &mut Criterion) {
    let text = large_text(5_000);
    c.bench_function("style_fill/line_by_line", |b| {
        b.iter_batched(
            || Document::from_text(&text),
            |mut doc| {
                for line in 0..doc.line_count() {
                    let start = doc.line_start(line).unwrap();
                    doc.start_styling(start);
                    doc.set_style_for(6, 1).unwrap();
                    doc.set_style_for(doc.line_end(line).unwrap() - start - 6, 2).unwrap();
                }
                black_box(doc.style_at(doc.length() / 2));
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    benches,
    bench_large_file_load,
    bench_typing_in_middle,
    bench_random_edits,
    bench_line_lookups,
    bench_style_fills
);
criterion_main!(benches);
