use core_text::{Color, StyledRun, decompose, runs_from_ansi};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn sample_runs(lines: usize) -> Vec<StyledRun> {
    let keyword = Color::parse("#c678dd");
    let string = Color::parse("#98c379");
    let mut runs = Vec::with_capacity(lines * 4);
    for i in 0..lines {
        runs.push(StyledRun::new("def", keyword));
        runs.push(StyledRun::plain(format!(" handler_{i}(event):")).with_line_breaks(1));
        runs.push(StyledRun::plain("    return "));
        runs.push(StyledRun::new("\"tracked\"", string).with_line_breaks(1));
    }
    runs
}

fn decompose_bench(c: &mut Criterion) {
    let runs = sample_runs(200);
    c.bench_function("decompose_200_lines", |b| {
        b.iter(|| decompose(black_box(&runs)).map(|units| units.len()))
    });

    let markup = "\x1b[38;2;198;120;221mdef\x1b[0m handler(event):\n".repeat(200);
    c.bench_function("runs_from_ansi_200_lines", |b| {
        b.iter(|| runs_from_ansi(black_box(&markup)).map(|runs| runs.len()))
    });
}

criterion_group!(benches, decompose_bench);
criterion_main!(benches);
