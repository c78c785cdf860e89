use criterion::{Criterion, black_box, criterion_group, criterion_main};
use figcheck::diff::compare_files;
use figcheck::render::plot_series;

fn benchmark_compare(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let result = dir.path().join("result.png");
    let baseline = dir.path().join("baseline.png");
    std::fs::write(&result, plot_series(&[1.0, 2.0, 2.0]).to_png().unwrap()).unwrap();
    std::fs::write(&baseline, plot_series(&[1.0, 2.0, 3.0]).to_png().unwrap()).unwrap();

    c.bench_function("pixel_compare", |b| {
        b.iter(|| {
            let cmp = compare_files(black_box(&result), black_box(&baseline), 2.0);
            assert!(cmp.is_ok());
        })
    });
}

criterion_group!(benches, benchmark_compare);
criterion_main!(benches);
