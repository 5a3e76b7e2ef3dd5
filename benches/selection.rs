use criterion::{
    criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion, PlotConfiguration,
    Throughput,
};
use refcontainer::{dataspace::Dataspace, selection::Selection};

fn selection_indices(c: &mut Criterion) {
    let plot_config = PlotConfiguration::default().summary_scale(AxisScale::Logarithmic);
    let mut group = c.benchmark_group("selection_indices");
    group.plot_config(plot_config);

    for size in [32u64, 64, 128, 256].iter() {
        let dataspace = Dataspace::new(vec![*size; 3]);
        let hyperslab = Selection::hyperslab(
            &dataspace,
            &[0; 3],
            &[2; 3],
            &[size / 2; 3],
            &[1; 3],
        )
        .unwrap();
        let num_elements = hyperslab.num_elements();
        group.throughput(Throughput::Elements(num_elements));
        group.bench_function(BenchmarkId::new("hyperslab", num_elements), |b| {
            b.iter(|| hyperslab.iter_indices().count());
        });
        group.bench_function(BenchmarkId::new("hyperslab_linearised", num_elements), |b| {
            b.iter(|| hyperslab.iter_linearised_indices().sum::<u64>());
        });

        let points: Vec<Vec<u64>> = hyperslab.iter_indices().collect();
        let points = Selection::points(&dataspace, points).unwrap();
        group.bench_function(BenchmarkId::new("points", num_elements), |b| {
            b.iter(|| points.iter_indices().count());
        });
    }
}

fn selection_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection_codec");
    for num_points in [16u64, 256, 4096].iter() {
        let dataspace = Dataspace::new(vec![*num_points, 4]);
        let points = Selection::points(
            &dataspace,
            (0..*num_points).map(|i| vec![i, i % 4]).collect(),
        )
        .unwrap();
        let encoded = points.encode();
        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_function(BenchmarkId::new("encode", num_points), |b| {
            b.iter(|| points.encode());
        });
        group.bench_function(BenchmarkId::new("decode", num_points), |b| {
            b.iter(|| Selection::decode(&encoded, &dataspace).unwrap());
        });
    }
}

criterion_group!(benches, selection_indices, selection_codec);
criterion_main!(benches);
