use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::{Array1, Array3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tenbilac::config::TrainingConfig;
use tenbilac::data::TrainData;
use tenbilac::model::Model;
use tenbilac::network::{Network, NoiseScales};
use tenbilac::training::Training;

fn noisy_network(mult: bool) -> Network {
    let mut builder = Network::builder().inputs(4).hidden(10);
    if mult {
        builder = builder.hidden_mult(5);
    }
    let mut net = builder.hidden(10).output(2).build().unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    net.addnoise(&NoiseScales::uniform(0.2), &mut rng).unwrap();
    net
}

fn forward_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("forward");
    let inputs = Array3::from_shape_fn((20, 4, 500), |(r, f, c)| {
        ((r * 7 + f * 3 + c) % 11) as f64 / 11.0 - 0.5
    });

    let sum_net = noisy_network(false);
    group.bench_function("sum_layers_20x500", |b| {
        b.iter(|| sum_net.run3(black_box(inputs.view())).unwrap())
    });

    let mult_net = noisy_network(true);
    group.bench_function("with_product_units_20x500", |b| {
        b.iter(|| mult_net.run3(black_box(inputs.view())).unwrap())
    });

    group.finish();
}

fn cost_benchmark(c: &mut Criterion) {
    let inputs = Array3::from_shape_fn((20, 4, 500), |(r, f, c)| {
        ((r * 5 + f + c * 2) % 13) as f64 / 13.0 - 0.5
    });
    let targets = inputs.mean_axis(ndarray::Axis(0)).unwrap().slice_move(ndarray::s![0..2, ..]);
    let data = TrainData::from_arrays(inputs, targets).unwrap();
    let mut training =
        Training::new(noisy_network(false), data, TrainingConfig::default()).unwrap();
    let p: Array1<f64> = training.model().parameters().to_owned();

    c.bench_function("msrb_cost_call", |b| {
        b.iter(|| training.cost(black_box(p.view())).unwrap())
    });
}

criterion_group!(benches, forward_benchmark, cost_benchmark);
criterion_main!(benches);
