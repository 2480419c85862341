use criterion::{black_box, criterion_group, criterion_main, Criterion};
use num_bigint::BigUint;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use ripfe::sampler::{sample_gaussian_int, GaussianSampler};
use ripfe::{CycloRing, PrimeChainRing};

fn bench_ring() -> PrimeChainRing {
    PrimeChainRing::build(12, &(BigUint::from(1u32) << 58), 801).unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
    let ring = bench_ring();
    let mut rng = ChaCha20Rng::from_entropy();

    let coeff = ring.sample_gaussian(1000.0, GaussianSampler::Rounded, &mut rng);
    let eval = ring.forward(&coeff);

    c.bench_function("math::ntt_forward", |b| {
        b.iter(|| ring.forward(black_box(&coeff)));
    });

    c.bench_function("math::ntt_backward", |b| {
        b.iter(|| ring.backward(black_box(&eval)));
    });

    c.bench_function("math::negacyclic_mul", |b| {
        let other = ring.sample_gaussian(1000.0, GaussianSampler::Rounded, &mut rng);
        b.iter(|| ring.negacyclic_mul(black_box(&coeff), black_box(&other)));
    });

    c.bench_function("math::lift_centered", |b| {
        b.iter(|| ring.lift_centered(black_box(&coeff)));
    });

    c.bench_function("sampler::facct_sigma_1e6", |b| {
        b.iter(|| sample_gaussian_int(1_000_000.0, GaussianSampler::Facct, &mut rng));
    });

    c.bench_function("sampler::rounded_sigma_1e6", |b| {
        b.iter(|| sample_gaussian_int(1_000_000.0, GaussianSampler::Rounded, &mut rng));
    });

    c.bench_function("sampler::uniform_eval", |b| {
        b.iter(|| ring.sample_uniform_eval(&mut rng));
    });
}

criterion_group!(benchmark_group, criterion_benchmark);
criterion_main!(benchmark_group);
