use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use ocs_reencrypt::cluster::LocalCluster;
use ocs_reencrypt::commitment::deal;
use ocs_reencrypt::config::ProtocolConfig;
use ocs_reencrypt::curve::{generator, scalar_random};
use ocs_reencrypt::proof::{prove, verify};
use ocs_reencrypt::reencrypt::partial_reencrypt;
use ocs_reencrypt::ReencryptRequest;
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use std::time::Duration;

fn bench_proof(c: &mut Criterion) {
    let mut rng = ChaCha20Rng::seed_from_u64(42);
    let (commitment, shares) = deal(16, 11, &mut rng).expect("deal");
    let u = generator() * scalar_random(&mut rng);
    let xc = generator() * scalar_random(&mut rng);
    let ui = partial_reencrypt(&shares[3], &u, &xc);
    let proof = prove(&shares[3].scalar, &ui, &u, &xc, &mut rng).expect("prove");

    let mut group = c.benchmark_group("proof");
    group.bench_function("prove", |b| {
        b.iter(|| prove(&shares[3].scalar, &ui, &u, &xc, &mut rng).expect("prove"))
    });
    group.bench_function("verify", |b| {
        b.iter(|| verify(&commitment, &ui, &proof, &u, &xc).expect("verify"))
    });
    group.finish();
}

fn bench_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("protocol_run");
    group.measurement_time(Duration::from_secs(10));
    for n in [4usize, 16, 64] {
        let mut rng = ChaCha20Rng::seed_from_u64(n as u64);
        let cluster =
            LocalCluster::new(ProtocolConfig::new(n).expect("config"), &mut rng).expect("cluster");
        group.bench_function(format!("n={n}"), |b| {
            b.iter_batched(
                || {
                    let u = generator() * scalar_random(&mut rng);
                    let xc = generator() * scalar_random(&mut rng);
                    (ReencryptRequest::new(u, xc), ChaCha20Rng::seed_from_u64(7))
                },
                |(request, mut run_rng)| cluster.run(request, &mut run_rng).expect("run"),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_proof, bench_run);
criterion_main!(benches);
