//! End-to-end walk through one re-encryption run.
//!
//! 1. A dealer stands in for the DKG and hands each of `n` nodes a share
//!    `x_i` of the group secret `x`, publishing commitments to the sharing
//!    polynomial.
//! 2. A writer ElGamal-encrypts a secret point `K` under `X = x·G`, giving
//!    `(U, C) = (r·G, K + r·X)`.
//! 3. A reader with key `Xc = xc·G` asks the roster to re-encrypt `U`.
//!    Every node answers with `x_i·(U + Xc)` and a proof that it used the same
//!    `x_i` as its public share; one node refuses and one lies.
//! 4. The coordinator keeps only verified shares and publishes them once it
//!    holds `t`. The reader interpolates `x·(U + Xc)`, strips `xc·X` and
//!    recovers `K = C − r·X`.

use std::sync::Arc;

use ocs_reencrypt::client::{decrypt_point, encrypt_point, ClientKeypair};
use ocs_reencrypt::cluster::{Fault, LocalCluster};
use ocs_reencrypt::config::ProtocolConfig;
use ocs_reencrypt::curve::{generator, scalar_random};
use ocs_reencrypt::{Outcome, PolicyHook, ReencryptRequest};
use rand_core::SeedableRng;

fn main() {
    ocs_reencrypt::logging::init_tracing(None);

    let n = 7;
    let config = ProtocolConfig::new(n).expect("config");
    let mut rng = rand_chacha::ChaCha20Rng::from_entropy();

    let refuse: PolicyHook = Arc::new(|_: &ReencryptRequest| false);
    let cluster = LocalCluster::new(config.clone(), &mut rng)
        .expect("cluster")
        .with_policy(2, refuse)
        .with_fault(5, Fault::Tampered);

    let group_key = cluster.commitment().public_key();
    let secret = generator() * scalar_random(&mut rng);
    let ciphertext = encrypt_point(&group_key, &secret, &mut rng);

    let reader = ClientKeypair::random(&mut rng);
    let request = ReencryptRequest::new(ciphertext.u, reader.public);
    println!("request {} on {n} nodes, threshold {}", request.id(), config.threshold());

    let report = cluster.run(request, &mut rng).expect("run");
    match &report.outcome {
        Outcome::Reencrypted { shares } => {
            let indices: Vec<u32> = shares.iter().map(|s| s.index).collect();
            println!("verified shares from nodes {indices:?}");
            let recovered = decrypt_point(&reader, &group_key, &ciphertext, shares, config.threshold())
                .expect("decrypt");
            assert_eq!(recovered, secret);
            println!("reader recovered the secret point");
        }
        Outcome::Failed(reason) => println!("re-encryption failed: {reason:?}"),
    }
    println!(
        "{} messages, {} replies handled",
        report.messages_sent, report.events_handled
    );
}
