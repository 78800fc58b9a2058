use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ocs_reencrypt::client::{decrypt_point, encrypt_point, ClientKeypair};
use ocs_reencrypt::cluster::{Fault, LocalCluster, ROOT};
use ocs_reencrypt::commitment::deal;
use ocs_reencrypt::config::ProtocolConfig;
use ocs_reencrypt::curve::{generator, scalar_random};
use ocs_reencrypt::node::{NodeContext, ProtocolRegistry, OCS_PROTOCOL};
use ocs_reencrypt::signal::outcome_channel;
use ocs_reencrypt::transport::{InMemoryTransport, TreeTransport};
use ocs_reencrypt::types::Error;
use ocs_reencrypt::{
    Coordinator, FailureReason, Outcome, PolicyHook, ProtocolMessage, ReencryptRequest, RunStatus,
};
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;

fn deny() -> PolicyHook {
    Arc::new(|_: &ReencryptRequest| false)
}

fn random_request(rng: &mut ChaCha20Rng) -> ReencryptRequest {
    let u = generator() * scalar_random(rng);
    let xc = generator() * scalar_random(rng);
    ReencryptRequest::new(u, xc)
}

fn cluster(n: usize, seed: u64) -> (LocalCluster, ChaCha20Rng) {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let config = ProtocolConfig::new(n).expect("config");
    let cluster = LocalCluster::new(config, &mut rng).expect("cluster");
    (cluster, rng)
}

#[test]
fn one_refusal_still_reaches_quorum() {
    let (cluster, mut rng) = cluster(4, 1);
    let cluster = cluster.with_policy(1, deny());
    let request = random_request(&mut rng);
    let report = cluster.run(request, &mut rng).expect("run");
    assert!(report.outcome.is_success());
    let indices: Vec<u32> = report.outcome.shares().iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![0, 2, 3]);
}

#[test]
fn two_refusals_exhaust_the_budget() {
    let (cluster, mut rng) = cluster(4, 2);
    let cluster = cluster.with_policy(1, deny()).with_policy(2, deny());
    let request = random_request(&mut rng);
    let report = cluster.run(request, &mut rng).expect("run");
    assert_eq!(
        report.outcome,
        Outcome::Failed(FailureReason::ThresholdUnreachable)
    );
    // The third node's reply was never needed.
    assert_eq!(report.events_handled, 2);
}

#[test]
fn root_policy_rejection_sends_nothing() {
    let (cluster, mut rng) = cluster(4, 3);
    let cluster = cluster.with_policy(ROOT, deny());
    let request = random_request(&mut rng);
    let report = cluster.run(request, &mut rng).expect("run");
    assert_eq!(report.outcome, Outcome::Failed(FailureReason::PolicyRejected));
    assert_eq!(report.messages_sent, 0);
    assert_eq!(report.events_handled, 0);
}

#[test]
fn policy_is_consulted_once_per_node() {
    let (cluster, mut rng) = cluster(4, 4);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let counting: PolicyHook = Arc::new(move |_: &ReencryptRequest| {
        counter.fetch_add(1, Ordering::SeqCst);
        true
    });
    let mut cluster = cluster;
    for id in 0..4 {
        cluster = cluster.with_policy(id, counting.clone());
    }
    let request = random_request(&mut rng);
    let report = cluster.run(request, &mut rng).expect("run");
    assert!(report.outcome.is_success());
    // Root plus the two children needed for quorum.
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn tampered_reply_is_excluded() {
    let (cluster, mut rng) = cluster(4, 5);
    let cluster = cluster.with_fault(1, Fault::Tampered);
    let request = random_request(&mut rng);
    let report = cluster.run(request, &mut rng).expect("run");
    assert!(report.outcome.is_success());
    assert!(report.outcome.shares().iter().all(|s| s.index != 1));
    assert_eq!(report.outcome.shares().len(), 3);
}

#[test]
fn offline_node_within_tolerance() {
    let (cluster, mut rng) = cluster(7, 6);
    let cluster = cluster
        .with_fault(2, Fault::Offline)
        .with_fault(5, Fault::Offline);
    let request = random_request(&mut rng);
    let report = cluster.run(request, &mut rng).expect("run");
    assert!(report.outcome.is_success());
    assert_eq!(report.outcome.shares().len(), 5);
}

#[test]
fn unreachable_within_tolerance_counts_as_failure() {
    let (cluster, mut rng) = cluster(4, 7);
    let cluster = cluster
        .with_fault(1, Fault::Unreachable)
        .with_policy(2, deny());
    let request = random_request(&mut rng);
    let report = cluster.run(request, &mut rng).expect("run");
    assert_eq!(
        report.outcome,
        Outcome::Failed(FailureReason::ThresholdUnreachable)
    );
}

#[test]
fn too_many_unreachable_is_a_broadcast_error() {
    let (cluster, mut rng) = cluster(4, 8);
    let cluster = cluster
        .with_fault(1, Fault::Unreachable)
        .with_fault(3, Fault::Unreachable);
    let request = random_request(&mut rng);
    let res = cluster.run(request, &mut rng);
    assert!(matches!(
        res,
        Err(Error::Broadcast {
            failed: 2,
            attempted: 3,
            tolerance: 1
        })
    ));
}

#[test]
fn missing_inputs_fail_before_network() {
    let mut rng = ChaCha20Rng::seed_from_u64(9);
    let (commitment, shares) = deal(4, 3, &mut rng).expect("deal");
    let commitment = Arc::new(commitment);
    let mut transport = InMemoryTransport::<ProtocolMessage>::new(4);

    let no_secret = Coordinator::new(ROOT, None, commitment.clone(), 3);
    let res = no_secret.start(random_request(&mut rng), &mut transport);
    assert!(matches!(res, Err(Error::Precondition(_))));

    let coordinator = Coordinator::new(ROOT, Some(shares[0].clone()), commitment, 3);
    let mut request = random_request(&mut rng);
    request.ciphertext_point = None;
    let res = coordinator.start(request, &mut transport);
    assert!(matches!(res, Err(Error::Precondition(_))));
    assert_eq!(transport.sent_count(), 0);
}

#[test]
fn manual_run_over_transport() {
    let mut rng = ChaCha20Rng::seed_from_u64(10);
    let (commitment, shares) = deal(4, 3, &mut rng).expect("deal");
    let commitment = Arc::new(commitment);
    let mut transport = InMemoryTransport::<ProtocolMessage>::new(4);
    let coordinator = Coordinator::new(ROOT, Some(shares[0].clone()), commitment, 3);
    let (mut run, receiver) = coordinator
        .start(random_request(&mut rng), &mut transport)
        .expect("start");
    assert_eq!(run.status(), RunStatus::AwaitingReplies);
    assert_eq!(transport.sent_count(), 3);

    let registry = ProtocolRegistry::with_defaults();
    for child in transport.children(ROOT) {
        let mut node = registry
            .instantiate(
                OCS_PROTOCOL,
                NodeContext {
                    secret: shares[child as usize].clone(),
                    policy: None,
                },
            )
            .expect("instantiate");
        for (from, msg) in transport.drain_inbox(child) {
            if let Some(reply) = node.handle(from, msg, &mut rng).expect("handle") {
                transport.send(child, from, reply).expect("send");
            }
        }
    }
    for (from, msg) in transport.drain_inbox(ROOT) {
        run.handle_message(from, msg).expect("handle reply");
    }
    assert_eq!(run.status(), RunStatus::Succeeded);
    let outcome = receiver
        .wait_timeout(Duration::from_secs(1))
        .unwrap_or_else(|_| panic!("outcome not published"));
    assert_eq!(outcome.shares().len(), 3);
}

#[test]
fn coordinator_rejects_requests_addressed_to_it() {
    let mut rng = ChaCha20Rng::seed_from_u64(11);
    let (commitment, shares) = deal(4, 3, &mut rng).expect("deal");
    let mut transport = InMemoryTransport::<ProtocolMessage>::new(4);
    let coordinator = Coordinator::new(ROOT, Some(shares[0].clone()), Arc::new(commitment), 3);
    let request = random_request(&mut rng);
    let (mut run, _receiver) = coordinator
        .start(request.clone(), &mut transport)
        .expect("start");
    let res = run.handle_message(1, ProtocolMessage::Reencrypt(request));
    assert!(matches!(res, Err(Error::InvalidMessage(_))));
}

#[test]
fn client_recovers_secret_from_published_shares() {
    let (cluster, mut rng) = cluster(7, 12);
    let cluster = cluster.with_policy(3, deny()).with_fault(6, Fault::Tampered);
    let group_key = cluster.commitment().public_key();
    let secret = generator() * scalar_random(&mut rng);
    let ciphertext = encrypt_point(&group_key, &secret, &mut rng);
    let client = ClientKeypair::random(&mut rng);

    let report = cluster
        .run(ReencryptRequest::new(ciphertext.u, client.public), &mut rng)
        .expect("run");
    let shares = report.outcome.shares();
    let threshold = cluster.config().threshold();
    assert!(shares.len() >= threshold);
    let recovered =
        decrypt_point(&client, &group_key, &ciphertext, shares, threshold).expect("decrypt");
    assert_eq!(recovered, secret);

    let stranger = ClientKeypair::random(&mut rng);
    let wrong = decrypt_point(&stranger, &group_key, &ciphertext, shares, threshold)
        .expect("decrypt");
    assert_ne!(wrong, secret);
}

#[test]
fn outcome_is_published_once() {
    let (publisher, receiver) = outcome_channel();
    publisher
        .publish(Outcome::Failed(FailureReason::ThresholdUnreachable))
        .expect("first publish");
    let second = publisher.publish(Outcome::Reencrypted { shares: vec![] });
    assert_eq!(second, Err(Error::OutcomePublished));
    assert_eq!(
        receiver.wait(),
        Ok(Outcome::Failed(FailureReason::ThresholdUnreachable))
    );
}

#[test]
fn outcome_wait_across_threads() {
    let (publisher, receiver) = outcome_channel();
    let waiter = std::thread::spawn(move || receiver.wait());
    publisher
        .publish(Outcome::Failed(FailureReason::PolicyRejected))
        .expect("publish");
    let outcome = waiter.join().expect("join");
    assert_eq!(outcome, Ok(Outcome::Failed(FailureReason::PolicyRejected)));
}

#[test]
fn waiter_released_when_run_is_dropped_undecided() {
    let mut rng = ChaCha20Rng::seed_from_u64(14);
    let (commitment, shares) = deal(4, 3, &mut rng).expect("deal");
    let mut transport = InMemoryTransport::<ProtocolMessage>::new(4);
    let coordinator = Coordinator::new(ROOT, Some(shares[0].clone()), Arc::new(commitment), 3);
    let (run, receiver) = coordinator
        .start(random_request(&mut rng), &mut transport)
        .expect("start");
    assert_eq!(run.status(), RunStatus::AwaitingReplies);

    let waiter = std::thread::spawn(move || receiver.wait());
    drop(run);
    assert_eq!(waiter.join().expect("join"), Err(Error::OutcomeAbandoned));
}

#[test]
fn cloned_publisher_keeps_the_channel_open() {
    let (publisher, receiver) = outcome_channel();
    let second = publisher.clone();
    drop(publisher);
    second
        .publish(Outcome::Failed(FailureReason::PolicyRejected))
        .expect("publish");
    drop(second);
    assert_eq!(receiver.wait(), Ok(Outcome::Failed(FailureReason::PolicyRejected)));
}

#[test]
fn threshold_below_commitment_degree_is_rejected() {
    let mut rng = ChaCha20Rng::seed_from_u64(15);
    let (commitment, shares) = deal(7, 5, &mut rng).expect("deal");
    let mut transport = InMemoryTransport::<ProtocolMessage>::new(7);
    let coordinator = Coordinator::new(ROOT, Some(shares[0].clone()), Arc::new(commitment), 4);
    let res = coordinator.start(random_request(&mut rng), &mut transport);
    assert!(matches!(res, Err(Error::InvalidParams(_))));
    assert_eq!(transport.sent_count(), 0);
}

#[test]
fn registry_rejects_unknown_and_duplicate_protocols() {
    let mut rng = ChaCha20Rng::seed_from_u64(13);
    let (_, shares) = deal(4, 3, &mut rng).expect("deal");
    let mut registry = ProtocolRegistry::with_defaults();
    assert!(registry.contains(OCS_PROTOCOL));
    let ctx = NodeContext {
        secret: shares[1].clone(),
        policy: None,
    };
    assert!(matches!(
        registry.instantiate("unknown", ctx),
        Err(Error::UnknownProtocol(_))
    ));
    let factory: ocs_reencrypt::node::NodeFactory =
        |ctx| Box::new(ocs_reencrypt::node::ReencryptNode::new(ctx));
    assert!(registry.register(OCS_PROTOCOL, factory).is_err());
    assert!(registry.register("ocs-v2", factory).is_ok());
}
