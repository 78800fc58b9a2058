//! A whole roster in one process: coordinator at node 0, participants built
//! through the [`ProtocolRegistry`], wired over [`InMemoryTransport`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand_core::RngCore;
use tracing::debug;

use crate::aggregator::{Outcome, ReplyEvent};
use crate::commitment::{deal, PublicCommitment, SecretShare};
use crate::config::ProtocolConfig;
use crate::coordinator::Coordinator;
use crate::curve::generator;
use crate::messages::{ProtocolMessage, ReencryptReply, ReencryptRequest};
use crate::node::{NodeContext, ProtocolRegistry, OCS_PROTOCOL};
use crate::reencrypt::PolicyHook;
use crate::transport::{InMemoryTransport, TreeTransport};
use crate::types::{Error, NodeId};

pub const ROOT: NodeId = 0;

/// How a participant misbehaves in a simulated run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Receives the request but never answers; reported as a transport failure.
    Offline,
    /// Cannot be reached at broadcast time.
    Unreachable,
    /// Answers with a corrupted share value.
    Tampered,
}

#[derive(Clone, Debug)]
pub struct RunReport {
    pub outcome: Outcome,
    /// Messages the transport delivered, requests and replies together.
    pub messages_sent: usize,
    /// Replies and failures the coordinator processed before the run ended.
    pub events_handled: usize,
}

pub struct LocalCluster {
    config: ProtocolConfig,
    commitment: Arc<PublicCommitment>,
    shares: Vec<SecretShare>,
    registry: ProtocolRegistry,
    policies: HashMap<NodeId, PolicyHook>,
    faults: HashMap<NodeId, Fault>,
}

impl LocalCluster {
    /// Deals fresh shares for `config.roster_size` nodes.
    pub fn new<R: RngCore + ?Sized>(config: ProtocolConfig, rng: &mut R) -> Result<Self, Error> {
        config.validate()?;
        let (commitment, shares) = deal(config.roster_size, config.threshold(), rng)?;
        Ok(Self {
            config,
            commitment: Arc::new(commitment),
            shares,
            registry: ProtocolRegistry::with_defaults(),
            policies: HashMap::new(),
            faults: HashMap::new(),
        })
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn commitment(&self) -> Arc<PublicCommitment> {
        self.commitment.clone()
    }

    pub fn with_policy(mut self, node: NodeId, policy: PolicyHook) -> Self {
        self.policies.insert(node, policy);
        self
    }

    pub fn with_fault(mut self, node: NodeId, fault: Fault) -> Self {
        self.faults.insert(node, fault);
        self
    }

    pub fn run<R: RngCore>(&self, request: ReencryptRequest, rng: &mut R) -> Result<RunReport, Error> {
        let n = self.config.roster_size as u32;
        let mut transport = InMemoryTransport::<ProtocolMessage>::new(n);
        for (node, fault) in self.faults.iter() {
            if *fault == Fault::Unreachable {
                transport.mark_unreachable(*node);
            }
        }

        let mut coordinator = Coordinator::new(
            ROOT,
            self.shares.first().cloned(),
            self.commitment.clone(),
            self.config.threshold(),
        );
        if let Some(policy) = self.policies.get(&ROOT) {
            coordinator = coordinator.with_policy(policy.clone());
        }
        let (mut run, mut receiver) = coordinator.start(request, &mut transport)?;

        let mut events_handled = 0;
        let unreachable: HashSet<NodeId> = self
            .faults
            .iter()
            .filter(|(_, f)| **f == Fault::Unreachable)
            .map(|(id, _)| *id)
            .collect();
        for child in transport.children(ROOT) {
            if run.is_terminal() {
                break;
            }
            if unreachable.contains(&child) {
                continue;
            }
            let share = self
                .shares
                .get(child as usize)
                .cloned()
                .ok_or_else(|| Error::InvalidParams(format!("no share for node {child}")))?;
            let mut node = self.registry.instantiate(
                OCS_PROTOCOL,
                NodeContext {
                    secret: share,
                    policy: self.policies.get(&child).cloned(),
                },
            )?;
            for (from, msg) in transport.drain_inbox(child) {
                let Some(reply) = node.handle(from, msg, rng)? else {
                    continue;
                };
                match self.faults.get(&child) {
                    Some(Fault::Offline) => {
                        debug!(child, "simulated node stays silent");
                    }
                    Some(Fault::Tampered) => {
                        transport.send(child, from, tamper(reply))?;
                    }
                    _ => transport.send(child, from, reply)?,
                }
            }
            if self.faults.get(&child) == Some(&Fault::Offline) {
                run.handle_event(child, ReplyEvent::TransportFailure)?;
                events_handled += 1;
            }
            for (from, msg) in transport.drain_inbox(ROOT) {
                if run.is_terminal() {
                    break;
                }
                run.handle_message(from, msg)?;
                events_handled += 1;
            }
        }

        let outcome = receiver
            .try_take()
            .ok_or_else(|| Error::InvalidParams("run ended without an outcome".into()))?;
        Ok(RunReport {
            outcome,
            messages_sent: transport.sent_count(),
            events_handled,
        })
    }
}

fn tamper(msg: ProtocolMessage) -> ProtocolMessage {
    match msg {
        ProtocolMessage::Reply(ReencryptReply::Share { mut share, proof }) => {
            share.value += generator();
            ProtocolMessage::Reply(ReencryptReply::Share { share, proof })
        }
        other => other,
    }
}
