//! Orchestration of one re-encryption run at the root of the tree.
//!
//! A run moves `Idle -> Started -> AwaitingReplies -> {Succeeded | Failed}`.
//! `Coordinator::start` covers the first two steps: it checks preconditions,
//! consults the policy hook, computes the root's own share and broadcasts the
//! request. The returned [`ProtocolRun`] then absorbs replies one at a time
//! until the [`QuorumAggregator`] reaches a terminal decision, which is
//! published exactly once through the [`OutcomeReceiver`].

use std::sync::Arc;

use tracing::{error, info, info_span, warn};

use crate::aggregator::{FailureReason, Outcome, QuorumAggregator, ReplyEvent, RunStatus};
use crate::commitment::{PublicCommitment, SecretShare};
use crate::messages::{ProtocolMessage, ReencryptRequest, RequestId};
use crate::reencrypt::{partial_reencrypt, PolicyHook};
use crate::signal::{outcome_channel, OutcomePublisher, OutcomeReceiver};
use crate::transport::TreeTransport;
use crate::types::{fault_tolerance, validate_threshold, Error, NodeId};

pub struct Coordinator {
    me: NodeId,
    secret: Option<SecretShare>,
    commitment: Arc<PublicCommitment>,
    threshold: usize,
    policy: Option<PolicyHook>,
}

impl Coordinator {
    pub fn new(
        me: NodeId,
        secret: Option<SecretShare>,
        commitment: Arc<PublicCommitment>,
        threshold: usize,
    ) -> Self {
        Self {
            me,
            secret,
            commitment,
            threshold,
            policy: None,
        }
    }

    pub fn with_policy(mut self, policy: PolicyHook) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Starts a run for `request` and broadcasts it to the root's children.
    ///
    /// Only precondition and broadcast failures are returned as errors; a
    /// policy rejection yields a run that is already `Failed`.
    pub fn start<T: TreeTransport<ProtocolMessage>>(
        &self,
        request: ReencryptRequest,
        transport: &mut T,
    ) -> Result<(ProtocolRun, OutcomeReceiver), Error> {
        let secret = self
            .secret
            .as_ref()
            .ok_or(Error::Precondition("please initialize the secret share first"))?;
        let u = request
            .ciphertext_point
            .ok_or(Error::Precondition("please initialize the ciphertext point first"))?;
        let roster = transport.roster_size();
        validate_threshold(roster, self.threshold)?;
        if self.threshold < self.commitment.threshold() {
            return Err(Error::InvalidParams(format!(
                "threshold {} is below the {} shares the commitment requires",
                self.threshold,
                self.commitment.threshold()
            )));
        }

        let id = request.id();
        let span = info_span!("reencrypt", request = %id);
        let _enter = span.enter();
        info!(roster, threshold = self.threshold, "starting protocol");

        let (publisher, receiver) = outcome_channel();
        if let Some(policy) = &self.policy {
            if !policy(&request) {
                warn!("refused to reencrypt");
                publisher.publish(Outcome::Failed(FailureReason::PolicyRejected))?;
                let run = ProtocolRun {
                    id,
                    aggregator: None,
                    status: RunStatus::Failed,
                    publisher,
                };
                return Ok((run, receiver));
            }
        }

        let own = partial_reencrypt(secret, &u, &request.client_key);
        let children = transport.children(self.me);
        let message = ProtocolMessage::Reencrypt(request.clone());
        let mut unreachable = Vec::new();
        for child in children.iter() {
            if let Err(err) = transport.send(self.me, *child, message.clone()) {
                warn!(child, %err, "broadcast to node failed");
                unreachable.push(*child);
            }
        }
        let tolerance = fault_tolerance(roster);
        if unreachable.len() > tolerance {
            error!(failed = unreachable.len(), tolerance, "too many nodes failed in broadcast");
            return Err(Error::Broadcast {
                failed: unreachable.len(),
                attempted: children.len(),
                tolerance,
            });
        }

        let mut aggregator = QuorumAggregator::new(
            id,
            self.commitment.clone(),
            u,
            request.client_key,
            self.threshold,
            &children,
            own,
        );
        // Nodes we could not reach will never answer.
        for child in unreachable {
            aggregator.handle(child, ReplyEvent::TransportFailure);
        }
        let mut run = ProtocolRun {
            id,
            aggregator: Some(aggregator),
            status: RunStatus::AwaitingReplies,
            publisher,
        };
        run.publish_if_terminal()?;
        Ok((run, receiver))
    }
}

/// Coordinator-side state of one run.
pub struct ProtocolRun {
    id: RequestId,
    aggregator: Option<QuorumAggregator>,
    status: RunStatus,
    publisher: OutcomePublisher,
}

impl ProtocolRun {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status != RunStatus::AwaitingReplies
    }

    pub fn failures(&self) -> usize {
        self.aggregator.as_ref().map_or(0, |a| a.failures())
    }

    /// Routes one incoming tree message.
    pub fn handle_message(&mut self, from: NodeId, msg: ProtocolMessage) -> Result<RunStatus, Error> {
        match msg {
            ProtocolMessage::Reply(reply) => self.handle_event(from, ReplyEvent::Reply(reply)),
            ProtocolMessage::Reencrypt(_) => {
                Err(Error::InvalidMessage("coordinator received a re-encryption request"))
            }
        }
    }

    pub fn handle_event(&mut self, from: NodeId, event: ReplyEvent) -> Result<RunStatus, Error> {
        if self.is_terminal() {
            return Ok(self.status);
        }
        if let Some(aggregator) = self.aggregator.as_mut() {
            self.status = aggregator.handle(from, event);
        }
        self.publish_if_terminal()?;
        Ok(self.status)
    }

    fn publish_if_terminal(&mut self) -> Result<(), Error> {
        let Some(aggregator) = self.aggregator.as_ref() else {
            return Ok(());
        };
        self.status = aggregator.status();
        if let Some(outcome) = aggregator.outcome() {
            if !self.publisher.is_published() {
                self.publisher.publish(outcome.clone())?;
            }
        }
        Ok(())
    }
}
