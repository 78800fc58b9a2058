//! Reply accumulation at the coordinator.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::commitment::PublicCommitment;
use crate::curve::Point;
use crate::messages::{ReencryptReply, RequestId};
use crate::proof::verify;
use crate::reencrypt::PartialShare;
use crate::types::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// The coordinator's own policy hook declined the request.
    PolicyRejected,
    /// Too many refusals or missing replies to ever reach the threshold.
    ThresholdUnreachable,
}

/// Final result of a run, published exactly once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Verified shares, the coordinator's own included, ordered by index.
    Reencrypted { shares: Vec<PartialShare> },
    Failed(FailureReason),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Reencrypted { .. })
    }

    pub fn shares(&self) -> &[PartialShare] {
        match self {
            Outcome::Reencrypted { shares } => shares,
            Outcome::Failed(_) => &[],
        }
    }
}

/// What the transport reported for one child.
#[derive(Clone, Debug)]
pub enum ReplyEvent {
    Reply(ReencryptReply),
    TransportFailure,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    AwaitingReplies,
    Succeeded,
    Failed,
}

/// Collects child replies for one run until quorum or unavoidable failure.
pub struct QuorumAggregator {
    request: RequestId,
    commitment: Arc<PublicCommitment>,
    u: Point,
    xc: Point,
    threshold: usize,
    children: BTreeSet<NodeId>,
    own: PartialShare,
    accepted: BTreeMap<NodeId, PartialShare>,
    responded: HashSet<NodeId>,
    failures: usize,
    outcome: Option<Outcome>,
}

impl QuorumAggregator {
    /// `children` are the nodes the request was broadcast to; events from
    /// any other sender are dropped.
    pub fn new(
        request: RequestId,
        commitment: Arc<PublicCommitment>,
        u: Point,
        xc: Point,
        threshold: usize,
        children: &[NodeId],
        own: PartialShare,
    ) -> Self {
        let mut agg = Self {
            request,
            commitment,
            u,
            xc,
            threshold,
            children: children.iter().copied().collect(),
            own,
            accepted: BTreeMap::new(),
            responded: HashSet::new(),
            failures: 0,
            outcome: None,
        };
        agg.settle();
        agg
    }

    /// Refusals and transport failures tolerated before the run fails.
    ///
    /// Children must supply `threshold - 1` shares, so at most
    /// `children - (threshold - 1)` of them may drop out. For a flat tree of
    /// `n - 1` children this is `floor((n-1)/3)`.
    pub fn failure_budget(&self) -> usize {
        (self.children.len() + 1).saturating_sub(self.threshold)
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn status(&self) -> RunStatus {
        match &self.outcome {
            None => RunStatus::AwaitingReplies,
            Some(o) if o.is_success() => RunStatus::Succeeded,
            Some(_) => RunStatus::Failed,
        }
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn into_outcome(self) -> Option<Outcome> {
        self.outcome
    }

    pub fn handle(&mut self, from: NodeId, event: ReplyEvent) -> RunStatus {
        if self.outcome.is_some() {
            debug!(request = %self.request, from, "late reply ignored");
            return self.status();
        }
        if !self.children.contains(&from) {
            warn!(request = %self.request, from, "reply from a node outside the run ignored");
            return self.status();
        }
        if !self.responded.insert(from) {
            debug!(request = %self.request, from, "duplicate reply ignored");
            return self.status();
        }
        match event {
            ReplyEvent::TransportFailure => {
                debug!(request = %self.request, from, "no reply from node");
                self.failures += 1;
            }
            ReplyEvent::Reply(ReencryptReply::Refused) => {
                debug!(request = %self.request, from, "node refused to reply");
                self.failures += 1;
            }
            ReplyEvent::Reply(ReencryptReply::Share { share, proof }) => {
                if share.index == self.own.index || self.accepted.contains_key(&share.index) {
                    debug!(request = %self.request, index = share.index, "duplicate share ignored");
                } else if let Err(err) =
                    verify(&self.commitment, &share, &proof, &self.u, &self.xc)
                {
                    warn!(request = %self.request, from, %err, "received invalid share");
                } else {
                    self.accepted.insert(share.index, share);
                }
            }
        }
        self.settle();
        self.status()
    }

    fn settle(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        let needed = self.threshold.saturating_sub(1);
        if self.accepted.len() >= needed {
            let mut shares = Vec::with_capacity(self.accepted.len() + 1);
            shares.push(self.own);
            shares.extend(self.accepted.values().copied());
            shares.sort_by_key(|s| s.index);
            info!(request = %self.request, shares = shares.len(), "re-encryption succeeded");
            self.outcome = Some(Outcome::Reencrypted { shares });
            return;
        }
        let outstanding = self.children.len().saturating_sub(self.responded.len());
        if self.failures > self.failure_budget() || self.accepted.len() + outstanding < needed {
            warn!(
                request = %self.request,
                failures = self.failures,
                accepted = self.accepted.len(),
                "couldn't get enough shares"
            );
            self.outcome = Some(Outcome::Failed(FailureReason::ThresholdUnreachable));
        }
    }
}
