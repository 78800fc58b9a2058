//! Tree messaging interface and an in-memory implementation.

use std::collections::{HashSet, VecDeque};

use crate::types::{Error, NodeId};

/// Abstraction over the tree-routing layer, seen from one node.
pub trait TreeTransport<M> {
    /// Size of the full roster, this node included.
    fn roster_size(&self) -> usize;

    /// Nodes directly below `me` in the tree.
    fn children(&self, me: NodeId) -> Vec<NodeId>;

    /// Deliver `msg` from `from` to `to`.
    fn send(&mut self, from: NodeId, to: NodeId, msg: M) -> Result<(), Error>;

    /// Drain all messages destined for `to`.
    fn drain_inbox(&mut self, to: NodeId) -> Vec<(NodeId, M)>;
}

/// Star-shaped in-memory tree rooted at node 0, for tests and simulation.
pub struct InMemoryTransport<M> {
    n: u32,
    inboxes: Vec<VecDeque<(NodeId, M)>>,
    unreachable: HashSet<NodeId>,
    sent: usize,
}

impl<M: Clone> InMemoryTransport<M> {
    /// Create a transport for `n` nodes (IDs 0..n).
    pub fn new(n: u32) -> Self {
        let mut inboxes = Vec::with_capacity(n as usize);
        for _ in 0..n {
            inboxes.push(VecDeque::new());
        }
        Self {
            n,
            inboxes,
            unreachable: HashSet::new(),
            sent: 0,
        }
    }

    /// Sends to `id` will fail from now on.
    pub fn mark_unreachable(&mut self, id: NodeId) {
        self.unreachable.insert(id);
    }

    /// Number of messages successfully delivered so far.
    pub fn sent_count(&self) -> usize {
        self.sent
    }

    fn idx(&self, id: NodeId) -> Result<usize, Error> {
        if id >= self.n {
            return Err(Error::Transport(format!("unknown node {id}")));
        }
        Ok(id as usize)
    }
}

impl<M: Clone> TreeTransport<M> for InMemoryTransport<M> {
    fn roster_size(&self) -> usize {
        self.n as usize
    }

    fn children(&self, me: NodeId) -> Vec<NodeId> {
        if me == 0 {
            (1..self.n).collect()
        } else {
            Vec::new()
        }
    }

    fn send(&mut self, from: NodeId, to: NodeId, msg: M) -> Result<(), Error> {
        let idx = self.idx(to)?;
        if self.unreachable.contains(&to) {
            return Err(Error::Transport(format!("node {to} unreachable")));
        }
        self.inboxes[idx].push_back((from, msg));
        self.sent += 1;
        Ok(())
    }

    fn drain_inbox(&mut self, to: NodeId) -> Vec<(NodeId, M)> {
        let idx = match self.idx(to) {
            Ok(i) => i,
            Err(_) => return Vec::new(),
        };
        self.inboxes[idx].drain(..).collect()
    }
}
