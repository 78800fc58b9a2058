//! Participant side of the protocol and the registry that builds it.

use std::collections::HashMap;

use rand_core::RngCore;
use tracing::{debug, warn};

use crate::commitment::SecretShare;
use crate::messages::ProtocolMessage;
use crate::reencrypt::{respond, PolicyHook};
use crate::types::{Error, NodeId};

pub const OCS_PROTOCOL: &str = "ocs";

/// A protocol instance living at one tree position.
pub trait ProtocolNode: Send {
    /// Handles one incoming message and returns what to send to the parent, if anything.
    fn handle(
        &mut self,
        from: NodeId,
        msg: ProtocolMessage,
        rng: &mut dyn RngCore,
    ) -> Result<Option<ProtocolMessage>, Error>;
}

/// Everything a node needs to take part in a run.
#[derive(Clone)]
pub struct NodeContext {
    pub secret: SecretShare,
    pub policy: Option<PolicyHook>,
}

/// Non-root participant: answers a request with its share and proof, or refuses.
pub struct ReencryptNode {
    ctx: NodeContext,
    served: bool,
}

impl ReencryptNode {
    pub fn new(ctx: NodeContext) -> Self {
        Self { ctx, served: false }
    }

    pub fn index(&self) -> NodeId {
        self.ctx.secret.index
    }
}

impl ProtocolNode for ReencryptNode {
    fn handle(
        &mut self,
        from: NodeId,
        msg: ProtocolMessage,
        rng: &mut dyn RngCore,
    ) -> Result<Option<ProtocolMessage>, Error> {
        match msg {
            ProtocolMessage::Reencrypt(request) => {
                if self.served {
                    debug!(index = self.index(), from, "request already served");
                    return Ok(None);
                }
                self.served = true;
                let reply = respond(&self.ctx.secret, &request, self.ctx.policy.as_ref(), rng)?;
                Ok(Some(ProtocolMessage::Reply(reply)))
            }
            ProtocolMessage::Reply(_) => {
                warn!(index = self.index(), from, "participant received a reply");
                Err(Error::InvalidMessage("reply delivered to a participant"))
            }
        }
    }
}

pub type NodeFactory = fn(NodeContext) -> Box<dyn ProtocolNode>;

fn build_reencrypt_node(ctx: NodeContext) -> Box<dyn ProtocolNode> {
    Box::new(ReencryptNode::new(ctx))
}

/// Maps protocol names to node constructors. Built once at startup and passed
/// to whatever instantiates protocol runs.
#[derive(Default)]
pub struct ProtocolRegistry {
    factories: HashMap<String, NodeFactory>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the re-encryption protocol under [`OCS_PROTOCOL`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .factories
            .insert(OCS_PROTOCOL.to_string(), build_reencrypt_node);
        registry
    }

    pub fn register(&mut self, name: &str, factory: NodeFactory) -> Result<(), Error> {
        if self.factories.contains_key(name) {
            return Err(Error::InvalidParams(format!(
                "protocol {name} already registered"
            )));
        }
        self.factories.insert(name.to_string(), factory);
        Ok(())
    }

    pub fn instantiate(&self, name: &str, ctx: NodeContext) -> Result<Box<dyn ProtocolNode>, Error> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::UnknownProtocol(name.to_string()))?;
        Ok(factory(ctx))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}
