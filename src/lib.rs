#![forbid(unsafe_code)]

pub mod aggregator;
pub mod client;
pub mod cluster;
pub mod commitment;
pub mod config;
pub mod coordinator;
pub mod curve;
pub mod encoding;
pub mod lagrange;
pub mod logging;
pub mod messages;
pub mod node;
pub mod proof;
pub mod reencrypt;
pub mod signal;
pub mod transport;
pub mod types;

pub use crate::aggregator::{FailureReason, Outcome, QuorumAggregator, ReplyEvent, RunStatus};
pub use crate::commitment::{PublicCommitment, SecretShare};
pub use crate::coordinator::{Coordinator, ProtocolRun};
pub use crate::messages::{ProtocolMessage, ReencryptReply, ReencryptRequest, RequestId};
pub use crate::proof::Proof;
pub use crate::reencrypt::{PartialShare, PolicyHook};
pub use crate::types::{Error, NodeId, Wire};
