//! Per-node partial re-encryption.

use std::sync::Arc;

use rand_core::RngCore;
use tracing::debug;

use crate::commitment::SecretShare;
use crate::curve::Point;
use crate::messages::{ReencryptReply, ReencryptRequest};
use crate::proof::{prove, reencryption_base};
use crate::types::{Error, NodeId};

/// One node's contribution `x_i·(U + Xc)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartialShare {
    pub index: NodeId,
    pub value: Point,
}

/// Authorization callback deciding whether a request may be served.
pub type PolicyHook = Arc<dyn Fn(&ReencryptRequest) -> bool + Send + Sync>;

pub fn partial_reencrypt(secret: &SecretShare, u: &Point, xc: &Point) -> PartialShare {
    PartialShare {
        index: secret.index,
        value: reencryption_base(u, xc) * secret.scalar,
    }
}

/// Computes this node's reply: a refusal if `policy` declines, else share and proof.
pub fn respond<R: RngCore + ?Sized>(
    secret: &SecretShare,
    request: &ReencryptRequest,
    policy: Option<&PolicyHook>,
    rng: &mut R,
) -> Result<ReencryptReply, Error> {
    if let Some(policy) = policy {
        if !policy(request) {
            debug!(index = secret.index, "policy refused re-encryption");
            return Ok(ReencryptReply::Refused);
        }
    }
    let u = request
        .ciphertext_point
        .as_ref()
        .ok_or(Error::InvalidMessage("request without ciphertext point"))?;
    let share = partial_reencrypt(secret, u, &request.client_key);
    let proof = prove(&secret.scalar, &share, u, &request.client_key, rng)?;
    Ok(ReencryptReply::Share { share, proof })
}
