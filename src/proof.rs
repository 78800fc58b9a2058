//! Discrete-log-equality proof for a partial re-encryption share.
//!
//! A node holding `x_i` proves that `ui = x_i·(U + Xc)` uses the same scalar
//! as its public key share `gx_i = x_i·G`, without revealing `x_i`.
//!
//! Prover: pick `s`, commit `uiHat = s·(U+Xc)` and `hiHat = s·G`, derive
//! `e = H(ui || uiHat || hiHat)` and answer `f = s + e·x_i`.
//!
//! Verifier: rebuild `uiHat' = f·(U+Xc) − e·ui` and `hiHat' = f·G − e·gx_i`
//! and accept iff `H(ui || uiHat' || hiHat') == e`.

use rand_core::RngCore;

use crate::commitment::PublicCommitment;
use crate::curve::{generator, hash_points_to_scalar, scalar_random, Fr, Point};
use crate::reencrypt::PartialShare;
use crate::types::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Proof {
    pub challenge: Fr,
    pub response: Fr,
}

/// Base point `U + Xc` both proof equations are taken over.
pub fn reencryption_base(u: &Point, xc: &Point) -> Point {
    u + xc
}

pub fn prove<R: RngCore + ?Sized>(
    secret: &Fr,
    ui: &PartialShare,
    u: &Point,
    xc: &Point,
    rng: &mut R,
) -> Result<Proof, Error> {
    let s = scalar_random(rng);
    let ui_hat = reencryption_base(u, xc) * s;
    let hi_hat = generator() * s;
    let challenge = hash_points_to_scalar(&[&ui.value, &ui_hat, &hi_hat])?;
    Ok(Proof {
        challenge,
        response: s + challenge * secret,
    })
}

pub fn verify(
    commitment: &PublicCommitment,
    ui: &PartialShare,
    proof: &Proof,
    u: &Point,
    xc: &Point,
) -> Result<(), Error> {
    let gx_i = commitment.evaluate(ui.index);
    let ui_hat = reencryption_base(u, xc) * proof.response - ui.value * proof.challenge;
    let hi_hat = generator() * proof.response - gx_i * proof.challenge;
    let expected = hash_points_to_scalar(&[&ui.value, &ui_hat, &hi_hat])?;
    if expected != proof.challenge {
        return Err(Error::InvalidProof { index: ui.index });
    }
    Ok(())
}
