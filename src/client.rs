//! Client side: ElGamal encryption under the group key and recovery of the
//! secret point from a re-encrypted share set.

use rand_core::RngCore;

use crate::curve::{generator, scalar_random, Fr, Point};
use crate::lagrange::recover_point;
use crate::reencrypt::PartialShare;
use crate::types::Error;

#[derive(Clone, Debug)]
pub struct ClientKeypair {
    pub secret: Fr,
    pub public: Point,
}

impl ClientKeypair {
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let secret = scalar_random(rng);
        Self {
            secret,
            public: generator() * secret,
        }
    }
}

/// ElGamal ciphertext `(U, C) = (r·G, K + r·X)` of a point `K` under `X`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncryptedPoint {
    pub u: Point,
    pub c: Point,
}

pub fn encrypt_point<R: RngCore + ?Sized>(group_key: &Point, secret: &Point, rng: &mut R) -> EncryptedPoint {
    let r = scalar_random(rng);
    EncryptedPoint {
        u: generator() * r,
        c: secret + group_key * r,
    }
}

/// Recovers `K` from `threshold` re-encrypted shares `x_i·(U + Xc)`.
///
/// Interpolation yields `x·U + xc·X`; removing `xc·X` leaves `r·X`, and
/// `K = C − r·X`.
pub fn decrypt_point(
    client: &ClientKeypair,
    group_key: &Point,
    ciphertext: &EncryptedPoint,
    shares: &[PartialShare],
    threshold: usize,
) -> Result<Point, Error> {
    let x_hat_enc = recover_point(shares, threshold)?;
    let x_hat = x_hat_enc - group_key * client.secret;
    Ok(ciphertext.c - x_hat)
}
