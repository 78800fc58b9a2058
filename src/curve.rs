//! Group and scalar helpers over BLS12-381 G1.

use blstrs::{G1Affine, G1Projective, Scalar};
use ff::Field;
use group::{Curve, Group};
use sha2::{Digest, Sha256};

use crate::types::{Error, NodeId};

pub type Fr = Scalar;
pub type Point = G1Projective;

pub const POINT_LEN: usize = 48;
pub const SCALAR_LEN: usize = 32;

pub fn generator() -> Point {
    G1Projective::generator()
}

/// Abscissa of share `index` on the sharing polynomial.
pub fn scalar_from_index(index: NodeId) -> Fr {
    Fr::from(u64::from(index) + 1)
}

pub fn scalar_random<R: rand_core::RngCore + ?Sized>(rng: &mut R) -> Fr {
    Fr::random(rng)
}

pub fn scalar_to_bytes(s: &Fr) -> [u8; SCALAR_LEN] {
    s.to_bytes_be()
}

pub fn scalar_from_bytes(raw: &[u8; SCALAR_LEN]) -> Result<Fr, Error> {
    Option::<Fr>::from(Fr::from_bytes_be(raw)).ok_or(Error::InvalidEncoding)
}

pub fn point_to_bytes(p: &Point) -> [u8; POINT_LEN] {
    p.to_affine().to_compressed()
}

pub fn point_from_bytes(raw: &[u8; POINT_LEN]) -> Result<Point, Error> {
    let affine =
        Option::<G1Affine>::from(G1Affine::from_compressed(raw)).ok_or(Error::InvalidEncoding)?;
    Ok(affine.into())
}

/// SHA-256 over the compressed points, in order, mapped into the scalar field.
///
/// The top two bits of the big-endian digest are cleared, which keeps the value
/// below the scalar modulus (`0x73ed...`) so the mapping never fails.
pub fn hash_points_to_scalar(points: &[&Point]) -> Result<Fr, Error> {
    let mut hasher = Sha256::new();
    for p in points {
        hasher.update(point_to_bytes(p));
    }
    let mut digest: [u8; SCALAR_LEN] = hasher.finalize().into();
    digest[0] &= 0x3f;
    scalar_from_bytes(&digest)
}
