//! Secret shares and the public commitment polynomial.
//!
//! Shares are normally produced by an external DKG. [`deal`] is a trusted
//! dealer with the same output shape, used for simulation and tests.

use ff::Field;
use group::Group;
use rand_core::RngCore;

use crate::curve::{generator, scalar_from_index, scalar_random, Fr, Point};
use crate::types::{validate_threshold, Error, NodeId};

/// One node's share `f(index + 1)` of the group secret. Never leaves the node.
#[derive(Clone, Debug)]
pub struct SecretShare {
    pub index: NodeId,
    pub scalar: Fr,
}

/// Commitments `A_k = a_k·G` to the coefficients of the sharing polynomial.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicCommitment {
    commits: Vec<Point>,
}

impl PublicCommitment {
    pub fn new(commits: Vec<Point>) -> Result<Self, Error> {
        if commits.is_empty() {
            return Err(Error::InvalidParams("empty commitment polynomial".into()));
        }
        Ok(Self { commits })
    }

    /// Group public key `X = f(0)·G`.
    pub fn public_key(&self) -> Point {
        self.commits[0]
    }

    /// Public key share of node `index`, i.e. `f(index + 1)·G`.
    pub fn evaluate(&self, index: NodeId) -> Point {
        let x = scalar_from_index(index);
        let mut acc = Point::identity();
        for c_k in self.commits.iter().rev() {
            acc *= x;
            acc += c_k;
        }
        acc
    }

    pub fn threshold(&self) -> usize {
        self.commits.len()
    }

    pub fn commits(&self) -> &[Point] {
        &self.commits
    }
}

fn eval_poly(coeffs: &[Fr], x: &Fr) -> Fr {
    let mut acc = Fr::ZERO;
    for coeff in coeffs.iter().rev() {
        acc *= x;
        acc += coeff;
    }
    acc
}

/// Splits a fresh random secret into `n` shares, any `t` of which recover it.
pub fn deal<R: RngCore + ?Sized>(
    n: usize,
    t: usize,
    rng: &mut R,
) -> Result<(PublicCommitment, Vec<SecretShare>), Error> {
    validate_threshold(n, t)?;
    let coeffs: Vec<Fr> = (0..t).map(|_| scalar_random(rng)).collect();
    let g = generator();
    let commitment = PublicCommitment::new(coeffs.iter().map(|a| g * a).collect())?;
    let shares = (0..n as NodeId)
        .map(|index| SecretShare {
            index,
            scalar: eval_poly(&coeffs, &scalar_from_index(index)),
        })
        .collect();
    Ok((commitment, shares))
}
