use std::collections::HashSet;

use ff::Field;
use group::Group;

use crate::curve::{scalar_from_index, Fr, Point};
use crate::reencrypt::PartialShare;
use crate::types::{Error, NodeId};

pub fn lagrange_coefficients_at_zero(indices: &[NodeId]) -> Result<Vec<Fr>, Error> {
    if indices.is_empty() {
        return Err(Error::NotEnoughShares {
            required: 1,
            provided: 0,
        });
    }
    let mut coeffs = Vec::with_capacity(indices.len());
    for (i, idx_i) in indices.iter().enumerate() {
        let x_i = scalar_from_index(*idx_i);
        let mut num = Fr::ONE;
        let mut den = Fr::ONE;
        for (j, idx_j) in indices.iter().enumerate() {
            if i == j {
                continue;
            }
            let x_j = scalar_from_index(*idx_j);
            num *= -x_j;
            den *= x_i - x_j;
        }
        let den_inv = Option::<Fr>::from(den.invert()).ok_or(Error::DuplicateShare(*idx_i))?;
        coeffs.push(num * den_inv);
    }
    Ok(coeffs)
}

/// Interpolates `f(0)·P` from the first `threshold` shares `f(i+1)·P`.
pub fn recover_point(shares: &[PartialShare], threshold: usize) -> Result<Point, Error> {
    if threshold == 0 || shares.len() < threshold {
        return Err(Error::NotEnoughShares {
            required: threshold,
            provided: shares.len(),
        });
    }
    let mut seen = HashSet::with_capacity(threshold);
    let mut picked = Vec::with_capacity(threshold);
    for share in shares {
        if seen.insert(share.index) {
            picked.push(share);
        }
        if picked.len() == threshold {
            break;
        }
    }
    if picked.len() < threshold {
        return Err(Error::NotEnoughShares {
            required: threshold,
            provided: picked.len(),
        });
    }
    let indices: Vec<NodeId> = picked.iter().map(|s| s.index).collect();
    let coeffs = lagrange_coefficients_at_zero(&indices)?;
    let mut acc = Point::identity();
    for (coeff, share) in coeffs.iter().zip(picked.iter()) {
        acc += share.value * coeff;
    }
    Ok(acc)
}
