//! Non-interactive Chaum-Pedersen proofs of discrete-log equality (DLEQ).
//!
//! Given two bases `b1`, `b2` (possibly in different groups that share the
//! same scalar field) and two values `v1 = b1^x`, `v2 = b2^x`, a `DleqProof`
//! demonstrates knowledge of a single `x` satisfying both relations, without
//! revealing `x`. This is used to bind a threshold BLS signature share to the
//! share holder's entry in a DKG's public commitment polynomial: the prover
//! shows that the exponent used to produce the signature share is the same
//! scalar committed to by the DKG, without an extra round of communication.

use crate::group::{Point, Scalar};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DleqProof<S> {
    c: S,
    r: S,
}

#[derive(Debug, Error)]
pub enum DleqError {
    #[error("dleq proof did not verify")]
    Invalid,
}

/// Produces a proof that `value1 = base1^x` and `value2 = base2^x` for the
/// same scalar `x`. `tag` domain-separates the Fiat-Shamir transform from
/// other uses of DLEQ within the same protocol run.
pub fn prove<B1, B2, S, R>(
    tag: &[u8],
    base1: &B1,
    value1: &B1,
    base2: &B2,
    value2: &B2,
    x: &S,
    rng: &mut R,
) -> DleqProof<S>
where
    B1: Point<RHS = S>,
    B2: Point<RHS = S>,
    S: Scalar<RHS = S>,
    R: RngCore,
{
    let k = S::rand(rng);

    let mut u1 = base1.clone();
    u1.mul(&k);
    let mut u2 = base2.clone();
    u2.mul(&k);

    let c = challenge::<S, B1, B2>(tag, base1, value1, base2, value2, &u1, &u2);

    let mut cx = c.clone();
    cx.mul(x);
    let mut r = k;
    r.add(&cx);

    DleqProof { c, r }
}

/// Verifies a proof produced by [`prove`].
pub fn verify<B1, B2, S>(
    tag: &[u8],
    base1: &B1,
    value1: &B1,
    base2: &B2,
    value2: &B2,
    proof: &DleqProof<S>,
) -> Result<(), DleqError>
where
    B1: Point<RHS = S>,
    B2: Point<RHS = S>,
    S: Scalar<RHS = S>,
{
    let mut c_neg = proof.c.clone();
    c_neg.negate();

    // u1' = base1^r * value1^-c, recovering the prover's commitment since
    // r = k + c*x implies base1^r * value1^-c == base1^k.
    let mut u1 = base1.clone();
    u1.mul(&proof.r);
    let mut v1c = value1.clone();
    v1c.mul(&c_neg);
    u1.add(&v1c);

    let mut u2 = base2.clone();
    u2.mul(&proof.r);
    let mut v2c = value2.clone();
    v2c.mul(&c_neg);
    u2.add(&v2c);

    let expected = challenge::<S, B1, B2>(tag, base1, value1, base2, value2, &u1, &u2);
    if expected == proof.c {
        Ok(())
    } else {
        Err(DleqError::Invalid)
    }
}

fn challenge<S, B1, B2>(
    tag: &[u8],
    base1: &B1,
    value1: &B1,
    base2: &B2,
    value2: &B2,
    u1: &B1,
    u2: &B2,
) -> S
where
    B1: Serialize,
    B2: Serialize,
    S: Scalar,
{
    let mut counter: u64 = 0;
    loop {
        let mut hasher = Sha256::new();
        hasher.update(tag);
        hasher.update(bincode::serialize(base1).expect("serializing a point cannot fail"));
        hasher.update(bincode::serialize(value1).expect("serializing a point cannot fail"));
        hasher.update(bincode::serialize(base2).expect("serializing a point cannot fail"));
        hasher.update(bincode::serialize(value2).expect("serializing a point cannot fail"));
        hasher.update(bincode::serialize(u1).expect("serializing a point cannot fail"));
        hasher.update(bincode::serialize(u2).expect("serializing a point cannot fail"));
        hasher.update(counter.to_le_bytes());
        let digest = hasher.finalize();

        if let Some(s) = S::from_random_bytes(&digest) {
            return s;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::bls12381::{Scalar, G1, G2};
    use crate::group::Element;
    use rand::thread_rng;

    #[test]
    fn proves_and_verifies() {
        let x = Scalar::rand(&mut thread_rng());

        let base1 = G2::one();
        let mut value1 = base1.clone();
        value1.mul(&x);

        let base2 = {
            let mut h = G1::one();
            h.mul(&Scalar::rand(&mut thread_rng()));
            h
        };
        let mut value2 = base2.clone();
        value2.mul(&x);

        let proof = prove(b"test-tag", &base1, &value1, &base2, &value2, &x, &mut thread_rng());
        verify(b"test-tag", &base1, &value1, &base2, &value2, &proof).unwrap();
    }

    #[test]
    fn rejects_mismatched_exponents() {
        let x = Scalar::rand(&mut thread_rng());
        let y = Scalar::rand(&mut thread_rng());

        let base1 = G2::one();
        let mut value1 = base1.clone();
        value1.mul(&x);

        let base2 = G1::one();
        let mut value2 = base2.clone();
        value2.mul(&y); // different exponent

        let proof = prove(b"test-tag", &base1, &value1, &base2, &value2, &x, &mut thread_rng());
        verify(b"test-tag", &base1, &value1, &base2, &value2, &proof).unwrap_err();
    }

    #[test]
    fn rejects_wrong_tag() {
        let x = Scalar::rand(&mut thread_rng());
        let base1 = G2::one();
        let mut value1 = base1.clone();
        value1.mul(&x);
        let base2 = G1::one();
        let mut value2 = base2.clone();
        value2.mul(&x);

        let proof = prove(b"tag-a", &base1, &value1, &base2, &value2, &x, &mut thread_rng());
        verify(b"tag-b", &base1, &value1, &base2, &value2, &proof).unwrap_err();
    }
}
