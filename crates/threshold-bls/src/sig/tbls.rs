//! Threshold BLS signatures.
//!
//! A secret is Shamir-shared (typically the output of a distributed key
//! generation) as a polynomial whose public commitment lives in G2. Each
//! share holder produces a signature share in G1 together with a DLEQ proof
//! binding it to their entry in the commitment polynomial; any `t` valid
//! shares recover the full BLS signature via Lagrange interpolation, without
//! ever reconstructing the shared secret.

use crate::group::{Element, PairingCurve, Point};
use crate::poly::{Eval, Idx, Poly, PolyError};
use crate::sig::dleq::{self, DleqProof};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Domain separator for the DLEQ proof binding a signature share to its
/// public commitment. Distinct from the BLS hash-to-curve domain so that a
/// transcript from one cannot be replayed as the other.
const DLEQ_TAG: &[u8] = b"threshold-bls/tbls/dleq/v1";

/// A share of a Shamir-shared private scalar, e.g. the output of a DKG.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Share<S> {
    pub index: Idx,
    pub private: S,
}

/// A partial signature over a message, produced by a single share holder.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SigShare<C: PairingCurve> {
    pub index: Idx,
    pub sig: C::G1,
    /// The pairing of `sig` with the G2 generator, included so that an
    /// aggregator can batch pairing checks rather than recompute them.
    pub eval: C::GT,
    pub proof: DleqProof<C::Scalar>,
}

#[derive(Debug, Error)]
pub enum ThresholdError {
    #[error("could not hash message to curve")]
    Hashing,

    #[error("share {0} failed verification against the public polynomial")]
    InvalidShare(Idx),

    #[error("not enough valid shares to recover a signature: {0}/{1}")]
    InsufficientShares(usize, usize),

    #[error("lagrange interpolation failed: {0}")]
    Poly(#[from] PolyError),
}

/// Produces a signature share over `msg` using `share`, along with a proof
/// that the share's exponent matches the holder's entry in `public`.
pub fn partial_sign<C: PairingCurve, R: RngCore>(
    share: &Share<C::Scalar>,
    public: &Poly<C::G2>,
    msg: &[u8],
    rng: &mut R,
) -> Result<SigShare<C>, ThresholdError> {
    let mut hm = C::G1::new();
    hm.map(msg).map_err(|_| ThresholdError::Hashing)?;

    let mut sig = hm.clone();
    sig.mul(&share.private);

    let g2 = C::G2::one();
    let commitment = public.eval(share.index).value;
    let eval = C::pair(&sig, &g2);

    let proof = dleq::prove(
        DLEQ_TAG,
        &g2,
        &commitment,
        &hm,
        &sig,
        &share.private,
        rng,
    );

    Ok(SigShare {
        index: share.index,
        sig,
        eval,
        proof,
    })
}

/// Verifies a signature share against the public commitment polynomial,
/// without needing to know the corresponding private share.
pub fn partial_verify<C: PairingCurve>(
    public: &Poly<C::G2>,
    msg: &[u8],
    share: &SigShare<C>,
) -> Result<(), ThresholdError> {
    let mut hm = C::G1::new();
    hm.map(msg).map_err(|_| ThresholdError::Hashing)?;

    let g2 = C::G2::one();
    let commitment = public.eval(share.index).value;

    dleq::verify(DLEQ_TAG, &g2, &commitment, &hm, &share.sig, &share.proof)
        .map_err(|_| ThresholdError::InvalidShare(share.index))
}

/// Combines at least `threshold` signature shares into a single BLS
/// signature via Lagrange interpolation in the exponent. Shares are not
/// re-verified here; callers should have already discarded shares that
/// failed [`partial_verify`].
pub fn aggregate<C: PairingCurve>(
    threshold: usize,
    shares: &[SigShare<C>],
) -> Result<C::G1, ThresholdError> {
    if shares.len() < threshold {
        return Err(ThresholdError::InsufficientShares(shares.len(), threshold));
    }

    let evals = shares
        .iter()
        .map(|s| Eval {
            value: s.sig.clone(),
            index: s.index,
        })
        .collect();

    Poly::<C::G1>::recover(threshold, evals).map_err(ThresholdError::Poly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::bls12381::PairingCurve as PCurve;
    use crate::group::Curve;
    use crate::poly::PrivatePoly;
    use crate::sig::{G2Scheme, SignatureScheme};
    use rand::thread_rng;

    type G2Curve = crate::curve::bls12381::G2Curve;

    fn setup(n: usize, t: usize) -> (Vec<Share<<G2Curve as Curve>::Scalar>>, Poly<<G2Curve as Curve>::Point>) {
        let private = PrivatePoly::<G2Curve>::new(t - 1);
        let shares = (0..n)
            .map(|i| {
                let e = private.eval(i as Idx);
                Share {
                    index: e.index,
                    private: e.value,
                }
            })
            .collect();
        (shares, private.commit())
    }

    #[test]
    fn sign_verify_aggregate() {
        let (n, t) = (5, 3);
        let (shares, public) = setup(n, t);
        let msg = b"hello threshold world";
        let mut rng = thread_rng();

        let partials: Vec<_> = shares
            .iter()
            .map(|s| partial_sign::<PCurve, _>(s, &public, msg, &mut rng).unwrap())
            .collect();

        for partial in &partials {
            partial_verify::<PCurve>(&public, msg, partial).unwrap();
        }

        let sig = aggregate::<PCurve>(t, &partials[..t]).unwrap();
        G2Scheme::<PCurve>::verify(public.public_key(), msg, &sig).unwrap();
    }

    #[test]
    fn insufficient_shares_rejected() {
        let (_n, t) = (5, 3);
        let (shares, public) = setup(5, t);
        let msg = b"not enough signers";
        let mut rng = thread_rng();

        let partials: Vec<_> = shares[..t - 1]
            .iter()
            .map(|s| partial_sign::<PCurve, _>(s, &public, msg, &mut rng).unwrap())
            .collect();

        aggregate::<PCurve>(t, &partials).unwrap_err();
    }

    #[test]
    fn tampered_proof_rejected() {
        let (shares, public) = setup(5, 3);
        let msg = b"tamper test";
        let mut rng = thread_rng();

        let mut partial = partial_sign::<PCurve, _>(&shares[0], &public, msg, &mut rng).unwrap();
        // flip the response scalar to corrupt the proof.
        let forged = partial_sign::<PCurve, _>(&shares[1], &public, msg, &mut rng).unwrap();
        partial.proof = forged.proof;

        partial_verify::<PCurve>(&public, msg, &partial).unwrap_err();
    }
}
