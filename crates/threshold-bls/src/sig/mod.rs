mod bls;
pub use bls::{BLSError, G1Scheme, G2Scheme};

mod dleq;
pub use dleq::{DleqError, DleqProof};

pub mod tbls;
pub use tbls::{Share, ThresholdError};

use crate::group::{Point, Scalar};
use rand_core::RngCore;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

/// Ties together the private scalar, public key, and signature types of a
/// concrete BLS construction.
pub trait Scheme: Clone + Debug {
    type Private: Scalar<RHS = Self::Private>;
    type Public: Point<RHS = Self::Private> + Serialize + DeserializeOwned;
    type Signature: Point<RHS = Self::Private> + Serialize + DeserializeOwned;

    /// Generates a fresh keypair.
    fn keypair<R: RngCore>(rng: &mut R) -> (Self::Private, Self::Public) {
        let private = Self::Private::rand(rng);
        let mut public = Self::Public::one();
        public.mul(&private);
        (private, public)
    }
}

/// A BLS-style signature scheme: hash-then-sign, verified with a pairing check.
pub trait SignatureScheme: Scheme {
    type Error: std::error::Error;

    fn sign(private: &Self::Private, msg: &[u8]) -> Result<Self::Signature, Self::Error>;

    fn verify(
        public: &Self::Public,
        msg: &[u8],
        sig: &Self::Signature,
    ) -> Result<(), Self::Error>;
}
