use crate::group::{Element, PairingCurve, Point};
use crate::sig::{Scheme, SignatureScheme};
use std::marker::PhantomData;
use thiserror::Error;

/// Errors thrown out when using the BLS signature scheme.
#[derive(Debug, Error)]
pub enum BLSError {
    /// Raised when the pairing check in the verification routine fails.
    #[error("invalid signature")]
    InvalidSig,

    #[error("could not hash message to curve")]
    HashingError,
}

// private module workaround to avoid leaking a private trait into a public trait
// see https://github.com/rust-lang/rust/issues/34537
mod common {
    use super::*;

    /// Internal trait encompassing the work shared between BLS over G1 and over G2.
    pub trait BLSScheme: Scheme {
        /// Returns sig = H(msg)^private.
        fn internal_sign(
            private: &Self::Private,
            msg: &[u8],
        ) -> Result<Self::Signature, BLSError> {
            let mut h = Self::Signature::new();
            h.map(msg).map_err(|_| BLSError::HashingError)?;
            h.mul(private);
            Ok(h)
        }

        fn internal_verify(
            public: &Self::Public,
            msg: &[u8],
            sig: &Self::Signature,
        ) -> Result<(), BLSError> {
            let mut h = Self::Signature::new();
            h.map(msg).map_err(|_| BLSError::HashingError)?;

            if !Self::final_exp(public, sig, &h) {
                return Err(BLSError::InvalidSig);
            }
            Ok(())
        }

        /// Performs the pairing check for the BLS signature scheme.
        fn final_exp(p: &Self::Public, sig: &Self::Signature, hm: &Self::Signature) -> bool;
    }

    impl<T> SignatureScheme for T
    where
        T: BLSScheme,
    {
        type Error = BLSError;

        fn sign(private: &Self::Private, msg: &[u8]) -> Result<Self::Signature, Self::Error> {
            T::internal_sign(private, msg)
        }

        fn verify(
            public: &Self::Public,
            msg: &[u8],
            sig: &Self::Signature,
        ) -> Result<(), Self::Error> {
            T::internal_verify(public, msg, sig)
        }
    }
}

/// G1Scheme implements the BLS signature scheme with G1 as private/public
/// keys and G2 as signature elements over the given pairing curve.
#[derive(Clone, Debug)]
pub struct G1Scheme<C: PairingCurve> {
    m: PhantomData<C>,
}

impl<C> Scheme for G1Scheme<C>
where
    C: PairingCurve,
{
    type Private = C::Scalar;
    type Public = C::G1;
    type Signature = C::G2;
}

impl<C> common::BLSScheme for G1Scheme<C>
where
    C: PairingCurve,
{
    fn final_exp(p: &Self::Public, sig: &Self::Signature, hm: &Self::Signature) -> bool {
        // e(g1, sig) == e(pub, H(m))
        let left = C::pair(&C::G1::one(), sig);
        let right = C::pair(p, hm);
        left == right
    }
}

/// G2Scheme implements the BLS signature scheme with G2 as private/public
/// keys and G1 as signature elements over the given pairing curve. This is
/// the convention used for the threshold signature scheme, since it keeps
/// signatures (and their aggregation) in the smaller group G1.
#[derive(Clone, Debug)]
pub struct G2Scheme<C: PairingCurve> {
    m: PhantomData<C>,
}

impl<C> Scheme for G2Scheme<C>
where
    C: PairingCurve,
{
    type Private = C::Scalar;
    type Public = C::G2;
    type Signature = C::G1;
}

impl<C> common::BLSScheme for G2Scheme<C>
where
    C: PairingCurve,
{
    fn final_exp(p: &Self::Public, sig: &Self::Signature, hm: &Self::Signature) -> bool {
        // e(sig, g2) == e(H(m), pub)
        let left = C::pair(sig, &Self::Public::one());
        let right = C::pair(hm, p);
        left == right
    }
}
