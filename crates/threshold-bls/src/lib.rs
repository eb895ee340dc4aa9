//! # Threshold BLS Signatures
//!
//! This crate provides a BLS signature scheme over BLS12-381, plus a threshold
//! variant in which a secret key is Shamir-shared among a group of parties: each
//! party can produce a partial signature share (accompanied by a DLEQ proof
//! binding it to a distributed key generation's public commitment), and any
//! `t` of the `n` shares can be combined into a single valid BLS signature via
//! Lagrange interpolation, without any party ever learning the full secret key.
//!
//! ## Normal BLS Signatures
//!
//! ```rust
//! use threshold_bls::{
//!     schemes::bls12_381::G1Scheme as SigScheme,
//!     sig::{Scheme, SignatureScheme}
//! };
//!
//! let (private, public) = SigScheme::keypair(&mut rand::thread_rng());
//! let msg = b"hello";
//! let sig = SigScheme::sign(&private, &msg[..]).unwrap();
//! SigScheme::verify(&public, &msg[..], &sig).expect("signature should be verified");
//! ```
//!
//! ## Threshold Signatures
//!
//! First a threshold keypair must be generated. This is done utilizing [polynomials](poly).
//! Each share then proceeds to sign the message, to generate a partial signature with a DLEQ
//! proof against the public polynomial. Once enough partial signatures are produced, they can
//! be combined to a threshold signature, which can be verified against the threshold public key.
//!
//! ```rust
//! use threshold_bls::{
//!     poly::{Poly, Idx},
//!     schemes::bls12_381::G2Scheme as SigScheme,
//!     sig::{tbls, Share},
//!     group::{Curve, Element},
//! };
//!
//! let (n, t) = (5, 3);
//! let private_poly = Poly::<<SigScheme as threshold_bls::sig::Scheme>::Private>::new(t - 1);
//!
//! let shares = (0..n)
//!     .map(|i| {
//!         let eval = private_poly.eval(i as Idx);
//!         Share { index: eval.index, private: eval.value }
//!     })
//!     .collect::<Vec<_>>();
//!
//! let public_poly = private_poly.commit();
//! let msg = b"hello";
//! let mut rng = rand::thread_rng();
//!
//! let partials = shares
//!     .iter()
//!     .map(|s| tbls::partial_sign::<SigScheme, _>(s, &public_poly, &msg[..], &mut rng).unwrap())
//!     .collect::<Vec<_>>();
//!
//! for partial in &partials {
//!     tbls::partial_verify::<SigScheme>(&public_poly, &msg[..], partial).unwrap();
//! }
//!
//! let threshold_sig = tbls::aggregate::<SigScheme>(t, &partials).unwrap();
//! SigScheme::verify(public_poly.public_key(), &msg[..], &threshold_sig).unwrap();
//! ```
//!
//! ### Switching Groups
//!
//! `G1Scheme` can be drop-in replaced with `G2Scheme` (and vice-versa) depending on which group
//! you want keys and signatures to be in.

/// Curve implementations for the traits defined in the [`group`] module.
pub mod curve;

/// Elliptic Curve Integrated Encryption Scheme using SHA256 as the Key Derivation Function.
pub mod ecies;

/// Definitions of generic traits with scalars of prime fields and points on elliptic curves.
pub mod group;

/// Implementation of a polynomial suitable to be used for secret sharing schemes and DKG
/// protocols. It can evaluate and interpolate private and public shares to their corresponding
/// polynomial.
pub mod poly;

/// BLS signatures and their threshold variant, with Chaum-Pedersen DLEQ proofs.
pub mod sig;

/// Pre-instantiated signature schemes for each curve.
pub mod schemes {
    use crate::sig::{G1Scheme, G2Scheme};

    /// BLS12-381 Schemes
    pub mod bls12_381 {
        use crate::curve::bls12381::PairingCurve;
        pub use crate::curve::bls12381::{G1Curve, G2Curve};

        /// Public Keys on G1, Signatures on G2
        pub type G1Scheme = super::G1Scheme<PairingCurve>;
        /// Public Keys on G2, Signatures on G1
        pub type G2Scheme = super::G2Scheme<PairingCurve>;
    }
}
