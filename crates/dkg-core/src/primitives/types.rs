use crate::primitives::status::Status;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use threshold_bls::{
    ecies::EciesCipher,
    group::Curve,
    poly::{Idx, PublicPoly},
    sig::tbls,
};

/// A share encrypted under the recipient's long-term public key.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "C::Scalar: DeserializeOwned")]
pub struct EncryptedShare<C: Curve> {
    pub share_idx: Idx,
    pub secret: EciesCipher<C>,
}

/// A dealer's full deal: one encrypted share per share holder, plus the
/// commitment to the dealer's secret polynomial.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "C::Scalar: DeserializeOwned")]
pub struct BundledShares<C: Curve> {
    pub dealer_idx: Idx,
    pub shares: Vec<EncryptedShare<C>>,
    pub public: PublicPoly<C>,
}

/// A single share holder's verdict on a dealer's share.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Response {
    pub dealer_idx: Idx,
    pub status: Status,
}

/// All of a share holder's responses for a round, broadcast together.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BundledResponses {
    pub share_idx: Idx,
    pub responses: Vec<Response>,
}

/// A dealer's justification revealing the cleartext share for a holder who
/// complained, so that other holders can check it against the dealer's
/// public commitment without needing the holder's private key.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "C::Scalar: DeserializeOwned")]
pub struct Justification<C: Curve> {
    pub share_idx: Idx,
    pub share: C::Scalar,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "C::Scalar: DeserializeOwned")]
pub struct BundledJustification<C: Curve> {
    pub dealer_idx: Idx,
    pub justifications: Vec<Justification<C>>,
    pub public: PublicPoly<C>,
}

/// The final, locally-held output of a successful DKG run: this participant's
/// share of the joint secret, the joint public commitment polynomial, and the
/// set of dealer indices whose contributions were included.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "C::Scalar: DeserializeOwned")]
pub struct DKGOutput<C: Curve> {
    pub share: tbls::Share<C::Scalar>,
    pub public: PublicPoly<C>,
    pub qualified: Vec<Idx>,
}
