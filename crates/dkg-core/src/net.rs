//! The network collaborator the protocol drivers run against.
//!
//! A driver never performs I/O itself; it stages outbound messages while
//! holding its instance lock, then hands them to a [`Network`] once the lock
//! is released. Delivery is assumed at-least-once within a known roster -
//! duplicate suppression is the state machine's responsibility, not the
//! network's.

use crate::primitives::RunId;
use serde::{Deserialize, Serialize};
use threshold_bls::{
    group::{Curve, PairingCurve},
    poly::Idx,
    sig::tbls::SigShare,
};

use crate::primitives::types::{BundledJustification, BundledResponses, BundledShares};

/// Every message exchanged by a driver is tagged with the run it belongs to
/// and the sender's roster index, so a receiver can reject stale or foreign
/// traffic before it ever reaches the state machine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope<M> {
    pub run_id: RunId,
    pub from: Idx,
    pub body: M,
}

impl<M> Envelope<M> {
    pub fn new(run_id: RunId, from: Idx, body: M) -> Self {
        Self { run_id, from, body }
    }
}

/// The three DKG wire message kinds (C4).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "C::Scalar: serde::de::DeserializeOwned")]
pub enum DkgMessage<C: Curve> {
    Deal(BundledShares<C>),
    Response(BundledResponses),
    Justification(BundledJustification<C>),
}

/// The two threshold-BLS wire message kinds (C6).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "C::Scalar: serde::de::DeserializeOwned, C::G1: serde::de::DeserializeOwned, C::GT: serde::de::DeserializeOwned")]
pub enum TblsMessage<C: PairingCurve> {
    SignRequest(Vec<u8>),
    ShareSignature(SigShare<C>),
}

/// A transport for a single driver. `send` targets one peer by roster index;
/// `broadcast` targets every peer, including the sender.
pub trait Network<M> {
    fn send(&self, to: Idx, message: Envelope<M>);
    fn broadcast(&self, message: Envelope<M>);
}
