/// Primitives for grouping together vectors of nodes with an associated threshold
pub mod group;

/// 2D binary array utilities for tracking successful (or not) participation in the DKG
pub mod status;

/// Wire types exchanged between participants during a DKG run
pub mod types;

/// The message-driven DKG state machine
pub mod state_machine;

use thiserror::Error;
use threshold_bls::{ecies::EciesError, poly::Idx};

/// The minimum allowed threshold is 51%
pub fn minimum_threshold(n: usize) -> usize {
    (((n as f64) / 2.0) + 1.0) as usize
}

/// The default threshold is 66%
pub fn default_threshold(n: usize) -> usize {
    (((n as f64) * 2.0 / 3.0) + 1.0) as usize
}

/// Result type alias which returns `DKGError`
pub type DKGResult<A> = Result<A, DKGError>;

#[derive(Debug, Error)]
/// Errors which may occur during the DKG
pub enum DKGError {
    /// Raised when the private key given to the DKG init function does not
    /// yield a public key that is included in the group.
    #[error("public key not found in list of participants")]
    PublicKeyNotFound,

    /// Raised when creating a group and specifying an invalid threshold.
    /// Either the threshold is too low, inferior to what `minimum_threshold()`
    /// returns, or is too large (i.e. larger than the number of nodes).
    #[error("threshold {0} is not in range [{1},{2}]")]
    InvalidThreshold(usize, usize, usize),

    /// Raised when the qualified set at the end of the protocol is smaller
    /// than the threshold; the run must be aborted.
    #[error("only {0}/{1} dealers qualified, need at least {1}")]
    InsufficientQualified(usize, usize),

    /// Raised when a message refers to a run id other than the active one.
    #[error("message belongs to run {0:x?}, expected {1:x?}")]
    WrongRun(RunId, RunId),

    /// Raised when a message is received after the DKG has already finished
    /// or failed.
    #[error("DKG instance is no longer accepting messages (phase: {0})")]
    Finished(&'static str),

    /// BincodeError is raised when de(serialization) by bincode fails
    #[error("de(serialization) failed: {0}")]
    BincodeError(#[from] bincode::Error),

    /// ShareError is raised when a share is being processed
    #[error(transparent)]
    ShareError(#[from] ShareError),
}

#[derive(Debug, Error)]
#[allow(clippy::enum_variant_names)]
/// Error which may occur while processing a share
pub enum ShareError {
    /// Raised when decrypting the encrypted share fails.
    #[error("[dealer: {0}] invalid ciphertext")]
    InvalidCiphertext(Idx, EciesError),
    /// Raised when the share does not correspond to the public polynomial
    /// associated with its dealer.
    #[error("[dealer: {0}] share does not match associated public polynomial")]
    InvalidShare(Idx),
    /// Raised when the public polynomial does not have the correct degree.
    /// Each public polynomial in the scheme must have a degree equal to
    /// `threshold - 1` set for the DKG protocol. The fields are (1) the
    /// degree of the polynomial and (2) the degree it should be.
    #[error("[dealer: {0}] polynomial has degree {1}, expected {2}")]
    InvalidPublicPolynomial(Idx, usize, usize),
}

/// A 16-byte identifier tagging every wire message with the DKG run it
/// belongs to, so that messages from a stale or concurrent run are rejected
/// rather than silently cross-contaminating state.
pub type RunId = [u8; 16];
