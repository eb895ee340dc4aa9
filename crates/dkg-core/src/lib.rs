//! # DKG Core
//!
//! A Pedersen/Feldman-style distributed key generation protocol, and the
//! threshold BLS signing it feeds into, built around [`threshold_bls`].
//!
//! The DKG is a message-driven, reentrant state machine
//! ([`primitives::state_machine::DkgActor`]) rather than a batch pipeline:
//! messages may arrive in any order across participants, and the state
//! machine buffers what it cannot yet process instead of assuming a
//! particular delivery schedule. [`driver::DkgDriver`] and
//! [`driver::TblsDriver`] wrap an actor each behind a single mutex and a
//! [`net::Network`] collaborator to turn that state machine into something
//! that can actually run a protocol over a transport.

/// Low level primitives and datatypes for implementing the DKG
pub mod primitives;

/// The network collaborator and wire message envelopes the drivers run over
pub mod net;

/// Mutex-guarded drivers wrapping the DKG and TBLS state machines
pub mod driver;

/// Serialization of a certified participant's durable key material
pub mod persist;

#[cfg(test)]
mod test_helpers;
