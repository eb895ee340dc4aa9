//! Serialization of a certified participant's durable state, per §6: the
//! concatenation of the scalar share xᵢ, the index i, and the serialized
//! commitment polynomial, each length-prefixed so the fields can be read
//! back independently of `bincode`'s own framing.

use crate::primitives::types::DKGOutput;
use std::convert::TryInto;
use thiserror::Error;
use threshold_bls::{
    group::Curve,
    poly::{Idx, PublicPoly},
};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("(de)serialization failed: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("truncated persisted state")]
    Truncated,
}

/// The durable subset of a [`DKGOutput`]: the qualified set is a property of
/// a particular run, not of the long-lived key material, so it is not part
/// of the persisted format.
#[derive(Clone, Debug)]
pub struct PersistedShare<C: Curve> {
    pub index: Idx,
    pub private: C::Scalar,
    pub public: PublicPoly<C>,
}

impl<C: Curve> From<&DKGOutput<C>> for PersistedShare<C> {
    fn from(output: &DKGOutput<C>) -> Self {
        Self {
            index: output.share.index,
            private: output.share.private.clone(),
            public: output.public.clone(),
        }
    }
}

fn write_len_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn read_len_prefixed<'a>(buf: &'a [u8]) -> Result<(&'a [u8], &'a [u8]), PersistError> {
    if buf.len() < 8 {
        return Err(PersistError::Truncated);
    }
    let (len_bytes, rest) = buf.split_at(8);
    let len = u64::from_le_bytes(len_bytes.try_into().expect("exactly 8 bytes")) as usize;
    if rest.len() < len {
        return Err(PersistError::Truncated);
    }
    Ok(rest.split_at(len))
}

/// Serializes `share` to the wire format described in §6.
pub fn persist_share<C: Curve>(share: &PersistedShare<C>) -> Result<Vec<u8>, PersistError> {
    let mut buf = Vec::new();
    write_len_prefixed(&mut buf, &bincode::serialize(&share.private)?);
    write_len_prefixed(&mut buf, &bincode::serialize(&share.index)?);
    write_len_prefixed(&mut buf, &bincode::serialize(&share.public)?);
    Ok(buf)
}

/// Parses the wire format produced by [`persist_share`].
pub fn load_share<C: Curve>(bytes: &[u8]) -> Result<PersistedShare<C>, PersistError> {
    let (private_bytes, rest) = read_len_prefixed(bytes)?;
    let private: C::Scalar = bincode::deserialize(private_bytes)?;

    let (index_bytes, rest) = read_len_prefixed(rest)?;
    let index: Idx = bincode::deserialize(index_bytes)?;

    let (public_bytes, _) = read_len_prefixed(rest)?;
    let public: PublicPoly<C> = bincode::deserialize(public_bytes)?;

    Ok(PersistedShare {
        index,
        private,
        public,
    })
}
