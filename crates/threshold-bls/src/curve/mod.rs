pub mod bls12381;
