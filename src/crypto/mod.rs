//! Cryptographic primitives for pairing and request signing.

pub mod pairing;
pub mod signing;
