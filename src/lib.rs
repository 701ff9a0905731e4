//! Two-party ECDSA secret-share enclave over secp256k1.
//!
//! A DKG-style protocol splits one signing key into a validator share and a
//! user share; both must cooperate, one message at a time, to produce any
//! signature. The [`mpc::Enclave`] owns the pair, signs and verifies with
//! SHA3-256 digests, rotates shares in place of the same public key, and
//! seals itself into an AES-256-GCM blob portable across processes. The
//! [`bech32`] and [`bip32`] modules carry the address and key-derivation
//! codecs the enclave's serialization surface leans on.

pub mod bech32;
pub mod bip32;
pub mod curve;
pub mod error;
pub mod mpc;

pub use error::{Error, ProtocolError};
pub use mpc::{Enclave, ImportBuilder};
