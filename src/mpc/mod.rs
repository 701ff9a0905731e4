//! Two-party key management: DKG, signing, refresh, and the enclave that
//! owns the resulting shares.
//!
//! The validator and user sides live in one process here, but they only
//! ever talk through [`party::Message`] values pumped by the driver in
//! [`protocol`], the same interactive protocol shape used when the parties
//! are remote.

mod codec;
mod dkg;
mod refresh;

pub mod enclave;
pub mod import;
pub mod keyshare;
pub mod party;
pub mod protocol;
pub mod signing;
pub mod types;

pub use enclave::Enclave;
pub use import::ImportBuilder;
pub use keyshare::Keyshare;
pub use party::{Message, Party, ProtocolKind, Status};
pub use signing::{
    deserialize_signature, message_digest, serialize_signature, verify_with_pub_key, SIGNATURE_LEN,
};
pub use types::{
    CurveTag, Role, SignRequest, SignResponse, VerifyRequest, VerifyResponse, NONCE_LEN,
};
