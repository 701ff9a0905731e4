//! Shared protocol types: party roles, the curve tag, the enclave nonce,
//! and the request/response DTOs a host exposes.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::mpc::codec::b64;

/// AES-GCM nonce size; also the size of the enclave nonce.
pub const NONCE_LEN: usize = 12;

/// The two sides of the protocol. Functionally symmetric, but each protocol
/// assigns the initiator role to one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Validator,
    User,
}

impl Role {
    pub(crate) fn tag(self) -> u8 {
        match self {
            Role::Validator => 0x01,
            Role::User => 0x02,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(Role::Validator),
            0x02 => Some(Role::User),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Validator => f.write_str("validator"),
            Role::User => f.write_str("user"),
        }
    }
}

/// Discriminant naming the curve an enclave lives on. Only secp256k1 is
/// currently defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveTag {
    K256,
}

/// Fresh 12-byte nonce from the OS CSPRNG.
pub fn random_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Host-facing signing request: a message and the sealed enclave to sign
/// with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignRequest {
    #[serde(with = "b64")]
    pub message: Vec<u8>,
    #[serde(with = "b64")]
    pub enclave: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignResponse {
    #[serde(with = "b64")]
    pub signature: Vec<u8>,
}

/// Host-facing verification request against a bare public key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    #[serde(with = "b64")]
    pub pub_key: Vec<u8>,
    #[serde(with = "b64")]
    pub message: Vec<u8>,
    #[serde(with = "b64")]
    pub sig: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
