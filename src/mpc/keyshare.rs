//! Opaque key-share blobs.
//!
//! A share is the output of one side of DKG or refresh. Its wire layout is
//! `role(1) ‖ secret scalar(32) ‖ joint public point, compressed(33)`. The
//! blob is owned exclusively by the enclave holding it and is zeroized on
//! drop. A single blob carries only its own side's secret; nothing can be
//! signed from one alone.

use std::fmt;

use k256::{AffinePoint, Scalar};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::curve;
use crate::error::Error;
use crate::mpc::types::Role;

pub(crate) const SHARE_LEN: usize = 1 + curve::SCALAR_LEN + curve::POINT_COMPRESSED_LEN;

/// One side's share of the joint key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Keyshare {
    bytes: Vec<u8>,
}

impl Keyshare {
    /// Assemble a share blob from its parts. Used by the protocol engines
    /// when a DKG or refresh run finishes.
    pub(crate) fn encode(role: Role, secret: &Scalar, joint: &AffinePoint) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SHARE_LEN);
        bytes.push(role.tag());
        bytes.extend_from_slice(&curve::scalar_to_be_bytes(secret));
        bytes.extend_from_slice(&curve::point_to_compressed(joint));
        bytes
    }

    /// Validate and take ownership of a share blob for the expected side.
    pub fn from_bytes(role: Role, bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != SHARE_LEN {
            return Err(Error::InvalidShare(role));
        }
        if Role::from_tag(bytes[0]) != Some(role) {
            return Err(Error::InvalidShare(role));
        }
        let share = Keyshare { bytes: bytes.to_vec() };
        // Parse once up front so later accessors cannot fail for shape
        // reasons.
        share.secret_scalar().map_err(|_| Error::InvalidShare(role))?;
        share.public_point().map_err(|_| Error::InvalidShare(role))?;
        Ok(share)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn role(&self) -> Role {
        // The tag was validated in `from_bytes`.
        Role::from_tag(self.bytes[0]).unwrap_or(Role::Validator)
    }

    /// This side's secret scalar. Crate-internal; never leaves the process.
    pub(crate) fn secret_scalar(&self) -> Result<Scalar, Error> {
        let mut raw = [0u8; curve::SCALAR_LEN];
        raw.copy_from_slice(&self.bytes[1..1 + curve::SCALAR_LEN]);
        let scalar = curve::nonzero_scalar_from_be_bytes(&raw);
        raw.zeroize();
        scalar
    }

    /// The joint public point this share participates in.
    pub fn public_point(&self) -> Result<AffinePoint, Error> {
        curve::point_from_sec1(&self.bytes[1 + curve::SCALAR_LEN..])
    }
}

impl fmt::Debug for Keyshare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyshare")
            .field("role", &self.role())
            .field("secret", &"[redacted]")
            .finish()
    }
}
