//! The secret-share enclave.
//!
//! An enclave owns the two shares of one completed DKG run, the joint
//! public key they define, and the 12-byte nonce its sealed exports are
//! encrypted under. It is read-only after construction: signing and
//! verification build their own ephemeral parties from the shares, and
//! refresh produces a whole new enclave instead of mutating this one, so
//! concurrent use from multiple threads needs no locks. The nonce is
//! regenerated exactly where the serialized plaintext changes, by `new` and
//! by `refresh`, which is what makes its reuse as the GCM nonce across
//! repeated exports of the same enclave sound.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::AffinePoint;

use crate::curve;
use crate::error::Error;
use crate::mpc::codec;
use crate::mpc::import::ImportBuilder;
use crate::mpc::keyshare::Keyshare;
use crate::mpc::party::Party;
use crate::mpc::protocol::run;
use crate::mpc::signing::{self, new_user_sign, new_validator_sign};
use crate::mpc::types::{random_nonce, CurveTag, Role, NONCE_LEN};
use crate::mpc::{dkg, refresh};

pub struct Enclave {
    public: AffinePoint,
    pub_compressed: [u8; curve::POINT_COMPRESSED_LEN],
    pub_uncompressed: [u8; curve::POINT_UNCOMPRESSED_LEN],
    val_share: Keyshare,
    user_share: Keyshare,
    nonce: [u8; NONCE_LEN],
    curve: CurveTag,
}

impl Enclave {
    /// Run a fresh DKG and assemble the enclave around its outputs.
    pub fn new() -> Result<Self, Error> {
        let mut user = dkg::new_user_dkg();
        let mut validator = dkg::new_validator_dkg();
        run(&mut user, &mut validator)?;

        let val_blob = validator.output()?;
        let user_blob = user.output()?;
        let val_share = Keyshare::from_bytes(Role::Validator, &val_blob)?;
        let user_share = Keyshare::from_bytes(Role::User, &user_blob)?;
        let enclave = Self::from_parts(val_share, user_share, random_nonce())?;
        tracing::debug!(pub_key = %enclave.pub_key_hex(), "enclave generated");
        Ok(enclave)
    }

    /// Start an import; see [`ImportBuilder`] for the accepted sources.
    pub fn import() -> ImportBuilder {
        ImportBuilder::new()
    }

    /// Assemble an enclave from validated shares and a nonce. The public
    /// point comes from the validator share; the user share must agree.
    pub(crate) fn from_parts(
        val_share: Keyshare,
        user_share: Keyshare,
        nonce: [u8; NONCE_LEN],
    ) -> Result<Self, Error> {
        let public = val_share.public_point()?;
        if user_share.public_point()? != public {
            return Err(Error::InvalidShare(Role::User));
        }
        Ok(Enclave {
            public,
            pub_compressed: curve::point_to_compressed(&public),
            pub_uncompressed: curve::point_to_uncompressed(&public),
            val_share,
            user_share,
            nonce,
            curve: CurveTag::K256,
        })
    }

    /// Sign a message. Hashes with SHA3-256, runs the interactive signing
    /// protocol with the validator initiating, and returns the 64-byte
    /// `r32 ‖ s32` wire form.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Error> {
        let digest = signing::message_digest(message);
        let mut validator = new_validator_sign(&self.val_share, digest)?;
        let mut user = new_user_sign(&self.user_share, digest)?;
        run(&mut validator, &mut user)?;

        let signature = signing::decode_signature(&user.output()?)?;
        Ok(signing::serialize_signature(&signature).to_vec())
    }

    /// Verify a 64-byte signature over `message` against the joint public
    /// key. A mismatch is `Ok(false)`; only malformed input is an error.
    pub fn verify(&self, message: &[u8], sig: &[u8]) -> Result<bool, Error> {
        let signature = signing::deserialize_signature(sig)?;
        let key = k256::ecdsa::VerifyingKey::from_affine(self.public).map_err(|_| Error::InvalidPoint)?;
        let digest = signing::message_digest(message);
        Ok(key.verify_prehash(&digest, &signature).is_ok())
    }

    /// Rotate both shares while keeping the joint public key. Returns a new
    /// enclave with a fresh nonce; the receiver is untouched and both
    /// enclaves keep verifying the same signatures.
    pub fn refresh(&self) -> Result<Self, Error> {
        let mut validator = refresh::new_validator_refresh(&self.val_share)?;
        let mut user = refresh::new_user_refresh(&self.user_share)?;
        run(&mut validator, &mut user)?;

        let val_share = Keyshare::from_bytes(Role::Validator, &validator.output()?)?;
        let user_share = Keyshare::from_bytes(Role::User, &user.output()?)?;
        let rotated = Self::from_parts(val_share, user_share, random_nonce())?;
        if rotated.pub_compressed != self.pub_compressed {
            return Err(Error::Protocol("refresh moved the joint public key".into()));
        }
        tracing::debug!(pub_key = %rotated.pub_key_hex(), "enclave refreshed");
        Ok(rotated)
    }

    /// Check the structural invariants: shares parse, both agree on the
    /// public point, and the curve tag is recognized.
    pub fn is_valid(&self) -> bool {
        let val_ok = self
            .val_share
            .public_point()
            .map(|p| p == self.public)
            .unwrap_or(false);
        let user_ok = self
            .user_share
            .public_point()
            .map(|p| p == self.public)
            .unwrap_or(false);
        let shares_ok = self.val_share.secret_scalar().is_ok() && self.user_share.secret_scalar().is_ok();
        val_ok && user_ok && shares_ok && self.nonce.len() == NONCE_LEN && self.curve == CurveTag::K256
    }

    /// Seal the enclave under a caller-supplied key; see the module docs of
    /// the codec for the blob layout.
    pub fn export(&self, key: &[u8]) -> Result<Vec<u8>, Error> {
        codec::seal(self, key)
    }

    /// The stable JSON form, unencrypted, for hosts that manage storage
    /// themselves.
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        codec::to_json(self)
    }

    pub fn pub_key_compressed(&self) -> [u8; curve::POINT_COMPRESSED_LEN] {
        self.pub_compressed
    }

    pub fn pub_key_uncompressed(&self) -> [u8; curve::POINT_UNCOMPRESSED_LEN] {
        self.pub_uncompressed
    }

    pub fn pub_key_hex(&self) -> String {
        hex::encode(self.pub_compressed)
    }

    pub fn curve_tag(&self) -> CurveTag {
        self.curve
    }

    pub(crate) fn public_point(&self) -> &AffinePoint {
        &self.public
    }

    /// The validator-side share. Opaque; see [`Keyshare`].
    pub fn val_share(&self) -> &Keyshare {
        &self.val_share
    }

    /// The user-side share. Opaque; see [`Keyshare`].
    pub fn user_share(&self) -> &Keyshare {
        &self.user_share
    }

    pub(crate) fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }
}

impl std::fmt::Debug for Enclave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enclave")
            .field("pub_key", &self.pub_key_hex())
            .field("curve", &self.curve)
            .finish_non_exhaustive()
    }
}
