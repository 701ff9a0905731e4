//! Two-party signing and the signature codec.
//!
//! Signing runs over a 32-byte digest. The sides agree on the nonce point
//! multiplicatively (`R = k_u · k_v · G`), then the validator hands over a
//! masked partial and the user completes, low-S normalizes, and self-checks
//! the signature:
//!
//! ```text
//! validator -> user    round 1: Rv = kv · G
//! user -> validator    round 2: R  = ku · Rv
//! validator -> user    round 3: t = kv⁻¹(z + r·xv),  v = kv⁻¹·r
//! user: s = ku⁻¹(t + v·xu) = (kv·ku)⁻¹(z + r·x)
//! ```
//!
//! The round-3 partials are sent masked only by the nonce; the framing
//! assumes the pairwise channel between the two co-resident parties is
//! private. A hardened deployment would substitute an OT-based
//! multiplicative-to-additive conversion for round 3 without changing the
//! driver or the message layout.
//!
//! The user party's output blob is the DER encoding; the wire form used by
//! the enclave is the fixed 64-byte `r32 ‖ s32` big-endian pair.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};
use k256::elliptic_curve::Field;
use k256::{AffinePoint, Scalar};
use sha3::{Digest, Sha3_256};

use crate::curve;
use crate::error::{Error, ProtocolError};
use crate::mpc::keyshare::Keyshare;
use crate::mpc::party::{already_finished, expect_payload, Message, Party, ProtocolKind, Status};

pub const SIGNATURE_LEN: usize = 64;

/// SHA3-256 digest of a message, the hash every signature in this crate is
/// computed over.
pub fn message_digest(message: &[u8]) -> [u8; 32] {
    Sha3_256::digest(message).into()
}

fn invert(scalar: &Scalar) -> Result<Scalar, ProtocolError> {
    Option::<Scalar>::from(scalar.invert())
        .ok_or_else(|| ProtocolError::Arithmetic("nonce scalar is not invertible".into()))
}

fn verifying_key(joint: &AffinePoint) -> Result<VerifyingKey, Error> {
    VerifyingKey::from_affine(*joint).map_err(|_| Error::InvalidPoint)
}

enum ValidatorState {
    Start,
    AwaitNoncePoint,
    Done,
}

/// Validator side of a signing run; initiates the nonce agreement.
pub struct ValidatorSign {
    secret: Scalar,
    digest: [u8; 32],
    nonce: Scalar,
    state: ValidatorState,
}

/// Build the validator signing party from its share and a message digest.
pub fn new_validator_sign(share: &Keyshare, digest: [u8; 32]) -> Result<ValidatorSign, Error> {
    Ok(ValidatorSign {
        secret: share.secret_scalar()?,
        digest,
        nonce: curve::random_nonzero_scalar(),
        state: ValidatorState::Start,
    })
}

impl Party for ValidatorSign {
    fn next(&mut self, incoming: Option<Message>) -> Result<(Option<Message>, Status), ProtocolError> {
        match self.state {
            ValidatorState::Start => {
                if incoming.is_some() {
                    return Err(ProtocolError::UnexpectedMessage(
                        "initiator received a message before its first round".into(),
                    ));
                }
                let nonce_point = curve::mul_base(&self.nonce);
                self.state = ValidatorState::AwaitNoncePoint;
                Ok((
                    Some(Message::new(
                        ProtocolKind::Sign,
                        1,
                        curve::point_to_compressed(&nonce_point).to_vec(),
                    )),
                    Status::Continue,
                ))
            }
            ValidatorState::AwaitNoncePoint => {
                let payload = expect_payload(incoming, ProtocolKind::Sign, 2, 33)?;
                let nonce_point = curve::point_from_sec1(&payload)
                    .map_err(|_| ProtocolError::UnexpectedMessage("nonce point is not a point".into()))?;
                let r = curve::x_coordinate_scalar(&nonce_point);
                if bool::from(r.is_zero()) {
                    return Err(ProtocolError::Arithmetic("nonce point has zero x".into()));
                }
                let z = curve::reduce_to_scalar(&self.digest);
                let nonce_inv = invert(&self.nonce)?;
                let t = nonce_inv * (z + r * self.secret);
                let v = nonce_inv * r;

                let mut payload = Vec::with_capacity(64);
                payload.extend_from_slice(&curve::scalar_to_be_bytes(&t));
                payload.extend_from_slice(&curve::scalar_to_be_bytes(&v));
                self.state = ValidatorState::Done;
                Ok((
                    Some(Message::new(ProtocolKind::Sign, 3, payload)),
                    Status::Finished,
                ))
            }
            ValidatorState::Done => Err(already_finished()),
        }
    }

    fn output(&mut self) -> Result<Vec<u8>, ProtocolError> {
        // The completed signature is published by the user party.
        match self.state {
            ValidatorState::Done => Ok(Vec::new()),
            _ => Err(ProtocolError::NotFinished),
        }
    }
}

impl Drop for ValidatorSign {
    fn drop(&mut self) {
        self.secret = Scalar::ZERO;
        self.nonce = Scalar::ZERO;
    }
}

enum UserState {
    AwaitNoncePoint,
    AwaitPartial,
    Done,
}

/// User side of a signing run; completes and publishes the signature.
pub struct UserSign {
    secret: Scalar,
    joint: AffinePoint,
    digest: [u8; 32],
    nonce: Scalar,
    r: Scalar,
    encoded: Vec<u8>,
    state: UserState,
}

/// Build the user signing party from its share and a message digest.
pub fn new_user_sign(share: &Keyshare, digest: [u8; 32]) -> Result<UserSign, Error> {
    Ok(UserSign {
        secret: share.secret_scalar()?,
        joint: share.public_point()?,
        digest,
        nonce: Scalar::ZERO,
        r: Scalar::ZERO,
        encoded: Vec::new(),
        state: UserState::AwaitNoncePoint,
    })
}

impl Party for UserSign {
    fn next(&mut self, incoming: Option<Message>) -> Result<(Option<Message>, Status), ProtocolError> {
        match self.state {
            UserState::AwaitNoncePoint => {
                let payload = expect_payload(incoming, ProtocolKind::Sign, 1, 33)?;
                let peer_point = curve::point_from_sec1(&payload)
                    .map_err(|_| ProtocolError::UnexpectedMessage("nonce point is not a point".into()))?;

                // Redraw until the combined nonce point has a usable x
                // coordinate; a zero r is astronomically unlikely but
                // rejected by ECDSA.
                let (nonce, nonce_point) = loop {
                    let candidate = curve::random_nonzero_scalar();
                    let point = curve::mul_point(&candidate, &peer_point);
                    if !bool::from(curve::x_coordinate_scalar(&point).is_zero()) {
                        break (candidate, point);
                    }
                };
                self.nonce = nonce;
                self.r = curve::x_coordinate_scalar(&nonce_point);
                self.state = UserState::AwaitPartial;
                Ok((
                    Some(Message::new(
                        ProtocolKind::Sign,
                        2,
                        curve::point_to_compressed(&nonce_point).to_vec(),
                    )),
                    Status::Continue,
                ))
            }
            UserState::AwaitPartial => {
                let payload = expect_payload(incoming, ProtocolKind::Sign, 3, 64)?;
                let mut t_bytes = [0u8; 32];
                let mut v_bytes = [0u8; 32];
                t_bytes.copy_from_slice(&payload[..32]);
                v_bytes.copy_from_slice(&payload[32..]);
                let t = curve::scalar_from_be_bytes(&t_bytes)
                    .map_err(|_| ProtocolError::UnexpectedMessage("partial t out of range".into()))?;
                let v = curve::scalar_from_be_bytes(&v_bytes)
                    .map_err(|_| ProtocolError::UnexpectedMessage("partial v out of range".into()))?;

                let nonce_inv = invert(&self.nonce)?;
                let s = nonce_inv * (t + v * self.secret);
                if bool::from(s.is_zero()) {
                    return Err(ProtocolError::Arithmetic("signature s is zero".into()));
                }

                let signature = Signature::from_scalars(self.r.to_bytes(), s.to_bytes())
                    .map_err(|_| ProtocolError::Arithmetic("signature scalars rejected".into()))?;
                let signature = signature.normalize_s().unwrap_or(signature);

                // Self-check against the joint key before publishing.
                let key = verifying_key(&self.joint)
                    .map_err(|_| ProtocolError::Arithmetic("joint point rejected as a key".into()))?;
                if key.verify_prehash(&self.digest, &signature).is_err() {
                    return Err(ProtocolError::Arithmetic(
                        "completed signature failed self-verification".into(),
                    ));
                }

                self.encoded = signature.to_der().as_bytes().to_vec();
                self.state = UserState::Done;
                Ok((None, Status::Finished))
            }
            UserState::Done => Err(already_finished()),
        }
    }

    fn output(&mut self) -> Result<Vec<u8>, ProtocolError> {
        match self.state {
            UserState::Done => Ok(self.encoded.clone()),
            _ => Err(ProtocolError::NotFinished),
        }
    }
}

impl Drop for UserSign {
    fn drop(&mut self) {
        self.secret = Scalar::ZERO;
        self.nonce = Scalar::ZERO;
    }
}

/// Parse the DER blob a signing run publishes.
pub fn decode_signature(blob: &[u8]) -> Result<Signature, Error> {
    Signature::from_der(blob).map_err(|e| Error::Codec(format!("signature DER: {e}")))
}

/// Fixed-width wire form: `r32 ‖ s32`, big-endian.
pub fn serialize_signature(signature: &Signature) -> [u8; SIGNATURE_LEN] {
    signature.to_bytes().into()
}

/// Strict parse of the 64-byte wire form. Rejects bad lengths and `r` or
/// `s` outside `[1, n-1]`.
pub fn deserialize_signature(bytes: &[u8]) -> Result<Signature, Error> {
    if bytes.len() != SIGNATURE_LEN {
        return Err(Error::Codec(format!(
            "signature has {} bytes, wanted {SIGNATURE_LEN}",
            bytes.len()
        )));
    }
    Signature::from_slice(bytes).map_err(|_| Error::Codec("signature scalar out of range".into()))
}

/// Stateless verification for hosts that hold only the public key bytes.
///
/// `pub_key` is a SEC1 point, compressed or uncompressed; a malformed key
/// or signature is an error, a mere mismatch is `Ok(false)`.
pub fn verify_with_pub_key(pub_key: &[u8], message: &[u8], sig: &[u8]) -> Result<bool, Error> {
    let point = curve::point_from_sec1(pub_key)?;
    let key = verifying_key(&point)?;
    let signature = deserialize_signature(sig)?;
    let digest = message_digest(message);
    Ok(key.verify_prehash(&digest, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpc::dkg::{new_user_dkg, new_validator_dkg};
    use crate::mpc::protocol::run;
    use crate::mpc::types::Role;

    fn fresh_shares() -> (Keyshare, Keyshare) {
        let mut user = new_user_dkg();
        let mut validator = new_validator_dkg();
        run(&mut user, &mut validator).unwrap();
        (
            Keyshare::from_bytes(Role::Validator, &validator.output().unwrap()).unwrap(),
            Keyshare::from_bytes(Role::User, &user.output().unwrap()).unwrap(),
        )
    }

    fn sign_digest(val: &Keyshare, user: &Keyshare, digest: [u8; 32]) -> Signature {
        let mut validator = new_validator_sign(val, digest).unwrap();
        let mut signer = new_user_sign(user, digest).unwrap();
        run(&mut validator, &mut signer).unwrap();
        decode_signature(&signer.output().unwrap()).unwrap()
    }

    #[test]
    fn joint_signature_verifies_under_the_joint_key() {
        let (val, user) = fresh_shares();
        let digest = message_digest(b"two keys, one signature");
        let signature = sign_digest(&val, &user, digest);

        let key = verifying_key(&val.public_point().unwrap()).unwrap();
        assert!(key.verify_prehash(&digest, &signature).is_ok());
    }

    #[test]
    fn signature_wire_form_roundtrips() {
        let (val, user) = fresh_shares();
        let digest = message_digest(b"wire");
        let signature = sign_digest(&val, &user, digest);

        let wire = serialize_signature(&signature);
        assert_eq!(wire.len(), SIGNATURE_LEN);
        assert_eq!(deserialize_signature(&wire).unwrap(), signature);
    }

    #[test]
    fn deserialize_rejects_bad_lengths_and_zero_scalars() {
        assert!(deserialize_signature(&[]).is_err());
        assert!(deserialize_signature(&[0u8; 63]).is_err());
        assert!(deserialize_signature(&[0u8; 64]).is_err());
        let mut half_zero = [0u8; 64];
        half_zero[31] = 1; // r = 1, s = 0
        assert!(deserialize_signature(&half_zero).is_err());
    }

    #[test]
    fn verify_with_pub_key_accepts_and_rejects() {
        let (val, user) = fresh_shares();
        let message = b"stateless verify";
        let digest = message_digest(message);
        let signature = sign_digest(&val, &user, digest);
        let wire = serialize_signature(&signature);

        let compressed = curve::point_to_compressed(&val.public_point().unwrap());
        let uncompressed = curve::point_to_uncompressed(&val.public_point().unwrap());
        assert!(verify_with_pub_key(&compressed, message, &wire).unwrap());
        assert!(verify_with_pub_key(&uncompressed, message, &wire).unwrap());
        assert!(!verify_with_pub_key(&compressed, b"another message", &wire).unwrap());
        assert!(verify_with_pub_key(&[0x05; 33], message, &wire).is_err());
    }

    #[test]
    fn user_cannot_initiate_signing() {
        let (val, user) = fresh_shares();
        let digest = message_digest(b"order matters");
        let mut validator = new_validator_sign(&val, digest).unwrap();
        let mut signer = new_user_sign(&user, digest).unwrap();
        assert_eq!(run(&mut signer, &mut validator).unwrap_err(), ProtocolError::Deadlock);
    }

    #[test]
    fn emitted_scalars_are_always_in_range() {
        let (val, user) = fresh_shares();
        for i in 0..4u8 {
            let digest = message_digest(&[i]);
            let signature = sign_digest(&val, &user, digest);
            let wire = serialize_signature(&signature);
            // A strict parse enforces 0 < r, s < n.
            deserialize_signature(&wire).unwrap();
        }
    }
}
