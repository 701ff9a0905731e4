//! Two-party distributed key generation.
//!
//! The joint key is additively shared: each side draws a secret scalar and
//! the joint public point is the sum of the two public shares. The user
//! side initiates with a hash commitment to its public share, so neither
//! side can pick its share as a function of the other's. Round trip:
//!
//! ```text
//! user  -> validator   round 1: SHA-256 commitment to Qu
//! validator -> user    round 2: Qv
//! user  -> validator   round 3: Qu (reveal)
//! validator -> user    round 4: joint point Q, after checking the reveal
//! ```
//!
//! Both sides finish holding `role ‖ secret ‖ Q`.

use k256::{AffinePoint, Scalar};
use sha2::{Digest, Sha256};

use crate::curve;
use crate::error::ProtocolError;
use crate::mpc::keyshare::Keyshare;
use crate::mpc::party::{already_finished, expect_payload, Message, Party, ProtocolKind, Status};
use crate::mpc::types::Role;

fn commit_to_point(point_bytes: &[u8; 33]) -> [u8; 32] {
    Sha256::digest(point_bytes).into()
}

fn joint_point(a: &AffinePoint, b: &AffinePoint) -> Result<AffinePoint, ProtocolError> {
    curve::add_points(a, b)
        .map_err(|_| ProtocolError::Arithmetic("joint public point is the identity".into()))
}

enum ValidatorState {
    AwaitCommitment,
    AwaitReveal,
    Done,
}

/// Validator ("Alice") side of DKG. Responds to the user's messages.
pub struct ValidatorDkg {
    secret: Scalar,
    own_point: AffinePoint,
    peer_commitment: [u8; 32],
    joint: Option<AffinePoint>,
    state: ValidatorState,
}

/// Fresh validator DKG party.
pub fn new_validator_dkg() -> ValidatorDkg {
    let secret = curve::random_nonzero_scalar();
    ValidatorDkg {
        secret,
        own_point: curve::mul_base(&secret),
        peer_commitment: [0u8; 32],
        joint: None,
        state: ValidatorState::AwaitCommitment,
    }
}

impl Party for ValidatorDkg {
    fn next(&mut self, incoming: Option<Message>) -> Result<(Option<Message>, Status), ProtocolError> {
        match self.state {
            ValidatorState::AwaitCommitment => {
                let payload = expect_payload(incoming, ProtocolKind::Dkg, 1, 32)?;
                self.peer_commitment.copy_from_slice(&payload);
                self.state = ValidatorState::AwaitReveal;
                let reply = Message::new(
                    ProtocolKind::Dkg,
                    2,
                    curve::point_to_compressed(&self.own_point).to_vec(),
                );
                Ok((Some(reply), Status::Continue))
            }
            ValidatorState::AwaitReveal => {
                let payload = expect_payload(incoming, ProtocolKind::Dkg, 3, 33)?;
                let mut revealed = [0u8; 33];
                revealed.copy_from_slice(&payload);
                if commit_to_point(&revealed) != self.peer_commitment {
                    return Err(ProtocolError::CommitmentMismatch);
                }
                let peer_point = curve::point_from_sec1(&revealed)
                    .map_err(|_| ProtocolError::UnexpectedMessage("revealed share is not a point".into()))?;
                let joint = joint_point(&self.own_point, &peer_point)?;
                self.joint = Some(joint);
                self.state = ValidatorState::Done;
                let reply =
                    Message::new(ProtocolKind::Dkg, 4, curve::point_to_compressed(&joint).to_vec());
                Ok((Some(reply), Status::Finished))
            }
            ValidatorState::Done => Err(already_finished()),
        }
    }

    fn output(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let joint = self.joint.as_ref().ok_or(ProtocolError::NotFinished)?;
        Ok(Keyshare::encode(Role::Validator, &self.secret, joint))
    }
}

impl Drop for ValidatorDkg {
    fn drop(&mut self) {
        self.secret = Scalar::ZERO;
    }
}

enum UserState {
    Start,
    AwaitPoint,
    AwaitConfirmation,
    Done,
}

/// User ("Bob") side of DKG. Initiates the run.
pub struct UserDkg {
    secret: Scalar,
    own_point: AffinePoint,
    peer_point: Option<AffinePoint>,
    joint: Option<AffinePoint>,
    state: UserState,
}

/// Fresh user DKG party; this side sends the first message.
pub fn new_user_dkg() -> UserDkg {
    let secret = curve::random_nonzero_scalar();
    UserDkg {
        secret,
        own_point: curve::mul_base(&secret),
        peer_point: None,
        joint: None,
        state: UserState::Start,
    }
}

impl Party for UserDkg {
    fn next(&mut self, incoming: Option<Message>) -> Result<(Option<Message>, Status), ProtocolError> {
        match self.state {
            UserState::Start => {
                if incoming.is_some() {
                    return Err(ProtocolError::UnexpectedMessage(
                        "initiator received a message before its first round".into(),
                    ));
                }
                let commitment = commit_to_point(&curve::point_to_compressed(&self.own_point));
                self.state = UserState::AwaitPoint;
                Ok((
                    Some(Message::new(ProtocolKind::Dkg, 1, commitment.to_vec())),
                    Status::Continue,
                ))
            }
            UserState::AwaitPoint => {
                let payload = expect_payload(incoming, ProtocolKind::Dkg, 2, 33)?;
                let peer_point = curve::point_from_sec1(&payload)
                    .map_err(|_| ProtocolError::UnexpectedMessage("peer share is not a point".into()))?;
                self.peer_point = Some(peer_point);
                self.state = UserState::AwaitConfirmation;
                let reveal = Message::new(
                    ProtocolKind::Dkg,
                    3,
                    curve::point_to_compressed(&self.own_point).to_vec(),
                );
                Ok((Some(reveal), Status::Continue))
            }
            UserState::AwaitConfirmation => {
                let payload = expect_payload(incoming, ProtocolKind::Dkg, 4, 33)?;
                let peer_point = self
                    .peer_point
                    .as_ref()
                    .ok_or_else(|| ProtocolError::UnexpectedMessage("confirmation before peer share".into()))?;
                let joint = joint_point(peer_point, &self.own_point)?;
                if curve::point_to_compressed(&joint)[..] != payload[..] {
                    return Err(ProtocolError::UnexpectedMessage(
                        "peer confirmed a different joint point".into(),
                    ));
                }
                self.joint = Some(joint);
                self.state = UserState::Done;
                Ok((None, Status::Finished))
            }
            UserState::Done => Err(already_finished()),
        }
    }

    fn output(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let joint = self.joint.as_ref().ok_or(ProtocolError::NotFinished)?;
        Ok(Keyshare::encode(Role::User, &self.secret, joint))
    }
}

impl Drop for UserDkg {
    fn drop(&mut self) {
        self.secret = Scalar::ZERO;
    }
}
