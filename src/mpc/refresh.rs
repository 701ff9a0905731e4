//! Proactive share rotation.
//!
//! Both sides derive the same rotation scalar from a pair of exchanged
//! seeds; the validator adds it to its secret and the user subtracts it, so
//! the sum of the shares, and with it the joint public point, is unchanged.
//! The validator initiates:
//!
//! ```text
//! validator -> user    round 1: rotation seed A
//! user -> validator    round 2: rotation seed B
//! validator -> user    round 3: joint point Q (carried through, re-confirmed)
//! ```

use k256::{AffinePoint, Scalar};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::curve;
use crate::error::{Error, ProtocolError};
use crate::mpc::keyshare::Keyshare;
use crate::mpc::party::{already_finished, expect_payload, Message, Party, ProtocolKind, Status};
use crate::mpc::types::Role;

const SEED_LEN: usize = 32;
const ROTATION_TAG: &[u8] = b"share-rotation-v1";

fn rotation_scalar(seed_a: &[u8; SEED_LEN], seed_b: &[u8; SEED_LEN]) -> Scalar {
    let mut hasher = Sha256::new();
    hasher.update(ROTATION_TAG);
    hasher.update(seed_a);
    hasher.update(seed_b);
    let digest: [u8; 32] = hasher.finalize().into();
    curve::reduce_to_scalar(&digest)
}

fn random_seed() -> [u8; SEED_LEN] {
    let mut seed = [0u8; SEED_LEN];
    OsRng.fill_bytes(&mut seed);
    seed
}

enum ValidatorState {
    Start,
    AwaitSeed,
    Done,
}

/// Validator side of a refresh run; initiates.
pub struct ValidatorRefresh {
    secret: Scalar,
    joint: AffinePoint,
    seed: [u8; SEED_LEN],
    rotated: Option<Scalar>,
    state: ValidatorState,
}

/// Build the validator refresh party from its current share.
pub fn new_validator_refresh(share: &Keyshare) -> Result<ValidatorRefresh, Error> {
    Ok(ValidatorRefresh {
        secret: share.secret_scalar()?,
        joint: share.public_point()?,
        seed: random_seed(),
        rotated: None,
        state: ValidatorState::Start,
    })
}

impl Party for ValidatorRefresh {
    fn next(&mut self, incoming: Option<Message>) -> Result<(Option<Message>, Status), ProtocolError> {
        match self.state {
            ValidatorState::Start => {
                if incoming.is_some() {
                    return Err(ProtocolError::UnexpectedMessage(
                        "initiator received a message before its first round".into(),
                    ));
                }
                self.state = ValidatorState::AwaitSeed;
                Ok((
                    Some(Message::new(ProtocolKind::Refresh, 1, self.seed.to_vec())),
                    Status::Continue,
                ))
            }
            ValidatorState::AwaitSeed => {
                let payload = expect_payload(incoming, ProtocolKind::Refresh, 2, SEED_LEN)?;
                let mut peer_seed = [0u8; SEED_LEN];
                peer_seed.copy_from_slice(&payload);
                let rho = rotation_scalar(&self.seed, &peer_seed);
                self.rotated = Some(self.secret + rho);
                self.state = ValidatorState::Done;
                let confirm = Message::new(
                    ProtocolKind::Refresh,
                    3,
                    curve::point_to_compressed(&self.joint).to_vec(),
                );
                Ok((Some(confirm), Status::Finished))
            }
            ValidatorState::Done => Err(already_finished()),
        }
    }

    fn output(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let rotated = self.rotated.as_ref().ok_or(ProtocolError::NotFinished)?;
        Ok(Keyshare::encode(Role::Validator, rotated, &self.joint))
    }
}

impl Drop for ValidatorRefresh {
    fn drop(&mut self) {
        self.secret = Scalar::ZERO;
        if let Some(rotated) = self.rotated.as_mut() {
            *rotated = Scalar::ZERO;
        }
    }
}

enum UserState {
    AwaitSeed,
    AwaitConfirmation,
    Done,
}

/// User side of a refresh run; responds.
pub struct UserRefresh {
    secret: Scalar,
    joint: AffinePoint,
    seed: [u8; SEED_LEN],
    peer_seed: [u8; SEED_LEN],
    rotated: Option<Scalar>,
    state: UserState,
}

/// Build the user refresh party from its current share.
pub fn new_user_refresh(share: &Keyshare) -> Result<UserRefresh, Error> {
    Ok(UserRefresh {
        secret: share.secret_scalar()?,
        joint: share.public_point()?,
        seed: random_seed(),
        peer_seed: [0u8; SEED_LEN],
        rotated: None,
        state: UserState::AwaitSeed,
    })
}

impl Party for UserRefresh {
    fn next(&mut self, incoming: Option<Message>) -> Result<(Option<Message>, Status), ProtocolError> {
        match self.state {
            UserState::AwaitSeed => {
                let payload = expect_payload(incoming, ProtocolKind::Refresh, 1, SEED_LEN)?;
                self.peer_seed.copy_from_slice(&payload);
                self.state = UserState::AwaitConfirmation;
                Ok((
                    Some(Message::new(ProtocolKind::Refresh, 2, self.seed.to_vec())),
                    Status::Continue,
                ))
            }
            UserState::AwaitConfirmation => {
                let payload = expect_payload(incoming, ProtocolKind::Refresh, 3, 33)?;
                if curve::point_to_compressed(&self.joint)[..] != payload[..] {
                    return Err(ProtocolError::UnexpectedMessage(
                        "peer confirmed a different joint point".into(),
                    ));
                }
                let rho = rotation_scalar(&self.peer_seed, &self.seed);
                self.rotated = Some(self.secret - rho);
                self.state = UserState::Done;
                Ok((None, Status::Finished))
            }
            UserState::Done => Err(already_finished()),
        }
    }

    fn output(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let rotated = self.rotated.as_ref().ok_or(ProtocolError::NotFinished)?;
        Ok(Keyshare::encode(Role::User, rotated, &self.joint))
    }
}

impl Drop for UserRefresh {
    fn drop(&mut self) {
        self.secret = Scalar::ZERO;
        if let Some(rotated) = self.rotated.as_mut() {
            *rotated = Scalar::ZERO;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpc::dkg::{new_user_dkg, new_validator_dkg};
    use crate::mpc::protocol::run;

    fn fresh_shares() -> (Keyshare, Keyshare) {
        let mut user = new_user_dkg();
        let mut validator = new_validator_dkg();
        run(&mut user, &mut validator).unwrap();
        (
            Keyshare::from_bytes(Role::Validator, &validator.output().unwrap()).unwrap(),
            Keyshare::from_bytes(Role::User, &user.output().unwrap()).unwrap(),
        )
    }

    #[test]
    fn rotation_preserves_the_joint_point_and_moves_the_shares() {
        let (val_share, user_share) = fresh_shares();

        let mut validator = new_validator_refresh(&val_share).unwrap();
        let mut user = new_user_refresh(&user_share).unwrap();
        run(&mut validator, &mut user).unwrap();

        let new_val = Keyshare::from_bytes(Role::Validator, &validator.output().unwrap()).unwrap();
        let new_user = Keyshare::from_bytes(Role::User, &user.output().unwrap()).unwrap();

        assert_eq!(new_val.public_point().unwrap(), val_share.public_point().unwrap());
        assert_ne!(new_val.as_bytes(), val_share.as_bytes());
        assert_ne!(new_user.as_bytes(), user_share.as_bytes());

        let old_sum = val_share.secret_scalar().unwrap() + user_share.secret_scalar().unwrap();
        let new_sum = new_val.secret_scalar().unwrap() + new_user.secret_scalar().unwrap();
        assert_eq!(old_sum, new_sum);
    }

    #[test]
    fn user_cannot_initiate_a_refresh() {
        let (val_share, user_share) = fresh_shares();
        let mut validator = new_validator_refresh(&val_share).unwrap();
        let mut user = new_user_refresh(&user_share).unwrap();
        // Mis-ordered driver: the user side is asked to start.
        assert_eq!(run(&mut user, &mut validator).unwrap_err(), ProtocolError::Deadlock);
    }
}
