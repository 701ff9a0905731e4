//! The party abstraction.
//!
//! Each side of a two-party protocol is a `Party`: an iterator-like state
//! machine cranked forward one message at a time by the driver. `next`
//! consumes the peer's last message (or `None` for the initiator's first
//! call) and produces at most one outgoing message plus a status. After
//! `Finished`, `output` yields the party's result blob: a serialized key
//! share for DKG and refresh, an encoded signature for the user signing
//! party.

use crate::error::ProtocolError;

pub use crate::mpc::dkg::{new_user_dkg, new_validator_dkg, UserDkg, ValidatorDkg};
pub use crate::mpc::refresh::{new_user_refresh, new_validator_refresh, UserRefresh, ValidatorRefresh};
pub use crate::mpc::signing::{new_user_sign, new_validator_sign, UserSign, ValidatorSign};

/// Which of the three interactive protocols a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    Dkg,
    Refresh,
    Sign,
}

/// One protocol message in flight between the two parties.
#[derive(Debug, Clone)]
pub struct Message {
    pub protocol: ProtocolKind,
    pub round: u8,
    pub payload: Vec<u8>,
}

impl Message {
    pub(crate) fn new(protocol: ProtocolKind, round: u8, payload: Vec<u8>) -> Self {
        Message { protocol, round, payload }
    }
}

/// Outcome of one `next` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// More rounds to go; the driver keeps pumping this party.
    Continue,
    /// This party is done and must not be called again.
    Finished,
}

/// One endpoint of a two-party protocol.
pub trait Party {
    /// Advance by one round. `incoming` is the peer's last message; the
    /// initiator's first call passes `None`. Work inside is bounded and
    /// synchronous; there is no I/O and no blocking.
    fn next(&mut self, incoming: Option<Message>) -> Result<(Option<Message>, Status), ProtocolError>;

    /// The party's result blob, valid only once `next` has reported
    /// `Finished`.
    fn output(&mut self) -> Result<Vec<u8>, ProtocolError>;
}

/// Unwrap an expected peer message, checking protocol kind, round number,
/// and payload length. `None` here means the driver was mis-ordered.
pub(crate) fn expect_payload(
    incoming: Option<Message>,
    protocol: ProtocolKind,
    round: u8,
    payload_len: usize,
) -> Result<Vec<u8>, ProtocolError> {
    let msg = incoming.ok_or(ProtocolError::Deadlock)?;
    if msg.protocol != protocol || msg.round != round {
        return Err(ProtocolError::UnexpectedMessage(format!(
            "wanted {protocol:?} round {round}, got {:?} round {}",
            msg.protocol, msg.round
        )));
    }
    if msg.payload.len() != payload_len {
        return Err(ProtocolError::UnexpectedMessage(format!(
            "{protocol:?} round {round} payload has {} bytes, wanted {payload_len}",
            msg.payload.len()
        )));
    }
    Ok(msg.payload)
}

/// Reject any message on a party whose run already ended.
pub(crate) fn already_finished() -> ProtocolError {
    ProtocolError::UnexpectedMessage("party already finished".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expect_payload_flags_missing_message_as_deadlock() {
        let err = expect_payload(None, ProtocolKind::Dkg, 1, 32).unwrap_err();
        assert_eq!(err, ProtocolError::Deadlock);
    }

    #[test]
    fn expect_payload_checks_kind_round_and_length() {
        let msg = Message::new(ProtocolKind::Sign, 2, vec![0u8; 33]);
        assert!(expect_payload(Some(msg.clone()), ProtocolKind::Dkg, 2, 33).is_err());
        assert!(expect_payload(Some(msg.clone()), ProtocolKind::Sign, 3, 33).is_err());
        assert!(expect_payload(Some(msg.clone()), ProtocolKind::Sign, 2, 32).is_err());
        assert!(expect_payload(Some(msg), ProtocolKind::Sign, 2, 33).is_ok());
    }
}
