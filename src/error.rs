//! Crate-wide error taxonomy.
//!
//! Two layers: `ProtocolError` is what the two-party engines and the driver
//! speak among themselves; `Error` is what callers of the enclave see. Engine
//! failures fold into `Error::Protocol` at the enclave boundary and are never
//! retried, because partial protocol state is not reusable.

use thiserror::Error;

use crate::mpc::types::Role;

/// Failure of one of the interactive two-party protocols.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A party expected a peer message and received none. Usually a
    /// mis-ordered driver call: the non-initiator was passed as `first`.
    #[error("party expected a peer message before producing one")]
    Deadlock,

    /// A message arrived for the wrong protocol, the wrong round, or with a
    /// malformed payload.
    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),

    /// A revealed value did not match its earlier commitment.
    #[error("commitment mismatch")]
    CommitmentMismatch,

    /// Scalar or point arithmetic hit a degenerate value.
    #[error("arithmetic failure: {0}")]
    Arithmetic(String),

    /// `output()` was called before the party reported `Finished`.
    #[error("output requested before the protocol finished")]
    NotFinished,
}

/// Errors surfaced by enclave, codec, and key-derivation operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The two-party protocol aborted. The caller must restart the whole
    /// operation; there is no partial recovery.
    #[error("protocol aborted: {0}")]
    Protocol(String),

    /// Malformed serialized input: JSON, base58, signature bytes, or a
    /// sealed blob with an impossible shape.
    #[error("codec: {0}")]
    Codec(String),

    /// AEAD tag mismatch while unsealing. Wrong key or tampered blob; no
    /// plaintext is returned.
    #[error("authentication failed")]
    AuthFailed,

    /// A share blob failed validation for the given side.
    #[error("invalid {0} share")]
    InvalidShare(Role),

    /// A required share was not supplied for the given side.
    #[error("missing {0} share")]
    MissingShare(Role),

    /// Bytes that should describe a curve point do not.
    #[error("invalid curve point")]
    InvalidPoint,

    /// Bytes that should describe a scalar in range do not.
    #[error("invalid scalar")]
    InvalidScalar,

    /// The import builder was run with no options at all.
    #[error("no import options provided")]
    NoImportOptions,

    /// The import builder was handed an empty sealed blob.
    #[error("sealed input cannot be empty")]
    EmptySealedInput,
}

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::Protocol(err.to_string())
    }
}
