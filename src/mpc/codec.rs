//! Enclave serialization and the sealed export format.
//!
//! The stable JSON form carries the public point twice (compressed hex and
//! uncompressed base64), both share blobs, the nonce, and the curve tag;
//! field names are part of the wire contract. A sealed blob is
//!
//! ```text
//! nonce(12) ‖ AES-256-GCM(key = SHA-256(user key), nonce, json, aad = ∅)
//! ```
//!
//! with the GCM output being ciphertext followed by the 16-byte tag. The
//! nonce prefix makes the blob self-contained; unsealing cross-checks it
//! against the nonce inside the decrypted JSON. Reusing the enclave nonce
//! across exports is sound because the plaintext is fixed for the enclave's
//! lifetime; the nonce changes exactly when the plaintext does.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::curve;
use crate::error::Error;
use crate::mpc::enclave::Enclave;
use crate::mpc::keyshare::Keyshare;
use crate::mpc::types::{CurveTag, Role, NONCE_LEN};

/// GCM authentication tag length.
const TAG_LEN: usize = 16;

/// Serde adapter for byte fields carried as standard base64 strings.
pub(crate) mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// The JSON record; field names are bit-exact and stable.
#[derive(Serialize, Deserialize)]
struct EnclaveRecord {
    pub_hex: String,
    #[serde(with = "b64")]
    pub_key: Vec<u8>,
    #[serde(with = "b64")]
    val_share: Vec<u8>,
    #[serde(with = "b64")]
    user_share: Vec<u8>,
    #[serde(with = "b64")]
    nonce: Vec<u8>,
    curve: CurveTag,
}

pub(crate) fn to_json(enclave: &Enclave) -> Result<Vec<u8>, Error> {
    let record = EnclaveRecord {
        pub_hex: enclave.pub_key_hex(),
        pub_key: enclave.pub_key_uncompressed().to_vec(),
        val_share: enclave.val_share().as_bytes().to_vec(),
        user_share: enclave.user_share().as_bytes().to_vec(),
        nonce: enclave.nonce().to_vec(),
        curve: enclave.curve_tag(),
    };
    serde_json::to_vec(&record).map_err(|e| Error::Codec(format!("serialize enclave: {e}")))
}

pub(crate) fn from_json(bytes: &[u8]) -> Result<Enclave, Error> {
    let record: EnclaveRecord =
        serde_json::from_slice(bytes).map_err(|e| Error::Codec(format!("deserialize enclave: {e}")))?;

    let public = curve::point_from_sec1(&record.pub_key)?;
    if hex::encode(curve::point_to_compressed(&public)) != record.pub_hex {
        return Err(Error::Codec("pub_hex does not match pub_key".into()));
    }

    let nonce: [u8; NONCE_LEN] = record
        .nonce
        .as_slice()
        .try_into()
        .map_err(|_| Error::Codec("nonce must be 12 bytes".into()))?;

    let val_share = Keyshare::from_bytes(Role::Validator, &record.val_share)?;
    let user_share = Keyshare::from_bytes(Role::User, &record.user_share)?;
    let enclave = Enclave::from_parts(val_share, user_share, nonce)?;
    if *enclave.public_point() != public {
        return Err(Error::Codec("pub_key does not match the shares".into()));
    }
    Ok(enclave)
}

fn cipher_for_key(key: &[u8]) -> Result<Aes256Gcm, Error> {
    let hashed: [u8; 32] = Sha256::digest(key).into();
    Aes256Gcm::new_from_slice(&hashed).map_err(|_| Error::Codec("cipher key setup failed".into()))
}

/// Encrypt the enclave's JSON form under `key`.
pub(crate) fn seal(enclave: &Enclave, key: &[u8]) -> Result<Vec<u8>, Error> {
    let plaintext = to_json(enclave)?;
    let cipher = cipher_for_key(key)?;
    let sealed = cipher
        .encrypt(Nonce::from_slice(enclave.nonce()), plaintext.as_slice())
        .map_err(|_| Error::Codec("encryption failed".into()))?;

    let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());
    blob.extend_from_slice(enclave.nonce());
    blob.extend_from_slice(&sealed);
    tracing::debug!(bytes = blob.len(), "enclave sealed");
    Ok(blob)
}

/// Decrypt and validate a sealed blob.
pub(crate) fn unseal(blob: &[u8], key: &[u8]) -> Result<Enclave, Error> {
    if blob.is_empty() {
        return Err(Error::EmptySealedInput);
    }
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(Error::Codec("sealed blob too short".into()));
    }
    let (nonce, sealed) = blob.split_at(NONCE_LEN);

    let cipher = cipher_for_key(key)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| Error::AuthFailed)?;

    let enclave = from_json(&plaintext)?;
    if enclave.nonce() != nonce {
        return Err(Error::Codec("sealed nonce does not match enclave nonce".into()));
    }
    Ok(enclave)
}
