//! Hashing, base58check, and secp256k1 key-derivation helpers.
//!
//! These back the address and serialization surface: compressed-pubkey
//! derivation, point and scalar addition for child keys, and the base58check
//! envelope. Scalar and point parsing is delegated to the curve adapter so
//! the byte-padding rules stay in one place.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::curve;
use crate::error::Error;

/// Base58 alphabet, shared with the `bs58` crate's default.
pub const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// RIPEMD-160 of SHA-256, the classic address hash.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(sha256(data)).into()
}

/// First four bytes of the double SHA-256.
pub fn checksum4(data: &[u8]) -> [u8; 4] {
    let hash = double_sha256(data);
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Base58 with a trailing 4-byte checksum. Leading zero bytes come out as
/// leading '1' characters, one per byte.
pub fn base58check_encode(payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + 4);
    data.extend_from_slice(payload);
    data.extend_from_slice(&checksum4(payload));
    bs58::encode(data).into_string()
}

/// Inverse of [`base58check_encode`]; verifies and strips the checksum.
pub fn base58check_decode(s: &str) -> Result<Vec<u8>, Error> {
    let data = bs58::decode(s)
        .into_vec()
        .map_err(|e| Error::Codec(format!("base58: {e}")))?;
    if data.len() < 4 {
        return Err(Error::Codec("base58check payload too short".into()));
    }
    let (payload, checksum) = data.split_at(data.len() - 4);
    if checksum4(payload) != checksum {
        return Err(Error::Codec("base58check checksum mismatch".into()));
    }
    Ok(payload.to_vec())
}

/// Compressed secp256k1 public key for a 32-byte private scalar.
pub fn public_key_for_private_key(key: &[u8; 32]) -> Result<[u8; 33], Error> {
    let scalar = curve::nonzero_scalar_from_be_bytes(key)?;
    Ok(curve::point_to_compressed(&curve::mul_base(&scalar)))
}

/// Point addition of two compressed public keys, compressed result.
pub fn add_public_keys(a: &[u8], b: &[u8]) -> Result<[u8; 33], Error> {
    let pa = curve::point_from_sec1(a)?;
    let pb = curve::point_from_sec1(b)?;
    Ok(curve::point_to_compressed(&curve::add_points(&pa, &pb)?))
}

/// Scalar addition modulo the curve order; zero-padded big-endian result.
pub fn add_private_keys(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let sum = curve::reduce_to_scalar(a) + curve::reduce_to_scalar(b);
    curve::scalar_to_be_bytes(&sum)
}

/// A private key must be 32 bytes, nonzero, and below the curve order.
pub fn validate_private_key(key: &[u8]) -> Result<(), Error> {
    let bytes: [u8; 32] = key.try_into().map_err(|_| Error::InvalidScalar)?;
    curve::nonzero_scalar_from_be_bytes(&bytes).map(|_| ())
}

/// A public key must be a SEC1-parseable, non-identity point.
pub fn validate_public_key(key: &[u8]) -> Result<(), Error> {
    curve::point_from_sec1(key).map(|_| ())
}

/// Big-endian encoding of a child index.
pub fn uint32_be(i: u32) -> [u8; 4] {
    i.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_sha256_of_empty_input() {
        // Well-known vector: SHA-256 applied twice to the empty string.
        let expected = "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456";
        assert_eq!(hex::encode(double_sha256(b"")), expected);
    }

    #[test]
    fn hash160_known_vector() {
        // hash160 of the empty string.
        let expected = "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb";
        assert_eq!(hex::encode(hash160(b"")), expected);
    }

    #[test]
    fn base58check_roundtrip() {
        let payload = [0x00, 0x01, 0x02, 0xfe, 0xff];
        let encoded = base58check_encode(&payload);
        assert_eq!(base58check_decode(&encoded).unwrap(), payload);
    }

    #[test]
    fn base58check_preserves_leading_zeros() {
        for zeros in 0..4 {
            let mut payload = vec![0u8; zeros];
            payload.extend_from_slice(&[0xab, 0xcd]);
            let encoded = base58check_encode(&payload);
            let leading_ones = encoded.chars().take_while(|&c| c == '1').count();
            assert_eq!(leading_ones, zeros, "payload {payload:02x?}");
            assert_eq!(base58check_decode(&encoded).unwrap(), payload);
        }
    }

    #[test]
    fn base58check_rejects_tampering() {
        let encoded = base58check_encode(&[0xde, 0xad, 0xbe, 0xef]);
        let mut chars: Vec<char> = encoded.chars().collect();
        chars[0] = if chars[0] == '2' { '3' } else { '2' };
        let tampered: String = chars.into_iter().collect();
        assert!(base58check_decode(&tampered).is_err());
        assert!(base58check_decode("0OIl").is_err());
    }

    #[test]
    fn public_key_derivation_matches_generator() {
        let mut one = [0u8; 32];
        one[31] = 1;
        let pubkey = public_key_for_private_key(&one).unwrap();
        // Compressed encoding of the secp256k1 generator point.
        assert_eq!(
            hex::encode(pubkey),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
    }

    #[test]
    fn key_homomorphism() {
        // (a + b) * G  ==  a * G + b * G
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        a[31] = 17;
        b[30] = 3;
        let sum = add_private_keys(&a, &b);
        let direct = public_key_for_private_key(&sum).unwrap();
        let added = add_public_keys(
            &public_key_for_private_key(&a).unwrap(),
            &public_key_for_private_key(&b).unwrap(),
        )
        .unwrap();
        assert_eq!(direct, added);
    }

    #[test]
    fn private_key_validation() {
        assert!(validate_private_key(&[0u8; 32]).is_err());
        assert!(validate_private_key(&[0u8; 31]).is_err());
        assert!(validate_private_key(&[0xff; 32]).is_err());
        let mut ok = [0u8; 32];
        ok[0] = 1;
        assert!(validate_private_key(&ok).is_ok());
    }

    #[test]
    fn uint32_be_layout() {
        assert_eq!(uint32_be(0x01020304), [1, 2, 3, 4]);
    }
}
