//! Bech32 codec.
//!
//! HRP-prefixed 5-bit grouped encoding with the original BCH checksum
//! constant (1, not the bech32m variant). One deliberate tightening against
//! the common lenient decoders: strings that mix upper- and lowercase are
//! rejected outright instead of being lowercased first. An all-uppercase
//! string is still accepted and lowercased, per BIP-173.

use thiserror::Error;

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

const GENERATOR: [u32; 5] = [0x3b6a57b2, 0x26508e6d, 0x1ea119fa, 0x3d4233dd, 0x2a1462b3];

/// Checksum length in characters.
const CHECKSUM_LEN: usize = 6;

/// Minimum and maximum total length of a decodable string.
const MIN_LEN: usize = 8;
const MAX_LEN: usize = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Bech32Error {
    #[error("invalid bech32 string length")]
    InvalidLength,
    #[error("invalid character in bech32 string")]
    InvalidCharacter,
    #[error("invalid bech32 checksum")]
    InvalidChecksum,
    #[error("invalid separator index")]
    InvalidSeparator,
    #[error("invalid bech32 prefix")]
    InvalidPrefix,
    #[error("invalid character in hrp")]
    InvalidHrpCharacter,
}

/// Encode `payload` under the human-readable prefix `hrp`.
///
/// The prefix is lowercased; the output is always lowercase.
pub fn encode(hrp: &str, payload: &[u8]) -> Result<String, Bech32Error> {
    validate_hrp(hrp)?;
    let hrp = hrp.to_lowercase();

    let mut data = convert_bits(payload, 8, 5, true);
    let checksum = create_checksum(&hrp, &data);
    data.extend_from_slice(&checksum);

    let mut out = String::with_capacity(hrp.len() + 1 + data.len());
    out.push_str(&hrp);
    out.push('1');
    for value in data {
        out.push(CHARSET[value as usize] as char);
    }
    Ok(out)
}

/// Decode a bech32 string into its prefix and payload bytes.
pub fn decode(bech: &str) -> Result<(String, Vec<u8>), Bech32Error> {
    if bech.len() < MIN_LEN || bech.len() > MAX_LEN {
        return Err(Bech32Error::InvalidLength);
    }

    let has_lower = bech.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = bech.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(Bech32Error::InvalidCharacter);
    }
    let bech = bech.to_lowercase();

    // The separator is the last '1'; everything before it is the prefix and
    // at least the six checksum characters must follow it.
    let pos = bech.rfind('1').ok_or(Bech32Error::InvalidSeparator)?;
    if pos < 1 || pos + CHECKSUM_LEN + 1 > bech.len() {
        return Err(Bech32Error::InvalidSeparator);
    }

    let hrp = &bech[..pos];
    validate_hrp(hrp)?;

    let mut values = Vec::with_capacity(bech.len() - pos - 1);
    for b in bech[pos + 1..].bytes() {
        values.push(charset_index(b).ok_or(Bech32Error::InvalidCharacter)?);
    }

    if polymod(&expanded_values(hrp, &values)) != 1 {
        return Err(Bech32Error::InvalidChecksum);
    }

    let payload = convert_bits(&values[..values.len() - CHECKSUM_LEN], 5, 8, false);
    Ok((hrp.to_string(), payload))
}

fn validate_hrp(hrp: &str) -> Result<(), Bech32Error> {
    if hrp.is_empty() || hrp.len() > 83 {
        return Err(Bech32Error::InvalidPrefix);
    }
    if hrp.bytes().any(|b| !(33..=126).contains(&b)) {
        return Err(Bech32Error::InvalidHrpCharacter);
    }
    Ok(())
}

fn charset_index(c: u8) -> Option<u8> {
    CHARSET.iter().position(|&x| x == c).map(|i| i as u8)
}

/// Regroup a bit stream between widths. With `pad`, trailing bits are
/// flushed into a final zero-padded group; without, they are dropped.
fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Vec<u8> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let maxv: u32 = (1 << to) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);

    for &value in data {
        acc = (acc << from) | u32::from(value);
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & maxv) as u8);
        }
    }
    if pad && bits > 0 {
        out.push(((acc << (to - bits)) & maxv) as u8);
    }
    out
}

fn polymod(values: &[u8]) -> u32 {
    let mut chk: u32 = 1;
    for &v in values {
        let top = chk >> 25;
        chk = (chk & 0x1ff_ffff) << 5 ^ u32::from(v);
        for (i, &gen) in GENERATOR.iter().enumerate() {
            if (top >> i) & 1 == 1 {
                chk ^= gen;
            }
        }
    }
    chk
}

fn hrp_expand(hrp: &str) -> Vec<u8> {
    let bytes = hrp.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() * 2 + 1);
    out.extend(bytes.iter().map(|&b| b >> 5));
    out.push(0);
    out.extend(bytes.iter().map(|&b| b & 31));
    out
}

fn expanded_values(hrp: &str, data: &[u8]) -> Vec<u8> {
    let mut values = hrp_expand(hrp);
    values.extend_from_slice(data);
    values
}

fn create_checksum(hrp: &str, data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut values = expanded_values(hrp, data);
    values.extend_from_slice(&[0; CHECKSUM_LEN]);
    let m = polymod(&values) ^ 1;
    let mut checksum = [0u8; CHECKSUM_LEN];
    for (i, slot) in checksum.iter_mut().enumerate() {
        *slot = ((m >> (5 * (5 - i))) & 31) as u8;
    }
    checksum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_zero_byte_regroups_to_two_q_chars() {
        let encoded = encode("prefix", &[0x00]).unwrap();
        assert!(encoded.starts_with("prefix1qq"));
        assert_eq!(encoded.len(), "prefix1qq".len() + CHECKSUM_LEN);

        let (hrp, payload) = decode(&encoded).unwrap();
        assert_eq!(hrp, "prefix");
        assert_eq!(payload, vec![0x00]);
    }

    #[test]
    fn roundtrip_various_payloads() {
        let cases: [&[u8]; 5] = [b"", &[0x00, 0x01], &[0x00, 0x01, 0x02], &[0xff; 20], b"some payload bytes"];
        for payload in cases {
            let encoded = encode("hrp", payload).unwrap();
            let (hrp, decoded) = decode(&encoded).unwrap();
            assert_eq!(hrp, "hrp");
            assert_eq!(decoded, payload, "payload {payload:02x?}");
        }
    }

    #[test]
    fn encode_lowercases_the_prefix() {
        let encoded = encode("PREFIX", &[0x42]).unwrap();
        assert!(encoded.starts_with("prefix1"));
    }

    #[test]
    fn uppercase_only_strings_decode() {
        let encoded = encode("prefix", &[0x42]).unwrap();
        let upper = encoded.to_uppercase();
        assert_eq!(decode(&upper).unwrap(), decode(&encoded).unwrap());
    }

    #[test]
    fn mixed_case_is_rejected() {
        let encoded = encode("prefix", &[0x42]).unwrap();
        let mut mixed = encoded.clone();
        mixed.replace_range(0..1, "P");
        assert_eq!(decode(&mixed).unwrap_err(), Bech32Error::InvalidCharacter);
    }

    #[test]
    fn checksum_flip_is_rejected() {
        let encoded = encode("prefix", &[0x42]).unwrap();
        let mut chars: Vec<char> = encoded.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == 'q' { 'p' } else { 'q' };
        let tampered: String = chars.into_iter().collect();
        assert_eq!(decode(&tampered).unwrap_err(), Bech32Error::InvalidChecksum);
    }

    #[test]
    fn any_single_character_flip_fails_decode() {
        let encoded = encode("test", &[0xde, 0xad, 0xbe, 0xef]).unwrap();
        for i in 0..encoded.len() {
            let mut chars: Vec<char> = encoded.chars().collect();
            let replacement = if chars[i] == 'q' { 'p' } else { 'q' };
            if chars[i] == replacement {
                continue;
            }
            chars[i] = replacement;
            let tampered: String = chars.into_iter().collect();
            let original = decode(&encoded).unwrap();
            match decode(&tampered) {
                Err(_) => {}
                Ok(result) => assert_ne!(result, original, "flip at {i} went unnoticed"),
            }
        }
    }

    #[test]
    fn length_bounds_are_enforced() {
        assert_eq!(decode("short").unwrap_err(), Bech32Error::InvalidLength);
        let long = format!("p1{}", "q".repeat(95));
        assert_eq!(decode(&long).unwrap_err(), Bech32Error::InvalidLength);
    }

    #[test]
    fn separator_rules() {
        // No separator at all.
        assert_eq!(decode("qqqqqqqqqq").unwrap_err(), Bech32Error::InvalidSeparator);
        // Separator with fewer than six characters after it.
        assert_eq!(decode("prefix1qqq").unwrap_err(), Bech32Error::InvalidSeparator);
        // Leading separator leaves an empty prefix.
        assert_eq!(decode("1qqqqqqqqq").unwrap_err(), Bech32Error::InvalidSeparator);
    }

    #[test]
    fn hrp_validation() {
        assert!(encode("", &[1]).is_err());
        let too_long = "h".repeat(84);
        assert_eq!(encode(&too_long, &[1]).unwrap_err(), Bech32Error::InvalidPrefix);
        assert_eq!(encode("bad\x07hrp", &[1]).unwrap_err(), Bech32Error::InvalidHrpCharacter);
    }

    #[test]
    fn separator_is_the_last_one_in_the_string() {
        // An HRP may itself contain '1'; decode must split at the last one.
        let encoded = encode("split1hrp", &[0x11, 0x22]).unwrap();
        let (hrp, payload) = decode(&encoded).unwrap();
        assert_eq!(hrp, "split1hrp");
        assert_eq!(payload, vec![0x11, 0x22]);
    }
}
