//! Key encoding for numeric and composite keys.
//!
//! Numeric keys are 8-byte big-endian integers so that bytewise key order
//! equals numeric order. Composite keys append an opaque suffix (usually a
//! 32-byte hash) after that prefix.

use crate::error::{Result, StoreError};

/// Length of the numeric key prefix.
pub const NUMBER_LEN: usize = 8;

/// Encode a block number as an 8-byte big-endian key.
pub fn encode_block_number(number: u64) -> [u8; NUMBER_LEN] {
    number.to_be_bytes()
}

/// Decode the 8-byte big-endian prefix of a key.
pub fn decode_block_number(key: &[u8]) -> Result<u64> {
    let prefix: [u8; NUMBER_LEN] = key
        .get(..NUMBER_LEN)
        .and_then(|p| p.try_into().ok())
        .ok_or_else(|| {
            StoreError::InvalidData(format!(
                "key of {} bytes has no {}-byte number prefix",
                key.len(),
                NUMBER_LEN
            ))
        })?;
    Ok(u64::from_be_bytes(prefix))
}

/// Build a composite key: the encoded number followed by `suffix`.
pub fn composite_key(number: u64, suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(NUMBER_LEN + suffix.len());
    key.extend_from_slice(&encode_block_number(number));
    key.extend_from_slice(suffix);
    key
}

/// Split a composite key into its number and suffix.
pub fn split_composite(key: &[u8]) -> Result<(u64, &[u8])> {
    let number = decode_block_number(key)?;
    Ok((number, &key[NUMBER_LEN..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_is_big_endian() {
        assert_eq!(encode_block_number(1), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(
            encode_block_number(15_521_067),
            [0, 0, 0, 0, 0, 0xec, 0xd5, 0x2b]
        );
    }

    #[test]
    fn test_short_key_rejected() {
        assert!(decode_block_number(&[1, 2, 3]).is_err());
        assert!(split_composite(&[]).is_err());
    }

    #[test]
    fn test_composite_suffix() {
        let key = composite_key(42, &[0xab; 32]);
        assert_eq!(key.len(), 40);
        let (number, suffix) = split_composite(&key).unwrap();
        assert_eq!(number, 42);
        assert_eq!(suffix, &[0xab; 32]);
    }

    proptest! {
        #[test]
        fn test_byte_order_matches_numeric_order(a: u64, b: u64) {
            let ka = encode_block_number(a);
            let kb = encode_block_number(b);
            prop_assert_eq!(a.cmp(&b), ka.cmp(&kb));
        }
    }
}
