//! Sort-preserving byte encodings for store keys.
//!
//! The store only iterates in byte-lexicographic order, so every numeric key
//! component is encoded such that byte order equals numeric order.

use rust_decimal::Decimal;

use crate::types::PRICE_SCALE;

/// Sign byte plus 16 magnitude bytes.
pub const PRICE_KEY_LEN: usize = 17;
pub const HEIGHT_KEY_LEN: usize = 8;

const SIGN_NEGATIVE: u8 = 0x00;
const SIGN_NON_NEGATIVE: u8 = 0x01;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("price {0} cannot be encoded at scale 18")]
    PriceNotRepresentable(Decimal),

    #[error("key component has length {actual}, expected {expected}")]
    BadLength { expected: usize, actual: usize },

    #[error("unknown sign byte {0:#04x}")]
    BadSign(u8),

    #[error("decoded price does not fit a decimal")]
    OutOfRange,
}

/// Encode a price as sign byte followed by its big-endian magnitude at 18 decimals.
/// Negative magnitudes are bit-complemented so that more negative sorts lower.
pub fn encode_price(price: Decimal) -> Result<[u8; PRICE_KEY_LEN], CodecError> {
    let normalized = price.normalize();
    let scale = normalized.scale();
    if scale > PRICE_SCALE {
        return Err(CodecError::PriceNotRepresentable(price));
    }
    let factor = 10u128.pow(PRICE_SCALE - scale);
    let magnitude = normalized
        .mantissa()
        .unsigned_abs()
        .checked_mul(factor)
        .ok_or(CodecError::PriceNotRepresentable(price))?;

    let mut out = [0u8; PRICE_KEY_LEN];
    if normalized.is_sign_negative() && !normalized.is_zero() {
        out[0] = SIGN_NEGATIVE;
        out[1..].copy_from_slice(&(!magnitude).to_be_bytes());
    } else {
        out[0] = SIGN_NON_NEGATIVE;
        out[1..].copy_from_slice(&magnitude.to_be_bytes());
    }
    Ok(out)
}

pub fn decode_price(bytes: &[u8]) -> Result<Decimal, CodecError> {
    if bytes.len() != PRICE_KEY_LEN {
        return Err(CodecError::BadLength {
            expected: PRICE_KEY_LEN,
            actual: bytes.len(),
        });
    }
    let mut raw = [0u8; 16];
    raw.copy_from_slice(&bytes[1..]);
    let stored = u128::from_be_bytes(raw);

    let (negative, magnitude) = match bytes[0] {
        SIGN_NON_NEGATIVE => (false, stored),
        SIGN_NEGATIVE => (true, !stored),
        other => return Err(CodecError::BadSign(other)),
    };

    let mantissa = i128::try_from(magnitude).map_err(|_| CodecError::OutOfRange)?;
    let mantissa = if negative { -mantissa } else { mantissa };
    Decimal::try_from_i128_with_scale(mantissa, PRICE_SCALE)
        .map(|d| d.normalize())
        .map_err(|_| CodecError::OutOfRange)
}

pub fn encode_height(height: u64) -> [u8; HEIGHT_KEY_LEN] {
    height.to_be_bytes()
}

pub fn decode_height(bytes: &[u8]) -> Result<u64, CodecError> {
    let raw: [u8; HEIGHT_KEY_LEN] = bytes.try_into().map_err(|_| CodecError::BadLength {
        expected: HEIGHT_KEY_LEN,
        actual: bytes.len(),
    })?;
    Ok(u64::from_be_bytes(raw))
}

/// Signed 64-bit values with the sign bit flipped, so negatives sort first.
pub fn encode_i64(value: i64) -> [u8; 8] {
    ((value as u64) ^ (1 << 63)).to_be_bytes()
}

pub fn decode_i64(bytes: &[u8]) -> Result<i64, CodecError> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| CodecError::BadLength {
        expected: 8,
        actual: bytes.len(),
    })?;
    Ok((u64::from_be_bytes(raw) ^ (1 << 63)) as i64)
}
