//! Deterministic hash functions for the built-in value types.
//!
//! Numbers hash modulo the Mersenne prime `2^61 - 1` so that equal values of
//! different numeric types (`1`, `1.0`, `True`) share a hash. Strings use
//! SipHash-1-3 with a zero key, so hashes do not vary between runs.
//!
//! `-1` is never produced: it is remapped to `-2` everywhere.

use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;

/// `2^61 - 1`
const MODULUS: u64 = (1 << 61) - 1;

const INF_HASH: i64 = 314_159;

fn finish(hash: i64) -> i64 {
    if hash == -1 { -2 } else { hash }
}

/// Hash of a machine integer.
#[must_use]
pub fn hash_int(value: i64) -> i64 {
    let remainder = (value.unsigned_abs() % MODULUS).cast_signed();
    finish(if value < 0 { -remainder } else { remainder })
}

/// Hash of an arbitrary-precision integer, consistent with [`hash_int`].
#[must_use]
pub fn hash_bigint(value: &BigInt) -> i64 {
    let remainder = (value.magnitude() % MODULUS).to_i64().unwrap_or_default();
    finish(if value.sign() == Sign::Minus { -remainder } else { remainder })
}

/// Hash of a float; integral values hash like the equal integer.
#[must_use]
pub fn hash_float(value: f64) -> i64 {
    if value.is_infinite() {
        return if value > 0.0 { INF_HASH } else { -INF_HASH };
    }
    if value.is_nan() {
        return 0;
    }
    let (mut mantissa, mut exponent) = frexp(value);
    let negative = mantissa < 0.0;
    if negative {
        mantissa = -mantissa;
    }

    // consume the mantissa 28 bits at a time
    let mut x: u64 = 0;
    while mantissa > 0.0 {
        x = ((x << 28) & MODULUS) | (x >> 33);
        mantissa *= 268_435_456.0;
        exponent -= 28;
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "mantissa chunk is in [0, 2^28)")]
        let chunk = mantissa as u64;
        mantissa -= chunk as f64;
        x += chunk;
        if x >= MODULUS {
            x -= MODULUS;
        }
    }

    let shift = exponent.rem_euclid(61).unsigned_abs();
    x = ((x << shift) & MODULUS) | (x >> (61 - shift));
    let hash = x.cast_signed();
    finish(if negative { -hash } else { hash })
}

/// `value == mantissa * 2^exponent` with `0.5 <= |mantissa| < 1`.
fn frexp(value: f64) -> (f64, i32) {
    if value == 0.0 {
        return (value, 0);
    }
    let bits = value.to_bits();
    let biased = i32::try_from((bits >> 52) & 0x7ff).unwrap_or_default();
    if biased == 0 {
        // subnormal: scale into the normal range first
        let (mantissa, exponent) = frexp(value * 18_446_744_073_709_551_616.0);
        return (mantissa, exponent - 64);
    }
    let mantissa = f64::from_bits((bits & 0x800F_FFFF_FFFF_FFFF) | 0x3FE0_0000_0000_0000);
    (mantissa, biased - 1022)
}

/// Hash of a string.
#[must_use]
pub fn hash_str(value: &str) -> i64 {
    if value.is_empty() {
        return 0;
    }
    finish(siphash13(value.as_bytes()).cast_signed())
}

/// Combines item hashes the way tuples do (xxHash-style lanes).
#[must_use]
pub fn hash_tuple(items: impl ExactSizeIterator<Item = i64>) -> i64 {
    const PRIME_1: u64 = 11_400_714_785_074_694_791;
    const PRIME_2: u64 = 14_029_467_366_897_019_727;
    const PRIME_5: u64 = 2_870_177_450_012_600_261;

    let len = items.len() as u64;
    let mut acc = PRIME_5;
    for item in items {
        acc = acc.wrapping_add(item.cast_unsigned().wrapping_mul(PRIME_2));
        acc = acc.rotate_left(31);
        acc = acc.wrapping_mul(PRIME_1);
    }
    acc = acc.wrapping_add(len ^ (PRIME_5 ^ 3_527_539));
    if acc == u64::MAX {
        return 1_546_275_796;
    }
    acc.cast_signed()
}

fn siphash13(bytes: &[u8]) -> u64 {
    let mut v = [
        0x736f_6d65_7073_6575_u64,
        0x646f_7261_6e64_6f6d,
        0x6c79_6765_6e65_7261,
        0x7465_6462_7974_6573,
    ];

    let mut chunks = bytes.chunks_exact(8);
    for chunk in &mut chunks {
        let mut block = [0_u8; 8];
        block.copy_from_slice(chunk);
        let message = u64::from_le_bytes(block);
        v[3] ^= message;
        sip_round(&mut v);
        v[0] ^= message;
    }

    let mut tail = (bytes.len() as u64) << 56;
    for (index, byte) in chunks.remainder().iter().enumerate() {
        tail |= u64::from(*byte) << (index * 8);
    }
    v[3] ^= tail;
    sip_round(&mut v);
    v[0] ^= tail;
    v[2] ^= 0xff;
    for _ in 0..3 {
        sip_round(&mut v);
    }
    v[0] ^ v[1] ^ v[2] ^ v[3]
}

fn sip_round(v: &mut [u64; 4]) {
    v[0] = v[0].wrapping_add(v[1]);
    v[1] = v[1].rotate_left(13) ^ v[0];
    v[0] = v[0].rotate_left(32);
    v[2] = v[2].wrapping_add(v[3]);
    v[3] = v[3].rotate_left(16) ^ v[2];
    v[0] = v[0].wrapping_add(v[3]);
    v[3] = v[3].rotate_left(21) ^ v[0];
    v[2] = v[2].wrapping_add(v[1]);
    v[1] = v[1].rotate_left(17) ^ v[2];
    v[2] = v[2].rotate_left(32);
}
