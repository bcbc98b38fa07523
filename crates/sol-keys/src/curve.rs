//! Ed25519 curve membership check.
//!
//! Interoperating validators disagree on candidates whose little-endian
//! integer value is at or above the field prime 2^255 - 19: strict decoders
//! reject them outright, permissive ones reduce modulo the prime first. The
//! check here reduces the low 255 bits modulo the prime (the sign bit is
//! carried through untouched) before attempting Edwards-point decompression,
//! so both conventions see the same verdict.

use curve25519_dalek::edwards::CompressedEdwardsY;

/// 2^255 - 19, little-endian.
const FIELD_PRIME: [u8; 32] = [
    0xed, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0x7f,
];

/// Whether 32 bytes name a valid point on the Ed25519 curve.
///
/// The candidate's y coordinate (low 255 bits) is reduced modulo the field
/// prime before decompression; the x-sign bit is preserved separately.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    let normalized = normalize_candidate(bytes);
    CompressedEdwardsY(normalized).decompress().is_some()
}

/// Reduce the low 255 bits modulo 2^255 - 19, keeping the sign bit.
///
/// y < 2^255 < 2 * (2^255 - 19), so a single conditional subtraction is a
/// full reduction.
fn normalize_candidate(bytes: &[u8; 32]) -> [u8; 32] {
    let sign = bytes[31] & 0x80;
    let mut y = *bytes;
    y[31] &= 0x7f;

    if ge_le(&y, &FIELD_PRIME) {
        sub_le(&mut y, &FIELD_PRIME);
    }

    y[31] |= sign;
    y
}

/// Little-endian `a >= b` over 32-byte values.
fn ge_le(a: &[u8; 32], b: &[u8; 32]) -> bool {
    for i in (0..32).rev() {
        if a[i] != b[i] {
            return a[i] > b[i];
        }
    }
    true
}

/// Little-endian in-place `a -= b`; requires `a >= b`.
fn sub_le(a: &mut [u8; 32], b: &[u8; 32]) {
    let mut borrow = 0u16;
    for i in 0..32 {
        let lhs = a[i] as u16;
        let rhs = b[i] as u16 + borrow;
        if lhs >= rhs {
            a[i] = (lhs - rhs) as u8;
            borrow = 0;
        } else {
            a[i] = (lhs + 0x100 - rhs) as u8;
            borrow = 1;
        }
    }
    debug_assert_eq!(borrow, 0);
}
