//! Modular arithmetic primitives for the blinding exchange.
//!
//! Three operations shared by both protocol roles: big-integer modular
//! exponentiation, secret sampling from the operating system random
//! source, and deterministic hashing of marker symbols into the exponent
//! range.

use num_bigint::BigUint;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::psi::ProtocolError;

/// Bytes drawn from the OS random source per blinding secret.
const SECRET_BYTES: usize = 32;

/// `base ^ exponent mod modulus` over arbitrary-precision integers.
///
/// The base is reduced first, so values at or above the modulus are
/// accepted. An exponent of zero yields 1. `modulus` must be nonzero;
/// callers pass one of the fixed group moduli.
#[must_use]
pub fn mod_pow(base: &BigUint, exponent: &BigUint, modulus: &BigUint) -> BigUint {
    (base % modulus).modpow(exponent, modulus)
}

/// Draw a one-time blinding secret in `[2, upper_exclusive)`.
///
/// Fills a fixed-size buffer from the OS random source, interprets it as
/// a big-endian integer and maps it into range. The buffer is wiped when
/// it goes out of scope. `upper_exclusive` must exceed 2; callers pass
/// the exponent modulus.
///
/// # Errors
/// Fails when the OS random source cannot produce bytes. No fallback
/// generator is consulted and the draw is not retried.
pub fn random_secret(upper_exclusive: &BigUint) -> Result<BigUint, ProtocolError> {
    debug_assert!(*upper_exclusive > BigUint::from(2u32));

    let mut buf = Zeroizing::new([0u8; SECRET_BYTES]);
    OsRng
        .try_fill_bytes(&mut *buf)
        .map_err(|e| ProtocolError::RandomSourceUnavailable(e.to_string()))?;

    let two = BigUint::from(2u32);
    let span = upper_exclusive - &two;
    Ok(BigUint::from_bytes_be(&*buf) % span + two)
}

/// Hash a marker symbol to a group exponent.
///
/// The symbol is uppercased, its UTF-8 bytes are digested with SHA-256
/// and the digest is reduced modulo `modulus`. Both parties apply this to
/// their own symbols, so equal markers land on equal elements regardless
/// of input casing.
#[must_use]
pub fn hash_to_group(symbol: &str, modulus: &BigUint) -> BigUint {
    let canonical = symbol.to_ascii_uppercase();
    let digest = Sha256::digest(canonical.as_bytes());
    BigUint::from_bytes_be(digest.as_slice()) % modulus
}
