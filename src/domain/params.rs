//! Group parameters for the blinding exchange.
//!
//! All arithmetic in the protocol runs in the multiplicative group modulo a
//! safe prime `p`, while hashed markers and blinding secrets live in the
//! exponent range `[0, q)` with `q = (p - 1) / 2`. Both values are public
//! and fixed for the lifetime of the process; every participant must use
//! the same pair or intersections silently come up empty.

use std::sync::{Arc, OnceLock};

use num_bigint::BigUint;
use num_traits::One;

/// 2048-bit MODP safe prime from RFC 3526 (group 14), hex encoded.
const RFC3526_GROUP14_P_HEX: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74",
    "020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437",
    "4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED",
    "EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05",
    "98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB",
    "9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B",
    "E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718",
    "3995497CEA956AE515D2261898FA051015728E5A8AACAA68FFFFFFFFFFFFFFFF",
);

/// Error type for group parameter construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamsError {
    #[error("Group modulus must be at least 7")]
    ModulusTooSmall,

    #[error("Group modulus must be odd")]
    EvenModulus,
}

/// The prime modulus `p` and exponent modulus `q = (p - 1) / 2`.
///
/// Constructed once at startup and shared by handle; see [`standard`].
///
/// [`standard`]: GroupParameters::standard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupParameters {
    p: BigUint,
    q: BigUint,
}

impl GroupParameters {
    /// Build parameters from a prime modulus.
    ///
    /// The halving relation `p = 2q + 1` must hold exactly, so an even
    /// modulus is rejected here rather than producing a truncated `q`.
    ///
    /// # Errors
    /// Returns an error if the modulus is even or below the smallest
    /// usable value.
    pub fn new(p: BigUint) -> Result<Self, ParamsError> {
        if p < BigUint::from(7u32) {
            return Err(ParamsError::ModulusTooSmall);
        }
        if (&p % 2u32) != BigUint::one() {
            return Err(ParamsError::EvenModulus);
        }
        let q = (&p - BigUint::one()) / 2u32;
        Ok(Self { p, q })
    }

    /// The process-wide default group: RFC 3526 group 14.
    ///
    /// Built on first use and shared afterwards; the baked-in constant
    /// cannot fail validation.
    #[must_use]
    pub fn standard() -> Arc<Self> {
        static STANDARD: OnceLock<Arc<GroupParameters>> = OnceLock::new();
        Arc::clone(STANDARD.get_or_init(|| {
            let p = BigUint::parse_bytes(RFC3526_GROUP14_P_HEX.as_bytes(), 16)
                .expect("baked-in modulus is valid hex");
            Arc::new(Self::new(p).expect("RFC 3526 group 14 is a safe prime"))
        }))
    }

    /// Prime modulus for group element arithmetic.
    #[must_use]
    pub fn p(&self) -> &BigUint {
        &self.p
    }

    /// Exponent modulus: hashed markers and secrets are reduced by this.
    #[must_use]
    pub fn q(&self) -> &BigUint {
        &self.q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halving_relation_holds() {
        let params = GroupParameters::standard();
        let rebuilt = params.q() * 2u32 + BigUint::one();
        assert_eq!(&rebuilt, params.p());
    }

    #[test]
    fn test_standard_group_sizes() {
        let params = GroupParameters::standard();
        assert_eq!(params.p().bits(), 2048);
        assert_eq!(params.q().bits(), 2047);
    }

    #[test]
    fn test_standard_is_shared() {
        let a = GroupParameters::standard();
        let b = GroupParameters::standard();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_rejects_even_modulus() {
        let result = GroupParameters::new(BigUint::from(16u32));
        assert_eq!(result.unwrap_err(), ParamsError::EvenModulus);
    }

    #[test]
    fn test_rejects_tiny_modulus() {
        let result = GroupParameters::new(BigUint::from(5u32));
        assert_eq!(result.unwrap_err(), ParamsError::ModulusTooSmall);
    }

    #[test]
    fn test_small_safe_prime() {
        let params = GroupParameters::new(BigUint::from(23u32)).expect("23 is a safe prime");
        assert_eq!(params.q(), &BigUint::from(11u32));
    }
}
