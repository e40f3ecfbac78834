//! 512-bit intermediate arithmetic for Q64.96 computations.

use alloy::primitives::{U256, U512};

use crate::error::{CoreError, Result};

/// 2^96, the Q64.96 scaling factor.
pub const Q96: U256 = U256::from_limbs([0, 1 << 32, 0, 0]);

/// Resolution of the Q64.96 format in bits.
pub const RESOLUTION: usize = 96;

/// Computes `floor(a * b / denominator)` with a full 512-bit product.
///
/// Fails with `ArithmeticOverflow` when the denominator is zero or the
/// quotient does not fit in 256 bits.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256> {
    if denominator.is_zero() {
        return Err(CoreError::ArithmeticOverflow("mul_div: zero denominator"));
    }

    let product = U512::from(a) * U512::from(b);
    let quotient = product / U512::from(denominator);

    narrow(quotient).ok_or(CoreError::ArithmeticOverflow("mul_div: result exceeds 256 bits"))
}

/// Truncates a U512 to U256, returning `None` if any high limb is set.
fn narrow(value: U512) -> Option<U256> {
    let limbs = value.as_limbs();
    if limbs[4..].iter().any(|limb| *limb != 0) {
        return None;
    }
    Some(U256::from_limbs_slice(&limbs[..4]))
}
