//! Minimum acceptable output under a slippage tolerance.

use std::str::FromStr;

use alloy::primitives::U256;
use bigdecimal::BigDecimal;
use num_bigint::Sign;

use crate::error::{CoreError, Result};
use crate::utils::full_math::mul_div;

/// Slippage tolerance applied when none is configured (0.5%).
pub const DEFAULT_SLIPPAGE_PERCENT: f64 = 0.5;

/// Decimal places of a percent kept from the tolerance. Finer digits are
/// truncated, which can only raise the minimum.
const MAX_TOLERANCE_SCALE: i64 = 36;

/// Slippage tolerance held as the exact fraction of the amount to keep:
/// `keep / denominator = (100 - percent) / 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlippageTolerance {
    keep: U256,
    denominator: U256,
}

impl SlippageTolerance {
    /// Build from a percentage such as `0.5`. The percentage is taken at its
    /// shortest decimal form, so `0.125` is exactly 0.125%.
    pub fn from_percent(percent: f64) -> Result<Self> {
        if !percent.is_finite() || !(0.0..100.0).contains(&percent) {
            return Err(CoreError::InvalidTolerance(percent));
        }

        let decimal = BigDecimal::from_str(&percent.to_string())
            .map_err(|_| CoreError::InvalidTolerance(percent))?;
        let (_, scale) = decimal.as_bigint_and_exponent();
        let (mantissa, scale) = decimal
            .with_scale(scale.clamp(0, MAX_TOLERANCE_SCALE))
            .as_bigint_and_exponent();

        let (sign, bytes) = mantissa.to_bytes_le();
        let tolerance = match sign {
            Sign::Minus => None,
            _ => U256::try_from_le_slice(&bytes),
        }
        .ok_or(CoreError::InvalidTolerance(percent))?;

        // 100 * 10^scale
        let denominator = U256::from(100u8) * U256::from(10u8).pow(U256::from(scale as u64));
        if tolerance >= denominator {
            return Err(CoreError::InvalidTolerance(percent));
        }

        Ok(Self {
            keep: denominator - tolerance,
            denominator,
        })
    }

    /// floor(desired * (100 - percent) / 100)
    pub fn min_amount(&self, desired: U256) -> Result<U256> {
        mul_div(desired, self.keep, self.denominator)
    }
}

impl Default for SlippageTolerance {
    fn default() -> Self {
        // 0.5%
        Self {
            keep: U256::from(995u32),
            denominator: U256::from(1000u32),
        }
    }
}

/// `floor(desired * (100 - tolerance_percent) / 100)` in integer arithmetic.
///
/// Tolerance must lie in `[0, 100)`, anything else is `InvalidTolerance`.
pub fn get_min_amount(desired: U256, tolerance_percent: f64) -> Result<U256> {
    SlippageTolerance::from_percent(tolerance_percent)?.min_amount(desired)
}
