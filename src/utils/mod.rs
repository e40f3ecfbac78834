//! Pure math for concentrated-liquidity pools.
//!
//! This module is organized into focused submodules:
//!
//! - [`tick_math`] - tick <-> Q64.96 sqrt price, range validation
//! - [`full_math`] - 512-bit `mul_div`
//! - [`liquidity`] - liquidity <-> token amounts
//! - [`slippage`] - minimum acceptable amounts
//! - [`apr`] - trailing-volume fee APR
//! - [`price`] - display price conversion
//!
//! Everything here is side-effect free and safe to call from any thread.

mod apr;
mod full_math;
mod liquidity;
mod price;
mod slippage;
mod tick_math;

// ============================================
// Re-exports
// ============================================

// Fixed point
pub use full_math::{mul_div, Q96, RESOLUTION};

// Tick math
pub use tick_math::{
    sqrt_price_to_tick, tick_to_sqrt_price, validate_tick_range, MAX_SQRT_RATIO, MAX_TICK,
    MIN_SQRT_RATIO, MIN_TICK,
};

// Liquidity amounts
pub use liquidity::{
    get_amount0_for_liquidity, get_amount1_for_liquidity, get_liquidity_for_amounts,
    get_token_amounts,
};

// Slippage
pub use slippage::{get_min_amount, SlippageTolerance, DEFAULT_SLIPPAGE_PERCENT};

// APR
pub use apr::{calculate_7day_average_apr, fee_tier_fraction, APR_WINDOW_DAYS};

// Display price
pub use price::{sqrt_price_to_human_price, MAX_TOKEN_DECIMALS};
