//! Fee APR estimation from trailing daily volume.

use crate::models::VolumeSample;

/// Days in the trailing window.
pub const APR_WINDOW_DAYS: usize = 7;

/// Days per year used for annualization.
const DAYS_PER_YEAR: f64 = 365.0;

/// Pool fee in hundredths of a bip to a fraction (3000 -> 0.003).
#[inline]
pub fn fee_tier_fraction(fee: u32) -> f64 {
    fee as f64 / 1_000_000.0
}

/// Estimate fee APR (in percent) from up to the 7 most recent daily samples.
///
/// - No samples: 0
/// - TVL of zero (or not a positive finite number): 0
/// - Otherwise: mean(volume) * fee_tier * 365 / tvl * 100
///
/// Samples may arrive in any order; the most recent by date are used.
pub fn calculate_7day_average_apr(samples: &[VolumeSample], fee_tier: f64, tvl_usd: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    if !tvl_usd.is_finite() || tvl_usd <= 0.0 {
        return 0.0;
    }

    let mut recent: Vec<&VolumeSample> = samples.iter().collect();
    recent.sort_unstable_by(|a, b| b.date.cmp(&a.date));
    recent.truncate(APR_WINDOW_DAYS);

    let total: f64 = recent.iter().map(|s| s.volume_usd).sum();
    let avg_daily_volume = total / recent.len() as f64;

    let fees_per_day = avg_daily_volume * fee_tier;
    let annualized_fees = fees_per_day * DAYS_PER_YEAR;

    let apr = annualized_fees / tvl_usd * 100.0;
    if apr.is_finite() {
        apr
    } else {
        0.0
    }
}
