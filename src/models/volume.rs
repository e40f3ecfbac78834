use chrono::NaiveDate;
use serde::Serialize;

/// USD volume traded in a pool over one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeSample {
    pub date: NaiveDate,
    pub volume_usd: f64,
}

impl VolumeSample {
    pub fn new(date: NaiveDate, volume_usd: f64) -> Self {
        Self { date, volume_usd }
    }
}
