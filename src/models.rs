// src/models.rs
use chrono::NaiveDate;
use serde::Serialize;

/// One calendar-date observation of an aggregate USD figure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DatedValue {
    pub date: NaiveDate,
    pub value: f64,
}

/// Aggregate TVL history for one protocol after category filtering and
/// cross-chain summation, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct ProtocolSeries {
    pub name: String,
    pub points: Vec<DatedValue>,
}

/// One day of pool chart data. The upstream chart also carries 7-day
/// derived fields (`il7d`, `apyBase7d`); those are dropped before this
/// struct is built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PoolRecord {
    pub date: NaiveDate,
    pub tvl_usd: f64,
    pub apy: Option<f64>,
    pub apy_base: Option<f64>,
    pub apy_reward: Option<f64>,
}

/// Normalized chart history for one pool, newest first. Row order doubles
/// as the positional index when tables are concatenated side by side.
#[derive(Debug, Clone, Serialize)]
pub struct PoolSeries {
    pub pool_id: String,
    pub records: Vec<PoolRecord>,
}

/// Computed vs. API-reported current TVL for one protocol. Never written to
/// the workbook, only logged.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationRecord {
    pub protocol: String,
    pub computed_tvl: f64,
    pub reported_tvl: f64,
}

impl ReconciliationRecord {
    /// Relative divergence against the API's own figure. A nonzero computed
    /// value against a zero reported one counts as full divergence.
    pub fn relative_drift(&self) -> f64 {
        if self.reported_tvl == 0.0 {
            if self.computed_tvl == 0.0 {
                0.0
            } else {
                1.0
            }
        } else {
            ((self.computed_tvl - self.reported_tvl) / self.reported_tvl).abs()
        }
    }
}
