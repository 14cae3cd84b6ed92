// src/services/history.rs
use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::LandscapeError;
use crate::models::{DatedValue, PoolRecord, PoolSeries, ProtocolSeries};
use crate::services::llama::{ChainHistory, ChainTvlPoint, ChartPoint};
use crate::services::reconcile::ExclusionRules;

/// Timestamp layout used by the yields chart endpoint.
const CHART_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Truncate a UNIX-seconds timestamp to its UTC calendar date.
pub fn date_from_unix(secs: i64) -> Result<NaiveDate, LandscapeError> {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| {
            LandscapeError::MalformedResponse(format!("timestamp out of range: {}", secs))
        })
}

/// Parse a chart timestamp string down to its calendar date.
pub fn parse_chart_timestamp(raw: &str) -> Result<NaiveDate, LandscapeError> {
    NaiveDateTime::parse_from_str(raw, CHART_TIMESTAMP_FORMAT)
        .map(|dt| dt.date())
        .map_err(|e| {
            LandscapeError::MalformedResponse(format!("bad chart timestamp '{}': {}", raw, e))
        })
}

/// Collapse a protocol's per-chain daily histories into one date-summed
/// series. Chains report on their own date sets; every retained entry lands
/// in the per-date sum regardless of how many chains share that date, and
/// no date is dropped even if only one chain reports it.
pub fn aggregate_protocol_history(
    name: &str,
    chain_tvls: &HashMap<String, ChainHistory>,
    rules: &ExclusionRules,
) -> Result<ProtocolSeries, LandscapeError> {
    let mut by_date: HashMap<NaiveDate, f64> = HashMap::new();

    for (chain, history) in chain_tvls {
        if rules.excludes(chain) {
            continue;
        }
        for entry in &history.tvl {
            let date = date_from_unix(entry.date)?;
            *by_date.entry(date).or_insert(0.0) += entry.total_liquidity_usd;
        }
    }

    let mut points: Vec<DatedValue> = by_date
        .into_iter()
        .map(|(date, value)| DatedValue { date, value })
        .collect();
    points.sort_by_key(|p| p.date);
    points.reverse();

    Ok(ProtocolSeries {
        name: name.to_string(),
        points,
    })
}

/// Normalize a pool's raw chart into a date-sorted series, newest first and
/// contiguous from index zero so positional concatenation lines up.
pub fn normalize_pool_chart(
    pool_id: &str,
    points: &[ChartPoint],
) -> Result<PoolSeries, LandscapeError> {
    let mut records = Vec::with_capacity(points.len());
    for point in points {
        records.push(PoolRecord {
            date: parse_chart_timestamp(&point.timestamp)?,
            tvl_usd: point.tvl_usd,
            apy: point.apy,
            apy_base: point.apy_base,
            apy_reward: point.apy_reward,
        });
    }
    records.sort_by(|a, b| b.date.cmp(&a.date));

    Ok(PoolSeries {
        pool_id: pool_id.to_string(),
        records,
    })
}

/// Whole-chain TVL history, newest first.
pub fn normalize_chain_history(
    points: &[ChainTvlPoint],
) -> Result<Vec<DatedValue>, LandscapeError> {
    let mut series = Vec::with_capacity(points.len());
    for point in points {
        series.push(DatedValue {
            date: date_from_unix(point.date)?,
            value: point.tvl,
        });
    }
    series.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(series)
}
