// src/services/peer_index.rs
use std::collections::HashMap;

use chrono::NaiveDate;
use log::info;

use crate::error::LandscapeError;
use crate::models::{PoolRecord, PoolSeries};

/// Remove explicitly excluded ids from a configured peer list. Absent ids
/// are a no-op; the remaining list keeps its configured order.
pub fn apply_exclusions(member_ids: &[String], excluded: &[String]) -> Vec<String> {
    member_ids
        .iter()
        .filter(|id| !excluded.contains(*id))
        .cloned()
        .collect()
}

/// Average the aligned histories of a set of comparable pools into one
/// synthetic composite series. Every member must exist in the fetched pool
/// universe; a missing id means the configured lists have drifted from the
/// data, and the run stops rather than quietly averaging a smaller basket.
pub fn build_peer_index(
    group_name: &str,
    member_ids: &[String],
    all_pools: &HashMap<String, PoolSeries>,
) -> Result<PoolSeries, LandscapeError> {
    let mut stacked: Vec<&PoolRecord> = Vec::new();
    for id in member_ids {
        let series = all_pools
            .get(id)
            .ok_or_else(|| LandscapeError::UnknownIdentifier(id.clone()))?;
        stacked.extend(series.records.iter());
    }

    let mut groups: HashMap<NaiveDate, Vec<&PoolRecord>> = HashMap::new();
    for record in stacked {
        groups.entry(record.date).or_default().push(record);
    }

    // Column-wise mean per date. Optional columns average only the values
    // actually present, so a pool that reports TVL but no reward APY does
    // not drag the reward mean toward zero.
    let mut records: Vec<PoolRecord> = groups
        .into_iter()
        .map(|(date, rows)| {
            let mut tvl = 0.0;
            let mut apy = ColumnMean::default();
            let mut apy_base = ColumnMean::default();
            let mut apy_reward = ColumnMean::default();
            for row in &rows {
                tvl += row.tvl_usd;
                apy.push(row.apy);
                apy_base.push(row.apy_base);
                apy_reward.push(row.apy_reward);
            }
            PoolRecord {
                date,
                tvl_usd: tvl / rows.len() as f64,
                apy: apy.mean(),
                apy_base: apy_base.mean(),
                apy_reward: apy_reward.mean(),
            }
        })
        .collect();
    records.sort_by(|a, b| b.date.cmp(&a.date));

    info!(
        "Peer index '{}': {} pools averaged over {} dates",
        group_name,
        member_ids.len(),
        records.len()
    );

    Ok(PoolSeries {
        pool_id: group_name.to_string(),
        records,
    })
}

#[derive(Default)]
struct ColumnMean {
    sum: f64,
    count: usize,
}

impl ColumnMean {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(id: &str, records: &[(i32, u32, u32, f64, Option<f64>)]) -> PoolSeries {
        PoolSeries {
            pool_id: id.to_string(),
            records: records
                .iter()
                .map(|&(y, m, d, tvl, apy)| PoolRecord {
                    date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
                    tvl_usd: tvl,
                    apy,
                    apy_base: None,
                    apy_reward: None,
                })
                .collect(),
        }
    }

    fn universe(pools: Vec<PoolSeries>) -> HashMap<String, PoolSeries> {
        pools.into_iter().map(|p| (p.pool_id.clone(), p)).collect()
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn composite_is_the_mean_of_members_sharing_a_date() {
        let all = universe(vec![
            pool("a", &[(2024, 1, 1, 100.0, Some(4.0))]),
            pool("b", &[(2024, 1, 1, 200.0, Some(6.0))]),
        ]);

        let index = build_peer_index("comps", &ids(&["a", "b"]), &all).unwrap();
        assert_eq!(index.records.len(), 1);
        assert_eq!(index.records[0].tvl_usd, 150.0);
        assert_eq!(index.records[0].apy, Some(5.0));
    }

    #[test]
    fn dates_reported_by_one_member_average_over_that_member_alone() {
        let all = universe(vec![
            pool("a", &[(2024, 1, 2, 100.0, None), (2024, 1, 1, 100.0, None)]),
            pool("b", &[(2024, 1, 1, 200.0, None)]),
        ]);

        let index = build_peer_index("comps", &ids(&["a", "b"]), &all).unwrap();
        // Newest first: Jan 2 has a single contributor, Jan 1 has two.
        assert_eq!(index.records[0].tvl_usd, 100.0);
        assert_eq!(index.records[1].tvl_usd, 150.0);
    }

    #[test]
    fn optional_columns_average_present_values_only() {
        let all = universe(vec![
            pool("a", &[(2024, 1, 1, 100.0, Some(4.0))]),
            pool("b", &[(2024, 1, 1, 200.0, None)]),
        ]);

        let index = build_peer_index("comps", &ids(&["a", "b"]), &all).unwrap();
        assert_eq!(index.records[0].apy, Some(4.0));
    }

    #[test]
    fn missing_member_is_a_hard_stop() {
        let all = universe(vec![pool("a", &[(2024, 1, 1, 100.0, None)])]);

        let err = build_peer_index("comps", &ids(&["a", "ghost"]), &all).unwrap_err();
        assert!(matches!(err, LandscapeError::UnknownIdentifier(id) if id == "ghost"));
    }

    #[test]
    fn excluding_a_member_changes_the_composite() {
        let all = universe(vec![
            pool("a", &[(2024, 1, 1, 100.0, None)]),
            pool("b", &[(2024, 1, 1, 200.0, None)]),
            pool("reference", &[(2024, 1, 1, 900.0, None)]),
        ]);
        let configured = ids(&["a", "b", "reference"]);

        let full = build_peer_index("comps", &configured, &all).unwrap();
        let members = apply_exclusions(&configured, &ids(&["reference"]));
        let trimmed = build_peer_index("comps", &members, &all).unwrap();

        assert_eq!(full.records[0].tvl_usd, 400.0);
        assert_eq!(trimmed.records[0].tvl_usd, 150.0);
    }

    #[test]
    fn excluding_an_absent_id_changes_nothing() {
        let configured = ids(&["a", "b"]);
        assert_eq!(apply_exclusions(&configured, &ids(&["ghost"])), configured);
    }
}
