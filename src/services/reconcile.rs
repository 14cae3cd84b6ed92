// src/services/reconcile.rs
use std::collections::HashMap;

use crate::models::ReconciliationRecord;

/// Substring patterns whose chain/category labels are dropped before any
/// TVL aggregation. "borrowed" rows are liabilities; "staking" and "pool2"
/// rows double-count value already reported under the plain chain label.
#[derive(Debug, Clone)]
pub struct ExclusionRules {
    patterns: Vec<String>,
}

impl Default for ExclusionRules {
    fn default() -> Self {
        ExclusionRules {
            patterns: vec![
                "borrowed".to_string(),
                "staking".to_string(),
                "pool2".to_string(),
            ],
        }
    }
}

impl ExclusionRules {
    pub fn new(patterns: Vec<String>) -> Self {
        ExclusionRules { patterns }
    }

    /// Case-sensitive substring match against a chain/category label.
    pub fn excludes(&self, label: &str) -> bool {
        self.patterns.iter().any(|p| label.contains(p.as_str()))
    }
}

/// Drop excluded categories from a per-chain balance map.
pub fn filter_chain_map(
    map: &HashMap<String, f64>,
    rules: &ExclusionRules,
) -> HashMap<String, f64> {
    map.iter()
        .filter(|(label, _)| !rules.excludes(label))
        .map(|(label, value)| (label.clone(), *value))
        .collect()
}

/// Sum of the retained balances.
pub fn aggregate(map: &HashMap<String, f64>) -> f64 {
    map.values().sum()
}

/// Filter a protocol's current per-chain balances and pair the summed
/// result with the TVL figure the API reports for the same protocol. A
/// material gap between the two means a liability category slipped past the
/// exclusion rules.
pub fn reconcile(
    protocol: &str,
    current_chain_tvls: &HashMap<String, f64>,
    reported_tvl: f64,
    rules: &ExclusionRules,
) -> (HashMap<String, f64>, ReconciliationRecord) {
    let filtered = filter_chain_map(current_chain_tvls, rules);
    let record = ReconciliationRecord {
        protocol: protocol.to_string(),
        computed_tvl: aggregate(&filtered),
        reported_tvl,
    };
    (filtered, record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> HashMap<String, f64> {
        let mut map = HashMap::new();
        map.insert("Ethereum".to_string(), 100.0);
        map.insert("Ethereum-borrowed".to_string(), 40.0);
        map.insert("Polygon".to_string(), 20.0);
        map
    }

    #[test]
    fn filters_liability_categories_and_sums_the_rest() {
        let (filtered, record) = reconcile("test", &sample_map(), 120.0, &ExclusionRules::default());

        assert_eq!(filtered.len(), 2);
        assert!(filtered.contains_key("Ethereum"));
        assert!(filtered.contains_key("Polygon"));
        assert_eq!(record.computed_tvl, 120.0);
    }

    #[test]
    fn filtering_is_idempotent() {
        let rules = ExclusionRules::default();
        let once = filter_chain_map(&sample_map(), &rules);
        let twice = filter_chain_map(&once, &rules);
        assert_eq!(once, twice);
    }

    #[test]
    fn aggregate_equals_sum_of_filtered_values() {
        let rules = ExclusionRules::default();
        let filtered = filter_chain_map(&sample_map(), &rules);
        assert_eq!(aggregate(&filtered), filtered.values().sum::<f64>());
    }

    #[test]
    fn staking_and_pool2_are_also_excluded() {
        let mut map = sample_map();
        map.insert("Ethereum-staking".to_string(), 5.0);
        map.insert("pool2".to_string(), 7.0);

        let filtered = filter_chain_map(&map, &ExclusionRules::default());
        assert_eq!(aggregate(&filtered), 120.0);
    }

    #[test]
    fn custom_rules_replace_the_defaults() {
        let rules = ExclusionRules::new(vec!["Polygon".to_string()]);
        let filtered = filter_chain_map(&sample_map(), &rules);
        // Only the literal substring matches; the default categories stay.
        assert_eq!(aggregate(&filtered), 140.0);
    }

    #[test]
    fn drift_is_relative_to_the_reported_figure() {
        let (_, record) = reconcile("test", &sample_map(), 100.0, &ExclusionRules::default());
        assert!((record.relative_drift() - 0.2).abs() < 1e-12);

        let (_, exact) = reconcile("test", &sample_map(), 120.0, &ExclusionRules::default());
        assert_eq!(exact.relative_drift(), 0.0);
    }
}
