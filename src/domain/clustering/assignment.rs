use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Distribution, Max, Min};
use std::collections::BTreeMap;

/// One output row: instrument, its mean efficiency ratio, its cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRow {
    pub symbol: String,
    pub mean_efficiency_ratio: f64,
    pub cluster_label: usize,
}

/// Per-cluster statistics over the members' mean efficiency ratios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster_label: usize,
    pub members: Vec<String>,
    pub mean_efficiency_ratio: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Symbol → (mean ratio, cluster label), unique per symbol.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClusterAssignment {
    rows: BTreeMap<String, AssignmentRow>,
}

impl ClusterAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row, returning the previous row for the same symbol if any.
    pub fn insert(&mut self, row: AssignmentRow) -> Option<AssignmentRow> {
        self.rows.insert(row.symbol.clone(), row)
    }

    pub fn get(&self, symbol: &str) -> Option<&AssignmentRow> {
        self.rows.get(symbol)
    }

    pub fn label_of(&self, symbol: &str) -> Option<usize> {
        self.rows.get(symbol).map(|r| r.cluster_label)
    }

    /// Rows ordered by symbol.
    pub fn rows(&self) -> impl Iterator<Item = &AssignmentRow> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cluster_count(&self) -> usize {
        let mut labels: Vec<usize> = self.rows.values().map(|r| r.cluster_label).collect();
        labels.sort_unstable();
        labels.dedup();
        labels.len()
    }

    /// Rows ordered by ascending mean efficiency ratio, ties by symbol.
    pub fn sorted_by_mean_ratio(&self) -> Vec<&AssignmentRow> {
        let mut rows: Vec<&AssignmentRow> = self.rows.values().collect();
        rows.sort_by(|a, b| {
            a.mean_efficiency_ratio
                .total_cmp(&b.mean_efficiency_ratio)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        rows
    }

    pub fn summaries(&self) -> Vec<ClusterSummary> {
        let mut groups: BTreeMap<usize, Vec<&AssignmentRow>> = BTreeMap::new();
        for row in self.rows.values() {
            groups.entry(row.cluster_label).or_default().push(row);
        }

        groups
            .into_iter()
            .map(|(cluster_label, members)| {
                let ratios: Vec<f64> = members.iter().map(|r| r.mean_efficiency_ratio).collect();
                let data = Data::new(ratios);
                let finite_or_zero = |v: Option<f64>| v.filter(|x| x.is_finite()).unwrap_or(0.0);

                ClusterSummary {
                    cluster_label,
                    members: members.iter().map(|r| r.symbol.clone()).collect(),
                    mean_efficiency_ratio: finite_or_zero(data.mean()),
                    std_dev: finite_or_zero(data.std_dev()),
                    min: data.min(),
                    max: data.max(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(symbol: &str, ratio: f64, label: usize) -> AssignmentRow {
        AssignmentRow {
            symbol: symbol.to_string(),
            mean_efficiency_ratio: ratio,
            cluster_label: label,
        }
    }

    fn sample() -> ClusterAssignment {
        let mut assignment = ClusterAssignment::new();
        assignment.insert(row("XAUUSD", 0.30, 1));
        assignment.insert(row("EURUSD", 0.10, 0));
        assignment.insert(row("GBPUSD", 0.14, 0));
        assignment
    }

    #[test]
    fn test_symbol_key_is_unique() {
        let mut assignment = sample();
        let previous = assignment.insert(row("EURUSD", 0.12, 1));
        assert!(previous.is_some());
        assert_eq!(assignment.len(), 3);
        assert_eq!(assignment.label_of("EURUSD"), Some(1));
    }

    #[test]
    fn test_sorted_by_mean_ratio() {
        let assignment = sample();
        let symbols: Vec<&str> = assignment
            .sorted_by_mean_ratio()
            .iter()
            .map(|r| r.symbol.as_str())
            .collect();
        assert_eq!(symbols, vec!["EURUSD", "GBPUSD", "XAUUSD"]);
    }

    #[test]
    fn test_summaries_group_by_label() {
        let summaries = sample().summaries();
        assert_eq!(summaries.len(), 2);

        let trend = &summaries[0];
        assert_eq!(trend.cluster_label, 0);
        assert_eq!(trend.members, vec!["EURUSD", "GBPUSD"]);
        assert!((trend.mean_efficiency_ratio - 0.12).abs() < 1e-12);
        assert!((trend.min - 0.10).abs() < 1e-12);
        assert!((trend.max - 0.14).abs() < 1e-12);

        let single = &summaries[1];
        assert_eq!(single.members, vec!["XAUUSD"]);
        assert_eq!(single.std_dev, 0.0);
    }
}
