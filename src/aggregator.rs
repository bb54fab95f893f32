// 📊 Aggregator - per (Razão Social, Modalidade, UF) running statistics
//
// Streaming: amounts are never stored. Variance uses Welford's update so the
// result equals the two-pass population formula without cancellation on
// large amounts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::enrichment::EnrichedFact;

// ============================================================================
// GROUP KEY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub legal_name: String,
    pub category: String,
    pub region: String,
}

impl GroupKey {
    pub fn new(legal_name: &str, category: &str, region: &str) -> Self {
        GroupKey {
            legal_name: legal_name.to_string(),
            category: category.to_string(),
            region: region.to_string(),
        }
    }

    pub fn of(fact: &EnrichedFact<'_>) -> Self {
        GroupKey::new(fact.legal_name(), fact.category(), fact.region())
    }
}

// ============================================================================
// ACCUMULATOR
// ============================================================================

/// Running statistics for one group. Fields are only mutated through `push`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupAccumulator {
    count: u64,
    sum: f64,
    mean: f64,
    /// Sum of squared deviations from the running mean
    m2: f64,
}

impl GroupAccumulator {
    pub fn push(&mut self, amount: f64) {
        self.count += 1;
        self.sum += amount;

        let delta = amount - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (amount - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total(&self) -> f64 {
        self.sum
    }

    /// total / count, 0 for an empty accumulator
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Population standard deviation (divisor = count)
    pub fn std_dev(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.m2 / self.count as f64).max(0.0).sqrt()
    }
}

// ============================================================================
// AGGREGATOR
// ============================================================================

/// One accumulator per distinct key, kept in first-seen order so ties in the
/// final ranking are deterministic.
#[derive(Debug, Default)]
pub struct Aggregator {
    index: HashMap<GroupKey, usize>,
    groups: Vec<(GroupKey, GroupAccumulator)>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, fact: &EnrichedFact<'_>) {
        self.add_amount(GroupKey::of(fact), fact.amount());
    }

    pub fn add_amount(&mut self, key: GroupKey, amount: f64) {
        let slot = match self.index.get(&key) {
            Some(slot) => *slot,
            None => {
                let slot = self.groups.len();
                self.index.insert(key.clone(), slot);
                self.groups.push((key, GroupAccumulator::default()));
                slot
            }
        };
        self.groups[slot].1.push(amount);
    }

    pub fn get(&self, key: &GroupKey) -> Option<&GroupAccumulator> {
        self.index.get(key).map(|slot| &self.groups[*slot].1)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups in first-seen order
    pub fn groups(&self) -> impl Iterator<Item = (&GroupKey, &GroupAccumulator)> {
        self.groups.iter().map(|(k, acc)| (k, acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> GroupKey {
        GroupKey::new("ACME SAUDE", "Cooperativa", "SP")
    }

    #[test]
    fn test_accumulator_ten_twenty_thirty() {
        let mut acc = GroupAccumulator::default();
        for amount in [10.0, 20.0, 30.0] {
            acc.push(amount);
        }

        assert_eq!(acc.count(), 3);
        assert_eq!(format!("{:.2}", acc.total()), "60.00");
        assert_eq!(format!("{:.2}", acc.mean()), "20.00");
        assert_eq!(format!("{:.2}", acc.std_dev()), "8.16");
    }

    #[test]
    fn test_accumulator_two_facts() {
        let mut acc = GroupAccumulator::default();
        acc.push(100.0);
        acc.push(300.0);

        assert!((acc.total() - 400.0).abs() < 1e-9);
        assert!((acc.mean() - 200.0).abs() < 1e-9);
        assert!((acc.std_dev() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_amount_has_zero_deviation() {
        let mut acc = GroupAccumulator::default();
        acc.push(1500.50);
        assert_eq!(acc.std_dev(), 0.0);
        assert_eq!(acc.mean(), 1500.50);
    }

    #[test]
    fn test_identical_large_amounts_stay_at_zero() {
        let mut acc = GroupAccumulator::default();
        for _ in 0..1000 {
            acc.push(123_456_789.12);
        }
        assert_eq!(format!("{:.2}", acc.std_dev()), "0.00");
    }

    #[test]
    fn test_matches_two_pass_formula() {
        let amounts = [0.01, 1e6, 250.75, 3.5, 99_999.99, 42.0];
        let mut acc = GroupAccumulator::default();
        for a in amounts {
            acc.push(a);
        }

        let n = amounts.len() as f64;
        let mean = amounts.iter().sum::<f64>() / n;
        let var = amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;
        assert!((acc.std_dev() - var.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_empty_accumulator() {
        let acc = GroupAccumulator::default();
        assert_eq!(acc.mean(), 0.0);
        assert_eq!(acc.std_dev(), 0.0);
    }

    #[test]
    fn test_one_accumulator_per_key() {
        let mut agg = Aggregator::new();
        agg.add_amount(key(), 100.0);
        agg.add_amount(GroupKey::new("OTHER", "Cooperativa", "SP"), 5.0);
        agg.add_amount(key(), 300.0);

        assert_eq!(agg.len(), 2);
        let acc = agg.get(&key()).unwrap();
        assert_eq!(acc.count(), 2);
        assert_eq!(acc.total(), 400.0);
    }

    #[test]
    fn test_region_is_part_of_key() {
        let mut agg = Aggregator::new();
        agg.add_amount(GroupKey::new("ACME", "Cooperativa", "SP"), 1.0);
        agg.add_amount(GroupKey::new("ACME", "Cooperativa", "RJ"), 1.0);
        assert_eq!(agg.len(), 2);
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let mut agg = Aggregator::new();
        agg.add_amount(GroupKey::new("B", "x", "SP"), 1.0);
        agg.add_amount(GroupKey::new("A", "x", "SP"), 1.0);
        agg.add_amount(GroupKey::new("B", "x", "SP"), 1.0);

        let names: Vec<&str> = agg.groups().map(|(k, _)| k.legal_name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }
}
