//! Occurrence counts for extracted addresses.

use std::collections::HashMap;

/// IP address -> number of times it was seen, in first-seen order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IpTally {
    order: Vec<String>,
    counts: HashMap<String, usize>,
}

impl IpTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one occurrence of `ip`.
    pub fn record(&mut self, ip: impl Into<String>) {
        self.add(ip.into(), 1);
    }

    fn add(&mut self, ip: String, count: usize) {
        match self.counts.get_mut(&ip) {
            Some(existing) => *existing += count,
            None => {
                self.order.push(ip.clone());
                self.counts.insert(ip, count);
            }
        }
    }

    pub fn get(&self, ip: &str) -> Option<usize> {
        self.counts.get(ip).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Sum of all occurrences.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.order
            .iter()
            .map(move |ip| (ip.as_str(), self.counts.get(ip).copied().unwrap_or(0)))
    }

    /// Adds every count from `other`; addresses new to `self` are appended in
    /// `other`'s order.
    pub fn merge(&mut self, other: IpTally) {
        let IpTally { order, mut counts } = other;
        for ip in order {
            let count = counts.remove(&ip).unwrap_or(0);
            self.add(ip, count);
        }
    }

    /// Distinct addresses in first-seen order.
    pub fn ips(&self) -> Vec<String> {
        self.order.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_first_seen_order() {
        let mut tally = IpTally::new();
        tally.record("8.8.8.8");
        tally.record("1.1.1.1");
        tally.record("8.8.8.8");

        assert_eq!(tally.len(), 2);
        assert_eq!(tally.total(), 3);
        assert_eq!(tally.get("8.8.8.8"), Some(2));
        assert_eq!(tally.get("9.9.9.9"), None);
        assert_eq!(tally.ips(), vec!["8.8.8.8", "1.1.1.1"]);
    }

    #[test]
    fn test_merge_sums_counts() {
        let mut left = IpTally::new();
        left.record("8.8.8.8");
        left.record("1.1.1.1");

        let mut right = IpTally::new();
        right.record("9.9.9.9");
        right.record("1.1.1.1");
        right.record("1.1.1.1");

        left.merge(right);
        let pairs: Vec<(&str, usize)> = left.iter().collect();
        assert_eq!(pairs, vec![("8.8.8.8", 1), ("1.1.1.1", 3), ("9.9.9.9", 1)]);
    }

    #[test]
    fn test_empty() {
        let tally = IpTally::new();
        assert!(tally.is_empty());
        assert_eq!(tally.iter().count(), 0);
    }
}
