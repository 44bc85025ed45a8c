//! In-process quota ledger
//!
//! The ledger is built once when a selector is constructed and is the only
//! source of remaining quota and space for that selector's lifetime. Every
//! committed pick decrements it; nothing re-reads the catalog.

use serde::Serialize;
use siteplace_common::{Capacity, Error, QuotaGroup, Result, SiteId};
use std::collections::{BTreeMap, HashMap};

/// Remaining quota and space of one site
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    /// Account quota left on the site
    pub quota_left: Capacity,
    /// Free space left on the site
    pub space_left: Capacity,
    /// Quota left in every group the site belongs to
    pub group_quota_left: BTreeMap<QuotaGroup, i64>,
}

impl LedgerEntry {
    /// Entry with no limits at all
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            quota_left: Capacity::Unlimited,
            space_left: Capacity::Unlimited,
            group_quota_left: BTreeMap::new(),
        }
    }

    /// Enough free space for `size` bytes when `present` bytes are already there
    #[must_use]
    pub fn has_space_for(&self, size: u64, present: u64) -> bool {
        self.space_left
            .covers(i128::from(size) - i128::from(present))
    }

    /// Quota must strictly exceed the size
    #[must_use]
    pub fn has_quota_for(&self, size: u64) -> bool {
        self.quota_left.exceeds(i128::from(size))
    }

    /// Every group the site belongs to still covers the size
    #[must_use]
    pub fn has_group_quota_for(&self, size: u64) -> bool {
        self.group_quota_left
            .values()
            .all(|left| i128::from(*left) >= i128::from(size))
    }

    fn consume(&mut self, size: u64) {
        self.quota_left.consume(size);
        let amount = i64::try_from(size).unwrap_or(i64::MAX);
        for left in self.group_quota_left.values_mut() {
            *left = left.saturating_sub(amount);
        }
    }
}

/// Per-selector view of remaining quota, keyed by site
#[derive(Clone, Debug, Default)]
pub struct QuotaLedger {
    entries: HashMap<SiteId, LedgerEntry>,
}

impl QuotaLedger {
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, site: SiteId, entry: LedgerEntry) {
        self.entries.insert(site, entry);
    }

    /// Remaining quota and space of a site
    #[must_use]
    pub fn get(&self, site: SiteId) -> Option<&LedgerEntry> {
        self.entries.get(&site)
    }

    /// Number of sites tracked
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no site is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record `size` bytes committed to `site`.
    ///
    /// Decrements the site's quota and every group quota it belongs to;
    /// no other site changes. Space is left untouched.
    pub fn consume(&mut self, site: SiteId, size: u64) -> Result<()> {
        let entry = self
            .entries
            .get_mut(&site)
            .ok_or_else(|| Error::invalid_argument(format!("site {site} is not in the ledger")))?;
        entry.consume(size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limited(quota: i64, groups: &[(&str, i64)]) -> LedgerEntry {
        LedgerEntry {
            quota_left: Capacity::Bytes(quota),
            space_left: Capacity::Unlimited,
            group_quota_left: groups
                .iter()
                .map(|(g, left)| (QuotaGroup::from(*g), *left))
                .collect(),
        }
    }

    #[test]
    fn test_consume_only_touches_one_site() {
        let a = SiteId::from_name("A");
        let b = SiteId::from_name("B");
        let mut ledger = QuotaLedger::new();
        ledger.insert(a, limited(100, &[("tier=1", 50), ("A", 80)]));
        ledger.insert(b, limited(100, &[("tier=1", 50)]));

        ledger.consume(a, 10).unwrap();

        let entry = ledger.get(a).unwrap();
        assert_eq!(entry.quota_left, Capacity::Bytes(90));
        assert_eq!(entry.group_quota_left[&QuotaGroup::from("tier=1")], 40);
        assert_eq!(entry.group_quota_left[&QuotaGroup::from("A")], 70);
        // Group values are per-site copies: B's view is unchanged
        assert_eq!(ledger.get(b).unwrap(), &limited(100, &[("tier=1", 50)]));
    }

    #[test]
    fn test_consume_unknown_site() {
        let mut ledger = QuotaLedger::new();
        assert!(ledger.consume(SiteId::from_name("missing"), 1).is_err());
    }

    #[test]
    fn test_quota_is_strict() {
        let entry = limited(10, &[]);
        assert!(!entry.has_quota_for(10));
        assert!(entry.has_quota_for(9));
    }

    #[test]
    fn test_group_quota_is_inclusive() {
        let entry = limited(100, &[("g", 10)]);
        assert!(entry.has_group_quota_for(10));
        assert!(!entry.has_group_quota_for(11));
    }

    #[test]
    fn test_space_accounts_for_present_bytes() {
        let entry = LedgerEntry {
            quota_left: Capacity::Unlimited,
            space_left: Capacity::Bytes(5),
            group_quota_left: BTreeMap::new(),
        };
        assert!(!entry.has_space_for(10, 0));
        assert!(entry.has_space_for(10, 5));
        assert!(entry.has_space_for(10, 20));
        assert!(LedgerEntry::unlimited().has_space_for(u64::MAX, 0));
    }
}
