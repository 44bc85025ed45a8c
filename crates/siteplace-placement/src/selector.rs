//! Selector facade
//!
//! A [`SiteSelector`] is built once per placement decision. Construction
//! shapes the raw candidates through the configured strategy, then filters
//! them by the account's local and group quota and records what is left in
//! a [`QuotaLedger`]. Every later [`SiteSelector::select`] call draws from
//! that ledger and decrements it; the catalog is not consulted again.

use crate::candidate::{CandidateSite, Pricing, SitePick, WeightingMode};
use crate::catalog::{GlobalQuotaLimit, RawCandidate, SiteCatalog};
use crate::ledger::{LedgerEntry, QuotaLedger};
use crate::pipeline::SelectionRequest;
use crate::strategy::{SelectionStrategy, Strategy};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use siteplace_common::{
    AccountName, Capacity, Error, QuotaGroup, Result, SelectorConfig, SiteId,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Construction parameters of a selector
#[derive(Clone, Debug)]
pub struct SelectorOptions {
    /// Account the placement is charged to
    pub account: AccountName,
    /// How candidates are weighted
    pub weighting: WeightingMode,
    /// Default copies per `select` call
    pub copies: usize,
    /// Skip quota and space enforcement
    pub ignore_account_limit: bool,
    /// RNG seed (overrides the configured seed)
    pub seed: Option<u64>,
}

impl SelectorOptions {
    /// Uniform weighting, limits enforced
    #[must_use]
    pub fn new(account: impl Into<AccountName>, copies: usize) -> Self {
        Self {
            account: account.into(),
            weighting: WeightingMode::Uniform,
            copies,
            ignore_account_limit: false,
            seed: None,
        }
    }

    /// Set the weighting mode
    #[must_use]
    pub fn with_weighting(mut self, weighting: WeightingMode) -> Self {
        self.weighting = weighting;
        self
    }

    /// Grant unlimited quota and space to every candidate
    #[must_use]
    pub const fn ignore_account_limit(mut self) -> Self {
        self.ignore_account_limit = true;
        self
    }

    /// Seed the selector's RNG
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Read-only view of one admitted candidate
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CandidateSnapshot {
    pub name: String,
    pub weight: f64,
    pub mock: bool,
    pub availability_write: bool,
    pub staging_area: bool,
    pub quota_left: Capacity,
    pub space_left: Capacity,
    pub group_quota_left: BTreeMap<QuotaGroup, i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<Pricing>,
    pub availability: f64,
}

/// Quota-aware replica placement for one account
pub struct SiteSelector {
    account: AccountName,
    copies: usize,
    strategy: Strategy,
    sites: Vec<CandidateSite>,
    ledger: QuotaLedger,
    rng: StdRng,
}

impl std::fmt::Debug for SiteSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteSelector")
            .field("account", &self.account)
            .field("copies", &self.copies)
            .field("strategy", &self.strategy)
            .field("sites", &self.sites.len())
            .finish_non_exhaustive()
    }
}

impl SiteSelector {
    /// Create a selector with the default configuration
    pub fn new(
        catalog: &dyn SiteCatalog,
        raw: &[RawCandidate],
        options: SelectorOptions,
    ) -> Result<Self> {
        Self::with_config(catalog, raw, options, &SelectorConfig::default())
    }

    /// Create a selector.
    ///
    /// Fails with `InsufficientTargetRses` when fewer than `copies`
    /// candidates survive attribute filtering and with
    /// `InsufficientAccountLimit` when fewer survive quota filtering.
    pub fn with_config(
        catalog: &dyn SiteCatalog,
        raw: &[RawCandidate],
        options: SelectorOptions,
        config: &SelectorConfig,
    ) -> Result<Self> {
        if options.copies == 0 {
            return Err(Error::invalid_argument("copies must be at least 1"));
        }

        let strategy = Strategy::for_mode(&options.weighting, config);
        let shaped = strategy.filter_invalid(catalog, raw)?;
        if shaped.len() < options.copies {
            return Err(Error::InsufficientTargetRses {
                available: shaped.len(),
                required: options.copies,
            });
        }

        let unlimited = options.ignore_account_limit
            || catalog.account_is_privileged(&options.account, &config.admin_attribute)?;
        let (sites, ledger) = if unlimited {
            debug!("account {} is not limited", options.account);
            let mut ledger = QuotaLedger::new();
            for site in &shaped {
                ledger.insert(site.id, LedgerEntry::unlimited());
            }
            (shaped, ledger)
        } else {
            Self::apply_limits(catalog, &options.account, shaped, config)?
        };

        if sites.len() < options.copies {
            return Err(Error::InsufficientAccountLimit {
                available: sites.len(),
                required: options.copies,
            });
        }

        info!(
            "selector for account {} ready: {} of {} candidates, {} copies",
            options.account,
            sites.len(),
            raw.len(),
            options.copies
        );

        let rng = match options.seed.or(config.seed) {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            account: options.account,
            copies: options.copies,
            strategy,
            sites,
            ledger,
            rng,
        })
    }

    fn apply_limits(
        catalog: &dyn SiteCatalog,
        account: &AccountName,
        shaped: Vec<CandidateSite>,
        config: &SelectorConfig,
    ) -> Result<(Vec<CandidateSite>, QuotaLedger)> {
        let groups = catalog.global_quota_limits(account)?;
        let usage = catalog.usage_per_site(account)?;
        let group_left: HashMap<&QuotaGroup, i64> = groups
            .iter()
            .map(|(group, limit)| (group, Self::group_quota_left(limit, &usage)))
            .collect();

        let mut ledger = QuotaLedger::new();
        let mut sites = Vec::with_capacity(shaped.len());
        for site in shaped {
            if site.mock {
                ledger.insert(site.id, LedgerEntry::unlimited());
                sites.push(site);
                continue;
            }

            let quota_left = Capacity::Bytes(match catalog.local_quota_limit(account, site.id)? {
                Some(limit) => limit.saturating_sub(catalog.local_usage(account, site.id)?),
                None => 0,
            });
            let group_quota_left: BTreeMap<QuotaGroup, i64> = groups
                .iter()
                .filter(|(_, limit)| limit.sites.contains(&site.id))
                .map(|(group, _)| (group.clone(), group_left[group]))
                .collect();

            if !quota_left.is_positive() || group_quota_left.values().any(|left| *left <= 0) {
                debug!(
                    "site {} dropped: quota left {}, group quota left {:?}",
                    site.name, quota_left, group_quota_left
                );
                continue;
            }

            let space_left = match catalog.space_cap(site.id)? {
                Some(cap) if cap >= 0 => {
                    Capacity::Bytes(cap.saturating_sub(catalog.occupied_space(site.id)?))
                }
                _ => Capacity::Unlimited,
            };
            debug!(
                "site {}: {} left {}, quota left {}",
                site.name, config.space_limit_name, space_left, quota_left
            );

            ledger.insert(
                site.id,
                LedgerEntry {
                    quota_left,
                    space_left,
                    group_quota_left,
                },
            );
            sites.push(site);
        }

        Ok((sites, ledger))
    }

    fn group_quota_left(limit: &GlobalQuotaLimit, usage: &HashMap<SiteId, i64>) -> i64 {
        let Some(bytes) = limit.limit else {
            return 0;
        };
        let used = limit
            .sites
            .iter()
            .filter_map(|site| usage.get(site))
            .fold(0_i64, |acc, b| acc.saturating_add(*b));
        bytes.saturating_sub(used)
    }

    /// Pick sites for one request and charge them to the ledger.
    ///
    /// Either all requested copies are granted or the call fails and the
    /// ledger is unchanged.
    pub fn select(&mut self, request: &SelectionRequest) -> Result<Vec<SitePick>> {
        let count = request.copies.unwrap_or(self.copies);
        if count == 0 {
            return Err(Error::invalid_argument("copies must be at least 1"));
        }

        let picks =
            self.strategy
                .select(&self.sites, &self.ledger, request, count, &mut self.rng)?;
        for pick in &picks {
            self.ledger.consume(pick.site_id, request.size)?;
        }

        debug!(
            "account {}: {} bytes placed on {:?}",
            self.account,
            request.size,
            picks.iter().map(|p| p.site_id).collect::<Vec<_>>()
        );
        Ok(picks)
    }

    /// Admitted candidates with their remaining quota
    #[must_use]
    pub fn candidates(&self) -> BTreeMap<SiteId, CandidateSnapshot> {
        self.sites
            .iter()
            .filter_map(|site| {
                let entry = self.ledger.get(site.id)?;
                Some((
                    site.id,
                    CandidateSnapshot {
                        name: site.name.clone(),
                        weight: site.weight,
                        mock: site.mock,
                        availability_write: site.availability_write,
                        staging_area: site.staging_area,
                        quota_left: entry.quota_left,
                        space_left: entry.space_left,
                        group_quota_left: entry.group_quota_left.clone(),
                        pricing: site.pricing,
                        availability: site.availability,
                    },
                ))
            })
            .collect()
    }

    /// Name of an admitted candidate
    #[must_use]
    pub fn site_name(&self, site: SiteId) -> Option<&str> {
        self.sites
            .iter()
            .find(|s| s.id == site)
            .map(|s| s.name.as_str())
    }

    /// The quota ledger
    #[must_use]
    pub const fn ledger(&self) -> &QuotaLedger {
        &self.ledger
    }

    /// Default copies per call
    #[must_use]
    pub const fn copies(&self) -> usize {
        self.copies
    }

    /// Account the selector charges
    #[must_use]
    pub const fn account(&self) -> &AccountName {
        &self.account
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryCatalog, SiteRecord};
    use std::collections::HashSet;

    const GB: u64 = 1 << 30;

    fn account() -> AccountName {
        AccountName::from("jdoe")
    }

    fn two_sites() -> (MemoryCatalog, SiteId, SiteId, Vec<RawCandidate>) {
        let catalog = MemoryCatalog::new();
        let a = catalog.add_site("SITE_1");
        let b = catalog.add_site("SITE_2");
        let raw = vec![
            catalog.raw_candidate(a).unwrap(),
            catalog.raw_candidate(b).unwrap(),
        ];
        (catalog, a, b, raw)
    }

    fn options(copies: usize) -> SelectorOptions {
        SelectorOptions::new(account(), copies).with_seed(7)
    }

    fn limit_both(catalog: &MemoryCatalog, a: SiteId, b: SiteId, local: i64, global: i64) {
        catalog.set_local_limit(&account(), a, local).unwrap();
        catalog.set_local_limit(&account(), b, local).unwrap();
        catalog.set_global_limit(&account(), "SITE_1", Some(global));
        catalog.set_global_limit(&account(), "SITE_2", Some(global));
    }

    #[test]
    fn test_more_copies_than_sites() {
        let (catalog, a, _, _) = two_sites();
        let raw = vec![catalog.raw_candidate(a).unwrap()];
        assert!(matches!(
            SiteSelector::new(&catalog, &raw, options(2)),
            Err(Error::InsufficientTargetRses {
                available: 1,
                required: 2
            })
        ));
    }

    #[test]
    fn test_exhausted_local_quota() {
        let (catalog, a, _, raw) = two_sites();
        catalog.set_local_limit(&account(), a, 10).unwrap();
        catalog.increase_usage(&account(), a, 10).unwrap();
        assert!(matches!(
            SiteSelector::new(&catalog, &raw, options(2)),
            Err(Error::InsufficientAccountLimit { .. })
        ));
    }

    #[test]
    fn test_exhausted_global_quota() {
        let (catalog, a, _, raw) = two_sites();
        catalog.set_local_limit(&account(), a, 20).unwrap();
        catalog.set_global_limit(&account(), "SITE_1", Some(10));
        catalog.increase_usage(&account(), a, 10).unwrap();
        assert!(matches!(
            SiteSelector::new(&catalog, &raw, options(2)),
            Err(Error::InsufficientAccountLimit { .. })
        ));
    }

    #[test]
    fn test_enough_quota_keeps_both() {
        let (catalog, a, b, raw) = two_sites();
        limit_both(&catalog, a, b, 20, 20);
        let selector = SiteSelector::new(&catalog, &raw, options(2)).unwrap();
        assert_eq!(selector.candidates().len(), 2);
    }

    #[test]
    fn test_local_quota_used_up_drops_only_that_site() {
        let (catalog, a, b, raw) = two_sites();
        limit_both(&catalog, a, b, 10, 100);
        catalog.increase_usage(&account(), a, 10).unwrap();
        let selector = SiteSelector::new(&catalog, &raw, options(1)).unwrap();
        let candidates = selector.candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[&b].quota_left, Capacity::Bytes(10));
    }

    #[test]
    fn test_global_quota_missing_drops_site() {
        let (catalog, a, b, raw) = two_sites();
        catalog.set_global_limit(&account(), "SITE_1", Some(10));
        catalog.increase_usage(&account(), a, 10).unwrap();
        catalog.set_local_limit(&account(), a, 20).unwrap();
        catalog.set_local_limit(&account(), b, 20).unwrap();
        let selector = SiteSelector::new(&catalog, &raw, options(1)).unwrap();
        let candidates = selector.candidates();
        assert_eq!(candidates.len(), 1);
        assert!(candidates.contains_key(&b));
    }

    #[test]
    fn test_local_quota_missing_drops_site() {
        let (catalog, a, b, raw) = two_sites();
        catalog.set_global_limit(&account(), "SITE_1", Some(10));
        catalog.set_local_limit(&account(), a, 10).unwrap();
        catalog.increase_usage(&account(), a, 10).unwrap();
        catalog.set_local_limit(&account(), b, 10).unwrap();
        catalog.set_global_limit(&account(), "SITE_2", Some(10));
        let selector = SiteSelector::new(&catalog, &raw, options(1)).unwrap();
        assert_eq!(selector.candidates().keys().copied().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_null_group_limit_blocks_members() {
        let (catalog, a, b, raw) = two_sites();
        catalog.set_local_limit(&account(), a, 20).unwrap();
        catalog.set_local_limit(&account(), b, 20).unwrap();
        catalog.set_global_limit(&account(), "SITE_1", None);
        let selector = SiteSelector::new(&catalog, &raw, options(1)).unwrap();
        assert!(!selector.candidates().contains_key(&a));
    }

    #[test]
    fn test_local_quota_runs_out_between_calls() {
        let (catalog, a, b, raw) = two_sites();
        limit_both(&catalog, a, b, 10, 20);
        let mut selector = SiteSelector::new(&catalog, &raw, options(2)).unwrap();
        assert_eq!(selector.candidates().len(), 2);

        selector
            .select(&SelectionRequest::new(9).prefer([a]).copies(1))
            .unwrap();
        let picks = selector.select(&SelectionRequest::new(5).copies(1)).unwrap();
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].site_id, b);
    }

    #[test]
    fn test_group_quota_runs_out_between_calls() {
        let (catalog, a, b, raw) = two_sites();
        limit_both(&catalog, a, b, 20, 10);
        let mut selector = SiteSelector::new(&catalog, &raw, options(2)).unwrap();

        selector
            .select(&SelectionRequest::new(10).prefer([a]).copies(1))
            .unwrap();
        let picks = selector.select(&SelectionRequest::new(5).copies(1)).unwrap();
        assert_eq!(picks[0].site_id, b);
    }

    #[test]
    fn test_quota_survives_several_calls() {
        let (catalog, a, b, raw) = two_sites();
        limit_both(&catalog, a, b, 20, 20);
        let mut selector = SiteSelector::new(&catalog, &raw, options(2)).unwrap();

        selector
            .select(&SelectionRequest::new(10).prefer([a]).copies(1))
            .unwrap();
        selector
            .select(&SelectionRequest::new(10).prefer([b]).copies(1))
            .unwrap();
        let picks = selector.select(&SelectionRequest::new(5).copies(2)).unwrap();
        assert_eq!(picks.len(), 2);
    }

    #[test]
    fn test_ledger_decrements_only_picked_site() {
        let (catalog, a, b, raw) = two_sites();
        limit_both(&catalog, a, b, 100, 100);
        let mut selector = SiteSelector::new(&catalog, &raw, options(1)).unwrap();

        let before = selector.candidates();
        let picks = selector
            .select(&SelectionRequest::new(30).prefer([a]).prioritize_order())
            .unwrap();
        assert_eq!(picks[0].site_id, a);

        let after = selector.candidates();
        assert_eq!(after[&a].quota_left, Capacity::Bytes(70));
        assert_eq!(after[&a].group_quota_left[&QuotaGroup::from("SITE_1")], 70);
        assert_eq!(after[&b], before[&b]);
    }

    #[test]
    fn test_failed_call_leaves_ledger_untouched() {
        let (catalog, a, b, raw) = two_sites();
        limit_both(&catalog, a, b, 100, 100);
        let mut selector = SiteSelector::new(&catalog, &raw, options(1)).unwrap();
        let before = selector.candidates();

        assert!(matches!(
            selector.select(&SelectionRequest::new(100).copies(2)),
            Err(Error::InsufficientAccountLimit { .. })
        ));
        assert_eq!(selector.candidates(), before);
    }

    #[test]
    fn test_two_unlimited_sites_both_chosen() {
        let (catalog, a, b, raw) = two_sites();
        let mut selector =
            SiteSelector::new(&catalog, &raw, options(2).ignore_account_limit()).unwrap();
        let picks = selector.select(&SelectionRequest::new(GB)).unwrap();
        let ids: HashSet<SiteId> = picks.iter().map(|p| p.site_id).collect();
        assert_eq!(ids, HashSet::from([a, b]));
    }

    #[test]
    fn test_quota_equal_to_size_is_rejected() {
        let (catalog, a, b, raw) = two_sites();
        limit_both(&catalog, a, b, 10, 100);
        let mut selector = SiteSelector::new(&catalog, &raw, options(1)).unwrap();
        assert!(matches!(
            selector.select(&SelectionRequest::new(10)),
            Err(Error::InsufficientAccountLimit { .. })
        ));
    }

    #[test]
    fn test_copies_override_and_default() {
        let (catalog, _, _, raw) = two_sites();
        let mut selector =
            SiteSelector::new(&catalog, &raw, options(1).ignore_account_limit()).unwrap();
        assert_eq!(selector.select(&SelectionRequest::new(1)).unwrap().len(), 1);
        assert_eq!(
            selector
                .select(&SelectionRequest::new(1).copies(2))
                .unwrap()
                .len(),
            2
        );
        assert!(matches!(
            selector.select(&SelectionRequest::new(1).copies(3)),
            Err(Error::InsufficientTargetRses { .. })
        ));
        assert!(matches!(
            selector.select(&SelectionRequest::new(1).copies(0)),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_blocklisted_site_never_chosen() {
        let (catalog, a, b, raw) = two_sites();
        let mut selector =
            SiteSelector::new(&catalog, &raw, options(1).ignore_account_limit()).unwrap();
        for _ in 0..50 {
            let picks = selector
                .select(&SelectionRequest::new(1).block([a]))
                .unwrap();
            assert_eq!(picks[0].site_id, b);
        }
    }

    #[test]
    fn test_prioritized_preference_beats_weight() {
        let catalog = MemoryCatalog::new();
        let heavy = catalog.add_site_record(SiteRecord::new("HEAVY").with_attribute("w", "1000"));
        let light = catalog.add_site_record(SiteRecord::new("LIGHT").with_attribute("w", "0.001"));
        let raw = vec![
            catalog.raw_candidate(heavy).unwrap(),
            catalog.raw_candidate(light).unwrap(),
        ];
        let mut selector = SiteSelector::new(
            &catalog,
            &raw,
            options(1)
                .ignore_account_limit()
                .with_weighting(WeightingMode::Attribute("w".into())),
        )
        .unwrap();

        for _ in 0..50 {
            let picks = selector
                .select(&SelectionRequest::new(1).prefer([light, heavy]).prioritize_order())
                .unwrap();
            assert_eq!(picks[0].site_id, light);
        }
    }

    #[test]
    fn test_privileged_account_is_unlimited() {
        let (catalog, _, _, raw) = two_sites();
        catalog.grant_admin(&account(), "admin");
        let mut selector = SiteSelector::new(&catalog, &raw, options(2)).unwrap();
        assert!(
            selector
                .candidates()
                .values()
                .all(|c| c.quota_left == Capacity::Unlimited)
        );
        assert_eq!(selector.select(&SelectionRequest::new(u64::MAX)).unwrap().len(), 2);
    }

    #[test]
    fn test_mock_site_skips_limits() {
        let catalog = MemoryCatalog::new();
        let mock = catalog.add_site_record(SiteRecord::new("MOCK").with_attribute("mock", "true"));
        let real = catalog.add_site("REAL");
        let raw = vec![
            catalog.raw_candidate(mock).unwrap(),
            catalog.raw_candidate(real).unwrap(),
        ];
        let selector = SiteSelector::new(&catalog, &raw, options(1)).unwrap();
        let candidates = selector.candidates();
        assert_eq!(candidates.len(), 1);
        assert!(candidates[&mock].mock);
        assert_eq!(candidates[&mock].space_left, Capacity::Unlimited);
    }

    #[test]
    fn test_space_cap_limits_selection() {
        let (catalog, a, b, raw) = two_sites();
        limit_both(&catalog, a, b, 1000, 1000);
        catalog.set_space_cap(a, Some(100)).unwrap();
        catalog.set_occupied(a, 60).unwrap();
        catalog.set_space_cap(b, Some(-1)).unwrap();

        let mut selector = SiteSelector::new(&catalog, &raw, options(2)).unwrap();
        let candidates = selector.candidates();
        assert_eq!(candidates[&a].space_left, Capacity::Bytes(40));
        assert_eq!(candidates[&b].space_left, Capacity::Unlimited);

        assert!(matches!(
            selector.select(&SelectionRequest::new(50)),
            Err(Error::RseOverQuota { .. })
        ));
        let picks = selector
            .select(&SelectionRequest::new(50).already_present(a, 20))
            .unwrap();
        assert_eq!(picks.len(), 2);
    }

    #[test]
    fn test_same_seed_same_picks() {
        let catalog = MemoryCatalog::new();
        let raw: Vec<RawCandidate> = (0..8)
            .map(|i| {
                let id = catalog.add_site(&format!("SITE_{i}"));
                catalog.raw_candidate(id).unwrap()
            })
            .collect();
        let run = || {
            let mut selector =
                SiteSelector::new(&catalog, &raw, options(3).ignore_account_limit()).unwrap();
            (0..10)
                .map(|_| selector.select(&SelectionRequest::new(1)).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_construction_is_repeatable() {
        let (catalog, a, b, raw) = two_sites();
        limit_both(&catalog, a, b, 20, 20);
        let first = SiteSelector::new(&catalog, &raw, options(1)).unwrap().candidates();
        let second = SiteSelector::new(&catalog, &raw, options(1)).unwrap().candidates();
        assert_eq!(first, second);
    }

    fn cloud(name: &str, storage: &str, transfer: &str, access: &str) -> SiteRecord {
        SiteRecord::new(name)
            .with_attribute("cloud", "True")
            .with_attribute(Pricing::STORAGE_KEY, storage)
            .with_attribute(Pricing::TRANSFER_KEY, transfer)
            .with_attribute(Pricing::ACCESS_KEY, access)
    }

    #[test]
    fn test_cloud_two_sites() {
        let catalog = MemoryCatalog::new();
        let ids: Vec<SiteId> = [
            cloud("CLOUD_1", "0.1", "0.09", "0.01"),
            cloud("CLOUD_2", "0.11", "0.092", "0.007"),
        ]
        .into_iter()
        .map(|r| catalog.add_site_record(r))
        .collect();
        for (id, name) in ids.iter().zip(["CLOUD_1", "CLOUD_2"]) {
            catalog.set_local_limit(&account(), *id, 20).unwrap();
            catalog.set_global_limit(&account(), name, Some(20));
        }
        let raw: Vec<RawCandidate> = ids
            .iter()
            .map(|id| catalog.raw_candidate(*id).unwrap())
            .collect();

        let mut selector = SiteSelector::new(
            &catalog,
            &raw,
            options(2).with_weighting(WeightingMode::Cost),
        )
        .unwrap();
        let picks = selector.select(&SelectionRequest::new(10)).unwrap();
        assert_eq!(picks.len(), 2);
        assert_eq!(selector.candidates().len(), 2);
    }

    #[test]
    fn test_cloud_picks_cheapest_pair() {
        let catalog = MemoryCatalog::new();
        let records = [
            cloud("CLOUD_1", "0.1", "0.09", "0.01"),
            cloud("CLOUD_2", "0.11", "0.092", "0.007"),
            cloud("CLOUD_3", "0.09", "0.101", "0.004"),
            cloud("CLOUD_4", "0.095", "0.878", "0.0098"),
            cloud("CLOUD_5", "0.085", "0.891", "0.008"),
        ];
        let raw: Vec<RawCandidate> = records
            .into_iter()
            .map(|r| {
                let id = catalog.add_site_record(r);
                catalog.raw_candidate(id).unwrap()
            })
            .collect();

        let mut selector = SiteSelector::new(
            &catalog,
            &raw,
            options(2)
                .ignore_account_limit()
                .with_weighting(WeightingMode::Cost),
        )
        .unwrap();

        let expected = HashSet::from([SiteId::from_name("CLOUD_1"), SiteId::from_name("CLOUD_3")]);
        for _ in 0..20 {
            let picks = selector.select(&SelectionRequest::new(10 * GB)).unwrap();
            let ids: HashSet<SiteId> = picks.iter().map(|p| p.site_id).collect();
            assert_eq!(ids, expected);
        }
    }

    #[test]
    fn test_cloud_mode_ignores_plain_sites() {
        let catalog = MemoryCatalog::new();
        let plain = catalog.add_site("PLAIN");
        let raw = vec![catalog.raw_candidate(plain).unwrap()];
        assert!(matches!(
            SiteSelector::new(
                &catalog,
                &raw,
                options(1).with_weighting(WeightingMode::Cost)
            ),
            Err(Error::InsufficientTargetRses { available: 0, .. })
        ));
    }

    fn available_clouds() -> (MemoryCatalog, Vec<RawCandidate>) {
        let catalog = MemoryCatalog::new();
        let records = [
            cloud("C1", "0.1", "0.09", "0.01").with_attribute("availability", "0.5"),
            cloud("C2", "0.09", "0.101", "0.004").with_attribute("availability", "0.9"),
            cloud("C3", "0.11", "0.092", "0.007").with_attribute("availability", "0.99"),
            cloud("C4", "0.095", "0.878", "0.0098"),
            cloud("C5", "0.085", "0.891", "0.008"),
        ];
        let raw = records
            .into_iter()
            .map(|r| {
                let id = catalog.add_site_record(r);
                catalog.raw_candidate(id).unwrap()
            })
            .collect();
        (catalog, raw)
    }

    fn cloud_picks(selector: &mut SiteSelector) -> HashSet<SiteId> {
        selector
            .select(&SelectionRequest::new(10 * GB))
            .unwrap()
            .iter()
            .map(|p| p.site_id)
            .collect()
    }

    #[test]
    fn test_cloud_default_keeps_cheapest_despite_availability() {
        let (catalog, raw) = available_clouds();
        let mut selector = SiteSelector::new(
            &catalog,
            &raw,
            options(2)
                .ignore_account_limit()
                .with_weighting(WeightingMode::Cost),
        )
        .unwrap();
        let expected = HashSet::from([SiteId::from_name("C1"), SiteId::from_name("C2")]);
        for _ in 0..10 {
            assert_eq!(cloud_picks(&mut selector), expected);
        }
    }

    #[test]
    fn test_cloud_tolerance_trades_cost_for_availability() {
        let (catalog, raw) = available_clouds();
        let config = SelectorConfig {
            cost_swap_tolerance: 0.05,
            ..SelectorConfig::default()
        };
        let mut selector = SiteSelector::with_config(
            &catalog,
            &raw,
            options(2)
                .ignore_account_limit()
                .with_weighting(WeightingMode::Cost),
            &config,
        )
        .unwrap();
        let expected = HashSet::from([SiteId::from_name("C2"), SiteId::from_name("C3")]);
        for _ in 0..10 {
            assert_eq!(cloud_picks(&mut selector), expected);
        }

        // Without the availability scores the same slack buys nothing
        let plain = MemoryCatalog::new();
        let raw: Vec<RawCandidate> = [
            cloud("C1", "0.1", "0.09", "0.01"),
            cloud("C2", "0.09", "0.101", "0.004"),
            cloud("C3", "0.11", "0.092", "0.007"),
        ]
        .into_iter()
        .map(|r| {
            let id = plain.add_site_record(r);
            plain.raw_candidate(id).unwrap()
        })
        .collect();
        let mut selector = SiteSelector::with_config(
            &plain,
            &raw,
            options(2)
                .ignore_account_limit()
                .with_weighting(WeightingMode::Cost),
            &config,
        )
        .unwrap();
        assert_eq!(
            cloud_picks(&mut selector),
            HashSet::from([SiteId::from_name("C1"), SiteId::from_name("C2")])
        );
    }
}
