//! Cost-weighted selection for cost-bearing sites
//!
//! A site's weight is the inverse of what storing, transferring and reading
//! the data there would cost. Before drawing, a local search builds a
//! placement plan from the cheapest sites and swaps in better-available
//! ones as long as the total cost does not rise above the cheapest plan's.
//! A relative slack on that bound can be configured.
//!
//! # Cost model
//! ```text
//! cost(s, z) = z * storage(s) + z * transfer(s) + read_frequency * access(s)
//! weight(s)  = 1 / cost(s, z)
//! ```
//! with `z` the request size in GiB.

use crate::candidate::{CandidateSite, Pricing, SitePick};
use crate::catalog::{RawCandidate, SiteCatalog};
use crate::expression::is_true;
use crate::ledger::QuotaLedger;
use crate::pipeline::{SelectionRequest, commit_loop, eligible};
use crate::strategy::SelectionStrategy;
use rand::RngCore;
use siteplace_common::{Error, Result, SelectorConfig, SiteId};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

const BYTES_PER_GB: f64 = 1_073_741_824.0;

/// Cost and availability of one eligible site
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PricedSite {
    pub id: SiteId,
    pub cost: f64,
    pub availability: f64,
}

/// Choose `count` sites, starting from the cheapest and swapping in
/// better-available ones while the total cost stays within
/// `min_total * (1 + tolerance)`.
///
/// Plan positions are visited by ascending availability and each is
/// offered the cheapest unused site. The search ends at the first position
/// where that swap does not raise availability within budget. Swapped-out
/// sites are not reconsidered.
#[must_use]
pub fn heuristic_placement(sites: &[PricedSite], count: usize, tolerance: f64) -> Vec<SiteId> {
    let mut sorted = sites.to_vec();
    sorted.sort_by(|a, b| a.cost.total_cmp(&b.cost));

    let count = count.min(sorted.len());
    let mut complement: VecDeque<PricedSite> = sorted.split_off(count).into();
    let mut working = sorted;
    if working.is_empty() {
        return Vec::new();
    }

    let mut total: f64 = working.iter().map(|s| s.cost).sum();
    let mut min_total = total;

    'search: loop {
        let mut order: Vec<usize> = (0..working.len()).collect();
        order.sort_by(|&a, &b| working[a].availability.total_cmp(&working[b].availability));

        for pos in order {
            let Some(&candidate) = complement.front() else {
                break 'search;
            };
            let swapped_total = total - working[pos].cost + candidate.cost;
            let better = candidate.availability > working[pos].availability;
            if !better || swapped_total > min_total * (1.0 + tolerance) {
                break 'search;
            }

            debug!(
                "swapping {} for {} (availability {} -> {})",
                working[pos].id, candidate.id, working[pos].availability, candidate.availability
            );
            working[pos] = candidate;
            complement.pop_front();
            total = swapped_total;
            min_total = min_total.min(total);
        }
    }

    working.into_iter().map(|s| s.id).collect()
}

/// Selector drawing by inverse monetary cost
#[derive(Clone, Debug)]
pub struct CostStrategy {
    token: String,
    mock_attribute: String,
    availability_attribute: String,
    tolerance: f64,
    read_frequency: f64,
}

impl CostStrategy {
    /// Create a cost strategy from configuration
    #[must_use]
    pub fn new(config: &SelectorConfig) -> Self {
        Self {
            token: config.cost_token.clone(),
            mock_attribute: config.mock_attribute.clone(),
            availability_attribute: config.availability_attribute.clone(),
            tolerance: config.cost_swap_tolerance,
            read_frequency: config.read_frequency,
        }
    }

    /// Cost of placing `size` bytes on a site
    #[must_use]
    pub fn cost(&self, pricing: &Pricing, size: u64) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let gb = size as f64 / BYTES_PER_GB;
        gb.mul_add(
            pricing.storage_cost_per_gb,
            gb * pricing.data_transfer_cost_per_gb,
        ) + self.read_frequency * pricing.data_access_cost_per_gb
    }

    fn numeric(
        raw: &RawCandidate,
        attributes: &HashMap<String, String>,
        key: &str,
    ) -> Result<Option<f64>> {
        let Some(value) = attributes.get(key) else {
            return Ok(None);
        };
        value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(Some)
            .ok_or_else(|| Error::InvalidRuleWeight {
                site: raw.name.clone(),
                attribute: key.to_string(),
                value: value.clone(),
            })
    }

    fn shape(&self, catalog: &dyn SiteCatalog, raw: &RawCandidate) -> Result<Option<CandidateSite>> {
        let attributes = catalog.site_attributes(raw.id)?;
        if !attributes.contains_key(&self.token) {
            debug!("site {} is not cost-bearing, ignored", raw.name);
            return Ok(None);
        }

        let storage = Self::numeric(raw, &attributes, Pricing::STORAGE_KEY)?;
        let transfer = Self::numeric(raw, &attributes, Pricing::TRANSFER_KEY)?;
        let access = Self::numeric(raw, &attributes, Pricing::ACCESS_KEY)?;
        let (Some(storage), Some(transfer), Some(access)) = (storage, transfer, access) else {
            debug!("site {} lacks price attributes, ignored", raw.name);
            return Ok(None);
        };
        let pricing = Pricing {
            storage_cost_per_gb: storage,
            data_transfer_cost_per_gb: transfer,
            data_access_cost_per_gb: access,
        };

        let availability =
            Self::numeric(raw, &attributes, &self.availability_attribute)?.unwrap_or(1.0);
        let base_cost = self.cost(&pricing, 0);

        Ok(Some(CandidateSite {
            id: raw.id,
            name: raw.name.clone(),
            weight: if base_cost > 0.0 { base_cost.recip() } else { 0.0 },
            mock: attributes
                .get(&self.mock_attribute)
                .is_some_and(|v| is_true(v)),
            availability_write: raw.writable(),
            staging_area: raw.staging_area,
            pricing: Some(pricing),
            availability,
        }))
    }
}

impl SelectionStrategy for CostStrategy {
    fn filter_invalid(
        &self,
        catalog: &dyn SiteCatalog,
        raw: &[RawCandidate],
    ) -> Result<Vec<CandidateSite>> {
        let mut sites = Vec::with_capacity(raw.len());
        for candidate in raw {
            if let Some(site) = self.shape(catalog, candidate)? {
                sites.push(site);
            }
        }
        Ok(sites)
    }

    fn select(
        &self,
        sites: &[CandidateSite],
        ledger: &QuotaLedger,
        request: &SelectionRequest,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<SitePick>> {
        let pool = eligible(sites, ledger, request, count)?;

        let mut priced = Vec::with_capacity(pool.len());
        let mut reweighted = Vec::with_capacity(pool.len());
        for site in pool {
            let pricing = site.pricing.as_ref().ok_or_else(|| {
                Error::no_eligible(format!("site {} has no price coefficients", site.name))
            })?;
            let cost = self.cost(pricing, request.size);
            if !(cost.is_finite() && cost > 0.0) {
                warn!("site {} has degenerate cost {}", site.name, cost);
                return Err(Error::no_eligible(format!(
                    "site {} has degenerate cost {cost}",
                    site.name
                )));
            }
            priced.push(PricedSite {
                id: site.id,
                cost,
                availability: site.availability,
            });
            reweighted.push(CandidateSite {
                weight: cost.recip(),
                ..site.clone()
            });
        }

        let plan = heuristic_placement(&priced, count, self.tolerance);
        debug!("cost plan for {} bytes: {:?}", request.size, plan);

        let refs: Vec<&CandidateSite> = reweighted.iter().collect();
        let chosen = commit_loop(rng, &refs, Some(&plan), request, count)?;
        Ok(chosen.into_iter().map(CandidateSite::pick).collect())
    }
}
