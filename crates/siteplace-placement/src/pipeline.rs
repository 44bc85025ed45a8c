//! Selection request and the stages shared by every strategy
//!
//! A request is narrowed in four fail-fast stages (blocklist, space, local
//! quota, group quota) before any pick is made. The commit loop then draws
//! one site per copy, honouring preferred sites.

use crate::candidate::CandidateSite;
use crate::draw::choose_weighted;
use crate::ledger::QuotaLedger;
use rand::RngCore;
use siteplace_common::{Error, Result, SiteId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// One `select` invocation
#[derive(Clone, Debug, Default)]
pub struct SelectionRequest {
    /// Bytes to place on every chosen site
    pub size: u64,
    /// Preferred sites, most preferred first
    pub preferred: Vec<SiteId>,
    /// Copy count override (None = the selector's default)
    pub copies: Option<usize>,
    /// Sites that must not be chosen
    pub blocklist: HashSet<SiteId>,
    /// Take the first eligible preferred site instead of drawing by weight
    pub prioritize_order: bool,
    /// Bytes of this data already present per site
    pub already_present: HashMap<SiteId, u64>,
}

impl SelectionRequest {
    /// Create a request for `size` bytes
    #[must_use]
    pub fn new(size: u64) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Set the preferred sites
    #[must_use]
    pub fn prefer(mut self, sites: impl IntoIterator<Item = SiteId>) -> Self {
        self.preferred = sites.into_iter().collect();
        self
    }

    /// Override the copy count
    #[must_use]
    pub const fn copies(mut self, copies: usize) -> Self {
        self.copies = Some(copies);
        self
    }

    /// Exclude sites
    #[must_use]
    pub fn block(mut self, sites: impl IntoIterator<Item = SiteId>) -> Self {
        self.blocklist.extend(sites);
        self
    }

    /// Prefer list order over weights
    #[must_use]
    pub const fn prioritize_order(mut self) -> Self {
        self.prioritize_order = true;
        self
    }

    /// Record bytes already present on a site
    #[must_use]
    pub fn already_present(mut self, site: SiteId, bytes: u64) -> Self {
        self.already_present.insert(site, bytes);
        self
    }
}

/// Narrow `sites` to the ones that can take `request.size` bytes.
///
/// Fails as soon as a stage leaves fewer than `count` sites.
pub fn eligible<'a>(
    sites: &'a [CandidateSite],
    ledger: &QuotaLedger,
    request: &SelectionRequest,
    count: usize,
) -> Result<Vec<&'a CandidateSite>> {
    let size = request.size;

    let pool: Vec<&CandidateSite> = sites
        .iter()
        .filter(|s| !request.blocklist.contains(&s.id))
        .collect();
    if pool.len() < count {
        return Err(Error::InsufficientTargetRses {
            available: pool.len(),
            required: count,
        });
    }

    let pool: Vec<&CandidateSite> = pool
        .into_iter()
        .filter(|s| {
            let present = request.already_present.get(&s.id).copied().unwrap_or(0);
            ledger
                .get(s.id)
                .is_some_and(|e| e.has_space_for(size, present))
        })
        .collect();
    if pool.len() < count {
        return Err(Error::RseOverQuota {
            available: pool.len(),
            required: count,
        });
    }

    let pool: Vec<&CandidateSite> = pool
        .into_iter()
        .filter(|s| ledger.get(s.id).is_some_and(|e| e.has_quota_for(size)))
        .collect();
    if pool.len() < count {
        return Err(Error::InsufficientAccountLimit {
            available: pool.len(),
            required: count,
        });
    }

    let pool: Vec<&CandidateSite> = pool
        .into_iter()
        .filter(|s| {
            ledger
                .get(s.id)
                .is_some_and(|e| e.has_group_quota_for(size))
        })
        .collect();
    if pool.len() < count {
        return Err(Error::InsufficientAccountLimit {
            available: pool.len(),
            required: count,
        });
    }

    debug!(
        "{} of {} candidates eligible for {} bytes",
        pool.len(),
        sites.len(),
        size
    );
    Ok(pool)
}

/// Pick `count` distinct sites from `pool`.
///
/// Each round considers the sites not yet picked. Preferred sites win: the
/// first one outright when `prioritize_order` is set, otherwise a weighted
/// draw among them. Without preferred sites the draw covers `planned`
/// sites when given (falling back to the whole pool once none remain).
pub fn commit_loop<'a>(
    rng: &mut dyn RngCore,
    pool: &[&'a CandidateSite],
    planned: Option<&[SiteId]>,
    request: &SelectionRequest,
    count: usize,
) -> Result<Vec<&'a CandidateSite>> {
    let mut chosen: Vec<&CandidateSite> = Vec::with_capacity(count);

    for _ in 0..count {
        let remaining: Vec<&CandidateSite> = pool
            .iter()
            .copied()
            .filter(|s| !chosen.iter().any(|c| c.id == s.id))
            .collect();

        let mut preferred: Vec<&CandidateSite> = request
            .preferred
            .iter()
            .filter_map(|id| remaining.iter().copied().find(|s| s.id == *id))
            .collect();

        let site = if request.prioritize_order && !preferred.is_empty() {
            preferred[0]
        } else if !preferred.is_empty() {
            choose_weighted(rng, &mut preferred)?
        } else {
            let mut planned_left: Vec<&CandidateSite> = planned
                .map(|plan| {
                    remaining
                        .iter()
                        .copied()
                        .filter(|s| plan.contains(&s.id))
                        .collect()
                })
                .unwrap_or_default();
            if planned_left.is_empty() {
                let mut remaining = remaining;
                choose_weighted(rng, &mut remaining)?
            } else {
                choose_weighted(rng, &mut planned_left)?
            }
        };

        chosen.push(site);
    }

    Ok(chosen)
}
