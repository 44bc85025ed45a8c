//! Selection strategies
//!
//! A strategy decides which raw candidates survive attribute filtering and
//! how the survivors are weighted when a copy is drawn.

use crate::candidate::{CandidateSite, SitePick, WeightingMode};
use crate::catalog::{RawCandidate, SiteCatalog};
use crate::cost::CostStrategy;
use crate::ledger::QuotaLedger;
use crate::pipeline::SelectionRequest;
use crate::weighted::WeightedStrategy;
use rand::RngCore;
use siteplace_common::{Result, SelectorConfig};

/// Weighting behaviour plugged into a selector
pub trait SelectionStrategy {
    /// Shape raw candidates into weighted sites, dropping those the
    /// strategy cannot use
    fn filter_invalid(
        &self,
        catalog: &dyn SiteCatalog,
        raw: &[RawCandidate],
    ) -> Result<Vec<CandidateSite>>;

    /// Pick `count` distinct sites for one request.
    ///
    /// Must not modify the ledger; the caller commits the picks.
    fn select(
        &self,
        sites: &[CandidateSite],
        ledger: &QuotaLedger,
        request: &SelectionRequest,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<SitePick>>;
}

/// The strategy a selector was configured with
#[derive(Clone, Debug)]
pub enum Strategy {
    Weighted(WeightedStrategy),
    Cost(CostStrategy),
}

impl Strategy {
    /// Build the strategy for a weighting mode
    #[must_use]
    pub fn for_mode(mode: &WeightingMode, config: &SelectorConfig) -> Self {
        match mode {
            WeightingMode::Uniform => {
                Self::Weighted(WeightedStrategy::uniform(config.mock_attribute.clone()))
            }
            WeightingMode::Attribute(attribute) => Self::Weighted(WeightedStrategy::attribute(
                attribute.clone(),
                config.mock_attribute.clone(),
            )),
            WeightingMode::Cost => Self::Cost(CostStrategy::new(config)),
        }
    }

    /// Whether picks are weighted by cost
    #[must_use]
    pub const fn is_cost(&self) -> bool {
        matches!(self, Self::Cost(_))
    }
}

impl SelectionStrategy for Strategy {
    fn filter_invalid(
        &self,
        catalog: &dyn SiteCatalog,
        raw: &[RawCandidate],
    ) -> Result<Vec<CandidateSite>> {
        match self {
            Self::Weighted(s) => s.filter_invalid(catalog, raw),
            Self::Cost(s) => s.filter_invalid(catalog, raw),
        }
    }

    fn select(
        &self,
        sites: &[CandidateSite],
        ledger: &QuotaLedger,
        request: &SelectionRequest,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<SitePick>> {
        match self {
            Self::Weighted(s) => s.select(sites, ledger, request, count, rng),
            Self::Cost(s) => s.select(sites, ledger, request, count, rng),
        }
    }
}
