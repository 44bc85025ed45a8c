//! Attribute-weighted selection
//!
//! Uniform mode gives every candidate weight 1. Attribute mode keeps only
//! the candidates carrying the named attribute and uses its numeric value
//! as the weight.

use crate::candidate::{CandidateSite, SitePick};
use crate::catalog::{RawCandidate, SiteCatalog};
use crate::expression::is_true;
use crate::ledger::QuotaLedger;
use crate::pipeline::{SelectionRequest, commit_loop, eligible};
use crate::strategy::SelectionStrategy;
use rand::RngCore;
use siteplace_common::{Error, Result};
use tracing::debug;

/// Selector drawing by a fixed per-site weight
#[derive(Clone, Debug)]
pub struct WeightedStrategy {
    /// Weight attribute (None = uniform weights)
    attribute: Option<String>,
    mock_attribute: String,
}

impl WeightedStrategy {
    /// Every site weighs 1
    #[must_use]
    pub fn uniform(mock_attribute: impl Into<String>) -> Self {
        Self {
            attribute: None,
            mock_attribute: mock_attribute.into(),
        }
    }

    /// Weight read from `attribute`
    #[must_use]
    pub fn attribute(attribute: impl Into<String>, mock_attribute: impl Into<String>) -> Self {
        Self {
            attribute: Some(attribute.into()),
            mock_attribute: mock_attribute.into(),
        }
    }

    fn shape_attribute(
        &self,
        catalog: &dyn SiteCatalog,
        raw: &RawCandidate,
        attribute: &str,
    ) -> Result<Option<CandidateSite>> {
        let attributes = catalog.site_attributes(raw.id)?;
        let Some(value) = attributes.get(attribute) else {
            return Ok(None);
        };

        let weight = value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|w| w.is_finite() && *w >= 0.0)
            .ok_or_else(|| Error::InvalidRuleWeight {
                site: raw.name.clone(),
                attribute: attribute.to_string(),
                value: value.clone(),
            })?;

        Ok(Some(CandidateSite {
            id: raw.id,
            name: raw.name.clone(),
            weight,
            mock: attributes
                .get(&self.mock_attribute)
                .is_some_and(|v| is_true(v)),
            availability_write: raw.writable(),
            staging_area: raw.staging_area,
            pricing: None,
            availability: 1.0,
        }))
    }
}

impl SelectionStrategy for WeightedStrategy {
    fn filter_invalid(
        &self,
        catalog: &dyn SiteCatalog,
        raw: &[RawCandidate],
    ) -> Result<Vec<CandidateSite>> {
        let mut sites = Vec::with_capacity(raw.len());
        for candidate in raw {
            match &self.attribute {
                Some(attribute) => {
                    if let Some(site) = self.shape_attribute(catalog, candidate, attribute)? {
                        sites.push(site);
                    } else {
                        debug!("site {} has no weight '{}', ignored", candidate.name, attribute);
                    }
                }
                None => sites.push(CandidateSite {
                    id: candidate.id,
                    name: candidate.name.clone(),
                    weight: 1.0,
                    mock: catalog.site_has_attribute(candidate.id, &self.mock_attribute)?,
                    availability_write: candidate.writable(),
                    staging_area: candidate.staging_area,
                    pricing: None,
                    availability: 1.0,
                }),
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
        let chosen = commit_loop(rng, &pool, None, request, count)?;
        Ok(chosen.into_iter().map(CandidateSite::pick).collect())
    }
}
