//! Name-based placement in one call
//!
//! Resolves a site expression, builds a selector and runs a single
//! selection, translating between site names and IDs on both ends.

use crate::candidate::WeightingMode;
use crate::catalog::SiteCatalog;
use crate::pipeline::SelectionRequest;
use crate::selector::{SelectorOptions, SiteSelector};
use serde::{Deserialize, Serialize};
use siteplace_common::{AccountName, Result, SelectorConfig, SiteId};
use std::collections::HashMap;
use tracing::debug;

/// Parameters of a name-based placement
#[derive(Clone, Debug)]
pub struct ResolveOptions {
    pub account: AccountName,
    /// Weighting token (None = uniform, the cost token = cost mode)
    pub weight: Option<String>,
    pub copies: usize,
    pub size: u64,
    /// Preferred site names, most preferred first
    pub preferred: Vec<String>,
    /// Site names to exclude
    pub blocklist: Vec<String>,
    /// Bytes of this data already stored, by site name
    pub already_present: Vec<(String, u64)>,
    pub prioritize_order: bool,
    pub ignore_account_limit: bool,
    pub seed: Option<u64>,
}

impl ResolveOptions {
    /// One copy of zero bytes, uniform weights
    #[must_use]
    pub fn new(account: impl Into<AccountName>) -> Self {
        Self {
            account: account.into(),
            weight: None,
            copies: 1,
            size: 0,
            preferred: Vec::new(),
            blocklist: Vec::new(),
            already_present: Vec::new(),
            prioritize_order: false,
            ignore_account_limit: false,
            seed: None,
        }
    }
}

/// Outcome of a name-based placement
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Chosen site names in commit order
    pub sites: Vec<String>,
    /// Preferred names that matched no candidate, sorted
    pub preferred_unmatched: Vec<String>,
}

/// Resolve `expression` and place one request using the default configuration
pub fn resolve_expression(
    catalog: &dyn SiteCatalog,
    expression: &str,
    options: ResolveOptions,
) -> Result<Resolution> {
    resolve_expression_with_config(catalog, expression, options, &SelectorConfig::default())
}

/// Resolve `expression` and place one request
pub fn resolve_expression_with_config(
    catalog: &dyn SiteCatalog,
    expression: &str,
    options: ResolveOptions,
    config: &SelectorConfig,
) -> Result<Resolution> {
    let raw = catalog.resolve_expression(expression)?;
    let by_name: HashMap<&str, SiteId> = raw.iter().map(|c| (c.name.as_str(), c.id)).collect();

    let mut preferred = Vec::with_capacity(options.preferred.len());
    let mut preferred_unmatched = Vec::new();
    for name in &options.preferred {
        match by_name.get(name.as_str()) {
            Some(id) => preferred.push(*id),
            None => preferred_unmatched.push(name.clone()),
        }
    }
    preferred_unmatched.sort();
    preferred_unmatched.dedup();

    let blocked: Vec<SiteId> = options
        .blocklist
        .iter()
        .filter_map(|name| by_name.get(name.as_str()).copied())
        .collect();

    let mut selector_options = SelectorOptions::new(options.account, options.copies)
        .with_weighting(WeightingMode::from_token(
            options.weight.as_deref(),
            &config.cost_token,
        ));
    if options.ignore_account_limit {
        selector_options = selector_options.ignore_account_limit();
    }
    if let Some(seed) = options.seed {
        selector_options = selector_options.with_seed(seed);
    }
    let mut selector = SiteSelector::with_config(catalog, &raw, selector_options, config)?;

    let mut request = SelectionRequest::new(options.size)
        .prefer(preferred)
        .block(blocked);
    for (name, bytes) in &options.already_present {
        if let Some(id) = by_name.get(name.as_str()) {
            request = request.already_present(*id, *bytes);
        }
    }
    if options.prioritize_order {
        request = request.prioritize_order();
    }
    let picks = selector.select(&request)?;

    let names: HashMap<SiteId, &str> = raw.iter().map(|c| (c.id, c.name.as_str())).collect();
    let sites: Vec<String> = picks
        .iter()
        .filter_map(|p| names.get(&p.site_id).map(|n| (*n).to_string()))
        .collect();
    debug!("expression {:?} resolved to {:?}", expression, sites);

    Ok(Resolution {
        sites,
        preferred_unmatched,
    })
}
