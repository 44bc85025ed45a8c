//! In-memory site catalog
//!
//! Backs the CLI and the tests. Sites and accounts are keyed by name in the
//! serialized form; site IDs are derived from names with
//! [`SiteId::from_name`], so a fixture always yields the same IDs.

use crate::catalog::{GlobalQuotaLimit, RawCandidate, SiteCatalog};
use crate::expression::{self, SiteRef};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use siteplace_common::{AccountName, Error, QuotaGroup, Result, SiteId};
use std::collections::HashMap;
use std::path::Path;

/// Stored description of one site
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub name: String,
    #[serde(default)]
    pub availability_write: Option<bool>,
    #[serde(default)]
    pub staging_area: bool,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    /// Maximum space the site may fill (None or negative = uncapped)
    #[serde(default)]
    pub space_cap: Option<i64>,
    /// Bytes currently stored on the site
    #[serde(default)]
    pub occupied: i64,
}

impl SiteRecord {
    /// Create a record with no attributes and no space cap
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add an attribute
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Mark the site as a staging area
    #[must_use]
    pub fn staging(mut self) -> Self {
        self.staging_area = true;
        self
    }
}

/// Stored limits and usage of one account
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    /// Per-site limit, keyed by site name
    #[serde(default)]
    pub local_limits: HashMap<String, i64>,
    /// Per-site usage, keyed by site name
    #[serde(default)]
    pub usage: HashMap<String, i64>,
    /// Group limit, keyed by the group's site expression
    #[serde(default)]
    pub global_limits: HashMap<String, Option<i64>>,
}

/// Serializable form of the whole catalog
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub sites: Vec<SiteRecord>,
    #[serde(default)]
    pub accounts: HashMap<String, AccountRecord>,
}

#[derive(Debug, Default)]
struct State {
    sites: Vec<SiteRecord>,
    index: HashMap<SiteId, usize>,
    accounts: HashMap<String, AccountRecord>,
}

impl State {
    fn site(&self, id: SiteId) -> Result<&SiteRecord> {
        self.index
            .get(&id)
            .map(|&i| &self.sites[i])
            .ok_or_else(|| Error::catalog(format!("unknown site {id}")))
    }

    fn site_mut(&mut self, id: SiteId) -> Result<&mut SiteRecord> {
        let i = *self
            .index
            .get(&id)
            .ok_or_else(|| Error::catalog(format!("unknown site {id}")))?;
        Ok(&mut self.sites[i])
    }

    fn upsert(&mut self, record: SiteRecord) -> SiteId {
        let id = SiteId::from_name(&record.name);
        if let Some(&i) = self.index.get(&id) {
            self.sites[i] = record;
        } else {
            self.index.insert(id, self.sites.len());
            self.sites.push(record);
        }
        id
    }

    fn evaluate(&self, expression: &str) -> Result<Vec<SiteId>> {
        let refs: Vec<SiteRef<'_>> = self
            .sites
            .iter()
            .map(|s| SiteRef {
                id: SiteId::from_name(&s.name),
                name: &s.name,
                attributes: &s.attributes,
            })
            .collect();
        expression::evaluate(expression, &refs)
    }

    fn account(&self, account: &AccountName) -> Option<&AccountRecord> {
        self.accounts.get(account.as_str())
    }

    fn account_mut(&mut self, account: &AccountName) -> &mut AccountRecord {
        self.accounts.entry(account.as_str().to_string()).or_default()
    }
}

/// Site catalog held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: RwLock<State>,
}

impl MemoryCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let mut state = State {
            accounts: snapshot.accounts,
            ..State::default()
        };
        for site in snapshot.sites {
            state.upsert(site);
        }
        Self {
            state: RwLock::new(state),
        }
    }

    /// Parse a JSON catalog fixture
    pub fn from_json(text: &str) -> Result<Self> {
        let snapshot: CatalogSnapshot =
            serde_json::from_str(text).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Load a JSON catalog fixture from disk
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::catalog(format!("reading {}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Export the catalog
    #[must_use]
    pub fn snapshot(&self) -> CatalogSnapshot {
        let state = self.state.read();
        CatalogSnapshot {
            sites: state.sites.clone(),
            accounts: state.accounts.clone(),
        }
    }

    // =========== Site Operations ===========

    /// Add a plain site and return its ID
    pub fn add_site(&self, name: &str) -> SiteId {
        self.add_site_record(SiteRecord::new(name))
    }

    /// Add or replace a site
    pub fn add_site_record(&self, record: SiteRecord) -> SiteId {
        self.state.write().upsert(record)
    }

    /// Set a site attribute
    pub fn set_attribute(&self, site: SiteId, key: &str, value: &str) -> Result<()> {
        self.state
            .write()
            .site_mut(site)?
            .attributes
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Set or clear a site's space cap
    pub fn set_space_cap(&self, site: SiteId, cap: Option<i64>) -> Result<()> {
        self.state.write().site_mut(site)?.space_cap = cap;
        Ok(())
    }

    /// Set the bytes occupied on a site
    pub fn set_occupied(&self, site: SiteId, bytes: i64) -> Result<()> {
        self.state.write().site_mut(site)?.occupied = bytes;
        Ok(())
    }

    /// Candidate record for a single site
    pub fn raw_candidate(&self, site: SiteId) -> Result<RawCandidate> {
        let state = self.state.read();
        let record = state.site(site)?;
        Ok(RawCandidate {
            availability_write: record.availability_write,
            staging_area: record.staging_area,
            ..RawCandidate::new(site, record.name.clone())
        })
    }

    // =========== Account Operations ===========

    /// Set an account attribute
    pub fn set_account_attribute(&self, account: &AccountName, key: &str, value: &str) {
        self.state
            .write()
            .account_mut(account)
            .attributes
            .insert(key.to_string(), value.to_string());
    }

    /// Grant the account the administrative attribute
    pub fn grant_admin(&self, account: &AccountName, admin_attribute: &str) {
        self.set_account_attribute(account, admin_attribute, "true");
    }

    /// Set the account's limit on one site
    pub fn set_local_limit(&self, account: &AccountName, site: SiteId, bytes: i64) -> Result<()> {
        let mut state = self.state.write();
        let name = state.site(site)?.name.clone();
        state.account_mut(account).local_limits.insert(name, bytes);
        Ok(())
    }

    /// Record additional usage by the account on one site
    pub fn increase_usage(&self, account: &AccountName, site: SiteId, bytes: i64) -> Result<()> {
        let mut state = self.state.write();
        let name = state.site(site)?.name.clone();
        *state.account_mut(account).usage.entry(name).or_default() += bytes;
        Ok(())
    }

    /// Set the account's limit on a group of sites
    pub fn set_global_limit(&self, account: &AccountName, expression: &str, bytes: Option<i64>) {
        self.state
            .write()
            .account_mut(account)
            .global_limits
            .insert(expression.to_string(), bytes);
    }
}

impl SiteCatalog for MemoryCatalog {
    fn resolve_expression(&self, expression: &str) -> Result<Vec<RawCandidate>> {
        let state = self.state.read();
        let ids = state.evaluate(expression)?;
        if ids.is_empty() {
            return Err(Error::invalid_argument(format!(
                "site expression {expression:?} resolved to an empty set"
            )));
        }
        ids.into_iter()
            .map(|id| {
                let record = state.site(id)?;
                Ok(RawCandidate {
                    availability_write: record.availability_write,
                    staging_area: record.staging_area,
                    ..RawCandidate::new(id, record.name.clone())
                })
            })
            .collect()
    }

    fn site_attributes(&self, site: SiteId) -> Result<HashMap<String, String>> {
        Ok(self.state.read().site(site)?.attributes.clone())
    }

    fn site_has_attribute(&self, site: SiteId, key: &str) -> Result<bool> {
        Ok(self.state.read().site(site)?.attributes.contains_key(key))
    }

    fn account_has_attribute(&self, account: &AccountName, key: &str) -> Result<bool> {
        Ok(self
            .state
            .read()
            .account(account)
            .is_some_and(|a| a.attributes.contains_key(key)))
    }

    fn local_quota_limit(&self, account: &AccountName, site: SiteId) -> Result<Option<i64>> {
        let state = self.state.read();
        let name = &state.site(site)?.name;
        Ok(state
            .account(account)
            .and_then(|a| a.local_limits.get(name).copied()))
    }

    fn local_usage(&self, account: &AccountName, site: SiteId) -> Result<i64> {
        let state = self.state.read();
        let name = &state.site(site)?.name;
        Ok(state
            .account(account)
            .and_then(|a| a.usage.get(name).copied())
            .unwrap_or(0))
    }

    fn global_quota_limits(
        &self,
        account: &AccountName,
    ) -> Result<HashMap<QuotaGroup, GlobalQuotaLimit>> {
        let state = self.state.read();
        let Some(record) = state.account(account) else {
            return Ok(HashMap::new());
        };
        record
            .global_limits
            .iter()
            .map(|(expression, limit)| {
                let sites = state
                    .evaluate(expression)
                    .map_err(|e| Error::catalog(format!("quota group {expression:?}: {e}")))?;
                Ok((
                    QuotaGroup::new(expression.clone()),
                    GlobalQuotaLimit {
                        limit: *limit,
                        sites,
                    },
                ))
            })
            .collect()
    }

    fn usage_per_site(&self, account: &AccountName) -> Result<HashMap<SiteId, i64>> {
        let state = self.state.read();
        let Some(record) = state.account(account) else {
            return Ok(HashMap::new());
        };
        Ok(record
            .usage
            .iter()
            .map(|(name, bytes)| (SiteId::from_name(name), *bytes))
            .collect())
    }

    fn space_cap(&self, site: SiteId) -> Result<Option<i64>> {
        Ok(self.state.read().site(site)?.space_cap)
    }

    fn occupied_space(&self, site: SiteId) -> Result<i64> {
        Ok(self.state.read().site(site)?.occupied)
    }
}
