//! Per-account domain collector
//!
//! Walks every region of the catalog for one account, lists and describes the
//! OpenSearch domains there and prices the ones eligible for extended
//! support. Rows are returned to the caller instead of being written, so the
//! coordinator can commit them together with the checkpoint.

use domain_extended_support::{
    AuditError, DomainRecord, EligibleDomainReport, NodeGroup, NormalizationTable, PricingTable,
    Region, RegionCatalog, RoleCapacity, is_extended_support_eligible, support_window,
    yearly_extended_support_cost,
};
use observability::AuditMetrics;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::providers::{DomainAccess, DomainApi, ProviderError};

/// DescribeDomains rejects requests naming more than five domains
pub const DESCRIBE_BATCH_LIMIT: usize = 5;

/// Failure that ends one account's collection
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Account {account}, region {region}: {source}")]
    Provider {
        account: String,
        region: String,
        #[source]
        source: ProviderError,
    },

    #[error("Account {account}, region {region}, domain {domain}: {source}")]
    Domain {
        account: String,
        region: String,
        domain: String,
        #[source]
        source: AuditError,
    },
}

/// Shared, read-mostly state every account task evaluates domains against
pub struct DomainCollector {
    catalog: Arc<RegionCatalog>,
    normalization: Arc<NormalizationTable>,
    pricing: Arc<PricingTable>,
}

impl DomainCollector {
    pub fn new(
        catalog: Arc<RegionCatalog>,
        normalization: Arc<NormalizationTable>,
        pricing: Arc<PricingTable>,
    ) -> Self {
        Self {
            catalog,
            normalization,
            pricing,
        }
    }

    /// Collect the eligible domains of `account` across all catalog regions.
    ///
    /// Regions the account has not enabled are skipped. Any other failure
    /// aborts the account and no rows are returned.
    pub async fn collect(
        &self,
        account: &str,
        access: &dyn DomainAccess,
    ) -> Result<Vec<EligibleDomainReport>, CollectError> {
        info!(
            account = account,
            strategy = access.strategy(),
            regions = self.catalog.len(),
            "Collecting domains"
        );

        let mut rows = Vec::new();
        for region in self.catalog.iter() {
            let provider_error = |source| CollectError::Provider {
                account: account.to_string(),
                region: region.code.clone(),
                source,
            };

            let (api, names) = match Self::list_region(access, &region.code).await {
                Ok(listed) => listed,
                Err(ProviderError::RegionNotEnabled { message, .. }) => {
                    info!(
                        account = account,
                        region = %region.code,
                        reason = %message,
                        "Region not enabled for account, skipping"
                    );
                    AuditMetrics::record_region_skipped(&region.code);
                    continue;
                }
                Err(e) => return Err(provider_error(e)),
            };

            AuditMetrics::record_region_scanned(&region.code);
            debug!(account = account, region = %region.code, count = names.len(), "Listed domains");

            for batch in names.chunks(DESCRIBE_BATCH_LIMIT) {
                let domains = api.describe_domains(batch).await.map_err(provider_error)?;
                AuditMetrics::record_domains_described(&region.code, domains.len());

                for domain in &domains {
                    if let Some(row) = self.evaluate(account, region, domain).await? {
                        rows.push(row);
                    }
                }
            }
        }

        info!(account = account, eligible = rows.len(), "Finished collecting account");
        Ok(rows)
    }

    /// Scoped client for `region` and the names of its domains
    async fn list_region(
        access: &dyn DomainAccess,
        region: &str,
    ) -> Result<(Box<dyn DomainApi>, Vec<String>), ProviderError> {
        let api = access.domain_api(region).await?;
        let names = api.list_domain_names().await?;
        Ok((api, names))
    }

    /// Price one domain, or `None` when its version is not eligible
    async fn evaluate(
        &self,
        account: &str,
        region: &Region,
        domain: &DomainRecord,
    ) -> Result<Option<EligibleDomainReport>, CollectError> {
        let Some(version) = domain.engine_version.as_deref() else {
            debug!(domain = %domain.domain_name, "Domain has no engine version, skipping");
            return Ok(None);
        };
        if !is_extended_support_eligible(version) {
            debug!(domain = %domain.domain_name, version = version, "Not eligible for extended support");
            return Ok(None);
        }

        let domain_error = |source| CollectError::Domain {
            account: account.to_string(),
            region: region.code.clone(),
            domain: domain.domain_name.clone(),
            source,
        };

        let cluster = &domain.cluster;
        let data = self.capacity(Some(&cluster.data)).await.map_err(domain_error)?;
        let dedicated_master = self
            .capacity(cluster.dedicated_master.as_ref())
            .await
            .map_err(domain_error)?;
        let ultrawarm = self.capacity(cluster.warm.as_ref()).await.map_err(domain_error)?;
        let coordinator = self.capacity(cluster.coordinator()).await.map_err(domain_error)?;

        let price_per_nih = self.pricing.price_per_nih(&region.name).map_err(domain_error)?;

        let window = support_window(version);
        if window.is_none() {
            warn!(version = version, "No support window known for version, dates reported as N/A");
        }

        let mut report = EligibleDomainReport {
            account_id: account.to_string(),
            region: region.code.clone(),
            region_name: region.name.clone(),
            domain_name: domain.domain_name.clone(),
            arn: domain.arn.clone(),
            engine_version: version.to_string(),
            dedicated_master,
            data,
            ultrawarm,
            coordinator,
            price_per_nih,
            end_of_standard_support: window.map(|w| w.end_of_standard_support),
            end_of_extended_support: window.map(|w| w.end_of_extended_support),
            yearly_cost: 0.0,
        };
        report.yearly_cost = yearly_extended_support_cost(report.normalized_capacity(), price_per_nih);

        AuditMetrics::record_eligible_domain(version, report.yearly_cost);
        info!(
            account = account,
            region = %region.code,
            domain = %report.domain_name,
            version = version,
            yearly_cost = report.yearly_cost,
            "Domain eligible for extended support"
        );

        Ok(Some(report))
    }

    /// Resolve a node role. Only roles with nodes are looked up; an empty
    /// group keeps its instance type with factor 0.
    async fn capacity(&self, group: Option<&NodeGroup>) -> Result<RoleCapacity, AuditError> {
        match group {
            Some(group) if group.count > 0 => {
                let factor = self.normalization.factor_for(&group.instance_type).await?;
                Ok(RoleCapacity::new(&group.instance_type, group.count, factor))
            }
            Some(group) => Ok(RoleCapacity::new(&group.instance_type, 0, 0.0)),
            None => Ok(RoleCapacity::absent()),
        }
    }
}
