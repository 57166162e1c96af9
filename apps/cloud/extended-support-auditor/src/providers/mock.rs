//! In-memory provider for collector and coordinator tests
//!
//! Each (account, region) pair holds a fixed state. Describe batches, the
//! accounts that were accessed and the peak number of accounts being
//! accessed at once are recorded for assertions.

use async_trait::async_trait;
use domain_extended_support::{AccountId, DomainRecord};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{AccessResolver, DomainAccess, DomainApi, ProviderError, ProviderResult};

/// What a region looks like for one account
#[derive(Debug, Clone)]
pub enum RegionState {
    Domains(Vec<DomainRecord>),
    NotEnabled,
    ListFails(String),
}

#[derive(Default)]
pub struct InMemoryCloud {
    regions: HashMap<(AccountId, String), RegionState>,
    describe_batches: Mutex<Vec<Vec<String>>>,
    accessed_accounts: Mutex<Vec<AccountId>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl InMemoryCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, account: &str, region: &str, state: RegionState) -> Self {
        self.regions
            .insert((account.to_string(), region.to_string()), state);
        self
    }

    /// Domain names of every DescribeDomains call, in call order
    pub fn describe_batches(&self) -> Vec<Vec<String>> {
        self.describe_batches.lock().unwrap().clone()
    }

    /// Most accounts holding an access handle at the same time
    pub fn peak_accounts_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn accessed_accounts(&self) -> Vec<AccountId> {
        let mut accounts = self.accessed_accounts.lock().unwrap().clone();
        accounts.sort();
        accounts
    }

    fn state(&self, account: &str, region: &str) -> RegionState {
        self.regions
            .get(&(account.to_string(), region.to_string()))
            .cloned()
            .unwrap_or(RegionState::Domains(Vec::new()))
    }
}

/// Resolver handing out in-memory access for any account
pub struct InMemoryResolver {
    cloud: Arc<InMemoryCloud>,
}

impl InMemoryResolver {
    pub fn new(cloud: Arc<InMemoryCloud>) -> Self {
        Self { cloud }
    }
}

impl AccessResolver for InMemoryResolver {
    fn access_for(&self, account: &str) -> Arc<dyn DomainAccess> {
        self.cloud
            .accessed_accounts
            .lock()
            .unwrap()
            .push(account.to_string());
        Arc::new(InMemoryAccess::new(Arc::clone(&self.cloud), account))
    }
}

pub struct InMemoryAccess {
    cloud: Arc<InMemoryCloud>,
    account: AccountId,
}

impl InMemoryAccess {
    pub fn new(cloud: Arc<InMemoryCloud>, account: &str) -> Self {
        let in_flight = cloud.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        cloud.peak_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        Self {
            cloud,
            account: account.to_string(),
        }
    }
}

impl Drop for InMemoryAccess {
    fn drop(&mut self) {
        self.cloud.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DomainAccess for InMemoryAccess {
    fn strategy(&self) -> &'static str {
        "in-memory"
    }

    async fn domain_api(&self, region: &str) -> ProviderResult<Box<dyn DomainApi>> {
        // Stand-in for credential latency so account tasks overlap
        tokio::time::sleep(Duration::from_millis(2)).await;
        Ok(Box::new(InMemoryDomainApi {
            cloud: Arc::clone(&self.cloud),
            region: region.to_string(),
            state: self.cloud.state(&self.account, region),
        }))
    }
}

struct InMemoryDomainApi {
    cloud: Arc<InMemoryCloud>,
    region: String,
    state: RegionState,
}

#[async_trait]
impl DomainApi for InMemoryDomainApi {
    async fn list_domain_names(&self) -> ProviderResult<Vec<String>> {
        match &self.state {
            RegionState::Domains(domains) => {
                Ok(domains.iter().map(|d| d.domain_name.clone()).collect())
            }
            RegionState::NotEnabled => Err(ProviderError::RegionNotEnabled {
                region: self.region.clone(),
                message: "UnrecognizedClientException: The security token included in the request is invalid".to_string(),
            }),
            RegionState::ListFails(message) => Err(ProviderError::Api {
                operation: "ListDomainNames",
                message: message.clone(),
            }),
        }
    }

    async fn describe_domains(&self, names: &[String]) -> ProviderResult<Vec<DomainRecord>> {
        if names.len() > 5 {
            return Err(ProviderError::Api {
                operation: "DescribeDomains",
                message: format!("ValidationException: {} domain names, at most 5 allowed", names.len()),
            });
        }
        self.cloud.describe_batches.lock().unwrap().push(names.to_vec());

        let RegionState::Domains(domains) = &self.state else {
            return Ok(Vec::new());
        };
        Ok(domains
            .iter()
            .filter(|d| names.contains(&d.domain_name))
            .cloned()
            .collect())
    }
}
