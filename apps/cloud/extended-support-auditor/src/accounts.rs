//! Account pool and region list resolution, plus the plain list files the
//! CLI reads and exports.

use domain_extended_support::{AccountId, AuditError, RegionCatalog};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::providers::{CallerIdentity, OrganizationApi, ProviderError};

#[derive(Error, Debug)]
pub enum AccountsError {
    #[error("Failed to read or write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Accounts not in the organization: {}", .0.join(", "))]
    NotInOrganization(Vec<AccountId>),

    #[error("No accounts to audit")]
    EmptyPool,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Region(#[from] AuditError),
}

/// Which accounts a scan covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountSelection {
    /// Only the caller's own account
    Caller,
    /// An explicit list, each validated against the organization
    Explicit(Vec<AccountId>),
    /// Every active organization account except `exclude`
    Organization { exclude: Vec<AccountId> },
}

/// Split a comma/newline separated list, dropping blanks and `#` comments
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Remove duplicates, keeping the first occurrence
pub fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Read a list file (account ids or region codes)
pub fn read_list_file(path: &Path) -> Result<Vec<String>, AccountsError> {
    let raw = std::fs::read_to_string(path).map_err(|source| AccountsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_list(&raw))
}

/// Write one entry per line, creating the parent directory
pub fn write_lines<I, S>(path: &Path, lines: I) -> Result<usize, AccountsError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let io_error = |source| AccountsError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }

    let mut written = 0;
    let mut content = String::new();
    for line in lines {
        content.push_str(line.as_ref());
        content.push('\n');
        written += 1;
    }
    std::fs::write(path, content).map_err(io_error)?;

    info!(path = %path.display(), count = written, "Wrote list file");
    Ok(written)
}

/// Region catalog restricted to a regions file, or the full catalog
pub fn resolve_regions(regions_file: Option<&Path>) -> Result<RegionCatalog, AccountsError> {
    let catalog = RegionCatalog::builtin();
    let Some(path) = regions_file else {
        info!(count = catalog.len(), "Using all OpenSearch regions");
        return Ok(catalog);
    };

    let codes = read_list_file(path)?;
    let restricted = catalog.restrict_to(&codes)?;
    info!(
        path = %path.display(),
        count = restricted.len(),
        "Restricted regions from file"
    );
    Ok(restricted)
}

/// Turn a selection into the ordered, de-duplicated account pool
pub async fn resolve_pool(
    api: &dyn OrganizationApi,
    caller: &CallerIdentity,
    selection: AccountSelection,
) -> Result<Vec<AccountId>, AccountsError> {
    let pool = match selection {
        AccountSelection::Caller => vec![caller.account_id.clone()],

        AccountSelection::Explicit(accounts) => {
            let accounts = dedup(accounts);
            let members: HashSet<AccountId> = api.list_active_accounts().await?.into_iter().collect();

            let unknown: Vec<AccountId> = accounts
                .iter()
                .filter(|a| **a != caller.account_id && !members.contains(*a))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                return Err(AccountsError::NotInOrganization(unknown));
            }
            accounts
        }

        AccountSelection::Organization { exclude } => {
            let members = dedup(api.list_active_accounts().await?);
            let exclude: HashSet<AccountId> = exclude.into_iter().collect();

            for account in exclude.iter().filter(|a| !members.contains(*a)) {
                warn!(account = %account, "Excluded account is not an active organization member");
            }

            members
                .into_iter()
                .filter(|a| !exclude.contains(a))
                .collect()
        }
    };

    if pool.is_empty() {
        return Err(AccountsError::EmptyPool);
    }

    info!(count = pool.len(), "Resolved account pool");
    Ok(pool)
}
