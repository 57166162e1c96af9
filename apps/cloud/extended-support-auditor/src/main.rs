//! Extended Support Auditor
//!
//! Inventories OpenSearch and Elasticsearch domains across an AWS
//! Organization, finds the ones running versions billed for extended
//! support and writes their projected yearly cost to a CSV report.
//! Interrupted scans resume from a checkpoint of completed accounts.

use chrono::Local;
use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_extended_support::{
    BuiltinNormalizationSource, CsvReportSink, JsonFileCheckpointStore, JsonFileNormalizationSource,
    NormalizationSource, NormalizationTable, PricingTable, RunLedger, format_usd,
};
use eyre::{Result, WrapErr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

mod accounts;
mod collector;
mod config;
mod coordinator;
mod organization;
mod providers;

use accounts::AccountSelection;
use collector::DomainCollector;
use config::Config;
use coordinator::Coordinator;
use providers::AwsProviders;

#[derive(Parser)]
#[command(name = "extended-support-auditor")]
#[command(about = "Find OpenSearch domains billed for extended support and estimate the yearly cost")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan accounts and write the extended support report
    Scan {
        /// Account ids to scan, comma separated
        #[arg(long, value_delimiter = ',', conflicts_with_all = ["accounts_file", "all"])]
        accounts: Option<Vec<String>>,

        /// File of account ids, one per line or comma separated
        #[arg(long, conflicts_with = "all")]
        accounts_file: Option<PathBuf>,

        /// Scan every active account of the organization
        #[arg(long)]
        all: bool,

        /// Accounts to leave out of --all, comma separated
        #[arg(long, value_delimiter = ',', requires = "all")]
        exclude_accounts: Vec<String>,

        /// File of region codes to scan. Defaults to every OpenSearch region.
        #[arg(long)]
        regions_file: Option<PathBuf>,

        /// JSON file of instance size -> normalization factor
        #[arg(long)]
        instance_mapping_file: Option<PathBuf>,

        /// JSON file of region name -> price per normalized instance hour
        #[arg(long)]
        pricing_file: Option<PathBuf>,

        /// Report path. Defaults to a timestamped file in OUTPUT_DIR.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the organization's active account ids to a file
    ExportAccounts {
        #[arg(long, default_value = "accounts.csv")]
        path: PathBuf,
    },

    /// Write the region catalog to a file
    ExportRegions {
        /// Restrict the catalog to the regions in this file
        #[arg(long)]
        regions_file: Option<PathBuf>,

        #[arg(long, default_value = "regions.csv")]
        path: PathBuf,
    },
}

struct ScanArgs {
    selection: AccountSelection,
    regions_file: Option<PathBuf>,
    instance_mapping_file: Option<PathBuf>,
    pricing_file: Option<PathBuf>,
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    // Initialize metrics
    observability::init_metrics();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scan {
            accounts,
            accounts_file,
            all,
            exclude_accounts,
            regions_file,
            instance_mapping_file,
            pricing_file,
            output,
        } => {
            let selection = if all {
                AccountSelection::Organization {
                    exclude: accounts::dedup(exclude_accounts),
                }
            } else if let Some(accounts) = accounts {
                AccountSelection::Explicit(accounts::parse_list(&accounts.join(",")))
            } else if let Some(path) = accounts_file {
                AccountSelection::Explicit(accounts::read_list_file(&path)?)
            } else {
                AccountSelection::Caller
            };

            scan(
                &config,
                ScanArgs {
                    selection,
                    regions_file,
                    instance_mapping_file,
                    pricing_file,
                    output,
                },
            )
            .await
        }

        Commands::ExportAccounts { path } => export_accounts(&config, &path).await,

        Commands::ExportRegions { regions_file, path } => {
            export_regions(regions_file.as_deref(), &path)
        }
    };

    if let Some(path) = &config.metrics_file {
        if let Err(e) = observability::write_snapshot(path) {
            warn!(path = %path.display(), error = %e, "Failed to write metrics snapshot");
        }
    }

    result
}

async fn scan(config: &Config, args: ScanArgs) -> Result<()> {
    info!("Starting extended support scan");

    let catalog = accounts::resolve_regions(args.regions_file.as_deref())?;

    let pricing = match &args.pricing_file {
        Some(path) => PricingTable::from_json_file(path)
            .wrap_err_with(|| format!("Failed to load pricing file {}", path.display()))?,
        None => PricingTable::builtin(),
    };
    pricing.ensure_covers(&catalog)?;

    let source: Arc<dyn NormalizationSource> = match &args.instance_mapping_file {
        Some(path) => Arc::new(JsonFileNormalizationSource::new(path)),
        None => Arc::new(BuiltinNormalizationSource),
    };
    let normalization = NormalizationTable::load(source).await?;

    let providers = AwsProviders::load(&config.aws).await;
    let caller = organization::identify_caller(&providers).await?;
    organization::ensure_management_account(&providers, &caller).await?;

    let pool = accounts::resolve_pool(&providers, &caller, args.selection).await?;

    let output = args
        .output
        .unwrap_or_else(|| default_report_path(&config.output_dir));
    let sink = CsvReportSink::create(&output)
        .wrap_err_with(|| format!("Failed to create report {}", output.display()))?;
    let checkpoint = JsonFileCheckpointStore::new(&config.checkpoint_path);
    let (ledger, processed) = RunLedger::open(Box::new(sink), Box::new(checkpoint))?;
    if !processed.is_empty() {
        info!(
            path = %config.checkpoint_path.display(),
            count = processed.len(),
            "Resuming from checkpoint"
        );
    }

    let collector = DomainCollector::new(Arc::new(catalog), Arc::new(normalization), Arc::new(pricing));
    let coordinator = Coordinator::new(
        Arc::new(collector),
        Arc::new(providers.access_resolver(&config.aws, &caller)),
        Arc::new(ledger),
        config.max_concurrent_accounts,
    );

    let summary = coordinator.run(&pool).await.wrap_err_with(|| {
        format!(
            "Scan aborted; rerun to resume from {}",
            config.checkpoint_path.display()
        )
    })?;

    info!(
        accounts = summary.accounts_in_pool,
        skipped = summary.skipped_from_checkpoint,
        committed = summary.committed,
        rows = summary.rows_written,
        yearly_cost = %format_usd(summary.total_yearly_cost),
        duration_ms = summary.duration_ms,
        report = %output.display(),
        "Scan complete"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

async fn export_accounts(config: &Config, path: &Path) -> Result<()> {
    let providers = AwsProviders::load(&config.aws).await;
    let caller = organization::identify_caller(&providers).await?;
    organization::ensure_management_account(&providers, &caller).await?;

    let pool = accounts::resolve_pool(
        &providers,
        &caller,
        AccountSelection::Organization { exclude: Vec::new() },
    )
    .await?;
    accounts::write_lines(path, &pool)?;
    Ok(())
}

fn export_regions(regions_file: Option<&Path>, path: &Path) -> Result<()> {
    let catalog = accounts::resolve_regions(regions_file)?;
    accounts::write_lines(
        path,
        catalog.iter().map(|region| format!("{},{}", region.code, region.name)),
    )?;
    Ok(())
}

/// `<dir>/aos_extended_support_instances-<YYYY-MM-DD HH-MM>.csv`
fn default_report_path(output_dir: &Path) -> PathBuf {
    output_dir.join(format!(
        "aos_extended_support_instances-{}.csv",
        Local::now().format("%Y-%m-%d %H-%M")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_account_flags_are_mutually_exclusive() {
        assert!(Cli::try_parse_from(["auditor", "scan", "--all", "--accounts", "1"]).is_err());
        assert!(
            Cli::try_parse_from(["auditor", "scan", "--accounts", "1", "--accounts-file", "a.txt"])
                .is_err()
        );
    }

    #[test]
    fn test_exclude_requires_all() {
        assert!(Cli::try_parse_from(["auditor", "scan", "--exclude-accounts", "1"]).is_err());
        assert!(
            Cli::try_parse_from(["auditor", "scan", "--all", "--exclude-accounts", "1,2"]).is_ok()
        );
    }

    #[test]
    fn test_default_report_path_shape() {
        let path = default_report_path(Path::new("/reports"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(path.starts_with("/reports"));
        assert!(name.starts_with("aos_extended_support_instances-"));
        assert!(name.ends_with(".csv"));
        // "YYYY-MM-DD HH-MM"
        assert_eq!(name.len(), "aos_extended_support_instances-".len() + 16 + ".csv".len());
    }
}
