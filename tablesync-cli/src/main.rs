use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::process::ExitCode;
use tablesync_cli::config::{self, ConfigMerger, MergedConfig, PolicyOverrides};
use tablesync_cli::files::{load_dataset, save_dataset};
use tablesync_core::adapters::JsonFileExecutor;
use tablesync_core::{
    AdapterError, DataAdapter, LoadOption, MissingMappingAction, MissingSchemaAction,
    PolicyStore,
};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "tablesync",
    version,
    about = "Policy-driven fill/update reconciliation between a JSON dataset and a JSON source."
)]
struct Cli {
    /// Config file (default: ./tablesync.toml when present).
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    #[command(flatten)]
    overrides: OverrideArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge source rows into the dataset.
    Fill(SyncArgs),
    /// Add missing tables, columns and keys to the dataset without loading rows.
    FillSchema(SyncArgs),
    /// Push pending dataset changes to the source.
    Update(SyncArgs),
    /// Print the effective policy as JSON.
    Policy,
}

#[derive(Debug, Args)]
struct OverrideArgs {
    /// Fill load option (overwrite_changes, preserve_changes, upsert, or 1-3).
    #[arg(long, global = true)]
    load_option: Option<String>,

    /// Missing mapping action (passthrough, ignore, error).
    #[arg(long, global = true)]
    missing_mapping: Option<String>,

    /// Missing schema action (ignore, error, add_with_key).
    #[arg(long, global = true)]
    missing_schema: Option<String>,

    /// Keep applying row changes after one fails.
    #[arg(long, global = true, default_value_t = false)]
    continue_on_error: bool,

    /// Leave filled rows as pending changes.
    #[arg(long, global = true, default_value_t = false)]
    no_accept_during_fill: bool,

    /// Leave applied rows as pending changes.
    #[arg(long, global = true, default_value_t = false)]
    no_accept_during_update: bool,
}

impl From<OverrideArgs> for PolicyOverrides {
    fn from(args: OverrideArgs) -> Self {
        Self {
            load_option: args.load_option,
            missing_mapping: args.missing_mapping,
            missing_schema: args.missing_schema,
            continue_on_error: args.continue_on_error,
            no_accept_during_fill: args.no_accept_during_fill,
            no_accept_during_update: args.no_accept_during_update,
        }
    }
}

#[derive(Debug, Args)]
struct SyncArgs {
    /// Source tables JSON file.
    #[arg(long)]
    source: Utf8PathBuf,

    /// Dataset JSON file (created if missing).
    #[arg(long)]
    dataset: Utf8PathBuf,
}

/// Effective policy as printed by `tablesync policy`.
#[derive(Debug, Serialize)]
struct EffectivePolicy {
    accept_changes_during_fill: bool,
    accept_changes_during_update: bool,
    continue_update_on_error: bool,
    return_provider_specific_types: bool,
    fill_load_option: LoadOption,
    fill_load_option_is_set: bool,
    missing_mapping_action: MissingMappingAction,
    missing_schema_action: MissingSchemaAction,
    mappings: usize,
}

impl EffectivePolicy {
    fn new(policy: &PolicyStore, mappings: usize) -> Self {
        Self {
            accept_changes_during_fill: policy.accept_changes_during_fill(),
            accept_changes_during_update: policy.accept_changes_during_update(),
            continue_update_on_error: policy.continue_update_on_error(),
            return_provider_specific_types: policy.return_provider_specific_types(),
            fill_load_option: policy.fill_load_option(),
            fill_load_option_is_set: policy.fill_load_option_is_set(),
            missing_mapping_action: policy.missing_mapping_action(),
            missing_schema_action: policy.missing_schema_action(),
            mappings,
        }
    }
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        error!("{:?}", e);
        eprintln!("error: {:#}", e);
        return ExitCode::from(exit_code_for(&e));
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let file_config =
        config::load_or_default(cli.config.as_deref()).context("load tablesync.toml config")?;
    let overrides: PolicyOverrides = cli.overrides.into();
    let merged = ConfigMerger::new(file_config).merge(&overrides)?;
    debug!("merged policy: {:?}", merged.policy.snapshot());

    match cli.cmd {
        Command::Fill(args) => cmd_fill(args, merged, false),
        Command::FillSchema(args) => cmd_fill(args, merged, true),
        Command::Update(args) => cmd_update(args, merged),
        Command::Policy => cmd_policy(merged),
    }
}

fn adapter_for(
    args: &SyncArgs,
    merged: MergedConfig,
) -> anyhow::Result<DataAdapter<JsonFileExecutor>> {
    let executor = JsonFileExecutor::open(&args.source)
        .with_context(|| format!("open source {}", args.source))?;
    let mut adapter = DataAdapter::with_executor(executor);
    *adapter.policy_mut() = merged.policy;
    *adapter.table_mappings_mut() = merged.mappings;
    Ok(adapter)
}

fn cmd_fill(args: SyncArgs, merged: MergedConfig, schema_only: bool) -> anyhow::Result<()> {
    let mut adapter = adapter_for(&args, merged)?;
    let mut dataset = load_dataset(&args.dataset)?;

    let report = if schema_only {
        adapter.fill_schema(&mut dataset)?
    } else {
        adapter.fill(&mut dataset)?
    };

    save_dataset(&args.dataset, &dataset)?;
    info!("wrote dataset to {}", args.dataset);
    print_json(&report)
}

fn cmd_update(args: SyncArgs, merged: MergedConfig) -> anyhow::Result<()> {
    let mut adapter = adapter_for(&args, merged)?;
    let mut dataset = load_dataset(&args.dataset)?;

    let result = adapter.update(&mut dataset);

    // Rows applied before a failure are accepted in the dataset; keep both
    // files consistent with that.
    adapter
        .executor_mut()
        .flush()
        .with_context(|| format!("flush source {}", args.source))?;
    save_dataset(&args.dataset, &dataset)?;
    info!("wrote dataset to {}", args.dataset);

    let report = result?;
    print_json(&report)
}

fn cmd_policy(merged: MergedConfig) -> anyhow::Result<()> {
    print_json(&EffectivePolicy::new(&merged.policy, merged.mappings.len()))
}

fn print_json<T: Serialize>(v: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(v).context("serialize json")?;
    println!("{}", s);
    Ok(())
}

/// 2 for policy rejections and row failures, 1 for everything else.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    if let Some(adapter_err) = err.chain().find_map(|e| e.downcast_ref::<AdapterError>()) {
        return adapter_err.exit_code();
    }
    if config::policy_error(err).is_some() {
        return 2;
    }
    1
}
