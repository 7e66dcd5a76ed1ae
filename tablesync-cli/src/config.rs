//! Configuration file loading for tablesync.
//!
//! Loads `tablesync.toml` and merges it with CLI overrides (CLI takes
//! precedence). Enum-valued settings accept a member name or its integer
//! discriminant and are validated by the policy store setters.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use tablesync_core::{PolicyError, PolicyInput, PolicyStore, TableMapping, TableMappings};
use tracing::debug;

/// The config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "tablesync.toml";

/// Top-level configuration from tablesync.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TablesyncConfig {
    pub policy: PolicyConfig,

    /// Source-to-dataset table mappings.
    pub mappings: Vec<TableMapping>,
}

/// `[policy]` section. Unset keys keep the adapter defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub accept_changes_during_fill: Option<bool>,
    pub accept_changes_during_update: Option<bool>,
    pub continue_update_on_error: Option<bool>,
    pub return_provider_specific_types: Option<bool>,
    pub fill_load_option: Option<RawEnum>,
    pub missing_mapping_action: Option<RawEnum>,
    pub missing_schema_action: Option<RawEnum>,
}

/// Enum value as written in TOML: `"upsert"` or `3`.
///
/// TOML integers are 64-bit; values outside `i32` reach the policy store as
/// their literal text and are rejected there like any unknown member.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawEnum {
    Discriminant(i64),
    Name(String),
}

impl From<RawEnum> for PolicyInput {
    fn from(raw: RawEnum) -> Self {
        match raw {
            RawEnum::Discriminant(d) => match i32::try_from(d) {
                Ok(d) => PolicyInput::Discriminant(d),
                Err(_) => PolicyInput::Name(d.to_string()),
            },
            RawEnum::Name(name) => PolicyInput::Name(name),
        }
    }
}

/// Resolve the config path: an explicit one must exist, the default may not.
pub fn discover_config(explicit: Option<&Utf8Path>) -> anyhow::Result<Option<Utf8PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("config file {} not found", path);
        }
        return Ok(Some(path.to_path_buf()));
    }
    let default = Utf8PathBuf::from(CONFIG_FILE_NAME);
    if default.exists() {
        debug!("found config file at {}", default);
        Ok(Some(default))
    } else {
        debug!("no config file found at {}", default);
        Ok(None)
    }
}

/// Load and parse a tablesync.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<TablesyncConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<TablesyncConfig> {
    let config: TablesyncConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load the config, or return the default if none was found.
pub fn load_or_default(explicit: Option<&Utf8Path>) -> anyhow::Result<TablesyncConfig> {
    match discover_config(explicit)? {
        Some(path) => load_config(&path),
        None => Ok(TablesyncConfig::default()),
    }
}

/// Policy overrides given on the command line.
#[derive(Debug, Clone, Default)]
pub struct PolicyOverrides {
    pub load_option: Option<String>,
    pub missing_mapping: Option<String>,
    pub missing_schema: Option<String>,
    pub continue_on_error: bool,
    pub no_accept_during_fill: bool,
    pub no_accept_during_update: bool,
}

/// Policy and mappings after merging the config file with CLI overrides.
#[derive(Debug, Clone, Default)]
pub struct MergedConfig {
    pub policy: PolicyStore,
    pub mappings: TableMappings,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: TablesyncConfig,
}

impl ConfigMerger {
    pub fn new(config: TablesyncConfig) -> Self {
        Self { config }
    }

    /// Apply the file's policy, then the CLI overrides.
    ///
    /// Invalid enum values fail with [`PolicyError`] in the error chain.
    pub fn merge(self, cli: &PolicyOverrides) -> anyhow::Result<MergedConfig> {
        let mut policy = PolicyStore::new();
        apply_file_policy(&mut policy, self.config.policy)?;

        if let Some(raw) = &cli.load_option {
            policy
                .try_set_fill_load_option(cli_input(raw))
                .context("--load-option")?;
        }
        if let Some(raw) = &cli.missing_mapping {
            policy
                .try_set_missing_mapping_action(cli_input(raw))
                .context("--missing-mapping")?;
        }
        if let Some(raw) = &cli.missing_schema {
            policy
                .try_set_missing_schema_action(cli_input(raw))
                .context("--missing-schema")?;
        }
        // CLI switches only ever move away from the defaults
        if cli.continue_on_error {
            policy.set_continue_update_on_error(true);
        }
        if cli.no_accept_during_fill {
            policy.set_accept_changes_during_fill(false);
        }
        if cli.no_accept_during_update {
            policy.set_accept_changes_during_update(false);
        }

        let mut mappings = TableMappings::new();
        for mapping in self.config.mappings {
            mappings
                .add(mapping)
                .context("invalid [[mappings]] entry")?;
        }

        Ok(MergedConfig { policy, mappings })
    }
}

/// Integer strings are discriminants; anything else is a member name.
fn cli_input(raw: &str) -> PolicyInput {
    match raw.trim().parse::<i32>() {
        Ok(d) => PolicyInput::Discriminant(d),
        Err(_) => PolicyInput::Name(raw.to_string()),
    }
}

fn apply_file_policy(policy: &mut PolicyStore, file: PolicyConfig) -> anyhow::Result<()> {
    if let Some(v) = file.accept_changes_during_fill {
        policy.set_accept_changes_during_fill(v);
    }
    if let Some(v) = file.accept_changes_during_update {
        policy.set_accept_changes_during_update(v);
    }
    if let Some(v) = file.continue_update_on_error {
        policy.set_continue_update_on_error(v);
    }
    if let Some(v) = file.return_provider_specific_types {
        policy.set_return_provider_specific_types(v);
    }
    if let Some(raw) = file.fill_load_option {
        policy
            .try_set_fill_load_option(raw)
            .context("[policy] fill_load_option")?;
    }
    if let Some(raw) = file.missing_mapping_action {
        policy
            .try_set_missing_mapping_action(raw)
            .context("[policy] missing_mapping_action")?;
    }
    if let Some(raw) = file.missing_schema_action {
        policy
            .try_set_missing_schema_action(raw)
            .context("[policy] missing_schema_action")?;
    }
    Ok(())
}

/// Returns the [`PolicyError`] in an error chain, if any.
pub fn policy_error(err: &anyhow::Error) -> Option<&PolicyError> {
    err.chain().find_map(|e| e.downcast_ref::<PolicyError>())
}
