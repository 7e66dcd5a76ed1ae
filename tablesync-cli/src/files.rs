//! Dataset persistence for the CLI.

use anyhow::Context;
use camino::Utf8Path;
use fs_err as fs;
use tablesync_core::DataSet;
use tracing::debug;

/// Load a dataset file. A missing file is an empty dataset.
pub fn load_dataset(path: &Utf8Path) -> anyhow::Result<DataSet> {
    if !path.exists() {
        debug!("dataset {} missing; starting empty", path);
        return Ok(DataSet::new());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read dataset {}", path))?;
    serde_json::from_str(&contents).with_context(|| format!("parse dataset {}", path))
}

pub fn save_dataset(path: &Utf8Path, dataset: &DataSet) -> anyhow::Result<()> {
    write_json(path, dataset)
}

pub fn write_json<T: serde::Serialize>(path: &Utf8Path, v: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent))?;
    }
    let s = serde_json::to_string_pretty(v).context("serialize json")?;
    fs::write(path, s).with_context(|| format!("write {}", path))?;
    Ok(())
}
