use crate::error::AdapterError;
use crate::pipeline::{run_fill, run_fill_schema, run_update};
use crate::ports::{CommandExecutor, UnsupportedExecutor};
use tablesync_dataset::DataSet;
use tablesync_policy::PolicyStore;
use tablesync_types::{FillReport, TableMappings, UpdateReport};

/// Reconciliation adapter: policy, table mappings and a command executor.
///
/// The policy is read when a pass starts, so changes made between passes
/// apply to the next one.
#[derive(Debug, Clone, Default)]
pub struct DataAdapter<E = UnsupportedExecutor> {
    policy: PolicyStore,
    mappings: TableMappings,
    executor: E,
}

impl DataAdapter {
    /// Base adapter with default policy and no executor.
    ///
    /// Its fill and update passes fail with [`AdapterError::NotSupported`].
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: CommandExecutor> DataAdapter<E> {
    pub fn with_executor(executor: E) -> Self {
        Self {
            policy: PolicyStore::new(),
            mappings: TableMappings::new(),
            executor,
        }
    }

    pub fn policy(&self) -> &PolicyStore {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut PolicyStore {
        &mut self.policy
    }

    pub fn table_mappings(&self) -> &TableMappings {
        &self.mappings
    }

    pub fn table_mappings_mut(&mut self) -> &mut TableMappings {
        &mut self.mappings
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Populate `dataset` from the source.
    pub fn fill(&mut self, dataset: &mut DataSet) -> Result<FillReport, AdapterError> {
        let policy = self.policy.snapshot();
        run_fill(&policy, &self.mappings, &mut self.executor, dataset)
    }

    /// Add or check source schema in `dataset` without loading rows.
    pub fn fill_schema(&mut self, dataset: &mut DataSet) -> Result<FillReport, AdapterError> {
        let policy = self.policy.snapshot();
        run_fill_schema(&policy, &self.mappings, &mut self.executor, dataset)
    }

    /// Push every pending change in `dataset` to the source.
    pub fn update(&mut self, dataset: &mut DataSet) -> Result<UpdateReport, AdapterError> {
        let policy = self.policy.snapshot();
        run_update(&policy, &self.mappings, &mut self.executor, dataset)
    }
}
