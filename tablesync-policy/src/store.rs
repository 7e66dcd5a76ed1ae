use crate::error::PolicyResult;
use crate::input::PolicyInput;
use tablesync_types::{LoadOption, MissingMappingAction, MissingSchemaAction, PolicyEnum};
use tracing::debug;

/// Policy state of one adapter.
///
/// Read-only outside this crate; every change goes through [`PolicyStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterConfig {
    accept_changes_during_fill: bool,
    accept_changes_during_update: bool,
    continue_update_on_error: bool,
    return_provider_specific_types: bool,
    fill_load_option: Option<LoadOption>,
    missing_mapping_action: MissingMappingAction,
    missing_schema_action: MissingSchemaAction,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            accept_changes_during_fill: true,
            accept_changes_during_update: true,
            continue_update_on_error: false,
            return_provider_specific_types: false,
            fill_load_option: None,
            missing_mapping_action: MissingMappingAction::Passthrough,
            missing_schema_action: MissingSchemaAction::AddWithKey,
        }
    }
}

impl AdapterConfig {
    pub fn accept_changes_during_fill(&self) -> bool {
        self.accept_changes_during_fill
    }

    pub fn accept_changes_during_update(&self) -> bool {
        self.accept_changes_during_update
    }

    pub fn continue_update_on_error(&self) -> bool {
        self.continue_update_on_error
    }

    pub fn return_provider_specific_types(&self) -> bool {
        self.return_provider_specific_types
    }

    /// Effective load option; `OverwriteChanges` while unset.
    pub fn fill_load_option(&self) -> LoadOption {
        self.fill_load_option
            .unwrap_or(LoadOption::OverwriteChanges)
    }

    pub fn fill_load_option_is_set(&self) -> bool {
        self.fill_load_option.is_some()
    }

    pub fn missing_mapping_action(&self) -> MissingMappingAction {
        self.missing_mapping_action
    }

    pub fn missing_schema_action(&self) -> MissingSchemaAction {
        self.missing_schema_action
    }
}

/// Holds an [`AdapterConfig`] and validates every enum-valued write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyStore {
    config: AdapterConfig,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: AdapterConfig) -> Self {
        Self { config }
    }

    /// Copy of the current policy, taken at the start of a pass.
    pub fn snapshot(&self) -> AdapterConfig {
        self.config
    }

    pub fn accept_changes_during_fill(&self) -> bool {
        self.config.accept_changes_during_fill()
    }

    pub fn set_accept_changes_during_fill(&mut self, value: bool) {
        debug!(value, "set accept_changes_during_fill");
        self.config.accept_changes_during_fill = value;
    }

    pub fn accept_changes_during_update(&self) -> bool {
        self.config.accept_changes_during_update()
    }

    pub fn set_accept_changes_during_update(&mut self, value: bool) {
        debug!(value, "set accept_changes_during_update");
        self.config.accept_changes_during_update = value;
    }

    pub fn continue_update_on_error(&self) -> bool {
        self.config.continue_update_on_error()
    }

    pub fn set_continue_update_on_error(&mut self, value: bool) {
        debug!(value, "set continue_update_on_error");
        self.config.continue_update_on_error = value;
    }

    pub fn return_provider_specific_types(&self) -> bool {
        self.config.return_provider_specific_types()
    }

    pub fn set_return_provider_specific_types(&mut self, value: bool) {
        debug!(value, "set return_provider_specific_types");
        self.config.return_provider_specific_types = value;
    }

    pub fn fill_load_option(&self) -> LoadOption {
        self.config.fill_load_option()
    }

    /// True only after an explicit set; false initially and after a reset.
    pub fn fill_load_option_is_set(&self) -> bool {
        self.config.fill_load_option_is_set()
    }

    pub fn set_fill_load_option(&mut self, value: LoadOption) {
        debug!(%value, "set fill_load_option");
        self.config.fill_load_option = Some(value);
    }

    pub fn try_set_fill_load_option(&mut self, raw: impl Into<PolicyInput>) -> PolicyResult<()> {
        let value = resolve::<LoadOption>(raw.into())?;
        self.set_fill_load_option(value);
        Ok(())
    }

    /// Return the load option to the unset state.
    pub fn reset_fill_load_option(&mut self) {
        debug!("reset fill_load_option");
        self.config.fill_load_option = None;
    }

    pub fn missing_mapping_action(&self) -> MissingMappingAction {
        self.config.missing_mapping_action()
    }

    pub fn set_missing_mapping_action(&mut self, value: MissingMappingAction) {
        debug!(%value, "set missing_mapping_action");
        self.config.missing_mapping_action = value;
    }

    pub fn try_set_missing_mapping_action(
        &mut self,
        raw: impl Into<PolicyInput>,
    ) -> PolicyResult<()> {
        let value = resolve::<MissingMappingAction>(raw.into())?;
        self.set_missing_mapping_action(value);
        Ok(())
    }

    pub fn missing_schema_action(&self) -> MissingSchemaAction {
        self.config.missing_schema_action()
    }

    pub fn set_missing_schema_action(&mut self, value: MissingSchemaAction) {
        debug!(%value, "set missing_schema_action");
        self.config.missing_schema_action = value;
    }

    pub fn try_set_missing_schema_action(
        &mut self,
        raw: impl Into<PolicyInput>,
    ) -> PolicyResult<()> {
        let value = resolve::<MissingSchemaAction>(raw.into())?;
        self.set_missing_schema_action(value);
        Ok(())
    }
}

fn resolve<T: PolicyEnum>(input: PolicyInput) -> PolicyResult<T> {
    input.resolve::<T>().inspect_err(|err| {
        debug!(param = err.param(), value = err.value(), "rejected policy value");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let store = PolicyStore::new();
        assert!(store.accept_changes_during_fill());
        assert!(store.accept_changes_during_update());
        assert!(!store.continue_update_on_error());
        assert!(!store.return_provider_specific_types());
        assert_eq!(store.fill_load_option(), LoadOption::OverwriteChanges);
        assert!(!store.fill_load_option_is_set());
        assert_eq!(store.missing_mapping_action(), MissingMappingAction::Passthrough);
        assert_eq!(store.missing_schema_action(), MissingSchemaAction::AddWithKey);
    }

    #[test]
    fn explicit_overwrite_is_distinguishable_from_unset() {
        let mut store = PolicyStore::new();
        store.set_fill_load_option(LoadOption::OverwriteChanges);
        assert!(store.fill_load_option_is_set());
        assert_eq!(store.fill_load_option(), LoadOption::OverwriteChanges);

        store.reset_fill_load_option();
        assert!(!store.fill_load_option_is_set());
        assert_eq!(store.fill_load_option(), LoadOption::OverwriteChanges);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut store = PolicyStore::new();
        store.reset_fill_load_option();
        store.reset_fill_load_option();
        assert_eq!(store, PolicyStore::new());
    }

    #[test]
    fn snapshot_is_detached_from_later_writes() {
        let mut store = PolicyStore::new();
        let before = store.snapshot();
        store.set_continue_update_on_error(true);
        assert!(!before.continue_update_on_error());
        assert!(store.snapshot().continue_update_on_error());
        assert_eq!(PolicyStore::from_config(before), PolicyStore::new());
    }
}
