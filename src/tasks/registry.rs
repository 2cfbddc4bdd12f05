//! Registry reads.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::registry::{ConfigStore, RegistryPath};
use crate::resource::ResourceStore;
use crate::task::{Outcome, Task, TaskContext};

/// Read one registry value and publish it as a
/// [`RegistryValue`](crate::registry::RegistryValue) resource.
///
/// The path (`HIVE\subkey\...\value_name`) is parsed when the task executes;
/// a malformed path fails the task.
pub struct ReadValueFromRegistry {
    name: String,
    path: String,
    store_in: String,
    config_store: Arc<dyn ConfigStore>,
    resources: ResourceStore,
}

impl ReadValueFromRegistry {
    pub fn new(ctx: &TaskContext, path: impl Into<String>, store_in: impl Into<String>) -> Self {
        Self {
            name: "ReadValueFromRegistry".to_string(),
            path: path.into(),
            store_in: store_in.into(),
            config_store: Arc::clone(&ctx.config_store),
            resources: ctx.resources.clone(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn run(&self) -> Result<()> {
        let path: RegistryPath = self.path.parse()?;
        let value = self.config_store.read_value(&path)?;
        debug!(path = %path, value = %value, "registry value read");
        self.resources.set(self.store_in.clone(), value)
    }
}

impl Task for ReadValueFromRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self) -> Outcome {
        Outcome::from_result(self.run(), "Failed to read value from registry")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::MockRunner;
    use crate::registry::{InMemoryConfigStore, RegistryValue};

    fn context_with(entries: Vec<(&str, RegistryValue)>) -> TaskContext {
        let store = InMemoryConfigStore::from_entries(
            entries
                .into_iter()
                .map(|(path, value)| (path.parse().unwrap(), value)),
        );
        TaskContext::new(Arc::new(MockRunner::new()), Arc::new(store))
    }

    #[test]
    fn test_reads_and_publishes_value() {
        let ctx = context_with(vec![(
            r"HKEY_LOCAL_MACHINE\SOFTWARE\McNeel\Rhinoceros\7.0\Install\InstallPath",
            RegistryValue::String(r"C:\Program Files\Rhino 7\".to_string()),
        )]);
        let task = ReadValueFromRegistry::new(
            &ctx,
            r"HKEY_LOCAL_MACHINE\SOFTWARE\McNeel\Rhinoceros\7.0\Install\InstallPath",
            "rhino_path",
        );

        assert!(task.execute().is_success());
        let value: RegistryValue = ctx.resources.get("rhino_path").unwrap();
        assert_eq!(value.as_str(), Some(r"C:\Program Files\Rhino 7\"));
    }

    #[test]
    fn test_malformed_path_fails_at_execute() {
        let ctx = context_with(Vec::new());
        let task = ReadValueFromRegistry::new(&ctx, r"HKEY_BOGUS\Key\Value", "out");

        let outcome = task.execute();
        let message = outcome.error().unwrap();
        assert!(message.starts_with("Failed to read value from registry: Invalid registry path"));
        assert!(!ctx.resources.contains("out"));
    }

    #[test]
    fn test_missing_value_fails() {
        let ctx = context_with(Vec::new());
        let outcome =
            ReadValueFromRegistry::new(&ctx, r"HKCU\Software\Nope\Value", "out").execute();
        assert!(outcome.error().unwrap().contains("Registry value not found"));
    }
}
