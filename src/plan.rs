//! JSON install plans.
//!
//! A plan presets string resources and lists the steps of one sequence:
//!
//! ```json
//! {
//!   "name": "rhino-plugin",
//!   "resources": { "venv_dir": "build/venv" },
//!   "steps": [
//!     { "task": "create_environment", "path": { "resource": "venv_dir" }, "store_in": "venv" },
//!     { "task": "install_to_environment", "environment": "venv", "packages": ["requests"] }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use strum::Display;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::environment::PythonEnvironment;
use crate::error::InstallKitError;
use crate::param::Param;
use crate::registry::{RegistryPath, RegistryValue};
use crate::resource::ResourceStore;
use crate::sequence::Sequence;
use crate::task::{Task, TaskContext};
use crate::tasks::{
    CopyFiles, CreatePythonEnvironment, DeleteFiles, InstallOfflineWheel,
    InstallToVirtualEnvironment, PipInstallPackage, ReadValueFromRegistry,
};

/// A literal string or a reference to a resource resolved at execution time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSource {
    Literal(String),
    Resource { resource: String },
}

impl ValueSource {
    /// Referenced resource key, if any
    pub fn resource_key(&self) -> Option<&str> {
        match self {
            Self::Literal(_) => None,
            Self::Resource { resource } => Some(resource),
        }
    }

    fn to_string_param(&self, store: &ResourceStore) -> Param<String> {
        match self {
            Self::Literal(value) => Param::literal(value.clone()),
            Self::Resource { resource } => {
                let store = store.clone();
                let key = resource.clone();
                Param::deferred(move || lookup_string(&store, &key))
            }
        }
    }

    fn to_path_param(&self, store: &ResourceStore) -> Param<PathBuf> {
        match self {
            Self::Literal(value) => Param::literal(PathBuf::from(value)),
            Self::Resource { resource } => {
                let store = store.clone();
                let key = resource.clone();
                Param::deferred(move || lookup_string(&store, &key).map(PathBuf::from))
            }
        }
    }
}

fn paths_param(sources: &[ValueSource], store: &ResourceStore) -> Param<Vec<PathBuf>> {
    let literals: Option<Vec<PathBuf>> = sources
        .iter()
        .map(|source| match source {
            ValueSource::Literal(value) => Some(PathBuf::from(value)),
            ValueSource::Resource { .. } => None,
        })
        .collect();
    if let Some(paths) = literals {
        return Param::literal(paths);
    }

    let params: Vec<Param<PathBuf>> = sources.iter().map(|s| s.to_path_param(store)).collect();
    Param::deferred(move || params.iter().map(Param::resolve).collect())
}

/// Read a resource as text; accepts `String`, `PathBuf` and string-like
/// registry values.
fn lookup_string(store: &ResourceStore, key: &str) -> crate::error::Result<String> {
    match store.get::<String>(key) {
        Err(InstallKitError::ResourceTypeMismatch { .. }) => {}
        other => return other,
    }
    if let Ok(path) = store.get::<PathBuf>(key) {
        return Ok(path.display().to_string());
    }
    if let Ok(value) = store.get::<RegistryValue>(key) {
        return Ok(value.to_string());
    }
    Err(InstallKitError::ResourceTypeMismatch {
        key: key.to_string(),
        expected: "String, PathBuf or RegistryValue",
    })
}

/// One step of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum StepConfig {
    PipInstall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        package: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
        /// Environment resource whose interpreter runs pip
        #[serde(default, skip_serializing_if = "Option::is_none")]
        environment: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        python: Option<ValueSource>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
    },
    CreateEnvironment {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        path: ValueSource,
        store_in: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        interpreter: Option<String>,
    },
    InstallToEnvironment {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        environment: String,
        packages: Vec<String>,
    },
    InstallWheel {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        environment: String,
        wheel: ValueSource,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
    },
    ReadRegistry {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        path: String,
        store_in: String,
    },
    CopyFiles {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        sources: Vec<ValueSource>,
        target: ValueSource,
    },
    DeleteFiles {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        paths: Vec<ValueSource>,
        #[serde(default = "default_true")]
        fail_on_doesnt_exist: bool,
    },
}

fn default_true() -> bool {
    true
}

/// What a plan resource holds once the step that sets it has run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ResourceKind {
    /// Preset string, readable as text or a path
    #[strum(to_string = "a string")]
    Text,
    /// [`PythonEnvironment`] published by `create_environment`
    #[strum(to_string = "a python environment")]
    Environment,
    /// [`RegistryValue`] published by `read_registry`
    #[strum(to_string = "a registry value")]
    RegistryValue,
}

impl ResourceKind {
    /// Whether a resource of this kind can be read where `expected` is needed.
    /// Registry values convert to text; environments convert to nothing else.
    pub fn satisfies(self, expected: ResourceKind) -> bool {
        match expected {
            Self::Text => matches!(self, Self::Text | Self::RegistryValue),
            other => self == other,
        }
    }
}

impl StepConfig {
    /// Display name override
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::PipInstall { name, .. }
            | Self::CreateEnvironment { name, .. }
            | Self::InstallToEnvironment { name, .. }
            | Self::InstallWheel { name, .. }
            | Self::ReadRegistry { name, .. }
            | Self::CopyFiles { name, .. }
            | Self::DeleteFiles { name, .. } => name.as_deref(),
        }
    }

    /// Resource keys this step reads, with the kind each must hold
    pub fn required_resources(&self) -> Vec<(&str, ResourceKind)> {
        let mut keys = Vec::new();
        match self {
            Self::PipInstall {
                environment,
                python,
                ..
            } => {
                keys.extend(environment.as_deref().map(environment_key));
                keys.extend(python.as_ref().and_then(text_key));
            }
            Self::CreateEnvironment { path, .. } => keys.extend(text_key(path)),
            Self::InstallToEnvironment { environment, .. } => {
                keys.push(environment_key(environment));
            }
            Self::InstallWheel {
                environment,
                wheel,
                ..
            } => {
                keys.push(environment_key(environment));
                keys.extend(text_key(wheel));
            }
            Self::ReadRegistry { .. } => {}
            Self::CopyFiles {
                sources, target, ..
            } => {
                keys.extend(sources.iter().filter_map(text_key));
                keys.extend(text_key(target));
            }
            Self::DeleteFiles { paths, .. } => {
                keys.extend(paths.iter().filter_map(text_key));
            }
        }
        keys
    }

    /// Resource key this step publishes, if any, and what it will hold
    pub fn produced_resource(&self) -> Option<(&str, ResourceKind)> {
        match self {
            Self::CreateEnvironment { store_in, .. } => {
                Some((store_in, ResourceKind::Environment))
            }
            Self::ReadRegistry { store_in, .. } => Some((store_in, ResourceKind::RegistryValue)),
            _ => None,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::PipInstall { package, .. } => {
                if package.trim().is_empty() {
                    anyhow::bail!("Package name must be specified");
                }
            }
            Self::InstallToEnvironment { packages, .. } => {
                if packages.is_empty() {
                    anyhow::bail!("At least one package must be listed");
                }
                if packages.iter().any(|p| p.trim().is_empty()) {
                    anyhow::bail!("Package names must not be empty");
                }
            }
            Self::ReadRegistry { path, .. } => {
                path.parse::<RegistryPath>()?;
            }
            Self::CopyFiles { sources, .. } => {
                if sources.is_empty() {
                    anyhow::bail!("At least one source file must be listed");
                }
            }
            Self::DeleteFiles { paths, .. } => {
                if paths.is_empty() {
                    anyhow::bail!("At least one path must be listed");
                }
            }
            Self::CreateEnvironment { .. } | Self::InstallWheel { .. } => {}
        }
        Ok(())
    }

    fn build(&self, ctx: &TaskContext) -> Box<dyn Task> {
        let store = &ctx.resources;
        let task: Box<dyn Task> = match self {
            Self::PipInstall {
                package,
                version,
                environment,
                python,
                args,
                ..
            } => {
                let mut task = PipInstallPackage::new(ctx, package.clone()).args(args.clone());
                if let Some(version) = version {
                    task = task.version(version.clone());
                }
                if let Some(python) = python {
                    task = task.python(python.to_string_param(store));
                }
                if let Some(environment) = environment {
                    task = task.python_from_environment(
                        store.resource::<PythonEnvironment>(environment.clone()),
                    );
                }
                Box::new(with_name(task, self.name(), PipInstallPackage::with_name))
            }
            Self::CreateEnvironment {
                path,
                store_in,
                interpreter,
                ..
            } => {
                let mut task =
                    CreatePythonEnvironment::new(ctx, path.to_path_param(store), store_in.clone());
                if let Some(interpreter) = interpreter {
                    task = task.interpreter(interpreter.clone());
                }
                Box::new(with_name(task, self.name(), CreatePythonEnvironment::with_name))
            }
            Self::InstallToEnvironment {
                environment,
                packages,
                ..
            } => {
                let task = InstallToVirtualEnvironment::new(
                    ctx,
                    packages.clone(),
                    store.resource::<PythonEnvironment>(environment.clone()),
                );
                Box::new(with_name(task, self.name(), InstallToVirtualEnvironment::with_name))
            }
            Self::InstallWheel {
                environment,
                wheel,
                args,
                ..
            } => {
                let task = InstallOfflineWheel::new(
                    ctx,
                    wheel.to_path_param(store),
                    store.resource::<PythonEnvironment>(environment.clone()),
                )
                .args(args.clone());
                Box::new(with_name(task, self.name(), InstallOfflineWheel::with_name))
            }
            Self::ReadRegistry { path, store_in, .. } => {
                let task = ReadValueFromRegistry::new(ctx, path.clone(), store_in.clone());
                Box::new(with_name(task, self.name(), ReadValueFromRegistry::with_name))
            }
            Self::CopyFiles {
                sources, target, ..
            } => {
                let task =
                    CopyFiles::new(paths_param(sources, store), target.to_path_param(store));
                Box::new(with_name(task, self.name(), CopyFiles::with_name))
            }
            Self::DeleteFiles {
                paths,
                fail_on_doesnt_exist,
                ..
            } => {
                let task = DeleteFiles::new(paths_param(paths, store))
                    .fail_on_doesnt_exist(*fail_on_doesnt_exist);
                Box::new(with_name(task, self.name(), DeleteFiles::with_name))
            }
        };
        task
    }
}

fn text_key(source: &ValueSource) -> Option<(&str, ResourceKind)> {
    source.resource_key().map(|key| (key, ResourceKind::Text))
}

fn environment_key(key: &str) -> (&str, ResourceKind) {
    (key, ResourceKind::Environment)
}

fn with_name<T>(task: T, name: Option<&str>, rename: impl FnOnce(T, String) -> T) -> T {
    match name {
        Some(name) => rename(task, name.to_string()),
        None => task,
    }
}

/// Install plan that can be saved/loaded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// String resources set before the first step runs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, String>,
    pub steps: Vec<StepConfig>,
}

impl InstallPlan {
    /// Save plan to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize install plan to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write install plan to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load plan from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read install plan from {:?}", path.as_ref()))?;

        let plan: Self =
            serde_json::from_str(&content).context("Failed to parse install plan JSON")?;

        Ok(plan)
    }

    /// Validate the plan
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            anyhow::bail!("Install plan has no steps");
        }

        let mut available: BTreeMap<&str, ResourceKind> = self
            .resources
            .keys()
            .map(|key| (key.as_str(), ResourceKind::Text))
            .collect();
        for (index, step) in self.steps.iter().enumerate() {
            let position = index + 1;
            step.validate()
                .with_context(|| format!("Step {position} is invalid"))?;

            for (key, expected) in step.required_resources() {
                match available.get(key) {
                    None => anyhow::bail!(
                        "Step {position} reads resource `{key}`, \
                         which is neither preset nor produced by an earlier step"
                    ),
                    Some(held) if !held.satisfies(expected) => anyhow::bail!(
                        "Step {position} needs resource `{key}` to be {expected}, \
                         but it holds {held}"
                    ),
                    Some(_) => {}
                }
            }
            if let Some((key, kind)) = step.produced_resource() {
                available.insert(key, kind);
            }
        }

        Ok(())
    }

    /// Validate, preset the plan's resources into `ctx` and build the sequence
    pub fn build(&self, ctx: &TaskContext) -> Result<Sequence> {
        self.validate()?;

        for (key, value) in &self.resources {
            ctx.resources
                .set(key.clone(), value.clone())
                .with_context(|| format!("Failed to preset resource `{key}`"))?;
        }

        Ok(self.steps.iter().map(|step| step.build(ctx)).collect())
    }
}
