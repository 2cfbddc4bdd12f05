//! installkit
//!
//! Ordered, fail-fast, cancellable install sequences. Tasks share state
//! through a [`ResourceStore`] and take their inputs as [`Param`]s, which may
//! be literals or values resolved when the task executes.

pub mod cli;
pub mod command;
pub mod environment;
pub mod error;
pub mod param;
pub mod plan;
pub mod progress;
pub mod registry;
pub mod resource;
pub mod sequence;
pub mod task;
pub mod tasks;

pub use command::{start_command, CommandOutput, CommandRunner, MockRunner, ShellRunner};
pub use environment::{EnvLayout, PythonEnvironment};
pub use error::{InstallKitError, Result};
pub use param::Param;
pub use plan::{InstallPlan, ResourceKind, StepConfig, ValueSource};
pub use progress::{ChargingBar, NoProgress, ProgressReporter};
pub use registry::{
    ConfigStore, Hive, InMemoryConfigStore, RegQueryStore, RegistryPath, RegistryValue,
};
pub use resource::{Resource, ResourceStore};
pub use sequence::{CancelToken, Sequence, SequenceState};
pub use task::{Outcome, Task, TaskContext};
pub use tasks::{
    CopyFiles, CreatePythonEnvironment, DeleteFiles, InstallOfflineWheel,
    InstallToVirtualEnvironment, ModifyResource, PipInstallPackage, ReadValueFromRegistry,
};
