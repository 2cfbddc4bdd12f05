//! Virtual environment creation.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::command::{start_command, CommandRunner};
use crate::environment::PythonEnvironment;
use crate::error::Result;
use crate::param::Param;
use crate::resource::ResourceStore;
use crate::task::{Outcome, Task, TaskContext};

/// Create a virtual environment (with pip) and publish its handle.
///
/// Runs `<interpreter> -m venv <path>` and stores a [`PythonEnvironment`]
/// under `env_resource` for later install steps.
pub struct CreatePythonEnvironment {
    name: String,
    path: Param<PathBuf>,
    env_resource: String,
    interpreter: String,
    runner: Arc<dyn CommandRunner>,
    resources: ResourceStore,
}

impl CreatePythonEnvironment {
    pub fn new(
        ctx: &TaskContext,
        path: impl Into<Param<PathBuf>>,
        env_resource: impl Into<String>,
    ) -> Self {
        Self {
            name: "CreatePythonEnvironment".to_string(),
            path: path.into(),
            env_resource: env_resource.into(),
            interpreter: "python".to_string(),
            runner: Arc::clone(&ctx.runner),
            resources: ctx.resources.clone(),
        }
    }

    /// Base interpreter used to create the environment (default `python`)
    pub fn interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn run(&self) -> Result<()> {
        let path = self.path.resolve()?;
        let command = vec![
            self.interpreter.clone(),
            "-m".to_string(),
            "venv".to_string(),
            path.display().to_string(),
        ];
        start_command(self.runner.as_ref(), &command)?;

        let env = PythonEnvironment::new(path);
        info!(environment = %env, resource = %self.env_resource, "python environment created");
        self.resources.set(self.env_resource.clone(), env)
    }
}

impl Task for CreatePythonEnvironment {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self) -> Outcome {
        Outcome::from_result(self.run(), "Failed to create python environment")
    }
}
