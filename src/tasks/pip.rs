//! Package installation through pip.
//!
//! - `PipInstallPackage`: install from the package index with a chosen interpreter
//! - `InstallToVirtualEnvironment`: force-reinstall packages into an environment
//! - `InstallOfflineWheel`: install a local wheel into an environment

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::command::{start_command, CommandRunner};
use crate::environment::PythonEnvironment;
use crate::error::{InstallKitError, Result};
use crate::param::Param;
use crate::task::{Outcome, Task, TaskContext};

fn strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

/// `python -m pip install` words, with `--quiet` so pip never fills the pipe
fn quiet_pip_install(env: &PythonEnvironment) -> Vec<String> {
    let mut cmd = env.activation_command();
    cmd.extend(strings(["&&", "python", "-m", "pip", "install", "--quiet"]));
    cmd
}

// ============================================================================
// Install From Index
// ============================================================================

/// Install a package from the package index.
pub struct PipInstallPackage {
    name: String,
    package_name: String,
    version: Option<String>,
    python: Param<String>,
    args: Vec<String>,
    runner: Arc<dyn CommandRunner>,
}

impl PipInstallPackage {
    pub fn new(ctx: &TaskContext, package_name: impl Into<String>) -> Self {
        Self {
            name: "PipInstallPackage".to_string(),
            package_name: package_name.into(),
            version: None,
            python: Param::literal("python".to_string()),
            args: Vec::new(),
            runner: Arc::clone(&ctx.runner),
        }
    }

    /// Pin the version (`name==version`)
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Interpreter that runs pip (default `python`)
    pub fn python(mut self, python: impl Into<Param<String>>) -> Self {
        self.python = python.into();
        self
    }

    /// Use the interpreter of an environment, resolved at execution time
    pub fn python_from_environment(mut self, env: impl Into<Param<PythonEnvironment>>) -> Self {
        let env = env.into();
        self.python = Param::deferred(move || Ok(env.resolve()?.python().display().to_string()));
        self
    }

    /// Extra arguments appended after the package spec
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = strings(args);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// `name` or `name==version`
    pub fn package_spec(&self) -> String {
        match &self.version {
            Some(version) => format!("{}=={}", self.package_name, version),
            None => self.package_name.clone(),
        }
    }

    /// The full argument vector, with the interpreter resolved now
    pub fn command(&self) -> Result<Vec<String>> {
        let mut cmd = vec![self.python.resolve()?];
        cmd.extend(strings(["-m", "pip", "install"]));
        cmd.push(self.package_spec());
        cmd.extend(self.args.iter().cloned());
        Ok(cmd)
    }

    fn run(&self) -> Result<()> {
        debug!(package = %self.package_spec(), "pip install");
        start_command(self.runner.as_ref(), &self.command()?)?;
        Ok(())
    }
}

impl Task for PipInstallPackage {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self) -> Outcome {
        match self.run() {
            Ok(()) => Outcome::Success,
            Err(e) => Outcome::failure(format!(
                "pip install failed for package: {} with error: {e}",
                self.package_name
            )),
        }
    }
}

// ============================================================================
// Install Into Environment
// ============================================================================

/// Force-reinstall packages into a previously created environment.
pub struct InstallToVirtualEnvironment {
    name: String,
    packages: Param<Vec<String>>,
    environment: Param<PythonEnvironment>,
    runner: Arc<dyn CommandRunner>,
}

impl InstallToVirtualEnvironment {
    pub fn new(
        ctx: &TaskContext,
        packages: impl Into<Param<Vec<String>>>,
        environment: impl Into<Param<PythonEnvironment>>,
    ) -> Self {
        Self {
            name: "InstallToVirtualEnvironment".to_string(),
            packages: packages.into(),
            environment: environment.into(),
            runner: Arc::clone(&ctx.runner),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn command(&self, packages: &[String]) -> Result<Vec<String>> {
        if packages.is_empty() {
            return Err(InstallKitError::validation("no packages to install"));
        }
        let env = self.environment.resolve()?;
        let mut cmd = quiet_pip_install(&env);
        cmd.push("--force-reinstall".to_string());
        cmd.extend(packages.iter().cloned());
        Ok(cmd)
    }

    fn run(&self, packages: &[String]) -> Result<()> {
        start_command(self.runner.as_ref(), &self.command(packages)?)?;
        Ok(())
    }
}

impl Task for InstallToVirtualEnvironment {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self) -> Outcome {
        let packages = match self.packages.resolve() {
            Ok(packages) => packages,
            Err(e) => {
                return Outcome::failure(format!(
                    "Failed to install package list to virtual environment: {e}"
                ))
            }
        };
        Outcome::from_result(
            self.run(&packages),
            &format!("Failed to install package: {packages:?} to virtual environment"),
        )
    }
}

// ============================================================================
// Install Local Wheel
// ============================================================================

/// Install a single local wheel into an environment.
pub struct InstallOfflineWheel {
    name: String,
    path: Param<PathBuf>,
    environment: Param<PythonEnvironment>,
    args: Vec<String>,
    runner: Arc<dyn CommandRunner>,
}

impl InstallOfflineWheel {
    pub fn new(
        ctx: &TaskContext,
        path: impl Into<Param<PathBuf>>,
        environment: impl Into<Param<PythonEnvironment>>,
    ) -> Self {
        Self {
            name: "InstallOfflineWheel".to_string(),
            path: path.into(),
            environment: environment.into(),
            args: Vec::new(),
            runner: Arc::clone(&ctx.runner),
        }
    }

    /// Extra pip arguments, placed before the wheel path
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = strings(args);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn run(&self, wheel: &Path) -> Result<()> {
        let env = self.environment.resolve()?;
        let mut cmd = quiet_pip_install(&env);
        cmd.extend(self.args.iter().cloned());
        cmd.push(wheel.display().to_string());
        debug!(wheel = %wheel.display(), environment = %env, "installing offline wheel");
        start_command(self.runner.as_ref(), &cmd)?;
        Ok(())
    }
}

impl Task for InstallOfflineWheel {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self) -> Outcome {
        let wheel = match self.path.resolve() {
            Ok(wheel) => wheel,
            Err(e) => return Outcome::failure(format!("Failed to install wheel: {e}")),
        };
        Outcome::from_result(
            self.run(&wheel),
            &format!("Failed to install wheel: {} to virtual environment", wheel.display()),
        )
    }
}
