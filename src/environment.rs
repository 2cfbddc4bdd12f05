//! Handle to an isolated Python environment.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::param::Param;

/// Directory layout of a virtual environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvLayout {
    /// `Scripts\python.exe` and `Scripts\activate.bat`
    Windows,
    /// `bin/python` and `bin/activate`
    Posix,
}

impl EnvLayout {
    /// Layout used by environments created on this platform
    pub const fn native() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Posix
        }
    }
}

/// A created virtual environment rooted at a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PythonEnvironment {
    root: PathBuf,
    layout: EnvLayout,
}

impl PythonEnvironment {
    /// Environment at `root` with the native layout
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_layout(root, EnvLayout::native())
    }

    pub fn with_layout(root: impl Into<PathBuf>, layout: EnvLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> EnvLayout {
        self.layout
    }

    /// Interpreter executable inside the environment
    pub fn python(&self) -> PathBuf {
        match self.layout {
            EnvLayout::Windows => self.root.join("Scripts").join("python.exe"),
            EnvLayout::Posix => self.root.join("bin").join("python"),
        }
    }

    /// Activation script inside the environment
    pub fn activate(&self) -> PathBuf {
        match self.layout {
            EnvLayout::Windows => self.root.join("Scripts").join("activate.bat"),
            EnvLayout::Posix => self.root.join("bin").join("activate"),
        }
    }

    /// Shell words that activate the environment; chain further commands
    /// after them with `&&`.
    pub fn activation_command(&self) -> Vec<String> {
        let script = self.activate().display().to_string();
        match self.layout {
            EnvLayout::Windows => vec![script],
            EnvLayout::Posix => vec![".".to_string(), script],
        }
    }
}

impl fmt::Display for PythonEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PythonEnvironment(`{}`)", self.root.display())
    }
}

impl From<PythonEnvironment> for Param<PythonEnvironment> {
    fn from(env: PythonEnvironment) -> Self {
        Self::Literal(env)
    }
}
