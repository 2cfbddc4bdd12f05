//! The uniform task contract.
//!
//! A task is one provisioning step. Sequences only ever see it through the
//! [`Task`] trait: a display name and an `execute` that performs the effect
//! synchronously and reports an [`Outcome`].
//!
//! # Contract
//!
//! - `execute()` never panics or returns an error for expected failures
//!   (missing file, failed subprocess, absent registry key, missing
//!   resource); the fault is converted into [`Outcome::Failure`] with a
//!   message that names what was being done.
//! - Deferred [`Param`](crate::param::Param)s are resolved at the start of
//!   `execute`, never at construction.
//! - Malformed parameters fail during `execute` rather than silently doing
//!   nothing.

use std::fmt;
use std::sync::Arc;

use crate::command::{CommandRunner, ShellRunner};
use crate::registry::{native_config_store, ConfigStore};
use crate::resource::ResourceStore;

/// Result of executing one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Failure with a human-readable diagnostic
    Failure(String),
}

impl Outcome {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }

    /// Convert an effect result, prefixing any error with `context`.
    pub fn from_result<E: fmt::Display>(result: Result<(), E>, context: &str) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(e) => Self::Failure(format!("{context}: {e}")),
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// The failure message, if any
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::Failure(message) => Some(message),
        }
    }

    /// `(success, error)` pair: `(true, None)` or `(false, Some(message))`
    pub fn into_parts(self) -> (bool, Option<String>) {
        match self {
            Self::Success => (true, None),
            Self::Failure(message) => (false, Some(message)),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Failure(message) => write!(f, "failure: {message}"),
        }
    }
}

/// One provisioning step.
pub trait Task: Send {
    /// Label shown in progress output and failure messages
    fn name(&self) -> &str;

    /// Perform the effect and report how it went.
    fn execute(&self) -> Outcome;
}

impl<T: Task + ?Sized> Task for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn execute(&self) -> Outcome {
        (**self).execute()
    }
}

/// Collaborators injected into every concrete task.
///
/// Cloning is cheap and clones share the same resource store.
#[derive(Clone)]
pub struct TaskContext {
    pub resources: ResourceStore,
    pub runner: Arc<dyn CommandRunner>,
    pub config_store: Arc<dyn ConfigStore>,
}

impl TaskContext {
    /// Context with a fresh resource store
    pub fn new(runner: Arc<dyn CommandRunner>, config_store: Arc<dyn ConfigStore>) -> Self {
        Self {
            resources: ResourceStore::new(),
            runner,
            config_store,
        }
    }

    /// Shell runner plus the platform configuration store
    pub fn native() -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(ShellRunner::new());
        let config_store = native_config_store(Arc::clone(&runner));
        Self::new(runner, config_store)
    }

    /// Share an existing resource store
    pub fn with_resources(mut self, resources: ResourceStore) -> Self {
        self.resources = resources;
        self
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("resources", &self.resources)
            .finish_non_exhaustive()
    }
}
