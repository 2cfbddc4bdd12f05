//! Task parameters that are either known up front or produced later.
//!
//! Tasks are built before a sequence runs, yet often need values that only
//! an earlier task can supply. A [`Param`] holds either a literal or a
//! zero-argument producer; tasks call [`Param::resolve`] at the start of
//! `execute`, never at construction.

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::resource::Resource;

type Producer<T> = Arc<dyn Fn() -> Result<T> + Send + Sync>;

/// A literal value or a deferred producer of one.
pub enum Param<T> {
    Literal(T),
    Deferred(Producer<T>),
}

impl<T> Param<T> {
    pub fn literal(value: T) -> Self {
        Self::Literal(value)
    }

    /// Wrap a producer invoked each time the parameter is resolved.
    pub fn deferred<F>(producer: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        Self::Deferred(Arc::new(producer))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

impl<T: Clone> Param<T> {
    /// Produce the current value of this parameter.
    pub fn resolve(&self) -> Result<T> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Deferred(producer) => producer(),
        }
    }
}

impl<T: Clone> Clone for Param<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Literal(value) => Self::Literal(value.clone()),
            Self::Deferred(producer) => Self::Deferred(Arc::clone(producer)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Param<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl<T: Any + Clone> From<Resource<T>> for Param<T> {
    fn from(resource: Resource<T>) -> Self {
        Self::deferred(move || resource.get())
    }
}

impl From<String> for Param<String> {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl From<&str> for Param<String> {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<PathBuf> for Param<PathBuf> {
    fn from(value: PathBuf) -> Self {
        Self::Literal(value)
    }
}

impl From<&Path> for Param<PathBuf> {
    fn from(value: &Path) -> Self {
        Self::Literal(value.to_path_buf())
    }
}

impl From<&str> for Param<PathBuf> {
    fn from(value: &str) -> Self {
        Self::Literal(PathBuf::from(value))
    }
}

impl From<Vec<String>> for Param<Vec<String>> {
    fn from(value: Vec<String>) -> Self {
        Self::Literal(value)
    }
}

impl From<Vec<PathBuf>> for Param<Vec<PathBuf>> {
    fn from(value: Vec<PathBuf>) -> Self {
        Self::Literal(value)
    }
}

/// A single path is accepted wherever a list of paths is expected.
impl From<PathBuf> for Param<Vec<PathBuf>> {
    fn from(value: PathBuf) -> Self {
        Self::Literal(vec![value])
    }
}
