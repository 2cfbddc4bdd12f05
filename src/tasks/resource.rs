//! In-sequence resource edits.

use std::any::Any;

use tracing::debug;

use crate::error::Result;
use crate::resource::ResourceStore;
use crate::task::{Outcome, Task, TaskContext};

type Modifier = Box<dyn Fn(&ResourceStore) -> Result<()> + Send + Sync>;

/// Apply a function to a resource as a step of the sequence.
///
/// Either mutates a value in place ([`ModifyResource::in_place`]) or reads
/// one resource and publishes a derived value under another key
/// ([`ModifyResource::transform`]). A missing source key fails the task.
pub struct ModifyResource {
    name: String,
    key: String,
    resources: ResourceStore,
    modifier: Modifier,
}

impl ModifyResource {
    /// Mutate the value stored under `key`.
    ///
    /// `f` runs while the store's write lock is held and must not access the
    /// store itself.
    pub fn in_place<T, F>(ctx: &TaskContext, key: impl Into<String>, f: F) -> Self
    where
        T: Any,
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        let key = key.into();
        let target = key.clone();
        Self::with_modifier(ctx, key, move |store| store.update::<T, _>(&target, &f))
    }

    /// Read `key`, apply `f` and store the result under `target`.
    ///
    /// `target` may equal `key` to replace the value, including with a value
    /// of a different type.
    pub fn transform<T, U, F>(
        ctx: &TaskContext,
        key: impl Into<String>,
        target: impl Into<String>,
        f: F,
    ) -> Self
    where
        T: Any + Clone,
        U: Any + Send + Sync,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        Self::try_transform(ctx, key, target, move |value: &T| Ok(f(value)))
    }

    /// Like [`ModifyResource::transform`], but `f` may fail the task.
    pub fn try_transform<T, U, F>(
        ctx: &TaskContext,
        key: impl Into<String>,
        target: impl Into<String>,
        f: F,
    ) -> Self
    where
        T: Any + Clone,
        U: Any + Send + Sync,
        F: Fn(&T) -> Result<U> + Send + Sync + 'static,
    {
        let key = key.into();
        let source = key.clone();
        let target = target.into();
        Self::with_modifier(ctx, key, move |store| {
            let value = store.get::<T>(&source)?;
            store.set(target.clone(), f(&value)?)
        })
    }

    fn with_modifier(
        ctx: &TaskContext,
        key: String,
        modifier: impl Fn(&ResourceStore) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: "ModifyResource".to_string(),
            key,
            resources: ctx.resources.clone(),
            modifier: Box::new(modifier),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Key of the resource this task reads
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Task for ModifyResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self) -> Outcome {
        debug!(resource = %self.key, "modifying resource");
        Outcome::from_result((self.modifier)(&self.resources), "Failed to modify resource")
    }
}
