//! Concrete provisioning tasks.
//!
//! Each task implements [`Task`](crate::task::Task), defaults its display
//! name to its type name and accepts `.with_name(...)` to override it.

pub mod files;
pub mod pip;
pub mod registry;
pub mod resource;
pub mod venv;

pub use files::{CopyFiles, DeleteFiles};
pub use pip::{InstallOfflineWheel, InstallToVirtualEnvironment, PipInstallPackage};
pub use registry::ReadValueFromRegistry;
pub use resource::ModifyResource;
pub use venv::CreatePythonEnvironment;
