//! Hierarchical configuration store access (the Windows registry).
//!
//! Values are addressed as `HIVE\subkey1\subkey2\...\value_name`. Reads go
//! through the [`ConfigStore`] trait so the native registry is just one
//! implementation ([`RegQueryStore`]); [`InMemoryConfigStore`] serves tests
//! and non-Windows hosts, optionally loaded from a JSON snapshot.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use tracing::debug;

use crate::command::CommandRunner;
use crate::error::{InstallKitError, Result};

/// Root namespace of the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Hive {
    #[strum(to_string = "HKEY_CLASSES_ROOT", serialize = "HKCR")]
    ClassesRoot,
    #[strum(to_string = "HKEY_CURRENT_USER", serialize = "HKCU")]
    CurrentUser,
    #[strum(to_string = "HKEY_LOCAL_MACHINE", serialize = "HKLM")]
    LocalMachine,
    #[strum(to_string = "HKEY_USERS", serialize = "HKU")]
    Users,
    #[strum(to_string = "HKEY_PERFORMANCE_DATA")]
    PerformanceData,
    #[strum(to_string = "HKEY_CURRENT_CONFIG", serialize = "HKCC")]
    CurrentConfig,
    /// Windows 9x only; kept so old paths still parse
    #[strum(to_string = "HKEY_DYN_DATA")]
    DynData,
}

/// A fully qualified registry value path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegistryPath {
    hive: Hive,
    subkey: String,
    value_name: String,
}

impl RegistryPath {
    pub fn hive(&self) -> Hive {
        self.hive
    }

    /// Key path below the hive, `\`-separated (may be empty)
    pub fn subkey(&self) -> &str {
        &self.subkey
    }

    pub fn value_name(&self) -> &str {
        &self.value_name
    }

    /// `HIVE\subkey`, the key that holds the value
    pub fn key_path(&self) -> String {
        if self.subkey.is_empty() {
            self.hive.to_string()
        } else {
            format!("{}\\{}", self.hive, self.subkey)
        }
    }
}

impl FromStr for RegistryPath {
    type Err = InstallKitError;

    fn from_str(path: &str) -> Result<Self> {
        let segments: Vec<&str> = path.split('\\').collect();
        if segments.len() < 2 {
            return Err(InstallKitError::invalid_registry_path(
                path,
                "expected HIVE\\...\\value_name",
            ));
        }
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(InstallKitError::invalid_registry_path(
                path,
                "empty path segment",
            ));
        }

        let hive = Hive::from_str(segments[0]).map_err(|_| {
            InstallKitError::invalid_registry_path(path, format!("unknown hive `{}`", segments[0]))
        })?;
        let value_name = segments[segments.len() - 1].to_string();
        let subkey = segments[1..segments.len() - 1].join("\\");

        Ok(Self {
            hive,
            subkey,
            value_name,
        })
    }
}

impl TryFrom<String> for RegistryPath {
    type Error = InstallKitError;

    fn try_from(path: String) -> Result<Self> {
        path.parse()
    }
}

impl From<RegistryPath> for String {
    fn from(path: RegistryPath) -> Self {
        path.to_string()
    }
}

impl fmt::Display for RegistryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\\{}", self.key_path(), self.value_name)
    }
}

/// A single registry value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RegistryValue {
    #[serde(rename = "REG_SZ")]
    String(String),
    #[serde(rename = "REG_EXPAND_SZ")]
    ExpandString(String),
    #[serde(rename = "REG_MULTI_SZ")]
    MultiString(Vec<String>),
    #[serde(rename = "REG_DWORD")]
    DWord(u32),
    #[serde(rename = "REG_QWORD")]
    QWord(u64),
    #[serde(rename = "REG_BINARY")]
    Binary(Vec<u8>),
}

impl RegistryValue {
    /// The string payload of `REG_SZ`/`REG_EXPAND_SZ` values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::ExpandString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::DWord(v) => Some(u64::from(*v)),
            Self::QWord(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for RegistryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) | Self::ExpandString(s) => f.write_str(s),
            Self::MultiString(items) => f.write_str(&items.join("\n")),
            Self::DWord(v) => write!(f, "{v}"),
            Self::QWord(v) => write!(f, "{v}"),
            Self::Binary(bytes) => {
                for byte in bytes {
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
        }
    }
}

/// Read access to a hive-based configuration store.
pub trait ConfigStore: Send + Sync {
    /// Read one value.
    ///
    /// # Errors
    ///
    /// `RegistryValueNotFound` when the key or value does not exist.
    fn read_value(&self, path: &RegistryPath) -> Result<RegistryValue>;
}

/// Configuration store backed by a map, for tests and non-Windows hosts.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigStore {
    values: HashMap<RegistryPath, RegistryValue>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (RegistryPath, RegistryValue)>) -> Self {
        Self {
            values: entries.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, path: RegistryPath, value: RegistryValue) {
        self.values.insert(path, value);
    }

    /// Load a JSON snapshot mapping value paths to typed values:
    ///
    /// ```json
    /// { "HKEY_LOCAL_MACHINE\\SOFTWARE\\App\\InstallDir": { "type": "REG_SZ", "data": "C:\\App" } }
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let values: HashMap<RegistryPath, RegistryValue> = serde_json::from_str(&content)?;
        debug!(
            file = %path.as_ref().display(),
            entries = values.len(),
            "loaded registry snapshot"
        );
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn read_value(&self, path: &RegistryPath) -> Result<RegistryValue> {
        self.values
            .get(path)
            .cloned()
            .ok_or_else(|| InstallKitError::RegistryValueNotFound {
                path: path.to_string(),
            })
    }
}

/// Native registry access through `reg query`.
#[derive(Clone)]
pub struct RegQueryStore {
    runner: Arc<dyn CommandRunner>,
}

impl RegQueryStore {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl ConfigStore for RegQueryStore {
    fn read_value(&self, path: &RegistryPath) -> Result<RegistryValue> {
        let command = vec![
            "reg".to_string(),
            "query".to_string(),
            path.key_path(),
            "/v".to_string(),
            path.value_name().to_string(),
        ];
        let output = self.runner.run(&command)?;
        if !output.success {
            return Err(InstallKitError::RegistryValueNotFound {
                path: path.to_string(),
            });
        }
        parse_reg_query(&output.stdout, path)
    }
}

/// Extract the value from `reg query` output, whose value lines read
/// `    <name>    <REG_TYPE>    <data>`.
pub fn parse_reg_query(stdout: &str, path: &RegistryPath) -> Result<RegistryValue> {
    for line in stdout.lines() {
        let Some(rest) = line.trim().strip_prefix(path.value_name()) else {
            continue;
        };
        // The name must be followed by the column separator
        if !rest.starts_with(char::is_whitespace) {
            continue;
        }
        let rest = rest.trim_start();
        let (kind, data) = match rest.split_once(char::is_whitespace) {
            Some((kind, data)) => (kind, data.trim()),
            None => (rest, ""),
        };
        return parse_typed_value(kind, data).ok_or_else(|| {
            InstallKitError::registry(format!("cannot parse {kind} data `{data}` for {path}"))
        });
    }
    Err(InstallKitError::RegistryValueNotFound {
        path: path.to_string(),
    })
}

fn parse_typed_value(kind: &str, data: &str) -> Option<RegistryValue> {
    match kind {
        "REG_SZ" => Some(RegistryValue::String(data.to_string())),
        "REG_EXPAND_SZ" => Some(RegistryValue::ExpandString(data.to_string())),
        "REG_MULTI_SZ" => Some(RegistryValue::MultiString(
            data.split("\\0")
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )),
        "REG_DWORD" => u32::from_str_radix(data.trim_start_matches("0x"), 16)
            .ok()
            .map(RegistryValue::DWord),
        "REG_QWORD" => u64::from_str_radix(data.trim_start_matches("0x"), 16)
            .ok()
            .map(RegistryValue::QWord),
        "REG_BINARY" => {
            if data.len() % 2 != 0 {
                return None;
            }
            (0..data.len())
                .step_by(2)
                .map(|i| u8::from_str_radix(data.get(i..i + 2)?, 16).ok())
                .collect::<Option<Vec<u8>>>()
                .map(RegistryValue::Binary)
        }
        _ => None,
    }
}

/// The configuration store for this platform: the real registry on
/// Windows, an empty in-memory store elsewhere.
pub fn native_config_store(runner: Arc<dyn CommandRunner>) -> Arc<dyn ConfigStore> {
    if cfg!(windows) {
        Arc::new(RegQueryStore::new(runner))
    } else {
        Arc::new(InMemoryConfigStore::new())
    }
}
