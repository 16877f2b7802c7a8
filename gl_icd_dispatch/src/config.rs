/// Dispatcher configuration
///
/// Describes where driver names come from and where shared-library drivers
/// are searched for. `IcdConfig::from_env()` is the usual starting point;
/// fields can be overridden afterwards.

use std::env;
use std::path::PathBuf;

use crate::driver::{
    DriverCatalog, EnvCatalog, LibraryModuleSource, ModuleSource, StaticCatalog,
    DEFAULT_DRIVER_ENV_VAR,
};

/// Environment variable listing extra driver search directories
pub const SEARCH_PATH_ENV_VAR: &str = "GL_ICD_PATH";

/// ICD dispatch configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcdConfig {
    /// Fixed candidate list. When None, candidates are read from
    /// `driver_env_var` at every enumeration.
    pub drivers: Option<Vec<String>>,
    /// Environment variable holding the candidate list
    pub driver_env_var: String,
    /// Directories searched for driver libraries before the system path
    pub search_paths: Vec<PathBuf>,
}

impl Default for IcdConfig {
    fn default() -> Self {
        Self {
            drivers: None,
            driver_env_var: DEFAULT_DRIVER_ENV_VAR.to_string(),
            search_paths: Vec::new(),
        }
    }
}

impl IcdConfig {
    /// Default configuration plus search directories from `GL_ICD_PATH`
    pub fn from_env() -> Self {
        let search_paths = env::var_os(SEARCH_PATH_ENV_VAR)
            .map(|value| {
                env::split_paths(&value)
                    .filter(|path| !path.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            search_paths,
            ..Self::default()
        }
    }

    /// Use a fixed candidate list instead of the environment
    pub fn with_drivers<I, S>(mut self, drivers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drivers = Some(drivers.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Catalog enumerating the configured candidates
    pub fn catalog(&self) -> Box<dyn DriverCatalog> {
        match &self.drivers {
            Some(drivers) => Box::new(StaticCatalog::new(drivers.iter().cloned())),
            None => Box::new(EnvCatalog::new(self.driver_env_var.clone())),
        }
    }

    /// Shared-library source searching the configured directories
    pub fn module_source(&self) -> Box<dyn ModuleSource> {
        Box::new(LibraryModuleSource::new(self.search_paths.clone()))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
