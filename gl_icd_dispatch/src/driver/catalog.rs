/// Driver catalogs - ordered sources of candidate driver names
///
/// The catalog is the only view the dispatcher has of the configuration
/// store listing installed drivers. Enumeration is restartable: every call
/// to `candidates()` starts again from the first entry and reflects the
/// store as it is at that moment.

use std::env;

/// Environment variable read by `EnvCatalog::default()`
pub const DEFAULT_DRIVER_ENV_VAR: &str = "GL_ICD_DRIVERS";

/// Ordered, restartable enumeration of installed driver names
pub trait DriverCatalog: Send + Sync {
    /// Enumerate driver names in store order
    fn candidates(&self) -> Box<dyn Iterator<Item = String> + '_>;
}

/// Catalog backed by a fixed list of driver names
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    drivers: Vec<String>,
}

impl StaticCatalog {
    pub fn new<I, S>(drivers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            drivers: drivers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

impl DriverCatalog for StaticCatalog {
    fn candidates(&self) -> Box<dyn Iterator<Item = String> + '_> {
        Box::new(self.drivers.iter().cloned())
    }
}

/// Catalog read from an environment variable
///
/// The variable holds driver names separated by the platform path-list
/// separator (`:` on Unix, `;` on Windows). It is read again on every
/// enumeration, so drivers installed at runtime are picked up by the next
/// context creation. An unset variable yields no candidates.
#[derive(Debug, Clone)]
pub struct EnvCatalog {
    var: String,
}

impl EnvCatalog {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    /// Name of the environment variable this catalog reads
    pub fn var(&self) -> &str {
        &self.var
    }
}

impl Default for EnvCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_DRIVER_ENV_VAR)
    }
}

impl DriverCatalog for EnvCatalog {
    fn candidates(&self) -> Box<dyn Iterator<Item = String> + '_> {
        let Some(value) = env::var_os(&self.var) else {
            return Box::new(std::iter::empty());
        };
        let drivers: Vec<String> = env::split_paths(&value)
            .map(|entry| entry.to_string_lossy().trim().to_string())
            .filter(|entry| !entry.is_empty())
            .collect();
        Box::new(drivers.into_iter())
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
