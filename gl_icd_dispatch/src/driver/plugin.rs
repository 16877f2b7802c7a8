/// In-process driver plugins
///
/// Lets an application (or a test) provide drivers without shipping shared
/// libraries: each driver name maps to a factory producing its operation
/// table.

use std::sync::Arc;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use super::icd_driver::{IcdDriver, ModuleSource};

/// Driver plugin factory function type
type DriverPluginFactory = Box<dyn Fn() -> Result<Arc<dyn IcdDriver>> + Send + Sync>;

/// Module source resolving driver names against registered factories
#[derive(Default)]
pub struct PluginModuleSource {
    plugins: FxHashMap<String, DriverPluginFactory>,
}

impl PluginModuleSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin
    ///
    /// Registering a name twice replaces the earlier factory.
    ///
    /// # Arguments
    ///
    /// * `name` - Driver name as it appears in the catalog
    /// * `factory` - Factory creating the driver's operation table
    pub fn register_plugin<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Arc<dyn IcdDriver>> + Send + Sync + 'static,
    {
        self.plugins.insert(name.into(), Box::new(factory));
    }

    /// Builder form of `register_plugin`
    pub fn with_plugin<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn IcdDriver>> + Send + Sync + 'static,
    {
        self.register_plugin(name, factory);
        self
    }

    /// Register an already constructed driver; every load returns it
    pub fn with_driver(self, name: impl Into<String>, driver: Arc<dyn IcdDriver>) -> Self {
        self.with_plugin(name, move || Ok(driver.clone()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }
}

impl ModuleSource for PluginModuleSource {
    fn load(&self, name: &str) -> Result<Arc<dyn IcdDriver>> {
        let factory = self.plugins
            .get(name)
            .ok_or_else(|| Error::DriverLoadError(format!("Plugin '{}' not found", name)))?;
        factory()
    }
}

#[cfg(test)]
#[path = "plugin_tests.rs"]
mod tests;
