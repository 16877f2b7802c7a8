/// Driver loader - resolves driver names to cached driver modules.
///
/// Successfully loaded modules are cached for the loader's lifetime and are
/// never unloaded. A name whose load failed is remembered and refused on
/// later calls until the failure is invalidated, so a broken driver is not
/// reopened on every context creation.

use std::sync::{Arc, Mutex, MutexGuard};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use super::icd_driver::{DriverModule, ModuleSource};

#[derive(Default)]
struct LoaderCache {
    modules: FxHashMap<String, Arc<DriverModule>>,
    failed: FxHashSet<String>,
}

pub struct DriverLoader {
    source: Box<dyn ModuleSource>,
    cache: Mutex<LoaderCache>,
}

impl DriverLoader {
    pub fn new(source: Box<dyn ModuleSource>) -> Self {
        Self {
            source,
            cache: Mutex::new(LoaderCache::default()),
        }
    }

    fn cache(&self) -> Result<MutexGuard<'_, LoaderCache>> {
        self.cache
            .lock()
            .map_err(|_| Error::LockPoisoned("driver loader cache".to_string()))
    }

    /// Load a driver module by name
    ///
    /// Returns the cached module if the driver was loaded before. The module
    /// source is called without holding the cache lock; if two threads load
    /// the same driver concurrently, the first module cached wins and both
    /// callers receive it.
    ///
    /// # Errors
    ///
    /// `DriverLoadError` if the module cannot be loaded, its operation table
    /// is incomplete, or an earlier load of the same name failed and has not
    /// been invalidated.
    pub fn load(&self, name: &str) -> Result<Arc<DriverModule>> {
        {
            let cache = self.cache()?;
            if let Some(module) = cache.modules.get(name) {
                return Ok(module.clone());
            }
            if cache.failed.contains(name) {
                return Err(Error::DriverLoadError(format!(
                    "driver '{}' failed to load earlier", name
                )));
            }
        }

        match self.source.load(name) {
            Ok(driver) => {
                let module = Arc::new(DriverModule::new(name, driver));
                let mut cache = self.cache()?;
                let module = cache.modules
                    .entry(name.to_string())
                    .or_insert(module)
                    .clone();
                crate::icd_info!("glicd::DriverLoader", "Driver '{}' loaded", name);
                Ok(module)
            }
            Err(error) => {
                self.cache()?.failed.insert(name.to_string());
                crate::icd_warn!("glicd::DriverLoader", "Driver '{}' failed to load: {}", name, error);
                Err(error)
            }
        }
    }

    /// Whether `name` is cached as loaded
    pub fn is_loaded(&self, name: &str) -> bool {
        self.cache().map(|cache| cache.modules.contains_key(name)).unwrap_or(false)
    }

    /// Whether `name` is remembered as failed
    pub fn is_failed(&self, name: &str) -> bool {
        self.cache().map(|cache| cache.failed.contains(name)).unwrap_or(false)
    }

    /// Names of all loaded modules, sorted
    pub fn loaded_modules(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cache()
            .map(|cache| cache.modules.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Forget a failed load so the next `load(name)` tries again
    ///
    /// Returns true if `name` was remembered as failed.
    pub fn invalidate_failed(&self, name: &str) -> bool {
        self.cache().map(|mut cache| cache.failed.remove(name)).unwrap_or(false)
    }

    /// Forget all failed loads
    pub fn invalidate_all_failed(&self) {
        if let Ok(mut cache) = self.cache() {
            cache.failed.clear();
        }
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
