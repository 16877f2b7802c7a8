//! Driver module loading
//!
//! Enumerates candidate drivers from a catalog, loads them through a
//! module source (shared library or in-process plugin) and caches the
//! resulting operation tables.

mod icd_driver;
mod catalog;
mod library;
mod plugin;
mod loader;
#[cfg(test)]
pub(crate) mod mock_driver;

pub use icd_driver::{IcdDriver, DriverModule, ModuleSource};
pub use catalog::{DriverCatalog, StaticCatalog, EnvCatalog, DEFAULT_DRIVER_ENV_VAR};
pub use library::{LibraryModuleSource, LibraryDriver, DRIVER_ENTRY_POINTS};
pub use plugin::PluginModuleSource;
pub use loader::DriverLoader;
