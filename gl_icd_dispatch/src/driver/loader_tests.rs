/// Tests for DriverLoader caching and failure memo

use super::*;
use crate::driver::mock_driver::MockDriver;
use crate::driver::{IcdDriver, PluginModuleSource};
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================================
// Helpers
// ============================================================================

/// Source whose "flaky" driver fails its first `fail_first` loads
fn counting_source(loads: Arc<AtomicUsize>, fail_first: usize) -> PluginModuleSource {
    PluginModuleSource::new()
        .with_plugin("soft", || Ok(MockDriver::shared("soft") as Arc<dyn IcdDriver>))
        .with_plugin("flaky", move || {
            let attempt = loads.fetch_add(1, Ordering::SeqCst);
            if attempt < fail_first {
                Err(Error::DriverLoadError("device not ready".to_string()))
            } else {
                Ok(MockDriver::shared("flaky") as Arc<dyn IcdDriver>)
            }
        })
}

// ============================================================================
// Tests: Caching
// ============================================================================

#[test]
fn test_load_caches_module() {
    let loader = DriverLoader::new(Box::new(counting_source(Arc::new(AtomicUsize::new(0)), 0)));

    let first = loader.load("soft").unwrap();
    let second = loader.load("soft").unwrap();

    assert!(DriverModule::same_module(&first, &second));
    assert_eq!(first.name(), "soft");
    assert!(loader.is_loaded("soft"));
}

#[test]
fn test_different_drivers_are_different_modules() {
    let loader = DriverLoader::new(Box::new(counting_source(Arc::new(AtomicUsize::new(0)), 0)));

    let soft = loader.load("soft").unwrap();
    let flaky = loader.load("flaky").unwrap();

    assert!(!DriverModule::same_module(&soft, &flaky));
    assert_eq!(loader.loaded_modules(), vec!["flaky".to_string(), "soft".to_string()]);
}

#[test]
fn test_load_source_called_once_per_driver() {
    let loads = Arc::new(AtomicUsize::new(0));
    let loader = DriverLoader::new(Box::new(counting_source(loads.clone(), 0)));

    loader.load("flaky").unwrap();
    loader.load("flaky").unwrap();
    loader.load("flaky").unwrap();

    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Tests: Failure memo
// ============================================================================

#[test]
fn test_failed_load_is_not_cached_as_module() {
    let loader = DriverLoader::new(Box::new(counting_source(Arc::new(AtomicUsize::new(0)), 1)));

    assert!(loader.load("flaky").is_err());
    assert!(!loader.is_loaded("flaky"));
    assert!(loader.is_failed("flaky"));
}

#[test]
fn test_failed_load_is_refused_until_invalidated() {
    let loads = Arc::new(AtomicUsize::new(0));
    let loader = DriverLoader::new(Box::new(counting_source(loads.clone(), 1)));

    assert!(loader.load("flaky").is_err());
    // Remembered failure: the source is not consulted again
    assert!(matches!(loader.load("flaky"), Err(Error::DriverLoadError(_))));
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    assert!(loader.invalidate_failed("flaky"));
    assert!(loader.load("flaky").is_ok());
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[test]
fn test_invalidate_failed_unknown_name() {
    let loader = DriverLoader::new(Box::new(PluginModuleSource::new()));
    assert!(!loader.invalidate_failed("never_loaded"));
}

#[test]
fn test_invalidate_all_failed() {
    let loader = DriverLoader::new(Box::new(PluginModuleSource::new()));

    assert!(loader.load("a").is_err());
    assert!(loader.load("b").is_err());
    assert!(loader.is_failed("a") && loader.is_failed("b"));

    loader.invalidate_all_failed();

    assert!(!loader.is_failed("a"));
    assert!(!loader.is_failed("b"));
}
