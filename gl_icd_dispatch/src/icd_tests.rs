//! Unit tests for the Icd process-wide facade
//!
//! ICD_STATE is a global shared across all tests in the crate. Every test
//! here is #[serial] and starts from reset_for_testing().

use crate::glicd::{Dispatcher, Error, Icd, IcdConfig};
use crate::glicd::handles::{AttribMask, Surface};
use crate::glicd::log::{LogEntry, LogSeverity, Logger};
use crate::driver::mock_driver::MockDriver;
use crate::driver::{IcdDriver, PluginModuleSource, StaticCatalog};
use serial_test::serial;
use std::sync::{Arc, Mutex};

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Test logger that captures "severity: message" lines from the facade
struct TestLogger {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        if entry.source == "glicd::Icd" {
            self.entries.lock().unwrap().push(format!("{:?}: {}", entry.severity, entry.message));
        }
    }
}

fn setup() {
    Icd::reset_for_testing();
}

fn surface() -> Surface {
    Surface::from_raw(0x2000).unwrap()
}

fn mock_dispatcher(driver: &Arc<MockDriver>) -> Dispatcher {
    let source = PluginModuleSource::new()
        .with_driver(driver.name().to_string(), driver.clone() as Arc<dyn IcdDriver>);
    Dispatcher::new(
        Box::new(StaticCatalog::new([driver.name().to_string()])),
        Box::new(source),
    )
}

// ============================================================================
// INITIALIZATION AND SHUTDOWN TESTS
// ============================================================================

#[test]
#[serial]
fn test_not_initialized_by_default() {
    setup();

    assert!(!Icd::is_initialized());
    assert!(matches!(Icd::dispatcher(), Err(Error::NotInitialized)));
    assert_eq!(Icd::create_context(surface()), Err(Error::NotInitialized));
    assert_eq!(Icd::make_current(None, None), Err(Error::NotInitialized));
    assert_eq!(Icd::get_current_context(), Err(Error::NotInitialized));
    assert_eq!(Icd::get_proc_address("glFoo"), Err(Error::NotInitialized));
}

#[test]
#[serial]
fn test_initialize_from_config() {
    setup();

    Icd::initialize(&IcdConfig::default().with_drivers(["glicd_missing_driver"])).unwrap();

    assert!(Icd::is_initialized());
    // The only candidate cannot be loaded as a library
    assert_eq!(Icd::create_context(surface()), Err(Error::NoDriverAvailable));
    assert_eq!(Icd::dispatcher().unwrap().context_count(), 0);

    Icd::shutdown();
    assert!(!Icd::is_initialized());
}

#[test]
#[serial]
fn test_initialize_is_idempotent() {
    setup();
    let driver = MockDriver::shared("soft");
    Icd::install(mock_dispatcher(&driver)).unwrap();

    // Keeps the installed dispatcher
    Icd::initialize(&IcdConfig::default()).unwrap();
    Icd::create_context(surface()).unwrap();

    assert_eq!(driver.call_count("create_context"), 1);
    setup();
}

#[test]
#[serial]
fn test_install_replaces_dispatcher() {
    setup();
    let first = MockDriver::shared("first");
    let second = MockDriver::shared("second");

    assert!(Icd::install(mock_dispatcher(&first)).unwrap().is_none());
    let previous = Icd::install(mock_dispatcher(&second)).unwrap();

    assert!(previous.is_some());
    let context = Icd::create_context(surface()).unwrap();
    assert_eq!(Icd::context_info(context).unwrap().driver, "second");
    setup();
}

#[test]
#[serial]
fn test_shutdown_without_initialize() {
    setup();
    Icd::shutdown();
    Icd::shutdown();
    assert!(!Icd::is_initialized());
}

#[test]
#[serial]
fn test_shutdown_destroys_idle_contexts() {
    setup();
    let driver = MockDriver::shared("soft");
    Icd::install(mock_dispatcher(&driver)).unwrap();
    Icd::create_context(surface()).unwrap();
    assert_eq!(driver.live_context_count(), 1);

    Icd::shutdown();

    assert_eq!(driver.live_context_count(), 0);
}

#[test]
#[serial]
fn test_dispatcher_outlives_shutdown_while_held() {
    setup();
    let driver = MockDriver::shared("soft");
    Icd::install(mock_dispatcher(&driver)).unwrap();
    let held = Icd::dispatcher().unwrap();
    held.create_context(surface()).unwrap();

    Icd::shutdown();

    assert_eq!(driver.live_context_count(), 1);
    drop(held);
    assert_eq!(driver.live_context_count(), 0);
}

// ============================================================================
// DISPATCH WRAPPER TESTS
// ============================================================================

#[test]
#[serial]
fn test_static_wrappers_full_lifecycle() {
    setup();
    let driver = MockDriver::shared("soft");
    driver.add_proc("glGenBuffers", 0xB0F);
    Icd::install(mock_dispatcher(&driver)).unwrap();

    let a = Icd::create_context(surface()).unwrap();
    let b = Icd::create_layer_context(surface(), 1).unwrap();
    assert_eq!(Icd::share_lists(a, b), Ok(true));
    assert_eq!(Icd::copy_context(a, b, AttribMask::TEXTURE), Ok(true));

    Icd::make_current(Some(surface()), Some(a)).unwrap();
    assert_eq!(Icd::get_current_context(), Ok(Some(a)));
    assert_eq!(Icd::get_current_surface(), Ok(Some(surface())));
    Icd::swap_buffers(surface()).unwrap();
    assert!(Icd::get_proc_address("glGenBuffers").unwrap().is_some());
    assert_eq!(Icd::delete_context(a), Err(Error::ContextBusy));

    Icd::make_current(None, None).unwrap();
    assert_eq!(Icd::get_current_context(), Ok(None));
    Icd::delete_context(a).unwrap();
    Icd::delete_context(b).unwrap();
    assert_eq!(driver.live_context_count(), 0);
    setup();
}

// ============================================================================
// LOGGING API TESTS
// ============================================================================

#[test]
#[serial]
fn test_errors_are_logged() {
    setup();
    let entries = Arc::new(Mutex::new(Vec::new()));
    Icd::set_logger(TestLogger { entries: entries.clone() });

    let _ = Icd::dispatcher();

    Icd::reset_logger();
    let entries = entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].starts_with("Error:"));
    assert!(entries[0].contains("not initialized"));
}

#[test]
#[serial]
fn test_log_and_log_detailed() {
    setup();
    let entries = Arc::new(Mutex::new(Vec::new()));
    Icd::set_logger(TestLogger { entries: entries.clone() });

    Icd::log(LogSeverity::Info, "glicd::Icd", "plain".to_string());
    Icd::log_detailed(LogSeverity::Error, "glicd::Icd", "detailed".to_string(), "icd.rs", 1);

    Icd::reset_logger();
    let entries = entries.lock().unwrap();
    assert_eq!(*entries, vec!["Info: plain".to_string(), "Error: detailed".to_string()]);
}
