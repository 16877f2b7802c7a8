/// Icd - process-wide dispatcher and logger
///
/// Holds the dispatcher that client entry points route through and the
/// logger every `icd_*!` macro writes to. Both live in thread-safe static
/// storage so that an exported C entry point can reach them without
/// threading state through the caller.

use std::sync::{Arc, OnceLock, RwLock};
use std::time::SystemTime;

use crate::config::IcdConfig;
use crate::context::{ContextHandle, ContextInfo};
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::handles::{AttribMask, ProcAddress, Surface};
use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};

// ===== INTERNAL STATE =====

/// Global dispatch state storage
static ICD_STATE: OnceLock<IcdState> = OnceLock::new();

/// Global logger (console logger with the `GL_ICD_LOG` threshold until replaced)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

struct IcdState {
    dispatcher: RwLock<Option<Arc<Dispatcher>>>,
}

impl IcdState {
    fn new() -> Self {
        Self {
            dispatcher: RwLock::new(None),
        }
    }
}

// ===== PUBLIC API =====

/// Process-wide ICD facade
///
/// # Example
///
/// ```no_run
/// use gl_icd_dispatch::glicd::{Icd, IcdConfig};
/// use gl_icd_dispatch::glicd::handles::Surface;
///
/// Icd::initialize(&IcdConfig::from_env())?;
///
/// let surface = Surface::from_raw(0x1000).unwrap();
/// let context = Icd::create_context(surface)?;
/// Icd::make_current(Some(surface), Some(context))?;
///
/// Icd::make_current(None, None)?;
/// Icd::delete_context(context)?;
/// Icd::shutdown();
/// # Ok::<(), gl_icd_dispatch::glicd::Error>(())
/// ```
pub struct Icd;

impl Icd {
    /// Helper to log errors before returning them (internal use)
    fn log_and_return_error(error: Error) -> Error {
        crate::icd_error!("glicd::Icd", "{}", error);
        error
    }

    fn state() -> &'static IcdState {
        ICD_STATE.get_or_init(IcdState::new)
    }

    fn logger() -> &'static RwLock<Box<dyn Logger>> {
        LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger::from_env())))
    }

    /// Install a dispatcher built from `config`
    ///
    /// Does nothing if a dispatcher is already installed.
    pub fn initialize(config: &IcdConfig) -> Result<()> {
        let mut lock = Self::state().dispatcher.write()
            .map_err(|_| Self::log_and_return_error(
                Error::LockPoisoned("ICD dispatcher".to_string())
            ))?;

        if lock.is_some() {
            crate::icd_debug!("glicd::Icd", "Already initialized");
            return Ok(());
        }

        *lock = Some(Arc::new(Dispatcher::from_config(config)));
        crate::icd_info!("glicd::Icd", "Dispatcher initialized");
        Ok(())
    }

    /// Install `dispatcher`, replacing the current one
    ///
    /// Returns the replaced dispatcher. Contexts current through it stay
    /// alive until it is dropped.
    pub fn install(dispatcher: Dispatcher) -> Result<Option<Arc<Dispatcher>>> {
        let mut lock = Self::state().dispatcher.write()
            .map_err(|_| Self::log_and_return_error(
                Error::LockPoisoned("ICD dispatcher".to_string())
            ))?;

        let previous = lock.replace(Arc::new(dispatcher));
        crate::icd_info!("glicd::Icd", "Dispatcher installed");
        Ok(previous)
    }

    /// Remove the installed dispatcher
    ///
    /// The dispatcher is destroyed once the last `Arc` obtained from
    /// `Icd::dispatcher()` is dropped.
    pub fn shutdown() {
        let previous = Self::state()
            .dispatcher
            .write()
            .ok()
            .and_then(|mut lock| lock.take());

        // Dropped outside the lock: dispatcher teardown calls into drivers
        if previous.is_some() {
            drop(previous);
            crate::icd_info!("glicd::Icd", "Dispatcher shut down");
        }
    }

    pub fn is_initialized() -> bool {
        Self::state()
            .dispatcher
            .read()
            .map(|lock| lock.is_some())
            .unwrap_or(false)
    }

    /// The installed dispatcher
    ///
    /// # Errors
    ///
    /// `NotInitialized` if no dispatcher is installed.
    pub fn dispatcher() -> Result<Arc<Dispatcher>> {
        let lock = Self::state().dispatcher.read()
            .map_err(|_| Self::log_and_return_error(
                Error::LockPoisoned("ICD dispatcher".to_string())
            ))?;

        lock.clone()
            .ok_or_else(|| Self::log_and_return_error(Error::NotInitialized))
    }

    // ===== DISPATCH API =====

    pub fn create_context(surface: Surface) -> Result<ContextHandle> {
        Self::dispatcher()?.create_context(surface)
    }

    pub fn create_layer_context(surface: Surface, layer_plane: i32) -> Result<ContextHandle> {
        Self::dispatcher()?.create_layer_context(surface, layer_plane)
    }

    pub fn delete_context(context: ContextHandle) -> Result<()> {
        Self::dispatcher()?.delete_context(context)
    }

    pub fn make_current(surface: Option<Surface>, context: Option<ContextHandle>) -> Result<()> {
        Self::dispatcher()?.make_current(surface, context)
    }

    pub fn copy_context(src: ContextHandle, dst: ContextHandle, mask: AttribMask) -> Result<bool> {
        Self::dispatcher()?.copy_context(src, dst, mask)
    }

    pub fn share_lists(first: ContextHandle, second: ContextHandle) -> Result<bool> {
        Self::dispatcher()?.share_lists(first, second)
    }

    pub fn swap_buffers(surface: Surface) -> Result<()> {
        Self::dispatcher()?.swap_buffers(surface)
    }

    pub fn get_proc_address(name: &str) -> Result<Option<ProcAddress>> {
        Self::dispatcher()?.get_proc_address(name)
    }

    pub fn get_current_context() -> Result<Option<ContextHandle>> {
        Ok(Self::dispatcher()?.get_current_context())
    }

    pub fn get_current_surface() -> Result<Option<Surface>> {
        Ok(Self::dispatcher()?.get_current_surface())
    }

    pub fn context_info(context: ContextHandle) -> Result<ContextInfo> {
        Self::dispatcher()?.context_info(context)
    }

    /// Reset global state for testing (only available in test builds)
    #[cfg(test)]
    pub fn reset_for_testing() {
        Self::shutdown();
        Self::reset_logger();
    }

    // ===== LOGGING API =====

    /// Set a custom logger
    ///
    /// # Example
    ///
    /// ```no_run
    /// use gl_icd_dispatch::glicd::{Icd, log::{Logger, LogEntry}};
    ///
    /// struct HostLogger;
    /// impl Logger for HostLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Forward to the host application's log...
    ///     }
    /// }
    ///
    /// Icd::set_logger(HostLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        if let Ok(mut lock) = Self::logger().write() {
            *lock = Box::new(logger);
        }
    }

    /// Reinstall the console logger, re-reading `GL_ICD_LOG`
    pub fn reset_logger() {
        if let Ok(mut lock) = Self::logger().write() {
            *lock = Box::new(DefaultLogger::from_env());
        }
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by `icd_log!` and the severity macros built on it.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = Self::logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Internal logging method with file:line information (for ERROR logs)
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if let Ok(lock) = Self::logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "icd_tests.rs"]
mod tests;
