/// IcdDriver trait - the operation table every driver module exposes

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::handles::{AttribMask, NativeContext, ProcAddress, Surface};

// ============================================================================
// IcdDriver trait
// ============================================================================

/// Operation table of a loaded driver module (the ICD contract)
///
/// Implemented by `LibraryDriver` for drivers shipped as shared libraries,
/// and by in-process drivers registered through `PluginModuleSource`.
/// All entry points may block; the dispatcher never calls them while
/// holding its metadata lock.
pub trait IcdDriver: Send + Sync {
    /// Create a driver-native context for a surface
    ///
    /// # Returns
    ///
    /// The native handle, or None if the driver cannot serve this surface
    fn create_context(&self, surface: Surface) -> Option<NativeContext>;

    /// Create a driver-native context for a layer plane of a surface
    ///
    /// # Arguments
    ///
    /// * `surface` - Surface to render to
    /// * `layer` - Layer plane (0 = main plane, > 0 overlay, < 0 underlay)
    fn create_layer_context(&self, surface: Surface, layer: i32) -> Option<NativeContext>;

    /// Destroy a native context. Returns false if the driver refused.
    fn delete_context(&self, context: NativeContext) -> bool;

    /// Bind a native context to a surface on the calling thread
    fn set_context(&self, surface: Surface, context: NativeContext) -> bool;

    /// Copy the state groups selected by `mask` from `src` to `dst`
    fn copy_context(&self, src: NativeContext, dst: NativeContext, mask: AttribMask) -> bool;

    /// Enable display-list sharing between two native contexts
    fn share_lists(&self, first: NativeContext, second: NativeContext) -> bool;

    /// Present the back buffer of a surface
    fn swap_buffers(&self, surface: Surface) -> bool;

    /// Resolve a GL entry point by name
    fn get_proc_address(&self, name: &str) -> Option<ProcAddress>;
}

// ============================================================================
// ModuleSource trait
// ============================================================================

/// Resolves a driver name to its operation table
///
/// A source either opens a shared library (`LibraryModuleSource`) or looks
/// up an in-process factory (`PluginModuleSource`). Returning an error means
/// the module could not be loaded or its operation table is incomplete.
pub trait ModuleSource: Send + Sync {
    fn load(&self, name: &str) -> Result<Arc<dyn IcdDriver>>;
}

// ============================================================================
// DriverModule
// ============================================================================

/// A loaded driver module
///
/// One instance exists per loaded driver; every context created by the
/// driver shares it. Two contexts use the same driver exactly when their
/// modules are the same allocation.
pub struct DriverModule {
    name: String,
    driver: Arc<dyn IcdDriver>,
}

impl DriverModule {
    pub fn new(name: impl Into<String>, driver: Arc<dyn IcdDriver>) -> Self {
        Self {
            name: name.into(),
            driver,
        }
    }

    /// Name the module was enumerated under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The module's operation table
    pub fn driver(&self) -> &dyn IcdDriver {
        self.driver.as_ref()
    }

    /// Whether two modules are the same loaded driver
    pub fn same_module(a: &Arc<DriverModule>, b: &Arc<DriverModule>) -> bool {
        Arc::ptr_eq(a, b)
    }
}

impl fmt::Debug for DriverModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverModule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
