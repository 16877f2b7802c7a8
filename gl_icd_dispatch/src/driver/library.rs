/// Shared-library driver modules
///
/// Opens an ICD shared library with libloading and resolves its `Drv*`
/// entry points into a `LibraryDriver`. A library missing any entry point
/// is rejected as an incomplete operation table.

use std::ffi::{c_char, c_void, CString};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;

use libloading::Library;

use crate::error::{Error, Result};
use crate::handles::{AttribMask, NativeContext, ProcAddress, Surface};
use super::icd_driver::{IcdDriver, ModuleSource};

/// Entry points a driver library must export
pub const DRIVER_ENTRY_POINTS: [&str; 8] = [
    "DrvCreateContext",
    "DrvCreateLayerContext",
    "DrvDeleteContext",
    "DrvSetContext",
    "DrvCopyContext",
    "DrvShareLists",
    "DrvSwapBuffers",
    "DrvGetProcAddress",
];

// C ABI of the entry points. BOOL results are 32-bit integers.
type DrvCreateContextFn = unsafe extern "system" fn(surface: *mut c_void) -> *mut c_void;
type DrvCreateLayerContextFn = unsafe extern "system" fn(surface: *mut c_void, layer: i32) -> *mut c_void;
type DrvDeleteContextFn = unsafe extern "system" fn(context: *mut c_void) -> i32;
type DrvSetContextFn = unsafe extern "system" fn(
    surface: *mut c_void,
    context: *mut c_void,
    callback: *mut c_void,
) -> *const c_void;
type DrvCopyContextFn = unsafe extern "system" fn(src: *mut c_void, dst: *mut c_void, mask: u32) -> i32;
type DrvShareListsFn = unsafe extern "system" fn(first: *mut c_void, second: *mut c_void) -> i32;
type DrvSwapBuffersFn = unsafe extern "system" fn(surface: *mut c_void) -> i32;
type DrvGetProcAddressFn = unsafe extern "system" fn(name: *const c_char) -> *const c_void;

// ============================================================================
// LibraryDriver
// ============================================================================

/// Driver backed by a loaded shared library
pub struct LibraryDriver {
    name: String,
    path: PathBuf,
    create_context: DrvCreateContextFn,
    create_layer_context: DrvCreateLayerContextFn,
    delete_context: DrvDeleteContextFn,
    set_context: DrvSetContextFn,
    copy_context: DrvCopyContextFn,
    share_lists: DrvShareListsFn,
    swap_buffers: DrvSwapBuffersFn,
    get_proc_address: DrvGetProcAddressFn,
    // Keeps the entry points above valid; never unloaded before them.
    _library: Library,
}

impl LibraryDriver {
    /// Open a driver library and resolve all entry points
    ///
    /// # Safety
    ///
    /// Loading a library runs its initialization routines, and the resolved
    /// symbols are trusted to have the ICD signatures declared in this module.
    pub unsafe fn open(name: &str, path: &Path) -> Result<Self> {
        let library = Library::new(path).map_err(|e| {
            Error::DriverLoadError(format!("cannot open '{}' ({}): {}", name, path.display(), e))
        })?;

        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            create_context: resolve(&library, name, "DrvCreateContext")?,
            create_layer_context: resolve(&library, name, "DrvCreateLayerContext")?,
            delete_context: resolve(&library, name, "DrvDeleteContext")?,
            set_context: resolve(&library, name, "DrvSetContext")?,
            copy_context: resolve(&library, name, "DrvCopyContext")?,
            share_lists: resolve(&library, name, "DrvShareLists")?,
            swap_buffers: resolve(&library, name, "DrvSwapBuffers")?,
            get_proc_address: resolve(&library, name, "DrvGetProcAddress")?,
            _library: library,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path the library was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Resolve one entry point, copying the function pointer out of the symbol
unsafe fn resolve<T: Copy>(library: &Library, driver: &str, symbol: &str) -> Result<T> {
    let mut symbol_name = Vec::with_capacity(symbol.len() + 1);
    symbol_name.extend_from_slice(symbol.as_bytes());
    symbol_name.push(0);

    library
        .get::<T>(&symbol_name)
        .map(|entry| *entry)
        .map_err(|e| {
            Error::DriverLoadError(format!(
                "incomplete operation table in '{}': missing {} ({})",
                driver, symbol, e
            ))
        })
}

impl IcdDriver for LibraryDriver {
    fn create_context(&self, surface: Surface) -> Option<NativeContext> {
        NativeContext::from_ptr(unsafe { (self.create_context)(surface.as_ptr()) })
    }

    fn create_layer_context(&self, surface: Surface, layer: i32) -> Option<NativeContext> {
        NativeContext::from_ptr(unsafe { (self.create_layer_context)(surface.as_ptr(), layer) })
    }

    fn delete_context(&self, context: NativeContext) -> bool {
        unsafe { (self.delete_context)(context.as_ptr()) != 0 }
    }

    fn set_context(&self, surface: Surface, context: NativeContext) -> bool {
        // The driver returns its dispatch table; null means failure.
        let table = unsafe { (self.set_context)(surface.as_ptr(), context.as_ptr(), ptr::null_mut()) };
        !table.is_null()
    }

    fn copy_context(&self, src: NativeContext, dst: NativeContext, mask: AttribMask) -> bool {
        unsafe { (self.copy_context)(src.as_ptr(), dst.as_ptr(), mask.bits()) != 0 }
    }

    fn share_lists(&self, first: NativeContext, second: NativeContext) -> bool {
        unsafe { (self.share_lists)(first.as_ptr(), second.as_ptr()) != 0 }
    }

    fn swap_buffers(&self, surface: Surface) -> bool {
        unsafe { (self.swap_buffers)(surface.as_ptr()) != 0 }
    }

    fn get_proc_address(&self, name: &str) -> Option<ProcAddress> {
        let name = CString::new(name).ok()?;
        ProcAddress::from_ptr(unsafe { (self.get_proc_address)(name.as_ptr()) })
    }
}

// ============================================================================
// LibraryModuleSource
// ============================================================================

/// Module source opening driver shared libraries
///
/// A driver name is resolved to a file in this order:
/// 1. a name that already looks like a path (has a directory or an
///    extension) is used as-is
/// 2. the platform library file name (`lib<name>.so`, `<name>.dll`, ...)
///    in each search directory, first match wins
/// 3. the platform library file name, left to the system loader's search
#[derive(Debug, Clone, Default)]
pub struct LibraryModuleSource {
    search_paths: Vec<PathBuf>,
}

impl LibraryModuleSource {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Resolve a driver name to the path handed to the system loader
    pub fn resolve_path(&self, name: &str) -> PathBuf {
        let as_path = Path::new(name);
        if as_path.components().count() > 1 || as_path.extension().is_some() {
            return as_path.to_path_buf();
        }

        let file_name = libloading::library_filename(name);
        self.search_paths
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.is_file())
            .unwrap_or_else(|| PathBuf::from(file_name))
    }
}

impl ModuleSource for LibraryModuleSource {
    fn load(&self, name: &str) -> Result<Arc<dyn IcdDriver>> {
        let path = self.resolve_path(name);
        let driver = unsafe { LibraryDriver::open(name, &path)? };
        crate::icd_debug!("glicd::LibraryModuleSource",
            "Opened driver '{}' from {}", name, path.display());
        Ok(Arc::new(driver))
    }
}

#[cfg(test)]
#[path = "library_tests.rs"]
mod tests;
