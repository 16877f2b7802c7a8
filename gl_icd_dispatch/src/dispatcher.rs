/// Dispatcher - the client-facing operation set of the ICD layer.
///
/// A Dispatcher owns a driver catalog, a driver loader and the registry of
/// live contexts. Every operation validates caller handles against the
/// registry, performs the binding transition it needs under the registry
/// lock, and calls into the driver with the lock released.
///
/// Contexts are reserved before a driver call so that the lock can be
/// dropped without letting another thread race the same context:
/// `Pending` while a make-current is inside the driver, `Releasing` while a
/// delete is, and a pin count while a copy or share is.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use crate::config::IcdConfig;
use crate::context::binding;
use crate::context::{
    ContextHandle, ContextInfo, ContextRegistry, ContextState, RenderingContext,
};
use crate::driver::{DriverCatalog, DriverLoader, DriverModule, IcdDriver, ModuleSource};
use crate::error::{Error, Result};
use crate::handles::{AttribMask, NativeContext, ProcAddress, Surface};

/// Source of dispatcher ids, used to key thread bindings
static NEXT_DISPATCHER_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// ProcNamespace
// ============================================================================

/// Family an entry point name belongs to, decided by its prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcNamespace {
    /// `wgl*` window-system extensions (not served)
    Wgl,
    /// `glu*` utility library entry points (not served)
    Glu,
    /// `gl*` entry points, resolved by the current driver
    Gl,
    /// Anything else
    Unknown,
}

impl ProcNamespace {
    pub fn classify(name: &str) -> Self {
        if name.starts_with("wgl") {
            ProcNamespace::Wgl
        } else if name.starts_with("glu") {
            ProcNamespace::Glu
        } else if name.starts_with("gl") {
            ProcNamespace::Gl
        } else {
            ProcNamespace::Unknown
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Rendering context registry and driver dispatch
///
/// # Example
///
/// ```no_run
/// use gl_icd_dispatch::glicd::{Dispatcher, IcdConfig};
/// use gl_icd_dispatch::glicd::handles::Surface;
///
/// let dispatcher = Dispatcher::from_config(&IcdConfig::from_env());
/// let surface = Surface::from_raw(0x1000).unwrap();
///
/// let context = dispatcher.create_context(surface)?;
/// dispatcher.make_current(Some(surface), Some(context))?;
/// dispatcher.swap_buffers(surface)?;
/// dispatcher.make_current(None, None)?;
/// dispatcher.delete_context(context)?;
/// # Ok::<(), gl_icd_dispatch::glicd::Error>(())
/// ```
pub struct Dispatcher {
    id: u64,
    catalog: Box<dyn DriverCatalog>,
    loader: DriverLoader,
    registry: Arc<Mutex<ContextRegistry>>,
}

impl Dispatcher {
    /// Create a dispatcher enumerating `catalog` and loading through `source`
    pub fn new(catalog: Box<dyn DriverCatalog>, source: Box<dyn ModuleSource>) -> Self {
        Self {
            id: NEXT_DISPATCHER_ID.fetch_add(1, Ordering::Relaxed),
            catalog,
            loader: DriverLoader::new(source),
            registry: Arc::new(Mutex::new(ContextRegistry::new())),
        }
    }

    /// Create a dispatcher for shared-library drivers described by `config`
    pub fn from_config(config: &IcdConfig) -> Self {
        Self::new(config.catalog(), config.module_source())
    }

    /// Helper to log errors before returning them (internal use)
    fn log_and_return_error(error: Error) -> Error {
        match &error {
            Error::DriverLoadError(msg) => {
                crate::icd_error!("glicd::Dispatcher", "Driver load error: {}", msg);
            }
            Error::DriverCallFailed(msg) => {
                crate::icd_error!("glicd::Dispatcher", "Driver call failed: {}", msg);
            }
            _ if error.is_caller_error() => {
                crate::icd_debug!("glicd::Dispatcher", "Rejected: {}", error);
            }
            _ => {
                crate::icd_error!("glicd::Dispatcher", "Dispatch error: {}", error);
            }
        }
        error
    }

    fn lock_registry(&self) -> Result<MutexGuard<'_, ContextRegistry>> {
        self.registry.lock().map_err(|_| {
            Self::log_and_return_error(Error::LockPoisoned("context registry".to_string()))
        })
    }

    /// Registry lock for rollback and teardown paths, which must run even
    /// after another thread panicked
    fn lock_registry_recovering(&self) -> MutexGuard<'_, ContextRegistry> {
        lock_recovering(&self.registry)
    }

    // ===== CREATION / DELETION =====

    /// Create a context for `surface` with the first driver able to serve it
    ///
    /// Candidates are tried in catalog order. A candidate is skipped if its
    /// module fails to load or its native create returns nothing; the first
    /// candidate for which both succeed wins and later ones are not
    /// consulted.
    ///
    /// # Errors
    ///
    /// `NoDriverAvailable` if every candidate was skipped.
    pub fn create_context(&self, surface: Surface) -> Result<ContextHandle> {
        self.create_with(0, |driver| driver.create_context(surface))
    }

    /// Create a context for a layer plane of `surface`
    ///
    /// Same enumeration as `create_context`, using the drivers'
    /// create-layer entry point. The layer plane is recorded on the context.
    pub fn create_layer_context(&self, surface: Surface, layer_plane: i32) -> Result<ContextHandle> {
        self.create_with(layer_plane, |driver| driver.create_layer_context(surface, layer_plane))
    }

    fn create_with<F>(&self, layer_plane: i32, create: F) -> Result<ContextHandle>
    where
        F: Fn(&dyn IcdDriver) -> Option<NativeContext>,
    {
        for name in self.catalog.candidates() {
            let module = match self.loader.load(&name) {
                Ok(module) => module,
                Err(error) => {
                    crate::icd_debug!("glicd::Dispatcher", "Skipping driver '{}': {}", name, error);
                    continue;
                }
            };

            let Some(native) = create(module.driver()) else {
                crate::icd_warn!("glicd::Dispatcher",
                    "Driver '{}' could not create a context", name);
                continue;
            };

            let mut registry = match self.lock_registry() {
                Ok(registry) => registry,
                Err(error) => {
                    module.driver().delete_context(native);
                    return Err(error);
                }
            };
            let handle = registry.insert(RenderingContext::new(module, native, layer_plane));
            crate::icd_info!("glicd::Dispatcher",
                "Context {:?} created by driver '{}' (layer {})", handle, name, layer_plane);
            return Ok(handle);
        }

        Err(Self::log_and_return_error(Error::NoDriverAvailable))
    }

    /// Delete an idle context
    ///
    /// # Errors
    ///
    /// - `InvalidHandle` if the context is not registered
    /// - `ContextBusy` if the context is current, being bound, or used by
    ///   an in-flight copy/share
    /// - `DriverCallFailed` if the driver refuses; the context stays
    ///   registered and Idle
    pub fn delete_context(&self, handle: ContextHandle) -> Result<()> {
        let (module, native) = {
            let mut registry = self.lock_registry()?;
            let context = registry
                .get_mut(handle)
                .ok_or_else(|| Self::log_and_return_error(Error::InvalidHandle))?;
            if !context.is_deletable() {
                return Err(Self::log_and_return_error(Error::ContextBusy));
            }
            context.set_state(ContextState::Releasing);
            (context.module().clone(), context.native())
        };

        if !module.driver().delete_context(native) {
            if let Some(context) = self.lock_registry_recovering().get_mut(handle) {
                context.set_state(ContextState::Idle);
            }
            return Err(Self::log_and_return_error(Error::DriverCallFailed(format!(
                "driver '{}' refused to delete context {:?}", module.name(), handle
            ))));
        }

        self.lock_registry_recovering().remove(handle);
        crate::icd_info!("glicd::Dispatcher", "Context {:?} deleted", handle);
        Ok(())
    }

    // ===== BINDING =====

    /// Bind `context` as the calling thread's current context, or release
    /// the current binding when `context` is None
    ///
    /// Binding a context replaces the thread's previous one, which returns
    /// to Idle. Re-binding the context already current on this thread is
    /// accepted and updates its surface. Releasing always succeeds, even if
    /// nothing is bound.
    ///
    /// # Errors
    ///
    /// - `InvalidHandle` if the context is not registered
    /// - `InvalidSurface` if a context is given without a surface
    /// - `ContextBusy` if the context is current on (or being bound by)
    ///   another thread, or is being deleted
    /// - `DriverCallFailed` if the driver's set-context fails; the previous
    ///   binding is left untouched
    pub fn make_current(&self, surface: Option<Surface>, context: Option<ContextHandle>) -> Result<()> {
        let Some(handle) = context else {
            self.release_current();
            return Ok(());
        };
        let thread = thread::current().id();

        let (module, native, surface, previous) = {
            let mut registry = self.lock_registry()?;
            let context = registry
                .get_mut(handle)
                .ok_or_else(|| Self::log_and_return_error(Error::InvalidHandle))?;
            let surface = surface.ok_or_else(|| Self::log_and_return_error(Error::InvalidSurface))?;

            let previous = context.state();
            match previous {
                ContextState::Idle => {}
                ContextState::Current { thread: owner, .. } if owner == thread => {}
                _ => return Err(Self::log_and_return_error(Error::ContextBusy)),
            }
            context.set_state(ContextState::Pending { thread });
            (context.module().clone(), context.native(), surface, previous)
        };

        if !module.driver().set_context(surface, native) {
            let mut registry = self.lock_registry_recovering();
            if let Some(context) = registry.get_mut(handle) {
                context.set_state(previous);
            }
            return Err(Self::log_and_return_error(Error::DriverCallFailed(format!(
                "driver '{}' could not bind context {:?}", module.name(), handle
            ))));
        }

        let mut registry = self.lock_registry_recovering();
        if let Some((prior, _)) = binding::current(self.id) {
            if prior != handle {
                match registry.get_mut(prior) {
                    Some(context) if context.owner_thread() == Some(thread) => {
                        context.set_state(ContextState::Idle);
                    }
                    _ => {
                        crate::icd_error!("glicd::Dispatcher",
                            "Thread {:?} was bound to context {:?} it does not own", thread, prior);
                    }
                }
            }
        }
        let Some(context) = registry.get_mut(handle) else {
            crate::icd_error!("glicd::Dispatcher",
                "Context {:?} vanished while reserved by thread {:?}", handle, thread);
            return Err(Error::InvalidHandle);
        };
        if !binding::bind(self.id, &self.registry, thread, handle, surface) {
            // A thread without binding storage cannot own a context
            context.set_state(ContextState::Idle);
            return Err(Self::log_and_return_error(Error::ThreadExiting));
        }
        context.set_state(ContextState::Current { thread, surface });

        crate::icd_trace!("glicd::Dispatcher",
            "Context {:?} current on thread {:?}", handle, thread);
        Ok(())
    }

    fn release_current(&self) {
        let Some((handle, _)) = binding::unbind(self.id) else {
            return;
        };
        let thread = thread::current().id();
        let mut registry = self.lock_registry_recovering();
        match registry.get_mut(handle) {
            Some(context) if context.owner_thread() == Some(thread) => {
                context.set_state(ContextState::Idle);
                crate::icd_trace!("glicd::Dispatcher",
                    "Context {:?} released by thread {:?}", handle, thread);
            }
            _ => {
                crate::icd_error!("glicd::Dispatcher",
                    "Thread {:?} was bound to context {:?} it does not own", thread, handle);
            }
        }
    }

    /// Context current on the calling thread
    pub fn get_current_context(&self) -> Option<ContextHandle> {
        binding::current(self.id).map(|(handle, _)| handle)
    }

    /// Surface the calling thread's current context is bound to
    pub fn get_current_surface(&self) -> Option<Surface> {
        binding::current(self.id).map(|(_, surface)| surface)
    }

    /// Module of the calling thread's current context
    ///
    /// A current context cannot be deleted, so the module stays valid for
    /// the duration of the caller's driver call.
    fn current_module(&self) -> Result<Arc<DriverModule>> {
        let (handle, _) = binding::current(self.id)
            .ok_or_else(|| Self::log_and_return_error(Error::NoCurrentContext))?;
        let registry = self.lock_registry()?;
        match registry.get(handle) {
            Some(context) => Ok(context.module().clone()),
            None => {
                crate::icd_error!("glicd::Dispatcher",
                    "Current context {:?} is not registered", handle);
                Err(Error::NoCurrentContext)
            }
        }
    }

    // ===== CROSS-CONTEXT =====

    /// Copy the state groups selected by `mask` from `src` to `dst`
    ///
    /// Both contexts must come from the same loaded driver. Returns the
    /// driver's result.
    ///
    /// # Errors
    ///
    /// `InvalidHandle`, `IncompatibleDriver`, or `ContextBusy` if either
    /// context is being deleted.
    pub fn copy_context(&self, src: ContextHandle, dst: ContextHandle, mask: AttribMask) -> Result<bool> {
        let pinned = self.pin_pair(src, dst)?;
        let copied = pinned.module.driver().copy_context(pinned.natives[0], pinned.natives[1], mask);
        crate::icd_debug!("glicd::Dispatcher",
            "copy_context {:?} -> {:?} ({:?}): {}", src, dst, mask, copied);
        Ok(copied)
    }

    /// Enable display-list sharing between two contexts of the same driver
    pub fn share_lists(&self, first: ContextHandle, second: ContextHandle) -> Result<bool> {
        let pinned = self.pin_pair(first, second)?;
        let shared = pinned.module.driver().share_lists(pinned.natives[0], pinned.natives[1]);
        crate::icd_debug!("glicd::Dispatcher",
            "share_lists {:?} <-> {:?}: {}", first, second, shared);
        Ok(shared)
    }

    fn pin_pair(&self, first: ContextHandle, second: ContextHandle) -> Result<PinnedPair<'_>> {
        let mut registry = self.lock_registry()?;

        let (a, b) = match (registry.get(first), registry.get(second)) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(Self::log_and_return_error(Error::InvalidHandle)),
        };
        if a.state() == ContextState::Releasing || b.state() == ContextState::Releasing {
            return Err(Self::log_and_return_error(Error::ContextBusy));
        }
        if !DriverModule::same_module(a.module(), b.module()) {
            return Err(Self::log_and_return_error(Error::IncompatibleDriver));
        }
        let module = a.module().clone();
        let natives = [a.native(), b.native()];

        for handle in [first, second] {
            if let Some(context) = registry.get_mut(handle) {
                context.pin();
            }
        }

        Ok(PinnedPair {
            registry: &self.registry,
            handles: [first, second],
            module,
            natives,
        })
    }

    // ===== CURRENT-CONTEXT OPERATIONS =====

    /// Present `surface` through the driver of the calling thread's current
    /// context
    ///
    /// # Errors
    ///
    /// `NoCurrentContext`, or `DriverCallFailed` if the driver reports
    /// failure.
    pub fn swap_buffers(&self, surface: Surface) -> Result<()> {
        let module = self.current_module()?;
        if !module.driver().swap_buffers(surface) {
            return Err(Self::log_and_return_error(Error::DriverCallFailed(format!(
                "driver '{}' could not swap buffers", module.name()
            ))));
        }
        Ok(())
    }

    /// Resolve a GL entry point through the current context's driver
    ///
    /// `wgl*` and `glu*` names are recognized but never served. Other
    /// `gl*` names go to the driver; any other name is not found.
    ///
    /// # Errors
    ///
    /// `NoCurrentContext` if the calling thread has no current context.
    pub fn get_proc_address(&self, name: &str) -> Result<Option<ProcAddress>> {
        let module = self.current_module()?;

        match ProcNamespace::classify(name) {
            ProcNamespace::Gl => {
                let address = module.driver().get_proc_address(name);
                if address.is_none() {
                    crate::icd_debug!("glicd::Dispatcher",
                        "Driver '{}' does not export {}", module.name(), name);
                }
                Ok(address)
            }
            ProcNamespace::Wgl => {
                crate::icd_debug!("glicd::Dispatcher", "Unsupported WGL extension: {}", name);
                Ok(None)
            }
            ProcNamespace::Glu => {
                crate::icd_debug!("glicd::Dispatcher", "GLU entry point {} requested", name);
                Ok(None)
            }
            ProcNamespace::Unknown => Ok(None),
        }
    }

    // ===== INTROSPECTION =====

    /// Snapshot of a registered context
    pub fn context_info(&self, handle: ContextHandle) -> Result<ContextInfo> {
        let registry = self.lock_registry()?;
        registry
            .get(handle)
            .map(RenderingContext::info)
            .ok_or_else(|| Self::log_and_return_error(Error::InvalidHandle))
    }

    /// Number of registered contexts
    pub fn context_count(&self) -> usize {
        self.lock_registry_recovering().len()
    }

    /// Names of the driver modules loaded so far, sorted
    pub fn loaded_drivers(&self) -> Vec<String> {
        self.loader.loaded_modules()
    }

    /// Allow a driver whose load failed to be tried again
    pub fn invalidate_failed(&self, name: &str) -> bool {
        self.loader.invalidate_failed(name)
    }

    pub fn invalidate_all_failed(&self) {
        self.loader.invalidate_all_failed();
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        let own = binding::unbind(self.id);

        let released: Vec<RenderingContext> = {
            let mut registry = self.lock_registry_recovering();
            if let Some((handle, _)) = own {
                let thread = thread::current().id();
                if let Some(context) = registry.get_mut(handle) {
                    if context.owner_thread() == Some(thread) {
                        context.set_state(ContextState::Idle);
                    }
                }
            }

            let mut released = Vec::new();
            for handle in registry.handles() {
                let deletable = registry.get(handle).map(RenderingContext::is_deletable);
                match deletable {
                    Some(true) => released.extend(registry.remove(handle)),
                    Some(false) => {
                        crate::icd_warn!("glicd::Dispatcher",
                            "Context {:?} still in use at shutdown, not destroyed", handle);
                    }
                    None => {}
                }
            }
            released
        };

        for context in released {
            if !context.module().driver().delete_context(context.native()) {
                crate::icd_warn!("glicd::Dispatcher",
                    "Driver '{}' refused to delete a context at shutdown", context.module().name());
            }
        }
    }
}

// ============================================================================
// PinnedPair
// ============================================================================

/// Two contexts pinned for a cross-context driver call; unpinned on drop
struct PinnedPair<'a> {
    registry: &'a Mutex<ContextRegistry>,
    handles: [ContextHandle; 2],
    module: Arc<DriverModule>,
    natives: [NativeContext; 2],
}

impl Drop for PinnedPair<'_> {
    fn drop(&mut self) {
        let mut registry = lock_recovering(self.registry);
        for handle in self.handles {
            if let Some(context) = registry.get_mut(handle) {
                context.unpin();
            }
        }
    }
}

fn lock_recovering(registry: &Mutex<ContextRegistry>) -> MutexGuard<'_, ContextRegistry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
