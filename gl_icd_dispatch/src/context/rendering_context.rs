/// Rendering context types.
///
/// A RenderingContext pairs a driver-native context with the loaded driver
/// module that created it, plus the bookkeeping the dispatcher needs to
/// enforce "one current context per thread".

use std::sync::Arc;
use std::thread::ThreadId;
use slotmap::{new_key_type, Key, KeyData};

use crate::driver::DriverModule;
use crate::handles::{NativeContext, Surface};

/// Pixel format value of a context whose format was never set
pub const PIXEL_FORMAT_UNSET: i32 = -1;

// ===== HANDLE =====

new_key_type! {
    /// Opaque handle to a registered rendering context.
    ///
    /// Handles are versioned: once a context is deleted its handle never
    /// validates again, even if the registry reuses the slot.
    pub struct ContextHandle;
}

impl ContextHandle {
    /// Encode the handle as an integer for crossing a binary boundary
    pub fn to_raw(self) -> u64 {
        self.data().as_ffi()
    }

    /// Decode a handle produced by `to_raw`. Any value is accepted here;
    /// validity is decided by the registry.
    pub fn from_raw(raw: u64) -> Self {
        KeyData::from_ffi(raw).into()
    }
}

// ===== STATE =====

/// Binding state of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Not bound to any thread; may be bound or deleted
    Idle,

    /// Reserved by a thread whose make-current call is inside the driver
    Pending { thread: ThreadId },

    /// Bound as the current context of `thread`, drawing to `surface`
    Current { thread: ThreadId, surface: Surface },

    /// The driver is destroying the native context
    Releasing,
}

// ===== RENDERING CONTEXT =====

pub struct RenderingContext {
    module: Arc<DriverModule>,
    native: NativeContext,
    pixel_format: i32,
    layer_plane: i32,
    state: ContextState,
    /// Cross-context driver calls (copy, share) in flight on this context
    pins: u32,
}

impl RenderingContext {
    pub(crate) fn new(module: Arc<DriverModule>, native: NativeContext, layer_plane: i32) -> Self {
        Self {
            module,
            native,
            pixel_format: PIXEL_FORMAT_UNSET,
            layer_plane,
            state: ContextState::Idle,
            pins: 0,
        }
    }

    /// The driver module that created this context
    pub fn module(&self) -> &Arc<DriverModule> {
        &self.module
    }

    pub fn native(&self) -> NativeContext {
        self.native
    }

    pub fn pixel_format(&self) -> i32 {
        self.pixel_format
    }

    pub fn layer_plane(&self) -> i32 {
        self.layer_plane
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn is_current(&self) -> bool {
        matches!(self.state, ContextState::Current { .. })
    }

    /// Thread the context is current on (or reserved by)
    pub fn owner_thread(&self) -> Option<ThreadId> {
        match self.state {
            ContextState::Current { thread, .. } | ContextState::Pending { thread } => Some(thread),
            ContextState::Idle | ContextState::Releasing => None,
        }
    }

    /// Surface the context is bound to while current
    pub fn surface(&self) -> Option<Surface> {
        match self.state {
            ContextState::Current { surface, .. } => Some(surface),
            _ => None,
        }
    }

    /// Idle and not used by an in-flight cross-context call
    pub fn is_deletable(&self) -> bool {
        self.state == ContextState::Idle && self.pins == 0
    }

    pub(crate) fn set_state(&mut self, state: ContextState) {
        self.state = state;
    }

    pub(crate) fn pin(&mut self) {
        self.pins += 1;
    }

    pub(crate) fn unpin(&mut self) {
        debug_assert!(self.pins > 0, "unpinning a context that is not pinned");
        self.pins = self.pins.saturating_sub(1);
    }

    pub fn pin_count(&self) -> u32 {
        self.pins
    }

    /// Snapshot of the context for callers outside the registry lock
    pub fn info(&self) -> ContextInfo {
        ContextInfo {
            driver: self.module.name().to_string(),
            pixel_format: self.pixel_format,
            layer_plane: self.layer_plane,
            is_current: self.is_current(),
            owner_thread: self.owner_thread(),
        }
    }
}

// ===== CONTEXT INFO =====

/// Read-only snapshot of a registered context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextInfo {
    /// Name of the driver that created the context
    pub driver: String,
    /// Pixel format identifier (-1 when unset)
    pub pixel_format: i32,
    /// Layer plane (0 = main plane)
    pub layer_plane: i32,
    pub is_current: bool,
    pub owner_thread: Option<ThreadId>,
}
