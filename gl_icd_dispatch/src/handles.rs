/// Opaque handle types shared between the dispatch layer and drivers.
///
/// Surfaces, driver-native contexts and resolved procedure addresses are all
/// pointer-sized values owned by something outside this crate. They are stored
/// as non-zero integers so that they can live inside the shared registry and
/// be handed across threads; they are only turned back into pointers at the
/// driver boundary.

use std::ffi::c_void;
use std::num::NonZeroUsize;
use bitflags::bitflags;

/// Drawing surface (device context / window surface) a context renders to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Surface(NonZeroUsize);

impl Surface {
    /// Wrap a raw surface pointer. Returns None for a null pointer.
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonZeroUsize::new(ptr as usize).map(Self)
    }

    /// Wrap a raw surface value (e.g. a handle obtained from a windowing API)
    pub fn from_raw(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.0.get() as *mut c_void
    }

    pub fn as_raw(&self) -> usize {
        self.0.get()
    }
}

/// Driver-native rendering context handle returned by a driver's create entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct NativeContext(NonZeroUsize);

impl NativeContext {
    /// Wrap a driver-returned pointer. A null pointer means creation failed.
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonZeroUsize::new(ptr as usize).map(Self)
    }

    pub fn from_raw(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.0.get() as *mut c_void
    }

    pub fn as_raw(&self) -> usize {
        self.0.get()
    }
}

/// Address of a GL entry point resolved by a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ProcAddress(NonZeroUsize);

impl ProcAddress {
    pub fn from_ptr(ptr: *const c_void) -> Option<Self> {
        NonZeroUsize::new(ptr as usize).map(Self)
    }

    pub fn from_raw(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    /// The resolved address. Callers transmute it to the matching
    /// function pointer type.
    pub fn as_ptr(&self) -> *const c_void {
        self.0.get() as *const c_void
    }

    pub fn as_raw(&self) -> usize {
        self.0.get()
    }
}

bitflags! {
    /// State groups copied by `copy_context`
    ///
    /// Uses the `glPushAttrib` bit layout, which is what drivers expect
    /// in their copy-context entry point.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttribMask: u32 {
        const CURRENT = 0x0000_0001;
        const POINT = 0x0000_0002;
        const LINE = 0x0000_0004;
        const POLYGON = 0x0000_0008;
        const POLYGON_STIPPLE = 0x0000_0010;
        const PIXEL_MODE = 0x0000_0020;
        const LIGHTING = 0x0000_0040;
        const FOG = 0x0000_0080;
        const DEPTH_BUFFER = 0x0000_0100;
        const ACCUM_BUFFER = 0x0000_0200;
        const STENCIL_BUFFER = 0x0000_0400;
        const VIEWPORT = 0x0000_0800;
        const TRANSFORM = 0x0000_1000;
        const ENABLE = 0x0000_2000;
        const COLOR_BUFFER = 0x0000_4000;
        const HINT = 0x0000_8000;
        const EVAL = 0x0001_0000;
        const LIST = 0x0002_0000;
        const TEXTURE = 0x0004_0000;
        const SCISSOR = 0x0008_0000;
        const ALL_ATTRIB = 0x000F_FFFF;
    }
}

#[cfg(test)]
#[path = "handles_tests.rs"]
mod tests;
