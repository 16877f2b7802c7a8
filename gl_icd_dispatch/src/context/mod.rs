//! Rendering context bookkeeping
//!
//! Context records, the registry that owns them, and the per-thread
//! binding slots that say which context is current where.

mod rendering_context;
mod registry;
pub(crate) mod binding;

pub use rendering_context::{
    ContextHandle, ContextState, ContextInfo,
    RenderingContext, PIXEL_FORMAT_UNSET,
};
pub use registry::ContextRegistry;
