/// Context registry: the set of live rendering contexts.
///
/// Uses a SlotMap so that insert/remove are O(1) and handles are versioned:
/// a handle to a deleted context never validates again.

use slotmap::SlotMap;

use super::rendering_context::{ContextHandle, RenderingContext};

/// Registry of live rendering contexts
///
/// The registry owns every context. Callers outside the dispatcher only ever
/// see `ContextHandle`s, which must be checked with `contains` (or `get`)
/// before use.
pub struct ContextRegistry {
    contexts: SlotMap<ContextHandle, RenderingContext>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self {
            contexts: SlotMap::with_key(),
        }
    }

    /// Register a context and return its handle
    pub fn insert(&mut self, context: RenderingContext) -> ContextHandle {
        self.contexts.insert(context)
    }

    /// Unregister a context
    ///
    /// A missing handle means the dispatcher's bookkeeping is wrong, not that
    /// the caller misbehaved: it is logged as a fault and ignored.
    pub fn remove(&mut self, handle: ContextHandle) -> Option<RenderingContext> {
        let removed = self.contexts.remove(handle);
        if removed.is_none() {
            crate::icd_error!("glicd::ContextRegistry",
                "Context {:?} not found in registry", handle);
        }
        removed
    }

    pub fn contains(&self, handle: ContextHandle) -> bool {
        self.contexts.contains_key(handle)
    }

    pub fn get(&self, handle: ContextHandle) -> Option<&RenderingContext> {
        self.contexts.get(handle)
    }

    pub fn get_mut(&mut self, handle: ContextHandle) -> Option<&mut RenderingContext> {
        self.contexts.get_mut(handle)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Handles of all registered contexts (unordered)
    pub fn handles(&self) -> Vec<ContextHandle> {
        self.contexts.keys().collect()
    }
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
