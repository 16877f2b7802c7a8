/// Thread-current binding.
///
/// Each thread keeps, per dispatcher, a slot naming the context current on
/// that thread. The slot holds only the handle and a weak reference to the
/// dispatcher's registry; the registry stays the owner of the context.
///
/// Slots are created on first use. When a thread exits, its slots are torn
/// down and every context still current on it is returned to Idle, so a
/// context is never left bound to a dead thread.

use std::cell::RefCell;
use std::sync::{Arc, Mutex, Weak};
use std::thread::ThreadId;

use crate::handles::Surface;
use super::registry::ContextRegistry;
use super::rendering_context::{ContextHandle, ContextState};

struct BindingSlot {
    dispatcher_id: u64,
    registry: Weak<Mutex<ContextRegistry>>,
    thread: ThreadId,
    context: ContextHandle,
    surface: Surface,
}

#[derive(Default)]
struct ThreadBindings {
    slots: Vec<BindingSlot>,
}

impl Drop for ThreadBindings {
    fn drop(&mut self) {
        // Runs during thread teardown: no logging, other thread-locals may
        // already be gone.
        for slot in self.slots.drain(..) {
            let Some(registry) = slot.registry.upgrade() else {
                continue;
            };
            let mut registry = registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(context) = registry.get_mut(slot.context) {
                if context.owner_thread() == Some(slot.thread) {
                    context.set_state(ContextState::Idle);
                }
            }
        }
    }
}

thread_local! {
    static THREAD_BINDINGS: RefCell<ThreadBindings> = RefCell::new(ThreadBindings::default());
}

/// Context and surface current on the calling thread for a dispatcher
pub(crate) fn current(dispatcher_id: u64) -> Option<(ContextHandle, Surface)> {
    THREAD_BINDINGS
        .try_with(|bindings| {
            bindings
                .borrow()
                .slots
                .iter()
                .find(|slot| slot.dispatcher_id == dispatcher_id)
                .map(|slot| (slot.context, slot.surface))
        })
        .ok()
        .flatten()
}

/// Record `context` as current on the calling thread, replacing any
/// previous binding for the same dispatcher
///
/// Returns false once the thread's binding storage is torn down; nothing
/// is recorded then.
pub(crate) fn bind(
    dispatcher_id: u64,
    registry: &Arc<Mutex<ContextRegistry>>,
    thread: ThreadId,
    context: ContextHandle,
    surface: Surface,
) -> bool {
    THREAD_BINDINGS
        .try_with(|bindings| {
            let mut bindings = bindings.borrow_mut();
            // Drop slots of dispatchers that no longer exist
            bindings.slots.retain(|slot| {
                slot.dispatcher_id != dispatcher_id && slot.registry.strong_count() > 0
            });
            bindings.slots.push(BindingSlot {
                dispatcher_id,
                registry: Arc::downgrade(registry),
                thread,
                context,
                surface,
            });
        })
        .is_ok()
}

/// Clear the calling thread's binding for a dispatcher, returning it
pub(crate) fn unbind(dispatcher_id: u64) -> Option<(ContextHandle, Surface)> {
    THREAD_BINDINGS
        .try_with(|bindings| {
            let mut bindings = bindings.borrow_mut();
            let index = bindings
                .slots
                .iter()
                .position(|slot| slot.dispatcher_id == dispatcher_id)?;
            let slot = bindings.slots.swap_remove(index);
            Some((slot.context, slot.surface))
        })
        .ok()
        .flatten()
}

#[cfg(test)]
#[path = "binding_tests.rs"]
mod tests;
