/// Mock driver for unit tests (no GPU or driver library required)
///
/// Records every entry point call and lets tests force individual entry
/// points to fail.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::handles::{AttribMask, NativeContext, ProcAddress, Surface};
use super::icd_driver::IcdDriver;

pub struct MockDriver {
    name: String,
    next_native: AtomicUsize,
    live_contexts: Mutex<FxHashSet<usize>>,
    calls: Mutex<Vec<String>>,
    procs: Mutex<FxHashMap<String, usize>>,
    fail_create: AtomicBool,
    fail_delete: AtomicBool,
    fail_set_context: AtomicBool,
    fail_swap: AtomicBool,
    copy_result: AtomicBool,
    share_result: AtomicBool,
}

impl MockDriver {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            next_native: AtomicUsize::new(1),
            live_contexts: Mutex::new(FxHashSet::default()),
            calls: Mutex::new(Vec::new()),
            procs: Mutex::new(FxHashMap::default()),
            fail_create: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            fail_set_context: AtomicBool::new(false),
            fail_swap: AtomicBool::new(false),
            copy_result: AtomicBool::new(true),
            share_result: AtomicBool::new(true),
        }
    }

    pub fn shared(name: &str) -> Arc<Self> {
        Arc::new(Self::new(name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_set_context(&self, fail: bool) {
        self.fail_set_context.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_swap(&self, fail: bool) {
        self.fail_swap.store(fail, Ordering::SeqCst);
    }

    pub fn set_copy_result(&self, result: bool) {
        self.copy_result.store(result, Ordering::SeqCst);
    }

    pub fn set_share_result(&self, result: bool) {
        self.share_result.store(result, Ordering::SeqCst);
    }

    /// Make `get_proc_address(name)` resolve to `address`
    pub fn add_proc(&self, name: &str, address: usize) {
        self.procs.lock().unwrap().insert(name.to_string(), address);
    }

    /// All recorded calls, in order (e.g. "create_context", "swap_buffers")
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, entry_point: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| call.as_str() == entry_point).count()
    }

    /// Native contexts created and not yet deleted
    pub fn live_context_count(&self) -> usize {
        self.live_contexts.lock().unwrap().len()
    }

    fn record(&self, entry_point: &str) {
        self.calls.lock().unwrap().push(entry_point.to_string());
    }

    fn allocate_native(&self) -> Option<NativeContext> {
        if self.fail_create.load(Ordering::SeqCst) {
            return None;
        }
        let raw = self.next_native.fetch_add(1, Ordering::SeqCst);
        self.live_contexts.lock().unwrap().insert(raw);
        NativeContext::from_raw(raw)
    }
}

impl IcdDriver for MockDriver {
    fn create_context(&self, _surface: Surface) -> Option<NativeContext> {
        self.record("create_context");
        self.allocate_native()
    }

    fn create_layer_context(&self, _surface: Surface, _layer: i32) -> Option<NativeContext> {
        self.record("create_layer_context");
        self.allocate_native()
    }

    fn delete_context(&self, context: NativeContext) -> bool {
        self.record("delete_context");
        if self.fail_delete.load(Ordering::SeqCst) {
            return false;
        }
        self.live_contexts.lock().unwrap().remove(&context.as_raw())
    }

    fn set_context(&self, _surface: Surface, context: NativeContext) -> bool {
        self.record("set_context");
        !self.fail_set_context.load(Ordering::SeqCst)
            && self.live_contexts.lock().unwrap().contains(&context.as_raw())
    }

    fn copy_context(&self, _src: NativeContext, _dst: NativeContext, _mask: AttribMask) -> bool {
        self.record("copy_context");
        self.copy_result.load(Ordering::SeqCst)
    }

    fn share_lists(&self, _first: NativeContext, _second: NativeContext) -> bool {
        self.record("share_lists");
        self.share_result.load(Ordering::SeqCst)
    }

    fn swap_buffers(&self, _surface: Surface) -> bool {
        self.record("swap_buffers");
        !self.fail_swap.load(Ordering::SeqCst)
    }

    fn get_proc_address(&self, name: &str) -> Option<ProcAddress> {
        self.record("get_proc_address");
        let address = self.procs.lock().unwrap().get(name).copied()?;
        ProcAddress::from_raw(address)
    }
}
