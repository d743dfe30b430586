use std::fmt;

use dyn_clone::{clone_trait_object, DynClone};
use parking_lot::Mutex;

use crate::operand::MemoryAccess;
use crate::register::RegisterDescriptor;
use crate::value::U512;

/// Observers invoked before concrete register and memory accesses.
#[allow(unused)]
pub trait HookConcrete {
    fn hook_register_read(&mut self, register: &RegisterDescriptor) {}

    fn hook_register_write(&mut self, register: &RegisterDescriptor, value: &U512) {}

    fn hook_memory_read(&mut self, access: &MemoryAccess) {}

    fn hook_memory_write(&mut self, access: &MemoryAccess, value: &U512) {}
}

pub trait ClonableHookConcrete: DynClone + HookConcrete + Send {}
clone_trait_object!(ClonableHookConcrete);

impl<T> ClonableHookConcrete for T where T: Clone + HookConcrete + Send {}

/// Hooks owned by a single CPU state.
///
/// Reads go through `&self` while hooks take `&mut self`, so the hook list
/// sits behind a lock. The lock only provides that mutable access and is
/// never contended: a state is not shared between threads, and a forked
/// state receives its own clones of every hook.
pub struct Callbacks {
    hooks: Mutex<Vec<Box<dyn ClonableHookConcrete>>>,
    enabled: bool,
}

impl Default for Callbacks {
    fn default() -> Self {
        Self {
            hooks: Mutex::new(Vec::new()),
            enabled: true,
        }
    }
}

impl Clone for Callbacks {
    fn clone(&self) -> Self {
        Self {
            hooks: Mutex::new(self.hooks.lock().clone()),
            enabled: self.enabled,
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("hooks", &self.len())
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<H>(&mut self, hook: H)
    where
        H: ClonableHookConcrete + 'static,
    {
        self.hooks.get_mut().push(Box::new(hook))
    }

    pub fn clear(&mut self) {
        self.hooks.get_mut().clear()
    }

    pub fn len(&self) -> usize {
        self.hooks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn each<F>(&self, mut f: F)
    where
        F: FnMut(&mut dyn ClonableHookConcrete),
    {
        if !self.enabled {
            return;
        }
        for hook in self.hooks.lock().iter_mut() {
            f(hook.as_mut())
        }
    }

    pub(crate) fn register_read(&self, register: &RegisterDescriptor) {
        self.each(|hook| hook.hook_register_read(register))
    }

    pub(crate) fn register_write(&self, register: &RegisterDescriptor, value: &U512) {
        self.each(|hook| hook.hook_register_write(register, value))
    }

    pub(crate) fn memory_read(&self, access: &MemoryAccess) {
        self.each(|hook| hook.hook_memory_read(access))
    }

    pub(crate) fn memory_write(&self, access: &MemoryAccess, value: &U512) {
        self.each(|hook| hook.hook_memory_write(access, value))
    }
}
