/// Concrete CPU state
///
/// Registers are stored per top-level register in a single packed byte
/// buffer; every read or write of a sub-register or flag is a bit-slice of its
/// parent's storage, parameterised only by the descriptor's `[low, high]`
/// range. Memory is a sparse [`ConcreteMemory`]. All accesses may be observed
/// by the instrumentation hooks installed in the state's [`Callbacks`].
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::hooks::{Callbacks, ClonableHookConcrete};
use crate::memory::ConcreteMemory;
use crate::operand::MemoryAccess;
use crate::register::{RegisterDescriptor, RegisterId, RegisterSpec};
use crate::value::{fits, mask, Endian, MAX_BITS, MAX_BYTES, U512};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid register identifier: {0}")]
    InvalidRegister(RegisterId),
    #[error("invalid register name: {0}")]
    InvalidRegisterName(String),
    #[error("value {value} too large for {bits}-bit target")]
    ValueTooLarge { value: U512, bits: usize },
    #[error("invalid memory access size: {0} bits")]
    InvalidSize(usize),
}

impl Error {
    fn too_large(value: &U512, bits: usize) -> Self {
        Error::ValueTooLarge {
            value: *value,
            bits,
        }
    }
}

/// Physical register storage.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    bytes: Box<[u8]>,
}

impl RegisterFile {
    pub fn new(spec: &RegisterSpec) -> Self {
        Self {
            bytes: vec![0u8; spec.storage_size()].into_boxed_slice(),
        }
    }

    fn slot(&self, spec: &RegisterSpec, register: &RegisterDescriptor) -> Result<(usize, usize), Error> {
        spec.storage(register.parent())
            .ok_or(Error::InvalidRegister(register.id()))
    }

    /// Reads the bits of `register` out of its parent's storage.
    pub fn read(&self, spec: &RegisterSpec, register: &RegisterDescriptor) -> Result<U512, Error> {
        let (offset, length) = self.slot(spec, register)?;
        let word = U512::from_le_slice(&self.bytes[offset..offset + length]);
        Ok((word >> register.low()) & mask(register.bits()))
    }

    /// Replaces the bits of `register` in its parent's storage, leaving every
    /// other bit of the parent unchanged.
    pub fn write(
        &mut self,
        spec: &RegisterSpec,
        register: &RegisterDescriptor,
        value: &U512,
    ) -> Result<(), Error> {
        if !fits(value, register.bits()) {
            return Err(Error::too_large(value, register.bits()));
        }

        let (offset, length) = self.slot(spec, register)?;
        let storage = &mut self.bytes[offset..offset + length];

        let word = U512::from_le_slice(storage);
        let cleared = word & !(mask(register.bits()) << register.low());
        let updated = cleared | (*value << register.low());

        storage.copy_from_slice(&updated.to_le_bytes::<MAX_BYTES>()[..length]);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }
}

#[derive(Debug, Clone)]
pub struct ConcreteState {
    spec: Arc<RegisterSpec>,
    endian: Endian,
    registers: RegisterFile,
    memory: ConcreteMemory,
    callbacks: Callbacks,
}

impl ConcreteState {
    pub fn new(spec: Arc<RegisterSpec>, endian: Endian) -> Self {
        Self::new_with(spec, endian, true)
    }

    pub fn new_with(spec: Arc<RegisterSpec>, endian: Endian, callbacks: bool) -> Self {
        let registers = RegisterFile::new(&spec);
        let mut hooks = Callbacks::new();
        if !callbacks {
            hooks.disable();
        }

        Self {
            spec,
            endian,
            registers,
            memory: ConcreteMemory::new(),
            callbacks: hooks,
        }
    }

    pub fn registers(&self) -> &RegisterSpec {
        &self.spec
    }

    pub fn register_spec(&self) -> Arc<RegisterSpec> {
        self.spec.clone()
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn memory(&self) -> &ConcreteMemory {
        &self.memory
    }

    pub fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut Callbacks {
        &mut self.callbacks
    }

    pub fn add_hook<H>(&mut self, hook: H)
    where
        H: ClonableHookConcrete + 'static,
    {
        self.callbacks.add(hook)
    }

    /// A fully independent copy of this state.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    pub fn restore(&mut self, other: &Self) {
        *self = other.fork()
    }

    /// Zeroes every register and forgets all memory. Installed hooks remain.
    pub fn reset(&mut self) {
        debug!(memory = self.memory.len(), "resetting concrete state");
        self.registers.clear();
        self.memory.clear_all();
    }

    pub fn register_value(&self, id: RegisterId) -> Result<U512, Error> {
        self.register_value_with(id, true)
    }

    pub fn register_value_with(&self, id: RegisterId, notify: bool) -> Result<U512, Error> {
        let register = self.spec.lookup(id)?;
        if notify {
            self.callbacks.register_read(register);
        }
        self.registers.read(&self.spec, register)
    }

    pub fn set_register_value(&mut self, id: RegisterId, value: &U512) -> Result<(), Error> {
        self.set_register_value_with(id, value, true)
    }

    pub fn set_register_value_with(
        &mut self,
        id: RegisterId,
        value: &U512,
        notify: bool,
    ) -> Result<(), Error> {
        let register = self.spec.lookup(id)?;
        if !fits(value, register.bits()) {
            return Err(Error::too_large(value, register.bits()));
        }
        if notify {
            self.callbacks.register_write(register, value);
        }
        self.registers.write(&self.spec, register, value)
    }

    pub fn memory_byte(&self, address: u64) -> u8 {
        self.memory_byte_with(address, true)
    }

    pub fn memory_byte_with(&self, address: u64, notify: bool) -> u8 {
        if notify {
            self.callbacks.memory_read(&MemoryAccess::new(address, 1));
        }
        self.memory.read(address)
    }

    pub fn memory_value(&self, access: &MemoryAccess) -> Result<U512, Error> {
        self.memory_value_with(access, true)
    }

    pub fn memory_value_with(&self, access: &MemoryAccess, notify: bool) -> Result<U512, Error> {
        let size = Self::access_size(access)?;
        if notify {
            self.callbacks.memory_read(access);
        }
        let bytes = self.memory.read_bytes(access.address(), size);
        Ok(self.endian.from_bytes(&bytes))
    }

    pub fn set_memory_byte(&mut self, address: u64, value: u8) {
        self.set_memory_byte_with(address, value, true)
    }

    pub fn set_memory_byte_with(&mut self, address: u64, value: u8, notify: bool) {
        if notify {
            self.callbacks
                .memory_write(&MemoryAccess::new(address, 1), &U512::from(value));
        }
        self.memory.write(address, value)
    }

    pub fn set_memory_value(&mut self, access: &MemoryAccess, value: &U512) -> Result<(), Error> {
        self.set_memory_value_with(access, value, true)
    }

    pub fn set_memory_value_with(
        &mut self,
        access: &MemoryAccess,
        value: &U512,
        notify: bool,
    ) -> Result<(), Error> {
        // Only whole bytes are stored, so the value must fit in `size` bytes.
        let bits = access.size() * 8;
        if !fits(value, bits) {
            return Err(Error::too_large(value, bits));
        }
        let size = Self::access_size(access)?;
        if notify {
            self.callbacks.memory_write(access, value);
        }
        let bytes = self.endian.to_bytes(value, size);
        self.memory.write_bytes(access.address(), &bytes);
        Ok(())
    }

    /// Byte-wise read of `length` bytes, firing the read hook per byte.
    pub fn memory_area(&self, address: u64, length: usize) -> Vec<u8> {
        self.memory_area_with(address, length, true)
    }

    pub fn memory_area_with(&self, address: u64, length: usize, notify: bool) -> Vec<u8> {
        (0..length as u64)
            .map(|i| self.memory_byte_with(address.wrapping_add(i), notify))
            .collect()
    }

    pub fn set_memory_area(&mut self, address: u64, bytes: &[u8]) {
        self.set_memory_area_with(address, bytes, true)
    }

    pub fn set_memory_area_with(&mut self, address: u64, bytes: &[u8], notify: bool) {
        for (i, byte) in bytes.iter().enumerate() {
            self.set_memory_byte_with(address.wrapping_add(i as u64), *byte, notify);
        }
    }

    pub fn is_memory_defined(&self, address: u64) -> bool {
        self.memory.is_defined(address)
    }

    /// True only if every byte covered by `access` is defined.
    pub fn is_memory_access_defined(&self, access: &MemoryAccess) -> bool {
        self.memory
            .is_range_defined(access.address(), access.size())
    }

    pub fn is_memory_area_defined(&self, address: u64, length: usize) -> bool {
        self.memory.is_range_defined(address, length)
    }

    pub fn clear_memory(&mut self, address: u64) {
        self.memory.clear(address)
    }

    pub fn clear_memory_access(&mut self, access: &MemoryAccess) {
        self.memory.clear_range(access.address(), access.size())
    }

    pub fn clear_memory_area(&mut self, address: u64, length: usize) {
        self.memory.clear_range(address, length)
    }

    /// Width in whole bytes of `access`; a width below one byte or above
    /// [`MAX_BITS`] is rejected.
    fn access_size(access: &MemoryAccess) -> Result<usize, Error> {
        let size = access.size();
        if size == 0 || size * 8 > MAX_BITS {
            Err(Error::InvalidSize(access.bits()))
        } else {
            Ok(size)
        }
    }
}
