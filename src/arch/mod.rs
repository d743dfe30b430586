//! Per-architecture CPU interface.
use crate::instruction::Instruction;
use crate::lifter;
use crate::operand::MemoryAccess;
use crate::register::{RegisterClass, RegisterDescriptor, RegisterId, RegisterSpec};
use crate::state::{ConcreteState, Error};
use crate::value::{Endian, U512};

pub mod x86;

/// A CPU: a register table, a concrete state and an instruction lifter.
///
/// Backends provide the architecture-specific parts; register access and
/// memory operations forward to the owned [`ConcreteState`].
pub trait Cpu {
    fn state(&self) -> &ConcreteState;
    fn state_mut(&mut self) -> &mut ConcreteState;

    /// Class of `id`, or `None` if it does not name a register of this
    /// architecture.
    fn classify(&self, id: RegisterId) -> Option<RegisterClass>;

    fn program_counter(&self) -> RegisterId;
    fn stack_pointer(&self) -> RegisterId;

    /// Width in bytes of a general-purpose register.
    fn gpr_size(&self) -> usize;

    /// Decodes and populates `instruction`; its address defaults to the
    /// current program counter value.
    fn lift(&mut self, instruction: &mut Instruction) -> Result<(), lifter::Error>;

    fn endianness(&self) -> Endian {
        self.state().endian()
    }

    fn gpr_bit_size(&self) -> usize {
        self.gpr_size() * 8
    }

    fn registers(&self) -> &RegisterSpec {
        self.state().registers()
    }

    fn number_of_registers(&self) -> usize {
        self.registers().len()
    }

    fn is_flag(&self, id: RegisterId) -> bool {
        self.classify(id) == Some(RegisterClass::Flag)
    }

    /// True for any non-flag register.
    fn is_register(&self, id: RegisterId) -> bool {
        matches!(self.classify(id), Some(class) if class != RegisterClass::Flag)
    }

    fn is_register_valid(&self, id: RegisterId) -> bool {
        self.classify(id).is_some()
    }

    fn register(&self, id: RegisterId) -> Result<&RegisterDescriptor, Error> {
        self.registers().lookup(id)
    }

    fn register_by_name(&self, name: &str) -> Result<&RegisterDescriptor, Error> {
        self.registers().lookup_by_name(name)
    }

    fn parent_register(&self, id: RegisterId) -> Result<&RegisterDescriptor, Error> {
        self.registers().parent_of(id)
    }

    fn all_registers(&self) -> Vec<&RegisterDescriptor> {
        self.registers().iter().collect()
    }

    /// One descriptor per top-level register, plus every flag.
    fn parent_registers(&self) -> Vec<&RegisterDescriptor> {
        let registers = self.registers();
        registers
            .parents()
            .chain(registers.iter().filter(|r| self.is_flag(r.id())))
            .collect()
    }

    fn register_value(&self, id: RegisterId) -> Result<U512, Error> {
        self.state().register_value(id)
    }

    fn register_value_with(&self, id: RegisterId, notify: bool) -> Result<U512, Error> {
        self.state().register_value_with(id, notify)
    }

    fn set_register_value(&mut self, id: RegisterId, value: &U512) -> Result<(), Error> {
        self.state_mut().set_register_value(id, value)
    }

    fn set_register_value_with(
        &mut self,
        id: RegisterId,
        value: &U512,
        notify: bool,
    ) -> Result<(), Error> {
        self.state_mut().set_register_value_with(id, value, notify)
    }

    fn memory_byte(&self, address: u64) -> u8 {
        self.state().memory_byte(address)
    }

    fn memory_byte_with(&self, address: u64, notify: bool) -> u8 {
        self.state().memory_byte_with(address, notify)
    }

    fn memory_value(&self, access: &MemoryAccess) -> Result<U512, Error> {
        self.state().memory_value(access)
    }

    fn memory_value_with(&self, access: &MemoryAccess, notify: bool) -> Result<U512, Error> {
        self.state().memory_value_with(access, notify)
    }

    fn memory_area(&self, address: u64, length: usize) -> Vec<u8> {
        self.state().memory_area(address, length)
    }

    fn memory_area_with(&self, address: u64, length: usize, notify: bool) -> Vec<u8> {
        self.state().memory_area_with(address, length, notify)
    }

    fn set_memory_byte(&mut self, address: u64, value: u8) {
        self.state_mut().set_memory_byte(address, value)
    }

    fn set_memory_byte_with(&mut self, address: u64, value: u8, notify: bool) {
        self.state_mut().set_memory_byte_with(address, value, notify)
    }

    fn set_memory_value(&mut self, access: &MemoryAccess, value: &U512) -> Result<(), Error> {
        self.state_mut().set_memory_value(access, value)
    }

    fn set_memory_value_with(
        &mut self,
        access: &MemoryAccess,
        value: &U512,
        notify: bool,
    ) -> Result<(), Error> {
        self.state_mut().set_memory_value_with(access, value, notify)
    }

    fn set_memory_area(&mut self, address: u64, bytes: &[u8]) {
        self.state_mut().set_memory_area(address, bytes)
    }

    fn set_memory_area_with(&mut self, address: u64, bytes: &[u8], notify: bool) {
        self.state_mut().set_memory_area_with(address, bytes, notify)
    }

    fn is_memory_defined(&self, address: u64) -> bool {
        self.state().is_memory_defined(address)
    }

    fn is_memory_access_defined(&self, access: &MemoryAccess) -> bool {
        self.state().is_memory_access_defined(access)
    }

    fn clear_memory(&mut self, address: u64) {
        self.state_mut().clear_memory(address)
    }

    fn clear_memory_access(&mut self, access: &MemoryAccess) {
        self.state_mut().clear_memory_access(access)
    }

    fn reset(&mut self) {
        self.state_mut().reset()
    }
}
