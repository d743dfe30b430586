use std::fmt;

use crate::register::RegisterDescriptor;
use crate::value::{mask, U512};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Immediate {
    value: u64,
    size: usize,
}

impl Immediate {
    /// An immediate `size` bytes wide; `value` is truncated to that width.
    pub fn new(value: u64, size: usize) -> Self {
        let value = if size == 0 || size >= 8 {
            value
        } else {
            value & ((1u64 << (size * 8)) - 1)
        };
        Self { value, size }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn bits(&self) -> usize {
        self.size * 8
    }
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}:{}", self.value, self.bits())
    }
}

/// A memory operand: the accessed location plus the decoded addressing
/// components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MemoryAccess {
    address: u64,
    bits: usize,
    segment: RegisterDescriptor,
    base: RegisterDescriptor,
    index: RegisterDescriptor,
    displacement: Immediate,
    scale: Immediate,
    pc_relative: Option<u64>,
}

impl MemoryAccess {
    pub fn new(address: u64, size: usize) -> Self {
        Self {
            address,
            bits: size * 8,
            ..Default::default()
        }
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn set_address(&mut self, address: u64) {
        self.address = address;
    }

    pub fn bits(&self) -> usize {
        self.bits
    }

    pub fn set_bits(&mut self, bits: usize) {
        self.bits = bits;
    }

    /// Access size in bytes.
    pub fn size(&self) -> usize {
        self.bits / 8
    }

    /// An access is usable once its width has been set.
    pub fn is_valid(&self) -> bool {
        self.bits != 0
    }

    /// Largest value storable in the access's whole bytes.
    pub fn max_value(&self) -> U512 {
        mask(self.size() * 8)
    }

    pub fn segment(&self) -> &RegisterDescriptor {
        &self.segment
    }

    pub fn set_segment(&mut self, segment: RegisterDescriptor) {
        self.segment = segment;
    }

    pub fn base(&self) -> &RegisterDescriptor {
        &self.base
    }

    pub fn set_base(&mut self, base: RegisterDescriptor) {
        self.base = base;
    }

    pub fn index(&self) -> &RegisterDescriptor {
        &self.index
    }

    pub fn set_index(&mut self, index: RegisterDescriptor) {
        self.index = index;
    }

    pub fn displacement(&self) -> &Immediate {
        &self.displacement
    }

    pub fn set_displacement(&mut self, displacement: Immediate) {
        self.displacement = displacement;
    }

    pub fn scale(&self) -> &Immediate {
        &self.scale
    }

    pub fn set_scale(&mut self, scale: Immediate) {
        self.scale = scale;
    }

    /// Address of the next instruction, when the base is the program counter.
    pub fn pc_relative(&self) -> Option<u64> {
        self.pc_relative
    }

    pub fn set_pc_relative(&mut self, target: u64) {
        self.pc_relative = Some(target);
    }

    pub fn is_pc_relative(&self) -> bool {
        self.pc_relative.is_some()
    }
}

impl fmt::Display for MemoryAccess {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{:#x}]:{}", self.address, self.bits)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Immediate(Immediate),
    Register(RegisterDescriptor),
    Memory(MemoryAccess),
}

impl From<Immediate> for Operand {
    fn from(imm: Immediate) -> Self {
        Self::Immediate(imm)
    }
}

impl From<RegisterDescriptor> for Operand {
    fn from(register: RegisterDescriptor) -> Self {
        Self::Register(register)
    }
}

impl From<MemoryAccess> for Operand {
    fn from(access: MemoryAccess) -> Self {
        Self::Memory(access)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Immediate(imm) => write!(f, "{}", imm),
            Self::Register(register) => write!(f, "{}", register),
            Self::Memory(access) => write!(f, "{}", access),
        }
    }
}

impl Operand {
    pub fn is_immediate(&self) -> bool {
        matches!(self, Self::Immediate(_))
    }

    pub fn is_register(&self) -> bool {
        matches!(self, Self::Register(_))
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory(_))
    }

    pub fn immediate(&self) -> Option<&Immediate> {
        if let Self::Immediate(ref imm) = self {
            Some(imm)
        } else {
            None
        }
    }

    pub fn register(&self) -> Option<&RegisterDescriptor> {
        if let Self::Register(ref register) = self {
            Some(register)
        } else {
            None
        }
    }

    pub fn memory(&self) -> Option<&MemoryAccess> {
        if let Self::Memory(ref access) = self {
            Some(access)
        } else {
            None
        }
    }

    /// Operand width in bits.
    pub fn bits(&self) -> usize {
        match self {
            Self::Immediate(imm) => imm.bits(),
            Self::Register(register) => register.bits(),
            Self::Memory(access) => access.bits(),
        }
    }
}
