use std::fmt;

use smallvec::SmallVec;

use crate::arch::x86;
use crate::operand::Operand;

/// Longest encodable instruction across supported architectures.
pub const MAX_INSTRUCTION_SIZE: usize = 16;

/// Architecture-neutral instruction type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InstructionType {
    #[default]
    Invalid,
    X86(x86::Opcode),
}

impl fmt::Display for InstructionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Invalid => write!(f, "invalid"),
            Self::X86(opcode) => write!(f, "{}", opcode),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Prefix {
    #[default]
    Invalid,
    X86(x86::Prefix),
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Invalid => write!(f, "invalid"),
            Self::X86(prefix) => write!(f, "{}", prefix),
        }
    }
}

/// A lifted instruction.
///
/// Constructed from raw bytes (and optionally an address), then populated in
/// place by [`crate::arch::Cpu::lift`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Instruction {
    pub(crate) opcode: SmallVec<[u8; MAX_INSTRUCTION_SIZE]>,
    pub(crate) address: Option<u64>,
    pub(crate) disassembly: String,
    pub(crate) kind: InstructionType,
    pub(crate) prefix: Prefix,
    pub(crate) operands: Vec<Operand>,
    pub(crate) branch: bool,
    pub(crate) control_flow: bool,
}

impl Instruction {
    pub fn new(opcode: &[u8]) -> Self {
        Self {
            opcode: opcode.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn with_address(address: u64, opcode: &[u8]) -> Self {
        Self {
            address: Some(address),
            ..Self::new(opcode)
        }
    }

    pub fn opcode(&self) -> &[u8] {
        &self.opcode
    }

    pub fn set_opcode(&mut self, opcode: &[u8]) {
        self.opcode = opcode.iter().copied().collect();
    }

    /// Length in bytes; refined to the decoded length after lifting.
    pub fn size(&self) -> usize {
        self.opcode.len()
    }

    pub fn address(&self) -> Option<u64> {
        self.address
    }

    pub fn set_address(&mut self, address: u64) {
        self.address = Some(address);
    }

    pub fn next_address(&self) -> Option<u64> {
        self.address
            .map(|address| address.wrapping_add(self.size() as u64))
    }

    pub fn disassembly(&self) -> &str {
        &self.disassembly
    }

    pub fn kind(&self) -> InstructionType {
        self.kind
    }

    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn is_branch(&self) -> bool {
        self.branch
    }

    pub fn is_control_flow(&self) -> bool {
        self.control_flow
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(address) = self.address {
            write!(f, "{:#x}: ", address)?;
        }
        write!(f, "{}", self.disassembly)
    }
}
