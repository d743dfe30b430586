use std::fmt;

use iced_x86::{Mnemonic, Register};
use tracing::debug;

use crate::arch::Cpu;
use crate::config::Config;
use crate::decoder::{DecodeMode, Decoder};
use crate::instruction::Instruction;
use crate::lifter::{self, Lifter};
use crate::register::{RegisterClass, RegisterId};
use crate::state::ConcreteState;
use crate::value::Endian;

use super::decoder::{IcedDecoder, X86Mapping};
use super::registers::{self, EIP, ESP, GPR_SIZE};

pub type X86Decoder = Box<dyn Decoder<Register = Register, Mnemonic = Mnemonic>>;

/// A 32-bit x86 CPU.
#[derive(Clone)]
pub struct X86Cpu {
    state: ConcreteState,
    decoder: X86Decoder,
}

impl Default for X86Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for X86Cpu {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("X86Cpu")
            .field("mode", &self.decoder.mode())
            .field("state", &self.state)
            .finish()
    }
}

impl X86Cpu {
    pub fn new() -> Self {
        Self::new_with(Config::default())
    }

    pub fn new_with(config: Config) -> Self {
        Self::with_decoder(config, Box::new(IcedDecoder::new(config.mode)))
    }

    /// Uses `decoder` in place of the default iced-x86 decoder.
    pub fn with_decoder(config: Config, mut decoder: X86Decoder) -> Self {
        if decoder.mode() != config.mode {
            decoder.set_mode(config.mode);
        }
        Self {
            state: ConcreteState::new_with(registers::spec(), Endian::Little, config.callbacks),
            decoder,
        }
    }

    pub fn mode(&self) -> DecodeMode {
        self.decoder.mode()
    }

    /// Switches decode mode; the decoder is reinitialised.
    pub fn set_mode(&mut self, mode: DecodeMode) {
        debug!(from = ?self.decoder.mode(), to = ?mode, "switching decode mode");
        self.decoder.set_mode(mode);
    }

    pub fn fork(&self) -> Self {
        self.clone()
    }

    pub fn restore(&mut self, other: &Self) {
        *self = other.fork()
    }
}

impl Cpu for X86Cpu {
    fn state(&self) -> &ConcreteState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ConcreteState {
        &mut self.state
    }

    fn classify(&self, id: RegisterId) -> Option<RegisterClass> {
        registers::classify(id)
    }

    fn program_counter(&self) -> RegisterId {
        EIP
    }

    fn stack_pointer(&self) -> RegisterId {
        ESP
    }

    fn gpr_size(&self) -> usize {
        GPR_SIZE
    }

    fn lift(&mut self, instruction: &mut Instruction) -> Result<(), lifter::Error> {
        if instruction.opcode().is_empty() {
            return Err(lifter::Error::MissingOpcode);
        }

        let address = match instruction.address() {
            Some(address) => address,
            None => self.state.register_value(EIP)?.as_limbs()[0],
        };

        let mapping = X86Mapping;
        let lifter = Lifter::new(self.state.registers(), &mapping, EIP, GPR_SIZE);
        lifter.lift(self.decoder.as_mut(), address, instruction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::U512;

    #[test]
    fn reset_keeps_mode() {
        let mut cpu = X86Cpu::new_with(Config::default().with_mode(DecodeMode::Bits16));
        cpu.set_register_value(registers::EAX, &U512::from(1u64)).unwrap();
        cpu.reset();

        assert_eq!(cpu.mode(), DecodeMode::Bits16);
        assert_eq!(cpu.register_value(registers::EAX).unwrap(), U512::ZERO);
    }

    #[test]
    fn register_metadata() {
        let cpu = X86Cpu::new();

        assert_eq!(cpu.number_of_registers(), registers::NUMBER_OF_REGISTERS);
        assert_eq!(cpu.gpr_bit_size(), 32);
        assert_eq!(cpu.endianness(), Endian::Little);
        assert!(cpu.is_flag(registers::ZF));
        assert!(!cpu.is_register(registers::ZF));
        assert!(cpu.is_register(registers::XMM0));
        assert!(!cpu.is_register_valid(RegisterId(500)));
        assert_eq!(cpu.register_by_name("ymm2").unwrap().id(), registers::YMM2);
        assert_eq!(cpu.parent_register(registers::SIL).unwrap().id(), registers::ESI);
    }

    #[test]
    fn parent_registers_cover_storage_and_flags() {
        let cpu = X86Cpu::new();
        let parents = cpu.parent_registers();
        let ids = parents.iter().map(|r| r.id()).collect::<Vec<_>>();

        assert!(ids.contains(&registers::EAX));
        assert!(ids.contains(&registers::YMM0));
        assert!(ids.contains(&registers::EFLAGS));
        assert!(ids.contains(&registers::ZF));
        assert!(ids.contains(&registers::FZ));
        assert!(!ids.contains(&registers::AL));
        assert!(!ids.contains(&registers::XMM0));

        // 55 top-level registers and 32 flag bits
        assert_eq!(ids.len(), 55 + 32);
    }
}
