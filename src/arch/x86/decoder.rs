//! iced-x86 adapter for the decoder boundary.
use iced_x86::{
    Decoder as IcedX86Decoder, DecoderOptions, FlowControl, Formatter, Instruction as IcedInstruction,
    IntelFormatter, MemorySizeOptions, Mnemonic, OpKind, Register,
};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::decoder::{DecodeMode, DecodedInstruction, DecodedOperand, Decoder, Group};
use crate::instruction::{InstructionType, Prefix};
use crate::lifter::DecoderMapping;
use crate::register::RegisterId;

use super::instructions::{Opcode, Prefix as X86Prefix};
use super::registers as reg;

pub type X86DecodedInstruction = DecodedInstruction<Register, Mnemonic>;

#[derive(Debug, Clone)]
pub struct IcedDecoder {
    mode: DecodeMode,
}

impl Default for IcedDecoder {
    fn default() -> Self {
        Self::new(DecodeMode::default())
    }
}

impl IcedDecoder {
    pub fn new(mode: DecodeMode) -> Self {
        debug!(bitness = mode.bitness(), "initialising x86 decoder");
        Self { mode }
    }

    fn formatter() -> IntelFormatter {
        let mut formatter = IntelFormatter::new();
        let options = formatter.options_mut();
        options.set_hex_prefix("0x");
        options.set_hex_suffix("");
        options.set_uppercase_hex(false);
        options.set_memory_size_options(MemorySizeOptions::Always);
        options.set_space_after_operand_separator(true);
        options.set_space_between_memory_add_operators(true);
        options.set_show_branch_size(false);
        options.set_branch_leading_zeros(false);
        formatter
    }

    fn immediate(instruction: &IcedInstruction, operand: u32, size: usize) -> DecodedOperand<Register> {
        DecodedOperand::Immediate {
            value: instruction.immediate(operand) as i64,
            size,
        }
    }

    fn memory(
        instruction: &IcedInstruction,
        segment: Register,
        base: Register,
    ) -> DecodedOperand<Register> {
        DecodedOperand::Memory {
            segment,
            base,
            index: Register::None,
            displacement: 0,
            scale: 1,
            size: instruction.memory_size().size(),
        }
    }

    fn operands(instruction: &IcedInstruction) -> SmallVec<[DecodedOperand<Register>; 4]> {
        let mut operands = SmallVec::new();

        for i in 0..instruction.op_count() {
            match instruction.op_kind(i) {
                OpKind::Register => {
                    operands.push(DecodedOperand::Register(instruction.op_register(i)))
                }
                OpKind::NearBranch16 | OpKind::NearBranch32 | OpKind::NearBranch64 => {
                    let size = match instruction.op_kind(i) {
                        OpKind::NearBranch16 => 2,
                        OpKind::NearBranch32 => 4,
                        _ => 8,
                    };
                    operands.push(DecodedOperand::Immediate {
                        value: instruction.near_branch_target() as i64,
                        size,
                    })
                }
                OpKind::FarBranch16 => {
                    operands.push(DecodedOperand::Immediate {
                        value: instruction.far_branch_selector() as i64,
                        size: 2,
                    });
                    operands.push(DecodedOperand::Immediate {
                        value: instruction.far_branch16() as i64,
                        size: 2,
                    });
                }
                OpKind::FarBranch32 => {
                    operands.push(DecodedOperand::Immediate {
                        value: instruction.far_branch_selector() as i64,
                        size: 2,
                    });
                    operands.push(DecodedOperand::Immediate {
                        value: instruction.far_branch32() as i64,
                        size: 4,
                    });
                }
                OpKind::Immediate8 | OpKind::Immediate8_2nd => {
                    operands.push(Self::immediate(instruction, i, 1))
                }
                OpKind::Immediate16 | OpKind::Immediate8to16 => {
                    operands.push(Self::immediate(instruction, i, 2))
                }
                OpKind::Immediate32 | OpKind::Immediate8to32 => {
                    operands.push(Self::immediate(instruction, i, 4))
                }
                OpKind::Immediate64 | OpKind::Immediate8to64 | OpKind::Immediate32to64 => {
                    operands.push(Self::immediate(instruction, i, 8))
                }
                OpKind::MemorySegSI => {
                    operands.push(Self::memory(instruction, instruction.segment_prefix(), Register::SI))
                }
                OpKind::MemorySegESI => {
                    operands.push(Self::memory(instruction, instruction.segment_prefix(), Register::ESI))
                }
                OpKind::MemorySegRSI => {
                    operands.push(Self::memory(instruction, instruction.segment_prefix(), Register::RSI))
                }
                OpKind::MemorySegDI => {
                    operands.push(Self::memory(instruction, instruction.segment_prefix(), Register::DI))
                }
                OpKind::MemorySegEDI => {
                    operands.push(Self::memory(instruction, instruction.segment_prefix(), Register::EDI))
                }
                OpKind::MemorySegRDI => {
                    operands.push(Self::memory(instruction, instruction.segment_prefix(), Register::RDI))
                }
                OpKind::MemoryESDI => {
                    operands.push(Self::memory(instruction, Register::ES, Register::DI))
                }
                OpKind::MemoryESEDI => {
                    operands.push(Self::memory(instruction, Register::ES, Register::EDI))
                }
                OpKind::MemoryESRDI => {
                    operands.push(Self::memory(instruction, Register::ES, Register::RDI))
                }
                OpKind::Memory => operands.push(DecodedOperand::Memory {
                    segment: instruction.segment_prefix(),
                    base: instruction.memory_base(),
                    index: instruction.memory_index(),
                    displacement: instruction.memory_displacement64() as i64,
                    scale: instruction.memory_index_scale(),
                    size: instruction.memory_size().size(),
                }),
                #[allow(unreachable_patterns)]
                _ => (),
            }
        }

        operands
    }

    fn groups(instruction: &IcedInstruction) -> SmallVec<[Group; 2]> {
        let mut groups = SmallVec::new();
        match instruction.flow_control() {
            FlowControl::UnconditionalBranch
            | FlowControl::ConditionalBranch
            | FlowControl::IndirectBranch => groups.push(Group::Jump),
            FlowControl::Call | FlowControl::IndirectCall => groups.push(Group::Call),
            FlowControl::Return => groups.push(Group::Return),
            FlowControl::Interrupt => groups.push(Group::Interrupt),
            _ => (),
        }
        groups
    }

    fn prefix(instruction: &IcedInstruction) -> u8 {
        if instruction.has_lock_prefix() {
            X86Prefix::LOCK
        } else if instruction.has_rep_prefix() {
            X86Prefix::REP
        } else if instruction.has_repne_prefix() {
            X86Prefix::REPNE
        } else {
            0
        }
    }
}

impl Decoder for IcedDecoder {
    type Register = Register;
    type Mnemonic = Mnemonic;

    fn mode(&self) -> DecodeMode {
        self.mode
    }

    fn set_mode(&mut self, mode: DecodeMode) {
        *self = Self::new(mode);
    }

    fn decode(&mut self, bytes: &[u8], address: u64) -> Vec<X86DecodedInstruction> {
        let mut decoder =
            IcedX86Decoder::with_ip(self.mode.bitness(), bytes, address, DecoderOptions::NONE);
        let mut formatter = Self::formatter();

        let mut decoded = Vec::new();
        let mut instruction = IcedInstruction::default();

        while decoder.can_decode() {
            decoder.decode_out(&mut instruction);
            if instruction.is_invalid() {
                break;
            }

            let mut mnemonic = String::new();
            formatter.format_mnemonic(&instruction, &mut mnemonic);

            let mut operands_text = String::new();
            formatter.format_all_operands(&instruction, &mut operands_text);

            decoded.push(DecodedInstruction {
                address: instruction.ip(),
                size: instruction.len(),
                mnemonic,
                operands_text,
                id: instruction.mnemonic(),
                prefix: Self::prefix(&instruction),
                operands: Self::operands(&instruction),
                groups: Self::groups(&instruction),
            });
        }

        decoded
    }
}

/// Maps iced-x86 registers onto the x86 register table.
pub fn register_from_iced(register: Register) -> RegisterId {
    match register {
        Register::EAX => reg::EAX,
        Register::AX => reg::AX,
        Register::AH => reg::AH,
        Register::AL => reg::AL,
        Register::EBX => reg::EBX,
        Register::BX => reg::BX,
        Register::BH => reg::BH,
        Register::BL => reg::BL,
        Register::ECX => reg::ECX,
        Register::CX => reg::CX,
        Register::CH => reg::CH,
        Register::CL => reg::CL,
        Register::EDX => reg::EDX,
        Register::DX => reg::DX,
        Register::DH => reg::DH,
        Register::DL => reg::DL,
        Register::EDI => reg::EDI,
        Register::DI => reg::DI,
        Register::DIL => reg::DIL,
        Register::ESI => reg::ESI,
        Register::SI => reg::SI,
        Register::SIL => reg::SIL,
        Register::ESP => reg::ESP,
        Register::SP => reg::SP,
        Register::SPL => reg::SPL,
        Register::EBP => reg::EBP,
        Register::BP => reg::BP,
        Register::BPL => reg::BPL,
        Register::EIP => reg::EIP,
        Register::MM0 => reg::MM0,
        Register::MM1 => reg::MM1,
        Register::MM2 => reg::MM2,
        Register::MM3 => reg::MM3,
        Register::MM4 => reg::MM4,
        Register::MM5 => reg::MM5,
        Register::MM6 => reg::MM6,
        Register::MM7 => reg::MM7,
        Register::XMM0 => reg::XMM0,
        Register::XMM1 => reg::XMM1,
        Register::XMM2 => reg::XMM2,
        Register::XMM3 => reg::XMM3,
        Register::XMM4 => reg::XMM4,
        Register::XMM5 => reg::XMM5,
        Register::XMM6 => reg::XMM6,
        Register::XMM7 => reg::XMM7,
        Register::YMM0 => reg::YMM0,
        Register::YMM1 => reg::YMM1,
        Register::YMM2 => reg::YMM2,
        Register::YMM3 => reg::YMM3,
        Register::YMM4 => reg::YMM4,
        Register::YMM5 => reg::YMM5,
        Register::YMM6 => reg::YMM6,
        Register::YMM7 => reg::YMM7,
        Register::CR0 => reg::CR0,
        Register::CR1 => reg::CR1,
        Register::CR2 => reg::CR2,
        Register::CR3 => reg::CR3,
        Register::CR4 => reg::CR4,
        Register::CR5 => reg::CR5,
        Register::CR6 => reg::CR6,
        Register::CR7 => reg::CR7,
        Register::CR8 => reg::CR8,
        Register::CR9 => reg::CR9,
        Register::CR10 => reg::CR10,
        Register::CR11 => reg::CR11,
        Register::CR12 => reg::CR12,
        Register::CR13 => reg::CR13,
        Register::CR14 => reg::CR14,
        Register::CR15 => reg::CR15,
        Register::DR0 => reg::DR0,
        Register::DR1 => reg::DR1,
        Register::DR2 => reg::DR2,
        Register::DR3 => reg::DR3,
        Register::DR6 => reg::DR6,
        Register::DR7 => reg::DR7,
        Register::CS => reg::CS,
        Register::DS => reg::DS,
        Register::ES => reg::ES,
        Register::FS => reg::FS,
        Register::GS => reg::GS,
        Register::SS => reg::SS,
        _ => RegisterId::NONE,
    }
}

/// iced-x86 identifiers to x86 register ids and tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct X86Mapping;

impl DecoderMapping for X86Mapping {
    type Register = Register;
    type Mnemonic = Mnemonic;

    fn register(&self, register: &Register) -> RegisterId {
        let id = register_from_iced(*register);
        if id.is_none() && *register != Register::None {
            trace!(register = ?register, "unmapped decoder register");
        }
        id
    }

    fn instruction_type(&self, mnemonic: &Mnemonic) -> InstructionType {
        match Opcode::from_mnemonic(*mnemonic) {
            Some(opcode) => InstructionType::X86(opcode),
            None => {
                trace!(mnemonic = ?mnemonic, "unmapped decoder mnemonic");
                InstructionType::Invalid
            }
        }
    }

    fn prefix(&self, prefix: u8) -> Prefix {
        match X86Prefix::from_byte(prefix) {
            Some(prefix) => Prefix::X86(prefix),
            None => {
                if prefix != 0 {
                    trace!(prefix = prefix, "unmapped decoder prefix");
                }
                Prefix::Invalid
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_every_instruction_in_buffer() {
        let mut decoder = IcedDecoder::default();
        let decoded = decoder.decode(&[0x90, 0xc3], 0x1000);

        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].mnemonic, "nop");
        assert_eq!(decoded[1].address, 0x1001);
        assert!(decoded[1].has_group(Group::Return));
    }

    #[test]
    fn stops_at_invalid_bytes() {
        let mut decoder = IcedDecoder::default();

        assert!(decoder.decode(&[0xe8, 0x00], 0).is_empty());
        assert_eq!(decoder.decode(&[0x90, 0xe8], 0).len(), 1);
    }

    #[test]
    fn mode_switch() {
        let mut decoder = IcedDecoder::default();
        decoder.set_mode(DecodeMode::Bits16);
        assert_eq!(decoder.mode(), DecodeMode::Bits16);

        // mov ax, 0x1234 in 16-bit mode
        let decoded = decoder.decode(&[0xb8, 0x34, 0x12], 0);
        assert_eq!(decoded[0].size, 3);
        assert_eq!(decoded[0].operands[0], DecodedOperand::Register(Register::AX));
        assert_eq!(
            decoded[0].operands[1],
            DecodedOperand::Immediate {
                value: 0x1234,
                size: 2
            }
        );
    }

    #[test]
    fn unmapped_identifiers() {
        let mapping = X86Mapping;

        assert_eq!(mapping.register(&Register::RAX), RegisterId::NONE);
        assert_eq!(mapping.register(&Register::None), RegisterId::NONE);
        assert_eq!(mapping.instruction_type(&Mnemonic::INVALID), InstructionType::Invalid);
        assert_eq!(
            mapping.instruction_type(&Mnemonic::Fld),
            InstructionType::X86(Opcode::new(Mnemonic::Fld))
        );
        assert_eq!(mapping.prefix(0), Prefix::Invalid);
        assert_eq!(mapping.prefix(0xf0), Prefix::X86(X86Prefix::Lock));
    }
}
