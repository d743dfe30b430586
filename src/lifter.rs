/// Instruction lifting
///
/// Turns the first instruction decoded from an [`Instruction`]'s bytes into
/// framework operands and tags. The pipeline is architecture independent: a
/// backend supplies the decoder and a [`DecoderMapping`] from the decoder's
/// identifiers to register ids and instruction/prefix tags.
use thiserror::Error;
use tracing::trace;

use crate::decoder::{DecodedInstruction, DecodedOperand, Decoder, Group};
use crate::instruction::{Instruction, InstructionType, Prefix};
use crate::operand::{Immediate, MemoryAccess, Operand};
use crate::register::{RegisterDescriptor, RegisterId, RegisterSpec};
use crate::state;

#[derive(Debug, Error)]
pub enum Error {
    #[error("instruction has no opcode bytes")]
    MissingOpcode,
    #[error("unable to decode instruction at {address:#x}")]
    DecodeFailure { address: u64 },
    #[error(transparent)]
    State(#[from] state::Error),
}

/// Translation from a decoder's identifiers into framework identifiers.
///
/// Unknown identifiers are not errors: registers map to
/// [`RegisterId::NONE`] and tags to their `Invalid` variants.
pub trait DecoderMapping {
    type Register;
    type Mnemonic;

    fn register(&self, register: &Self::Register) -> RegisterId;
    fn instruction_type(&self, mnemonic: &Self::Mnemonic) -> InstructionType;
    fn prefix(&self, prefix: u8) -> Prefix;
}

pub struct Lifter<'a, M> {
    registers: &'a RegisterSpec,
    mapping: &'a M,
    program_counter: RegisterId,
    gpr_size: usize,
}

impl<'a, M> Lifter<'a, M>
where
    M: DecoderMapping,
{
    pub fn new(
        registers: &'a RegisterSpec,
        mapping: &'a M,
        program_counter: RegisterId,
        gpr_size: usize,
    ) -> Self {
        Self {
            registers,
            mapping,
            program_counter,
            gpr_size,
        }
    }

    /// Decodes `instruction`'s bytes at `address` and populates it. The
    /// instruction is only modified if decoding succeeds.
    pub fn lift<D>(
        &self,
        decoder: &mut D,
        address: u64,
        instruction: &mut Instruction,
    ) -> Result<(), Error>
    where
        D: Decoder<Register = M::Register, Mnemonic = M::Mnemonic> + ?Sized,
    {
        if instruction.opcode.is_empty() {
            return Err(Error::MissingOpcode);
        }

        let decoded = decoder
            .decode(&instruction.opcode, address)
            .into_iter()
            .next()
            .ok_or(Error::DecodeFailure { address })?;

        trace!(
            address,
            size = decoded.size,
            mnemonic = %decoded.mnemonic,
            "lifted instruction"
        );

        let operands: Vec<Operand> = decoded
            .operands
            .iter()
            .map(|operand| self.operand(&decoded, operand))
            .collect();

        let disassembly = if decoded.operands.is_empty() {
            decoded.mnemonic.clone()
        } else {
            format!("{} {}", decoded.mnemonic, decoded.operands_text)
        };

        let kind = self.mapping.instruction_type(&decoded.id);
        let prefix = self.mapping.prefix(decoded.prefix);

        instruction.opcode.truncate(decoded.size);
        instruction.address = Some(address);
        instruction.disassembly = disassembly;
        instruction.kind = kind;
        instruction.prefix = prefix;
        instruction.operands = operands;
        instruction.branch = decoded.has_group(Group::Jump);
        instruction.control_flow = decoded.has_group(Group::Jump)
            || decoded.has_group(Group::Call)
            || decoded.has_group(Group::Return);

        Ok(())
    }

    fn register(&self, register: &M::Register) -> RegisterDescriptor {
        let id = self.mapping.register(register);
        self.registers.lookup_or_none(id)
    }

    fn operand(
        &self,
        decoded: &DecodedInstruction<M::Register, M::Mnemonic>,
        operand: &DecodedOperand<M::Register>,
    ) -> Operand {
        match operand {
            DecodedOperand::Immediate { value, size } => {
                Operand::Immediate(Immediate::new(*value as u64, *size))
            }
            DecodedOperand::Register(register) => Operand::Register(self.register(register)),
            DecodedOperand::Memory {
                segment,
                base,
                index,
                displacement,
                scale,
                size,
            } => {
                let size = if *size == 0 { self.gpr_size } else { *size };
                let mut access = MemoryAccess::new(0, size);

                let segment = self.register(segment);
                let base = self.register(base);
                let index = self.register(index);

                let width = [&base, &index]
                    .iter()
                    .find(|r| !r.is_none())
                    .map(|r| r.size())
                    .unwrap_or(self.gpr_size);

                access.set_displacement(Immediate::new(*displacement as u64, width));
                access.set_scale(Immediate::new(*scale as u64, width));

                if !base.is_none() && base.id() == self.program_counter {
                    access.set_pc_relative(decoded.address.wrapping_add(decoded.size as u64));
                }

                access.set_segment(segment);
                access.set_base(base);
                access.set_index(index);

                Operand::Memory(access)
            }
        }
    }
}
