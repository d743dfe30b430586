//! The decoder boundary.
//!
//! A [`Decoder`] turns raw bytes into [`DecodedInstruction`]s expressed in
//! the decoder's own register and mnemonic identifiers; the lifter maps those
//! to framework descriptors and tags. Any implementation producing this shape
//! can be substituted into a CPU.
use dyn_clone::{clone_trait_object, DynClone};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DecodeMode {
    Bits16,
    #[default]
    Bits32,
}

impl DecodeMode {
    pub fn bitness(&self) -> u32 {
        match self {
            Self::Bits16 => 16,
            Self::Bits32 => 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    Jump,
    Call,
    Return,
    Interrupt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedOperand<R> {
    Immediate {
        value: i64,
        size: usize,
    },
    Register(R),
    Memory {
        segment: R,
        base: R,
        index: R,
        displacement: i64,
        scale: u32,
        size: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction<R, M> {
    pub address: u64,
    pub size: usize,
    pub mnemonic: String,
    pub operands_text: String,
    pub id: M,
    pub prefix: u8,
    pub operands: SmallVec<[DecodedOperand<R>; 4]>,
    pub groups: SmallVec<[Group; 2]>,
}

impl<R, M> DecodedInstruction<R, M> {
    pub fn has_group(&self, group: Group) -> bool {
        self.groups.contains(&group)
    }
}

pub trait Decoder: DynClone + Send {
    type Register;
    type Mnemonic;

    fn mode(&self) -> DecodeMode;

    /// Switches decode mode, releasing any state tied to the previous mode.
    fn set_mode(&mut self, mode: DecodeMode);

    /// Decodes as many instructions as `bytes` holds, starting at `address`.
    fn decode(
        &mut self,
        bytes: &[u8],
        address: u64,
    ) -> Vec<DecodedInstruction<Self::Register, Self::Mnemonic>>;
}
clone_trait_object!(<R, M> Decoder<Register = R, Mnemonic = M>);
