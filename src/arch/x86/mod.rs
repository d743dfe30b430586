//! 32-bit x86.
pub mod cpu;
pub mod decoder;
pub mod instructions;
pub mod registers;

pub use cpu::{X86Cpu, X86Decoder};
pub use decoder::{register_from_iced, IcedDecoder, X86Mapping};
pub use instructions::{Opcode, Prefix};
