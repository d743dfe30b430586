pub mod arch;
pub mod config;
pub mod decoder;
pub mod hooks;
pub mod instruction;
pub mod lifter;
pub mod memory;
pub mod operand;
pub mod register;
pub mod solver;
pub mod state;
pub mod value;

pub use arch::x86::X86Cpu;
pub use arch::Cpu;
pub use config::Config;
pub use instruction::Instruction;
pub use value::U512;
