//! x86 instruction and prefix tags.
use std::fmt;

use iced_x86::Mnemonic;

/// x86 instruction tag.
///
/// Every mnemonic the decoder can produce has a tag, so only undecodable
/// bytes lift to an unspecified instruction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(Mnemonic);

impl Opcode {
    pub fn new(mnemonic: Mnemonic) -> Self {
        Self(mnemonic)
    }

    /// The tag for `mnemonic`; `None` for the decoder's invalid mnemonic.
    pub fn from_mnemonic(mnemonic: Mnemonic) -> Option<Self> {
        if mnemonic == Mnemonic::INVALID {
            None
        } else {
            Some(Self(mnemonic))
        }
    }

    pub fn mnemonic(&self) -> Mnemonic {
        self.0
    }
}

impl From<Mnemonic> for Opcode {
    fn from(mnemonic: Mnemonic) -> Self {
        Self(mnemonic)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&format!("{:?}", self.0).to_ascii_lowercase())
    }
}

/// Instruction prefixes distinguished by the decoder.
///
/// `rep` and `repe` share an encoding and are reported as [`Prefix::Rep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prefix {
    Lock,
    Rep,
    Repne,
}

impl Prefix {
    pub const LOCK: u8 = 0xf0;
    pub const REP: u8 = 0xf3;
    pub const REPNE: u8 = 0xf2;

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            Self::LOCK => Some(Self::Lock),
            Self::REP => Some(Self::Rep),
            Self::REPNE => Some(Self::Repne),
            _ => None,
        }
    }

    pub fn byte(&self) -> u8 {
        match self {
            Self::Lock => Self::LOCK,
            Self::Rep => Self::REP,
            Self::Repne => Self::REPNE,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Lock => write!(f, "lock"),
            Self::Rep => write!(f, "rep"),
            Self::Repne => write!(f, "repne"),
        }
    }
}
