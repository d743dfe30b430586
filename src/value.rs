//! Concrete values up to 512 bits wide.
//!
//! Registers and memory accesses are exchanged as [`U512`] regardless of their
//! actual width; helpers here compute width masks and compose/split values
//! according to an architecture's byte order.
use smallvec::SmallVec;

pub use ruint::aliases::U512;

pub const MAX_BITS: usize = 512;
pub const MAX_BYTES: usize = MAX_BITS / 8;

/// All-ones mask `bits` wide.
pub fn mask(bits: usize) -> U512 {
    if bits == 0 {
        U512::ZERO
    } else if bits >= MAX_BITS {
        U512::MAX
    } else {
        U512::MAX >> (MAX_BITS - bits)
    }
}

/// True if `value` is representable in `bits` bits.
pub fn fits(value: &U512, bits: usize) -> bool {
    value.bit_len() <= bits
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    pub fn is_big(&self) -> bool {
        matches!(self, Self::Big)
    }

    pub fn is_little(&self) -> bool {
        matches!(self, Self::Little)
    }

    /// Composes `bytes`, given in ascending address order, into a single value.
    pub fn from_bytes(&self, bytes: &[u8]) -> U512 {
        debug_assert!(bytes.len() <= MAX_BYTES);
        match self {
            Self::Little => U512::from_le_slice(bytes),
            Self::Big => U512::from_be_slice(bytes),
        }
    }

    /// Splits the low `size` bytes of `value` into ascending address order.
    pub fn to_bytes(&self, value: &U512, size: usize) -> SmallVec<[u8; MAX_BYTES]> {
        debug_assert!(size <= MAX_BYTES);
        let le = value.to_le_bytes::<MAX_BYTES>();
        match self {
            Self::Little => le[..size].iter().copied().collect(),
            Self::Big => le[..size].iter().rev().copied().collect(),
        }
    }
}
