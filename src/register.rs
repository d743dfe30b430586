//! Register descriptor tables.
//!
//! Every architectural register is described by a [`RegisterDescriptor`]:
//! the top-level register it lives in and the bit range it occupies there.
//! Sub-registers and individual flag bits are ordinary descriptors whose
//! parent is the register owning the physical storage, so a single bit-slice
//! read/write handles all of them.
use std::fmt;

use fxhash::FxHashMap as HashMap;
use itertools::Itertools;

use crate::state::Error;
use crate::value::{mask, U512};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RegisterId(pub u16);

impl RegisterId {
    pub const NONE: Self = Self(0);

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterClass {
    Gpr,
    Flag,
    VectorLow,
    VectorHigh,
    Control,
    Debug,
    Segment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterDescriptor {
    id: RegisterId,
    parent: RegisterId,
    high: u16,
    low: u16,
    name: &'static str,
}

impl Default for RegisterDescriptor {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for RegisterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}bv[{}..{}]", self.name, self.bits(), self.high, self.low)
    }
}

impl RegisterDescriptor {
    /// Placeholder for absent operand registers (e.g. a memory operand
    /// without an index).
    pub const NONE: Self = Self {
        id: RegisterId::NONE,
        parent: RegisterId::NONE,
        high: 0,
        low: 0,
        name: "unknown",
    };

    pub const fn new(
        id: RegisterId,
        parent: RegisterId,
        high: u16,
        low: u16,
        name: &'static str,
    ) -> Self {
        Self {
            id,
            parent,
            high,
            low,
            name,
        }
    }

    pub fn id(&self) -> RegisterId {
        self.id
    }

    pub fn parent(&self) -> RegisterId {
        self.parent
    }

    pub fn high(&self) -> usize {
        self.high as usize
    }

    pub fn low(&self) -> usize {
        self.low as usize
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_none(&self) -> bool {
        self.id.is_none()
    }

    /// True for registers owning their physical storage.
    pub fn is_parent(&self) -> bool {
        !self.is_none() && self.id == self.parent
    }

    pub fn bits(&self) -> usize {
        if self.is_none() {
            0
        } else {
            (self.high - self.low) as usize + 1
        }
    }

    /// Width in whole bytes; zero for single-bit flags.
    pub fn size(&self) -> usize {
        self.bits() / 8
    }

    pub fn max_value(&self) -> U512 {
        mask(self.bits())
    }
}

/// Descriptor table for one architecture, plus the layout of the physical
/// register file derived from it.
#[derive(Debug)]
pub struct RegisterSpec {
    descriptors: Box<[RegisterDescriptor]>,
    names: HashMap<String, RegisterId>,
    storage: Box<[Option<(usize, usize)>]>,
    storage_size: usize,
}

impl RegisterSpec {
    /// Builds a table from `descriptors`, where `descriptors[i].id() == i` and
    /// index 0 is [`RegisterDescriptor::NONE`].
    pub fn new(descriptors: &[RegisterDescriptor]) -> Self {
        let mut storage = vec![None; descriptors.len()];
        let mut storage_size = 0;

        for (index, descriptor) in descriptors.iter().enumerate() {
            debug_assert_eq!(descriptor.id().index(), index);
            if descriptor.is_parent() {
                let bytes = (descriptor.high() + 8) / 8;
                storage[index] = Some((storage_size, bytes));
                storage_size += bytes;
            }
        }

        for descriptor in descriptors.iter().filter(|d| !d.is_none()) {
            let parent = &descriptors[descriptor.parent().index()];
            debug_assert!(parent.is_parent());
            debug_assert!(descriptor.low() <= descriptor.high());
            debug_assert!(descriptor.high() <= parent.high());
        }

        let names = descriptors
            .iter()
            .filter(|d| !d.is_none())
            .map(|d| (d.name().to_ascii_lowercase(), d.id()))
            .collect();

        Self {
            descriptors: descriptors.into(),
            names,
            storage: storage.into(),
            storage_size,
        }
    }

    /// Number of identifiers, including the reserved `NONE` slot.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.len() <= 1
    }

    pub fn is_valid(&self, id: RegisterId) -> bool {
        !id.is_none() && id.index() < self.descriptors.len()
    }

    pub fn lookup(&self, id: RegisterId) -> Result<&RegisterDescriptor, Error> {
        if self.is_valid(id) {
            Ok(&self.descriptors[id.index()])
        } else {
            Err(Error::InvalidRegister(id))
        }
    }

    /// Case-insensitive lookup.
    pub fn lookup_by_name(&self, name: &str) -> Result<&RegisterDescriptor, Error> {
        self.names
            .get(&name.to_ascii_lowercase())
            .map(|id| &self.descriptors[id.index()])
            .ok_or_else(|| Error::InvalidRegisterName(name.to_owned()))
    }

    /// Resolves `id`, falling back to [`RegisterDescriptor::NONE`].
    pub fn lookup_or_none(&self, id: RegisterId) -> RegisterDescriptor {
        self.lookup(id).copied().unwrap_or_default()
    }

    pub fn parent_of(&self, id: RegisterId) -> Result<&RegisterDescriptor, Error> {
        let register = self.lookup(id)?;
        self.lookup(register.parent())
    }

    /// All descriptors except `NONE`, in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisterDescriptor> + '_ {
        self.descriptors.iter().skip(1)
    }

    /// One descriptor per top-level register.
    pub fn parents(&self) -> impl Iterator<Item = &RegisterDescriptor> + '_ {
        self.iter()
            .map(|d| &self.descriptors[d.parent().index()])
            .unique_by(|d| d.id())
    }

    /// Byte offset and length of `parent`'s storage in the register file.
    pub fn storage(&self, parent: RegisterId) -> Option<(usize, usize)> {
        self.storage.get(parent.index()).copied().flatten()
    }

    /// Total size in bytes of the register file.
    pub fn storage_size(&self) -> usize {
        self.storage_size
    }
}
