/// Sparse concrete memory
///
/// Bytes live in 4 KiB pages keyed by page number; each page tracks which of
/// its bytes have been written, so that "defined" and "zero" stay distinct.
/// Undefined bytes read as zero. Pages are created lazily on write and
/// dropped once their last defined byte is cleared.
use std::collections::BTreeMap;
use std::ops::{Index, IndexMut};

const PAGE_SHIFT: u32 = 12;
const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
const PAGE_MASK: u64 = PAGE_SIZE as u64 - 1;

const WORD_BITS: usize = u64::BITS as usize;

#[derive(Debug, Clone)]
struct Page {
    bytes: Box<[u8; PAGE_SIZE]>,
    defined: Box<[u64; PAGE_SIZE / WORD_BITS]>,
    count: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            bytes: Box::new([0u8; PAGE_SIZE]),
            defined: Box::new([0u64; PAGE_SIZE / WORD_BITS]),
            count: 0,
        }
    }
}

impl Index<usize> for Page {
    type Output = u8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.bytes[index]
    }
}

impl IndexMut<usize> for Page {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.bytes[index]
    }
}

impl Page {
    fn new() -> Self {
        Self::default()
    }

    fn is_defined(&self, offset: usize) -> bool {
        self.defined[offset / WORD_BITS] & (1 << (offset % WORD_BITS)) != 0
    }

    fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn define(&mut self, offset: usize, value: u8) {
        let word = &mut self.defined[offset / WORD_BITS];
        let bit = 1 << (offset % WORD_BITS);
        if *word & bit == 0 {
            *word |= bit;
            self.count += 1;
        }
        self.bytes[offset] = value;
    }

    fn undefine(&mut self, offset: usize) {
        let word = &mut self.defined[offset / WORD_BITS];
        let bit = 1 << (offset % WORD_BITS);
        if *word & bit != 0 {
            *word &= !bit;
            self.count -= 1;
        }
        self.bytes[offset] = 0;
    }

    fn defined_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        (0..PAGE_SIZE).filter(move |offset| self.is_defined(*offset))
    }
}

fn split(address: u64) -> (u64, usize) {
    (address >> PAGE_SHIFT, (address & PAGE_MASK) as usize)
}

#[derive(Debug, Clone, Default)]
pub struct ConcreteMemory {
    pages: BTreeMap<u64, Page>,
}

impl ConcreteMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of defined bytes.
    pub fn len(&self) -> usize {
        self.pages.values().map(|page| page.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn read(&self, address: u64) -> u8 {
        let (page, offset) = split(address);
        self.pages.get(&page).map(|p| p[offset]).unwrap_or(0)
    }

    pub fn write(&mut self, address: u64, value: u8) {
        let (page, offset) = split(address);
        self.pages
            .entry(page)
            .or_insert_with(Page::new)
            .define(offset, value);
    }

    pub fn is_defined(&self, address: u64) -> bool {
        let (page, offset) = split(address);
        self.pages
            .get(&page)
            .map(|p| p.is_defined(offset))
            .unwrap_or(false)
    }

    pub fn clear(&mut self, address: u64) {
        let (page, offset) = split(address);
        if let Some(p) = self.pages.get_mut(&page) {
            p.undefine(offset);
            if p.is_empty() {
                self.pages.remove(&page);
            }
        }
    }

    /// Reads `length` bytes starting at `address`; addresses wrap at 2^64.
    pub fn read_bytes(&self, address: u64, length: usize) -> Vec<u8> {
        (0..length as u64)
            .map(|i| self.read(address.wrapping_add(i)))
            .collect()
    }

    pub fn write_bytes(&mut self, address: u64, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            self.write(address.wrapping_add(i as u64), *byte);
        }
    }

    pub fn is_range_defined(&self, address: u64, length: usize) -> bool {
        (0..length as u64).all(|i| self.is_defined(address.wrapping_add(i)))
    }

    pub fn clear_range(&mut self, address: u64, length: usize) {
        for i in 0..length as u64 {
            self.clear(address.wrapping_add(i));
        }
    }

    pub fn clear_all(&mut self) {
        self.pages.clear();
    }

    /// Defined bytes in ascending address order.
    pub fn defined(&self) -> impl Iterator<Item = (u64, u8)> + '_ {
        self.pages.iter().flat_map(|(page, p)| {
            let base = page << PAGE_SHIFT;
            p.defined_offsets()
                .map(move |offset| (base + offset as u64, p[offset]))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_reads_zero() {
        let memory = ConcreteMemory::new();

        assert_eq!(memory.read(0x1000), 0);
        assert!(!memory.is_defined(0x1000));
        assert!(memory.is_empty());
    }

    #[test]
    fn defined_zero_is_distinct() {
        let mut memory = ConcreteMemory::new();
        memory.write(0x1000, 0);

        assert!(memory.is_defined(0x1000));
        assert!(!memory.is_defined(0x1001));
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn clear_drops_empty_pages() {
        let mut memory = ConcreteMemory::new();
        memory.write_bytes(0x2ffe, &[1, 2, 3, 4]);

        assert_eq!(memory.pages.len(), 2);
        assert_eq!(memory.read_bytes(0x2ffe, 4), vec![1, 2, 3, 4]);

        memory.clear_range(0x3000, 2);
        assert_eq!(memory.pages.len(), 1);
        assert_eq!(memory.read(0x3000), 0);
        assert!(memory.is_range_defined(0x2ffe, 2));
        assert!(!memory.is_range_defined(0x2ffe, 3));

        memory.clear_range(0x2ffe, 2);
        assert!(memory.is_empty());
    }

    #[test]
    fn wraps_at_top_of_address_space() {
        let mut memory = ConcreteMemory::new();
        memory.write_bytes(u64::MAX, &[0xaa, 0xbb]);

        assert_eq!(memory.read(u64::MAX), 0xaa);
        assert_eq!(memory.read(0), 0xbb);
        assert_eq!(
            memory.defined().collect::<Vec<_>>(),
            vec![(0, 0xbb), (u64::MAX, 0xaa)]
        );
    }
}
