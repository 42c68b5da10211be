use std::mem;

use hashbrown::HashTable;

use super::super::gc::{GcAllocator, GcManaged, GcPtr};
use super::super::object::ObjString;

/// The canonical set of strings.
///
/// The table holds handles only and stores no keys of its own: lookups hash
/// the content and compare against the strings in the heap, so a string's
/// buffer exists exactly once. Entries are weak; the collector purges the
/// ones it didn't mark before sweeping.
#[derive(Default)]
pub struct Interner {
    table: HashTable<GcPtr<ObjString>>,
}

/// Spread the 32-bit string hash over all 64 bits. The table takes its
/// control tag from the top bits, which a zero-extended hash leaves empty.
fn table_hash(hash: u32) -> u64 {
    (hash as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn string(allocator: &GcAllocator, ptr: GcPtr<ObjString>) -> &ObjString {
    match ObjString::from_object(allocator.object(ptr.key())) {
        Some(string) => string,
        None => panic!("Interned {:?} is not a string", ptr),
    }
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(
        &self,
        allocator: &GcAllocator,
        hash: u32,
        chars: &str,
    ) -> Option<GcPtr<ObjString>> {
        self.table
            .find(table_hash(hash), |candidate| {
                let candidate = string(allocator, *candidate);
                candidate.hash() == hash && candidate.as_str() == chars
            })
            .copied()
    }

    /// Whether the next insert will have to grow the table.
    pub fn needs_growth(&self) -> bool {
        self.table.len() == self.table.capacity()
    }

    /// Rough size of the table after it grows.
    pub fn growth_size(&self) -> usize {
        let capacity = self.table.capacity().max(4) * 2;
        capacity * mem::size_of::<GcPtr<ObjString>>()
    }

    /// The string must not already be interned.
    pub fn insert(&mut self, allocator: &GcAllocator, ptr: GcPtr<ObjString>) {
        let hash = string(allocator, ptr).hash();
        self.table.insert_unique(table_hash(hash), ptr, |entry| {
            table_hash(string(allocator, *entry).hash())
        });
    }

    /// Drop every entry whose string wasn't marked. Must run after marking
    /// and before the sweep frees those strings.
    pub fn remove_unmarked(&mut self, allocator: &GcAllocator) -> usize {
        let before = self.table.len();
        self.table.retain(|entry| allocator.is_marked(entry.key()));
        before - self.table.len()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
