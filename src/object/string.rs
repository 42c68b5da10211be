use std::fmt;

use super::super::gc::{GcTrace, Tracer};

/// An immutable heap string with its hash cached for the intern table.
///
/// Strings created through the heap are interned, so two handles to equal
/// content are the same handle.
pub struct ObjString {
    chars: String,
    hash: u32,
}

impl ObjString {
    /// Takes the buffer as-is; no copy is made.
    pub fn new(chars: String) -> Self {
        let hash = hash_string(&chars);
        Self { chars, hash }
    }

    pub(crate) fn with_hash(chars: String, hash: u32) -> Self {
        Self { chars, hash }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.chars
    }

    #[inline]
    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub(crate) fn heap_size(&self) -> usize {
        self.chars.capacity()
    }
}

/// 32-bit FNV-1a.
pub fn hash_string(chars: &str) -> u32 {
    let mut hash: u32 = 2166136261;
    for byte in chars.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

// Strings own no references.
impl GcTrace for ObjString {
    fn trace(&self, _tracer: &mut Tracer) {}
}

impl fmt::Debug for ObjString {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        f.debug_tuple("ObjString").field(&self.chars).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{hash_string, ObjString};

    #[test]
    fn it_hashes_with_fnv1a() {
        assert_eq!(hash_string(""), 2166136261);
        assert_eq!(hash_string("a"), 0xe40c292c);
        assert_eq!(hash_string("foobar"), 0xbf9cf968);
    }

    #[test]
    fn it_keeps_the_buffer_it_was_given() {
        let chars = String::from("hummingbird");
        let address = chars.as_ptr();
        let string = ObjString::new(chars);
        assert_eq!(string.as_str().as_ptr(), address);
        assert_eq!(string.hash(), hash_string("hummingbird"));
        assert_eq!(string.len(), 11);
    }
}
