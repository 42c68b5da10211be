use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use slotmap::new_key_type;

use super::super::object::Object;
use super::GcManaged;

new_key_type! {
    /// Slot of an object in the allocator's registry.
    pub struct ObjectKey;
}

/// Registry entry holding a GC'ed object and its mark bit. The object's kind
/// is the `Object` variant.
pub struct GcBox {
    marked: bool,
    object: Object,
}

impl GcBox {
    pub fn new(object: Object) -> Self {
        Self {
            marked: false,
            object,
        }
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }

    pub fn mark(&mut self) {
        self.marked = true;
    }

    pub fn unmark(&mut self) {
        self.marked = false;
    }

    pub fn object(&self) -> &Object {
        &self.object
    }

    pub fn object_mut(&mut self) -> &mut Object {
        &mut self.object
    }
}

/// Handle to a GC'ed object of kind `T`.
///
/// A handle is a registry key, not a pointer: it is `Copy`, compares and
/// hashes by identity, and dereferencing goes through the heap. A handle to
/// an object that has been swept is dangling and using it panics.
pub struct GcPtr<T: GcManaged> {
    key: ObjectKey,
    kind: PhantomData<fn() -> T>,
}

/// Handle to an object of any kind.
pub type ObjRef = GcPtr<Object>;

impl<T: GcManaged> GcPtr<T> {
    pub(crate) fn new(key: ObjectKey) -> Self {
        Self {
            key,
            kind: PhantomData,
        }
    }

    pub(crate) fn key(&self) -> ObjectKey {
        self.key
    }

    /// Forget the kind of the object.
    pub fn erase(self) -> ObjRef {
        GcPtr::new(self.key)
    }
}

impl<T: GcManaged> Clone for GcPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: GcManaged> Copy for GcPtr<T> {}

impl<T: GcManaged> PartialEq for GcPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T: GcManaged> Eq for GcPtr<T> {}

impl<T: GcManaged> Hash for GcPtr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T: GcManaged> fmt::Debug for GcPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        f.debug_tuple("GcPtr").field(&self.key).finish()
    }
}
