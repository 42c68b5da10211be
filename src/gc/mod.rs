mod gc_allocator;
mod gc_ptr;

use std::collections::HashMap;
use std::hash::BuildHasher;

pub use gc_allocator::{GcAllocator, GcStats, SweepReport};
pub use gc_ptr::{GcBox, GcPtr, ObjRef, ObjectKey};

use super::object::Object;

// NOTE: These are separate traits so that we don't conflate being managed by
// GC with being traceable. For example, the VM's stack is not GC-managed but
// it is where tracing starts.

/// Types which can be managed by the GC (ie. allocated and deallocated by it)
/// must have this trait. Every object kind is a variant of [`Object`]; this
/// trait is the checked conversion in and out of that enum.
pub trait GcManaged: GcTrace + Sized {
    fn into_object(self) -> Object;

    fn from_object(object: &Object) -> Option<&Self>;

    fn from_object_mut(object: &mut Object) -> Option<&mut Self>;
}

/// Types which contain `GcPtr`s or which contain types which contain `GcPtr`s
/// (and so on) must implement this trait. Root sets are anything that
/// implements it.
///
/// Tracing a `GcPtr` only grays it: the pointer is pushed onto the tracer's
/// worklist and the allocator later marks it and traces its contents. For an
/// instance whose field holds a list of strings:
///
/// - Value::trace(instance)
///   - Tracer::mark(instance)
/// - Instance::trace()
///   - Tracer::mark(class)
///   - for (name, value) in fields
///     - Tracer::mark(name)
///     - Value::trace(value)
///       - Tracer::mark(list)
/// - List::trace()
///   - for item in self
///     - Tracer::mark(string)
///
/// Working off a list rather than recursing keeps deep or cyclic graphs
/// from blowing the native stack.
pub trait GcTrace {
    /// Mark any `GcPtr`s in self or self's children.
    fn trace(&self, tracer: &mut Tracer);
}

/// Gray worklist for the mark phase.
#[derive(Debug, Default)]
pub struct Tracer {
    gray: Vec<ObjectKey>,
}

impl Tracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark<T: GcManaged>(&mut self, ptr: GcPtr<T>) {
        self.gray.push(ptr.key());
    }

    pub fn mark_value(&mut self, value: &super::value::Value) {
        value.trace(self);
    }

    pub(crate) fn pop(&mut self) -> Option<ObjectKey> {
        self.gray.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.gray.is_empty()
    }
}

/// Capacity to grow a buffer to once it is full: 8 slots, then doubling.
pub fn grow_capacity(capacity: usize) -> usize {
    if capacity < 8 {
        8
    } else {
        capacity * 2
    }
}

impl<T: GcManaged> GcTrace for GcPtr<T> {
    fn trace(&self, tracer: &mut Tracer) {
        tracer.mark(*self);
    }
}

impl GcTrace for () {
    fn trace(&self, _tracer: &mut Tracer) {}
}

impl<T: GcTrace + ?Sized> GcTrace for &T {
    fn trace(&self, tracer: &mut Tracer) {
        (**self).trace(tracer);
    }
}

impl<T: GcTrace> GcTrace for Option<T> {
    fn trace(&self, tracer: &mut Tracer) {
        if let Some(inner) = self {
            inner.trace(tracer);
        }
    }
}

impl<T: GcTrace> GcTrace for [T] {
    fn trace(&self, tracer: &mut Tracer) {
        for item in self.iter() {
            item.trace(tracer);
        }
    }
}

impl<T: GcTrace> GcTrace for Vec<T> {
    fn trace(&self, tracer: &mut Tracer) {
        self.as_slice().trace(tracer);
    }
}

impl<A: GcTrace, B: GcTrace> GcTrace for (A, B) {
    fn trace(&self, tracer: &mut Tracer) {
        self.0.trace(tracer);
        self.1.trace(tracer);
    }
}

impl<A: GcTrace, B: GcTrace, C: GcTrace> GcTrace for (A, B, C) {
    fn trace(&self, tracer: &mut Tracer) {
        self.0.trace(tracer);
        self.1.trace(tracer);
        self.2.trace(tracer);
    }
}

impl<K: GcTrace, V: GcTrace, S: BuildHasher> GcTrace for HashMap<K, V, S> {
    fn trace(&self, tracer: &mut Tracer) {
        for (key, value) in self.iter() {
            key.trace(tracer);
            value.trace(tracer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::grow_capacity;

    #[test]
    fn it_grows_capacity_by_doubling() {
        assert_eq!(grow_capacity(0), 8);
        assert_eq!(grow_capacity(7), 8);
        assert_eq!(grow_capacity(8), 16);
        assert_eq!(grow_capacity(16), 32);
    }
}
