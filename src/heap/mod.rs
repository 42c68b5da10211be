//! The runtime context for managed objects.
//!
//! A [`Heap`] bundles the object registry, the collector's bookkeeping and
//! the string intern table. The VM owns one and passes it explicitly to
//! anything that allocates or reads objects.
//!
//! # Roots and safepoints
//!
//! Every constructor takes the caller's root set (`&dyn GcTrace`: the VM
//! stack, globals, open upvalues, whatever the compiler is holding). If the
//! allocation crosses the collection threshold the heap collects *before*
//! linking the new object, tracing the roots, its own pinned values and the
//! object under construction. An object therefore never reaches the
//! collector half-built, and anything it references survives even when the
//! new object is its only referent.
//!
//! Buffers owned by existing objects (list elements, field and method
//! tables, chunks) grow through the heap as well: `list_append`,
//! `set_field`, `add_method`, `write_chunk` and `add_constant` run the same
//! threshold and cap checks before growing and charge what was added.

use std::io::{self, Write};

use humansize::{format_size, BINARY};

use super::config::HeapConfig;
use super::errors::HeapError;
use super::gc::{GcAllocator, GcManaged, GcPtr, GcStats, GcTrace, ObjRef, Tracer};
use super::object::{
    hash_string, BoundMethod, Class, Closure, Function, Instance, List, Native, NativeFn,
    ObjKind, ObjString, Object, ObjectDisplay, Property, Upvalue, ValueDisplay,
};
use super::value::Value;

mod interner;

use interner::Interner;

/// What one collection did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectionReport {
    pub objects_freed: usize,
    pub bytes_freed: usize,
    pub bytes_before: usize,
    pub bytes_after: usize,
    pub strings_uninterned: usize,
    pub next_gc: usize,
}

pub struct Heap {
    config: HeapConfig,
    allocator: GcAllocator,
    strings: Interner,
    /// Extra roots for values the heap itself is in the middle of using.
    pinned: Vec<ObjRef>,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new(HeapConfig::default())
    }
}

impl Heap {
    pub fn new(config: HeapConfig) -> Self {
        Self {
            allocator: GcAllocator::new(&config),
            strings: Interner::new(),
            pinned: vec![],
            config,
        }
    }

    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// The single entry point every object goes through. Strings belong in
    /// `copy_string`/`take_string` instead, which intern them.
    pub fn allocate<T: GcManaged>(
        &mut self,
        roots: &dyn GcTrace,
        value: T,
    ) -> Result<GcPtr<T>, HeapError> {
        let object = value.into_object();
        let size = object.heap_size();
        if self.allocator.needs_collection(size) {
            self.collect_garbage(roots, Some(&object));
        }
        self.allocator.reserve(size)?;
        let key = self.allocator.insert(object);
        Ok(GcPtr::new(key))
    }

    /// Collect if `size` more bytes would cross the threshold, then check
    /// them against the heap cap.
    fn make_room(&mut self, roots: &dyn GcTrace, size: usize) -> Result<(), HeapError> {
        if size == 0 {
            return Ok(());
        }
        if self.allocator.needs_collection(size) {
            self.collect_garbage(roots, None);
        }
        self.allocator.reserve(size)
    }

    /// Grow a buffer of `ptr` through `mutate`. `estimate` is an upper bound
    /// on the growth and `roots` must reach `ptr` and whatever is being
    /// stored into it. The growth actually made is what gets charged.
    fn grow<T: GcManaged, R>(
        &mut self,
        roots: &dyn GcTrace,
        ptr: GcPtr<T>,
        estimate: usize,
        mutate: impl FnOnce(&mut T) -> Result<R, HeapError>,
    ) -> Result<R, HeapError> {
        self.make_room(roots, estimate)?;
        let before = self.allocator.object(ptr.key()).heap_size();
        let result = mutate(self.get_mut(ptr))?;
        let after = self.allocator.object(ptr.key()).heap_size();
        self.allocator.charge(after.saturating_sub(before));
        Ok(result)
    }

    /// Keep `object` alive across collections until the matching `unpin`.
    pub fn pin(&mut self, object: ObjRef) {
        self.pinned.push(object);
    }

    pub fn unpin(&mut self) {
        self.pinned.pop();
    }

    /// Run a full mark-and-sweep pass from `roots`.
    pub fn collect(&mut self, roots: &dyn GcTrace) -> CollectionReport {
        self.collect_garbage(roots, None)
    }

    fn collect_garbage(&mut self, roots: &dyn GcTrace, pending: Option<&Object>) -> CollectionReport {
        let bytes_before = self.allocator.bytes_allocated();
        log::debug!(
            "-- gc begin: {} in {} objects",
            format_size(bytes_before, BINARY),
            self.allocator.len()
        );

        let mut tracer = Tracer::new();
        roots.trace(&mut tracer);
        self.pinned.trace(&mut tracer);
        if let Some(object) = pending {
            object.trace(&mut tracer);
        }
        self.allocator.mark(&mut tracer);

        let strings_uninterned = self.strings.remove_unmarked(&self.allocator);
        let sweep = self.allocator.sweep();

        let report = CollectionReport {
            objects_freed: sweep.objects_freed,
            bytes_freed: sweep.bytes_freed,
            bytes_before,
            bytes_after: sweep.live_bytes,
            strings_uninterned,
            next_gc: self.allocator.next_gc(),
        };
        log::debug!(
            "-- gc end: collected {} ({} objects), {} -> {}, next at {}",
            format_size(report.bytes_freed, BINARY),
            report.objects_freed,
            format_size(report.bytes_before, BINARY),
            format_size(report.bytes_after, BINARY),
            format_size(report.next_gc, BINARY)
        );
        report
    }

    pub fn stats(&self) -> &GcStats {
        self.allocator.stats()
    }

    pub fn bytes_allocated(&self) -> usize {
        self.allocator.bytes_allocated()
    }

    pub fn object_count(&self) -> usize {
        self.allocator.len()
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    pub fn get<T: GcManaged>(&self, ptr: GcPtr<T>) -> &T {
        let object = self.allocator.object(ptr.key());
        match T::from_object(object) {
            Some(inner) => inner,
            None => panic!("{:?} is a {}, not the kind it was typed as", ptr, object.kind()),
        }
    }

    pub fn get_mut<T: GcManaged>(&mut self, ptr: GcPtr<T>) -> &mut T {
        let object = self.allocator.object_mut(ptr.key());
        let kind = object.kind();
        match T::from_object_mut(object) {
            Some(inner) => inner,
            None => panic!("{:?} is a {}, not the kind it was typed as", ptr, kind),
        }
    }

    /// Whether the object is still in the heap (hasn't been swept).
    pub fn contains<T: GcManaged>(&self, ptr: GcPtr<T>) -> bool {
        self.allocator.contains(ptr.key())
    }

    pub fn kind(&self, object: ObjRef) -> ObjKind {
        self.allocator.object(object.key()).kind()
    }

    /// Recover the typed handle if `object` is a `T`.
    pub fn downcast<T: GcManaged>(&self, object: ObjRef) -> Option<GcPtr<T>> {
        T::from_object(self.allocator.object(object.key())).map(|_| GcPtr::new(object.key()))
    }

    /// The typed handle in `value`, if it holds an object of kind `T`.
    pub fn as_kind<T: GcManaged>(&self, value: Value) -> Option<GcPtr<T>> {
        value.as_object().and_then(|object| self.downcast(object))
    }

    pub fn is_kind<T: GcManaged>(&self, value: Value) -> bool {
        self.as_kind::<T>(value).is_some()
    }

    /// Intern a copy of `chars`.
    pub fn copy_string(
        &mut self,
        roots: &dyn GcTrace,
        chars: &str,
    ) -> Result<GcPtr<ObjString>, HeapError> {
        let hash = hash_string(chars);
        if let Some(interned) = self.strings.find(&self.allocator, hash, chars) {
            return Ok(interned);
        }
        let mut owned = String::new();
        owned.try_reserve_exact(chars.len())?;
        owned.push_str(chars);
        self.intern(roots, ObjString::with_hash(owned, hash))
    }

    /// Intern `chars`, taking ownership of the buffer. If the content is
    /// already interned the buffer is dropped, otherwise it becomes the new
    /// string's buffer without being copied.
    pub fn take_string(
        &mut self,
        roots: &dyn GcTrace,
        chars: String,
    ) -> Result<GcPtr<ObjString>, HeapError> {
        let hash = hash_string(&chars);
        if let Some(interned) = self.strings.find(&self.allocator, hash, &chars) {
            return Ok(interned);
        }
        self.intern(roots, ObjString::with_hash(chars, hash))
    }

    /// Look up an interned string without allocating.
    pub fn find_string(&self, chars: &str) -> Option<GcPtr<ObjString>> {
        self.strings
            .find(&self.allocator, hash_string(chars), chars)
    }

    pub fn concatenate(
        &mut self,
        roots: &dyn GcTrace,
        lhs: GcPtr<ObjString>,
        rhs: GcPtr<ObjString>,
    ) -> Result<GcPtr<ObjString>, HeapError> {
        let lhs = self.get(lhs).as_str();
        let rhs = self.get(rhs).as_str();
        let mut chars = String::new();
        chars.try_reserve_exact(lhs.len() + rhs.len())?;
        chars.push_str(lhs);
        chars.push_str(rhs);
        self.take_string(roots, chars)
    }

    fn intern(
        &mut self,
        roots: &dyn GcTrace,
        string: ObjString,
    ) -> Result<GcPtr<ObjString>, HeapError> {
        let ptr = self.allocate(roots, string)?;

        // Growing the table is an allocation of its own. The new string isn't
        // referenced by anything yet, so pin it for the duration.
        self.pin(ptr.erase());
        if self.strings.needs_growth()
            && self.allocator.needs_collection(self.strings.growth_size())
        {
            self.collect_garbage(roots, None);
        }
        self.strings.insert(&self.allocator, ptr);
        self.unpin();

        Ok(ptr)
    }

    pub fn new_function(&mut self, roots: &dyn GcTrace) -> Result<GcPtr<Function>, HeapError> {
        self.allocate(roots, Function::new())
    }

    pub fn new_closure(
        &mut self,
        roots: &dyn GcTrace,
        function: GcPtr<Function>,
    ) -> Result<GcPtr<Closure>, HeapError> {
        let upvalue_count = self.get(function).upvalue_count;
        self.allocate(roots, Closure::new(function, upvalue_count))
    }

    pub fn new_upvalue(
        &mut self,
        roots: &dyn GcTrace,
        slot: usize,
    ) -> Result<GcPtr<Upvalue>, HeapError> {
        self.allocate(roots, Upvalue::new(slot))
    }

    pub fn new_native(
        &mut self,
        roots: &dyn GcTrace,
        function: NativeFn,
    ) -> Result<GcPtr<Native>, HeapError> {
        self.allocate(roots, Native::new(function))
    }

    pub fn new_class(
        &mut self,
        roots: &dyn GcTrace,
        name: GcPtr<ObjString>,
    ) -> Result<GcPtr<Class>, HeapError> {
        self.allocate(roots, Class::new(name))
    }

    pub fn new_instance(
        &mut self,
        roots: &dyn GcTrace,
        class: GcPtr<Class>,
    ) -> Result<GcPtr<Instance>, HeapError> {
        self.allocate(roots, Instance::new(class))
    }

    pub fn new_bound_method(
        &mut self,
        roots: &dyn GcTrace,
        receiver: Value,
        method: GcPtr<Closure>,
    ) -> Result<GcPtr<BoundMethod>, HeapError> {
        self.allocate(roots, BoundMethod::new(receiver, method))
    }

    pub fn new_list(&mut self, roots: &dyn GcTrace) -> Result<GcPtr<List>, HeapError> {
        self.allocate(roots, List::new())
    }

    /// Append `value` to `list`, growing its buffer if it is full.
    pub fn list_append(
        &mut self,
        roots: &dyn GcTrace,
        list: GcPtr<List>,
        value: Value,
    ) -> Result<(), HeapError> {
        let growth = self.get(list).growth_size();
        self.grow(&(roots, list, value), list, growth, |list| list.append(value))
    }

    /// Append an instruction byte to `function`'s chunk.
    pub fn write_chunk(
        &mut self,
        roots: &dyn GcTrace,
        function: GcPtr<Function>,
        byte: u8,
        line: u32,
    ) -> Result<(), HeapError> {
        let growth = self.get(function).chunk.write_growth();
        self.grow(&(roots, function), function, growth, |function| {
            function.chunk.write(byte, line)
        })
    }

    /// Add a constant to `function`'s chunk and return its index.
    pub fn add_constant(
        &mut self,
        roots: &dyn GcTrace,
        function: GcPtr<Function>,
        value: Value,
    ) -> Result<usize, HeapError> {
        let growth = self.get(function).chunk.constant_growth();
        self.grow(&(roots, function, value), function, growth, |function| {
            function.chunk.add_constant(value)
        })
    }

    /// Look `name` up on an instance: its own fields first, then its class's
    /// methods. A missing property is `None`; reporting it is up to the VM.
    pub fn get_property(
        &self,
        instance: GcPtr<Instance>,
        name: GcPtr<ObjString>,
    ) -> Option<Property> {
        let instance = self.get(instance);
        if let Some(value) = instance.field(name) {
            return Some(Property::Field(value));
        }
        self.get(instance.class())
            .method(name)
            .map(Property::Method)
    }

    pub fn set_field(
        &mut self,
        roots: &dyn GcTrace,
        instance: GcPtr<Instance>,
        name: GcPtr<ObjString>,
        value: Value,
    ) -> Result<(), HeapError> {
        let growth = self.get(instance).field_growth(name);
        self.grow(&(roots, instance, (name, value)), instance, growth, |instance| {
            instance.set_field(name, value)
        })
    }

    pub fn add_method(
        &mut self,
        roots: &dyn GcTrace,
        class: GcPtr<Class>,
        name: GcPtr<ObjString>,
        method: Value,
    ) -> Result<(), HeapError> {
        let growth = self.get(class).method_growth(name);
        self.grow(&(roots, class, (name, method)), class, growth, |class| {
            class.set_method(name, method)
        })
    }

    pub fn find_method(&self, class: GcPtr<Class>, name: GcPtr<ObjString>) -> Option<Value> {
        self.get(class).method(name)
    }

    /// Pair `receiver` with the closure `class` defines under `name`.
    /// Returns `None` if there is no such method.
    pub fn bind_method(
        &mut self,
        roots: &dyn GcTrace,
        receiver: Value,
        class: GcPtr<Class>,
        name: GcPtr<ObjString>,
    ) -> Result<Option<GcPtr<BoundMethod>>, HeapError> {
        let method = match self
            .find_method(class, name)
            .and_then(|method| self.as_kind::<Closure>(method))
        {
            Some(method) => method,
            None => return Ok(None),
        };
        self.new_bound_method(roots, receiver, method).map(Some)
    }

    /// Copy every method of `superclass` into `subclass`. Run it before the
    /// subclass defines its own methods so those override the inherited
    /// ones.
    pub fn inherit(
        &mut self,
        roots: &dyn GcTrace,
        subclass: GcPtr<Class>,
        superclass: GcPtr<Class>,
    ) -> Result<(), HeapError> {
        let methods = self.get(superclass).methods().clone();
        for (name, method) in methods.into_iter() {
            self.add_method(&(roots, superclass), subclass, name, method)?;
        }
        Ok(())
    }

    pub fn display(&self, value: Value) -> ValueDisplay<'_> {
        ValueDisplay::new(self, value)
    }

    pub fn display_object(&self, object: ObjRef) -> ObjectDisplay<'_> {
        ObjectDisplay::new(self, object)
    }

    pub fn to_string(&self, value: Value) -> String {
        self.display(value).to_string()
    }

    /// Write `value` to stdout. Output errors are ignored.
    pub fn print(&self, value: Value) {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        let _ = write!(handle, "{}", self.display(value));
    }

    /// Identity, or equal content for two strings.
    pub fn objects_equal(&self, lhs: ObjRef, rhs: ObjRef) -> bool {
        lhs == rhs || self.get(lhs).equals(self.get(rhs))
    }

    pub fn values_equal(&self, lhs: Value, rhs: Value) -> bool {
        match (lhs, rhs) {
            (Value::Object(lhs), Value::Object(rhs)) => self.objects_equal(lhs, rhs),
            _ => lhs.same(&rhs),
        }
    }
}
