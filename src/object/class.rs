use std::mem;

use rustc_hash::FxHashMap;

use super::super::errors::HeapError;
use super::super::gc::{GcPtr, GcTrace, Tracer};
use super::super::value::Value;
use super::function::Closure;
use super::string::ObjString;

/// Method and field tables. Keys are interned strings, so hashing and
/// comparing the handle is the same as comparing the names.
pub type Table = FxHashMap<GcPtr<ObjString>, Value>;

fn table_size(table: &Table) -> usize {
    table.capacity() * mem::size_of::<(GcPtr<ObjString>, Value)>()
}

/// Upper bound on the bytes inserting `key` adds. A full table at least
/// doubles; it never more than doubles plus one slot.
fn table_growth(table: &Table, key: GcPtr<ObjString>) -> usize {
    if table.len() < table.capacity() || table.contains_key(&key) {
        return 0;
    }
    (table.capacity() + 1).max(3) * mem::size_of::<(GcPtr<ObjString>, Value)>()
}

fn table_insert(
    table: &mut Table,
    key: GcPtr<ObjString>,
    value: Value,
) -> Result<(), HeapError> {
    if !table.contains_key(&key) {
        table.try_reserve(1)?;
    }
    table.insert(key, value);
    Ok(())
}

/// Result of looking a name up on an instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Property {
    Field(Value),
    /// An unbound method found on the instance's class.
    Method(Value),
}

#[derive(Debug)]
pub struct Class {
    name: GcPtr<ObjString>,
    methods: Table,
}

impl Class {
    pub fn new(name: GcPtr<ObjString>) -> Self {
        Self {
            name,
            methods: Table::default(),
        }
    }

    pub fn name(&self) -> GcPtr<ObjString> {
        self.name
    }

    pub fn method(&self, name: GcPtr<ObjString>) -> Option<Value> {
        self.methods.get(&name).copied()
    }

    pub(crate) fn set_method(
        &mut self,
        name: GcPtr<ObjString>,
        method: Value,
    ) -> Result<(), HeapError> {
        table_insert(&mut self.methods, name, method)
    }

    pub(crate) fn method_growth(&self, name: GcPtr<ObjString>) -> usize {
        table_growth(&self.methods, name)
    }

    pub fn methods(&self) -> &Table {
        &self.methods
    }

    pub(crate) fn heap_size(&self) -> usize {
        table_size(&self.methods)
    }
}

impl GcTrace for Class {
    fn trace(&self, tracer: &mut Tracer) {
        self.name.trace(tracer);
        self.methods.trace(tracer);
    }
}

#[derive(Debug)]
pub struct Instance {
    class: GcPtr<Class>,
    fields: Table,
}

impl Instance {
    pub fn new(class: GcPtr<Class>) -> Self {
        Self {
            class,
            fields: Table::default(),
        }
    }

    pub fn class(&self) -> GcPtr<Class> {
        self.class
    }

    pub fn field(&self, name: GcPtr<ObjString>) -> Option<Value> {
        self.fields.get(&name).copied()
    }

    pub(crate) fn set_field(
        &mut self,
        name: GcPtr<ObjString>,
        value: Value,
    ) -> Result<(), HeapError> {
        table_insert(&mut self.fields, name, value)
    }

    pub(crate) fn field_growth(&self, name: GcPtr<ObjString>) -> usize {
        table_growth(&self.fields, name)
    }

    pub fn fields(&self) -> &Table {
        &self.fields
    }

    pub(crate) fn heap_size(&self) -> usize {
        table_size(&self.fields)
    }
}

impl GcTrace for Instance {
    fn trace(&self, tracer: &mut Tracer) {
        self.class.trace(tracer);
        self.fields.trace(tracer);
    }
}

/// A method accessed off a receiver but not yet called. Calling it passes
/// the receiver as the implicit first argument.
#[derive(Debug)]
pub struct BoundMethod {
    receiver: Value,
    method: GcPtr<Closure>,
}

impl BoundMethod {
    pub fn new(receiver: Value, method: GcPtr<Closure>) -> Self {
        Self { receiver, method }
    }

    pub fn receiver(&self) -> Value {
        self.receiver
    }

    pub fn method(&self) -> GcPtr<Closure> {
        self.method
    }
}

impl GcTrace for BoundMethod {
    fn trace(&self, tracer: &mut Tracer) {
        self.receiver.trace(tracer);
        self.method.trace(tracer);
    }
}
