use std::mem;

use super::super::chunk::Chunk;
use super::super::gc::{GcPtr, GcTrace, Tracer};
use super::string::ObjString;
use super::upvalue::Upvalue;

/// A compiled function template. The compiler creates it empty and fills in
/// the fields as it goes.
#[derive(Debug, Default)]
pub struct Function {
    pub arity: u8,
    pub upvalue_count: usize,
    pub chunk: Chunk,
    /// `None` for the implicit top-level script.
    pub name: Option<GcPtr<ObjString>>,
}

impl Function {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn heap_size(&self) -> usize {
        self.chunk.heap_size()
    }
}

impl GcTrace for Function {
    fn trace(&self, tracer: &mut Tracer) {
        self.name.trace(tracer);
        self.chunk.trace(tracer);
    }
}

/// A function paired with the upvalues it captured.
#[derive(Debug)]
pub struct Closure {
    function: GcPtr<Function>,
    upvalues: Box<[Option<GcPtr<Upvalue>>]>,
}

impl Closure {
    /// Every upvalue slot starts empty; the VM fills them right after
    /// creating the closure.
    pub fn new(function: GcPtr<Function>, upvalue_count: usize) -> Self {
        Self {
            function,
            upvalues: vec![None; upvalue_count].into_boxed_slice(),
        }
    }

    pub fn function(&self) -> GcPtr<Function> {
        self.function
    }

    pub fn upvalue(&self, index: usize) -> Option<GcPtr<Upvalue>> {
        self.upvalues[index]
    }

    pub fn set_upvalue(&mut self, index: usize, upvalue: GcPtr<Upvalue>) {
        self.upvalues[index] = Some(upvalue);
    }

    pub fn upvalues(&self) -> &[Option<GcPtr<Upvalue>>] {
        &self.upvalues
    }

    pub(crate) fn heap_size(&self) -> usize {
        self.upvalues.len() * mem::size_of::<Option<GcPtr<Upvalue>>>()
    }
}

impl GcTrace for Closure {
    fn trace(&self, tracer: &mut Tracer) {
        self.function.trace(tracer);
        self.upvalues.trace(tracer);
    }
}
