use std::fmt::{self, Display, Formatter};

use super::super::gc::{GcPtr, ObjRef};
use super::super::heap::Heap;
use super::super::value::Value;
use super::function::Function;
use super::Object;

/// Renders a value the way the language's `print` shows it.
pub struct ValueDisplay<'a> {
    heap: &'a Heap,
    value: Value,
}

impl<'a> ValueDisplay<'a> {
    pub fn new(heap: &'a Heap, value: Value) -> Self {
        Self { heap, value }
    }
}

impl Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.value {
            Value::Nil => f.write_str("nil"),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Number(value) => write!(f, "{}", value),
            Value::Object(object) => ObjectDisplay::new(self.heap, object).fmt(f),
        }
    }
}

/// Renders a heap object.
pub struct ObjectDisplay<'a> {
    heap: &'a Heap,
    object: ObjRef,
}

impl<'a> ObjectDisplay<'a> {
    pub fn new(heap: &'a Heap, object: ObjRef) -> Self {
        Self { heap, object }
    }

    fn write_function(&self, f: &mut Formatter, function: GcPtr<Function>) -> fmt::Result {
        match self.heap.get(function).name {
            Some(name) => write!(f, "<fn {}>", self.heap.get(name).as_str()),
            None => f.write_str("<script>"),
        }
    }
}

impl Display for ObjectDisplay<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let heap = self.heap;
        match heap.get(self.object) {
            Object::String(string) => f.write_str(string.as_str()),
            Object::Function(function) => match function.name {
                Some(name) => write!(f, "<fn {}>", heap.get(name).as_str()),
                None => f.write_str("<script>"),
            },
            Object::Closure(closure) => self.write_function(f, closure.function()),
            Object::Upvalue(_) => f.write_str("upvalue"),
            Object::Native(_) => f.write_str("<native fn>"),
            Object::Class(class) => f.write_str(heap.get(class.name()).as_str()),
            Object::Instance(instance) => {
                let class = heap.get(instance.class());
                write!(f, "{} instance", heap.get(class.name()).as_str())
            }
            Object::BoundMethod(bound_method) => {
                let closure = heap.get(bound_method.method());
                self.write_function(f, closure.function())
            }
            Object::List(_) => f.write_str("<list>"),
        }
    }
}
