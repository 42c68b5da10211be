//! Heap object kinds.
//!
//! Every object the heap manages is one variant of [`Object`]. Anything that
//! needs to treat objects generically (tracing, sizing, rendering, equality)
//! matches on the enum without a wildcard arm, so adding a kind won't compile
//! until every dispatch site handles it.

use std::fmt;
use std::mem;

use super::gc::{GcBox, GcManaged, GcTrace, Tracer};

mod class;
mod function;
mod list;
mod native;
mod printer;
mod string;
mod upvalue;

pub use class::{BoundMethod, Class, Instance, Property, Table};
pub use function::{Closure, Function};
pub use list::List;
pub use native::{Native, NativeFn};
pub use printer::{ObjectDisplay, ValueDisplay};
pub use string::{hash_string, ObjString};
pub use upvalue::{OpenUpvalues, Upvalue, UpvalueState};

#[derive(Debug)]
pub enum Object {
    String(ObjString),
    Function(Function),
    Closure(Closure),
    Upvalue(Upvalue),
    Native(Native),
    Class(Class),
    Instance(Instance),
    BoundMethod(BoundMethod),
    List(List),
}

/// The kind tag of an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjKind {
    String,
    Function,
    Closure,
    Upvalue,
    Native,
    Class,
    Instance,
    BoundMethod,
    List,
}

impl fmt::Display for ObjKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ObjKind::String => "String",
            ObjKind::Function => "Function",
            ObjKind::Closure => "Closure",
            ObjKind::Upvalue => "Upvalue",
            ObjKind::Native => "Native",
            ObjKind::Class => "Class",
            ObjKind::Instance => "Instance",
            ObjKind::BoundMethod => "BoundMethod",
            ObjKind::List => "List",
        };
        f.write_str(name)
    }
}

impl Object {
    pub fn kind(&self) -> ObjKind {
        match self {
            Object::String(_) => ObjKind::String,
            Object::Function(_) => ObjKind::Function,
            Object::Closure(_) => ObjKind::Closure,
            Object::Upvalue(_) => ObjKind::Upvalue,
            Object::Native(_) => ObjKind::Native,
            Object::Class(_) => ObjKind::Class,
            Object::Instance(_) => ObjKind::Instance,
            Object::BoundMethod(_) => ObjKind::BoundMethod,
            Object::List(_) => ObjKind::List,
        }
    }

    /// Only strings have structural equality. Every other kind has identity
    /// semantics, so two distinct objects are never equal even when their
    /// contents match.
    pub fn equals(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::String(lhs), Object::String(rhs)) => lhs.as_str() == rhs.as_str(),
            (Object::String(_), _) => false,
            (Object::Function(_), _) => false,
            (Object::Closure(_), _) => false,
            (Object::Upvalue(_), _) => false,
            (Object::Native(_), _) => false,
            (Object::Class(_), _) => false,
            (Object::Instance(_), _) => false,
            (Object::BoundMethod(_), _) => false,
            (Object::List(_), _) => false,
        }
    }

    /// Bytes accounted to this object: its registry box plus the buffers it
    /// owns.
    pub(crate) fn heap_size(&self) -> usize {
        let owned = match self {
            Object::String(string) => string.heap_size(),
            Object::Function(function) => function.heap_size(),
            Object::Closure(closure) => closure.heap_size(),
            Object::Upvalue(_) => 0,
            Object::Native(_) => 0,
            Object::Class(class) => class.heap_size(),
            Object::Instance(instance) => instance.heap_size(),
            Object::BoundMethod(_) => 0,
            Object::List(list) => list.heap_size(),
        };
        mem::size_of::<GcBox>() + owned
    }
}

impl GcTrace for Object {
    fn trace(&self, tracer: &mut Tracer) {
        match self {
            Object::String(string) => string.trace(tracer),
            Object::Function(function) => function.trace(tracer),
            Object::Closure(closure) => closure.trace(tracer),
            Object::Upvalue(upvalue) => upvalue.trace(tracer),
            Object::Native(native) => native.trace(tracer),
            Object::Class(class) => class.trace(tracer),
            Object::Instance(instance) => instance.trace(tracer),
            Object::BoundMethod(bound_method) => bound_method.trace(tracer),
            Object::List(list) => list.trace(tracer),
        }
    }
}

impl GcManaged for Object {
    fn into_object(self) -> Object {
        self
    }

    fn from_object(object: &Object) -> Option<&Self> {
        Some(object)
    }

    fn from_object_mut(object: &mut Object) -> Option<&mut Self> {
        Some(object)
    }
}

macro_rules! managed_kinds {
    ($($variant:ident($kind:ty)),* $(,)?) => {
        $(
            impl GcManaged for $kind {
                fn into_object(self) -> Object {
                    Object::$variant(self)
                }

                fn from_object(object: &Object) -> Option<&Self> {
                    match object {
                        Object::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn from_object_mut(object: &mut Object) -> Option<&mut Self> {
                    match object {
                        Object::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

managed_kinds!(
    String(ObjString),
    Function(Function),
    Closure(Closure),
    Upvalue(Upvalue),
    Native(Native),
    Class(Class),
    Instance(Instance),
    BoundMethod(BoundMethod),
    List(List),
);

#[cfg(test)]
mod tests {
    use super::{List, Native, ObjKind, ObjString, Object};
    use crate::value::Value;

    fn nil(_arguments: &[Value]) -> Value {
        Value::Nil
    }

    #[test]
    fn it_compares_strings_by_content() {
        let lhs = Object::String(ObjString::new("same".to_owned()));
        let rhs = Object::String(ObjString::new("same".to_owned()));
        let other = Object::String(ObjString::new("other".to_owned()));
        assert!(lhs.equals(&rhs));
        assert!(!lhs.equals(&other));
    }

    #[test]
    fn it_never_equates_other_kinds() {
        assert!(!Object::List(List::new()).equals(&Object::List(List::new())));
        assert!(!Object::Native(Native::new(nil)).equals(&Object::Native(Native::new(nil))));
        let string = Object::String(ObjString::new("list".to_owned()));
        assert!(!string.equals(&Object::List(List::new())));
        assert!(!Object::List(List::new()).equals(&string));
    }

    #[test]
    fn it_reports_kinds() {
        assert_eq!(Object::List(List::new()).kind(), ObjKind::List);
        assert_eq!(ObjKind::BoundMethod.to_string(), "BoundMethod");
    }
}
