use super::gc::{GcManaged, GcPtr, GcTrace, ObjRef, Tracer};

/// A VM value. Everything that isn't nil, a boolean or a number lives in the
/// heap and is held by reference.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    Object(ObjRef),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjRef> {
        match self {
            Value::Object(object) => Some(*object),
            _ => None,
        }
    }

    /// Nil and false are falsey, everything else is truthy.
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Equality for values that can be decided without looking into the
    /// heap. Object references compare by identity here; use
    /// `Heap::values_equal` for the full rules.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(lhs), Value::Bool(rhs)) => lhs == rhs,
            (Value::Number(lhs), Value::Number(rhs)) => lhs == rhs,
            (Value::Object(lhs), Value::Object(rhs)) => lhs == rhs,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl<T: GcManaged> From<GcPtr<T>> for Value {
    fn from(ptr: GcPtr<T>) -> Self {
        Value::Object(ptr.erase())
    }
}

impl GcTrace for Value {
    fn trace(&self, tracer: &mut Tracer) {
        if let Value::Object(object) = self {
            tracer.mark(*object);
        }
    }
}
