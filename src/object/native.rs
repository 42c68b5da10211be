use std::fmt;

use super::super::gc::{GcTrace, Tracer};
use super::super::value::Value;

/// Signature of functions the host exposes to scripts. Failures have to be
/// encoded in the returned value.
pub type NativeFn = fn(&[Value]) -> Value;

pub struct Native {
    function: NativeFn,
}

impl Native {
    pub fn new(function: NativeFn) -> Self {
        Self { function }
    }

    pub fn call(&self, arguments: &[Value]) -> Value {
        (self.function)(arguments)
    }
}

impl GcTrace for Native {
    fn trace(&self, _tracer: &mut Tracer) {}
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        f.write_str("Native")
    }
}

#[cfg(test)]
mod tests {
    use super::Native;
    use crate::value::Value;

    fn count(arguments: &[Value]) -> Value {
        Value::Number(arguments.len() as f64)
    }

    #[test]
    fn it_calls_the_host_function() {
        let native = Native::new(count);
        assert_eq!(native.call(&[Value::Nil, Value::Nil]), Value::Number(2.0));
    }
}
