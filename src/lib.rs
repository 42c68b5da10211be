//! Managed-object heap for the hummingbird bytecode VM.
//!
//! Everything the VM allocates at runtime lives in a [`Heap`]: strings,
//! functions and closures, upvalues, natives, classes, instances, bound
//! methods and lists. The heap owns every object and reclaims unreachable
//! ones with a stop-the-world mark-and-sweep pass driven by roots the VM
//! supplies.
//!
//! ```
//! use hummingbird_heap::{Heap, HeapConfig, Value};
//!
//! let mut heap = Heap::new(HeapConfig::default());
//! let mut stack: Vec<Value> = vec![];
//!
//! let greeting = heap.copy_string(&stack, "hello").unwrap();
//! stack.push(greeting.into());
//! heap.collect(&stack);
//!
//! assert_eq!(heap.to_string(stack[0]), "hello");
//! ```

pub mod chunk;
pub mod config;
pub mod errors;
pub mod gc;
pub mod heap;
pub mod object;
pub mod value;

pub use chunk::Chunk;
pub use config::HeapConfig;
pub use errors::HeapError;
pub use gc::{GcPtr, GcStats, GcTrace, ObjRef, Tracer};
pub use heap::{CollectionReport, Heap};
pub use object::{
    BoundMethod, Class, Closure, Function, Instance, List, Native, NativeFn, ObjKind, ObjString,
    Object, OpenUpvalues, Property, Table, Upvalue,
};
pub use value::Value;
