use super::super::errors::HeapError;
use super::super::gc::{GcPtr, GcTrace, Tracer};
use super::super::heap::Heap;
use super::super::value::Value;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UpvalueState {
    /// Aliases a live slot of the VM stack.
    Open(usize),
    /// Owns the captured value after its scope exited.
    Closed(Value),
}

/// A captured variable of an enclosing scope.
///
/// Reads and writes always go through `get`/`set` with the VM stack in hand,
/// so callers never care which state the upvalue is in.
#[derive(Debug)]
pub struct Upvalue {
    state: UpvalueState,
}

impl Upvalue {
    pub fn new(slot: usize) -> Self {
        Self {
            state: UpvalueState::Open(slot),
        }
    }

    pub fn state(&self) -> UpvalueState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, UpvalueState::Open(_))
    }

    /// The stack slot this upvalue aliases, while it is open.
    pub fn slot(&self) -> Option<usize> {
        match self.state {
            UpvalueState::Open(slot) => Some(slot),
            UpvalueState::Closed(_) => None,
        }
    }

    pub fn get(&self, stack: &[Value]) -> Value {
        match self.state {
            UpvalueState::Open(slot) => stack[slot],
            UpvalueState::Closed(value) => value,
        }
    }

    pub fn set(&mut self, stack: &mut [Value], value: Value) {
        match &mut self.state {
            UpvalueState::Open(slot) => stack[*slot] = value,
            UpvalueState::Closed(closed) => *closed = value,
        }
    }

    /// Move the aliased stack value into the upvalue. Closing an already
    /// closed upvalue does nothing.
    pub fn close(&mut self, stack: &[Value]) {
        if let UpvalueState::Open(slot) = self.state {
            self.state = UpvalueState::Closed(stack[slot]);
        }
    }
}

impl GcTrace for Upvalue {
    /// An open upvalue's value is on the stack, which is already a root.
    fn trace(&self, tracer: &mut Tracer) {
        if let UpvalueState::Closed(value) = &self.state {
            value.trace(tracer);
        }
    }
}

/// The VM's list of open upvalues, ordered by stack slot.
///
/// Keeping at most one open upvalue per slot is what lets two closures
/// capturing the same variable see each other's writes.
#[derive(Debug, Default)]
pub struct OpenUpvalues {
    // Sorted by slot, ascending.
    open: Vec<(usize, GcPtr<Upvalue>)>,
}

impl OpenUpvalues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the open upvalue for `slot`, creating one if there isn't one.
    /// `roots` must not need to include this list; it is traced as well.
    pub fn capture(
        &mut self,
        heap: &mut Heap,
        roots: &dyn GcTrace,
        slot: usize,
    ) -> Result<GcPtr<Upvalue>, HeapError> {
        match self.open.binary_search_by_key(&slot, |(open_slot, _)| *open_slot) {
            Ok(index) => Ok(self.open[index].1),
            Err(index) => {
                let upvalue = heap.new_upvalue(&(roots, &*self), slot)?;
                self.open.insert(index, (slot, upvalue));
                Ok(upvalue)
            }
        }
    }

    /// Close every upvalue aliasing `slot` or anything above it, topmost
    /// first.
    pub fn close_from(&mut self, heap: &mut Heap, stack: &[Value], slot: usize) {
        let start = self.open.partition_point(|(open_slot, _)| *open_slot < slot);
        for (_, upvalue) in self.open.drain(start..).rev() {
            heap.get_mut(upvalue).close(stack);
        }
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

impl GcTrace for OpenUpvalues {
    fn trace(&self, tracer: &mut Tracer) {
        for (_, upvalue) in self.open.iter() {
            upvalue.trace(tracer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OpenUpvalues, Upvalue, UpvalueState};
    use crate::config::HeapConfig;
    use crate::heap::Heap;
    use crate::value::Value;

    #[test]
    fn it_reads_and_writes_through_the_stack_while_open() {
        let mut stack = vec![Value::Nil, Value::Number(1.0)];
        let mut upvalue = Upvalue::new(1);
        assert!(upvalue.is_open());
        assert_eq!(upvalue.get(&stack), Value::Number(1.0));

        upvalue.set(&mut stack, Value::Number(2.0));
        assert_eq!(stack[1], Value::Number(2.0));
    }

    #[test]
    fn it_keeps_the_value_after_closing() {
        let mut stack = vec![Value::Bool(true)];
        let mut upvalue = Upvalue::new(0);
        upvalue.close(&stack);
        assert_eq!(upvalue.state(), UpvalueState::Closed(Value::Bool(true)));
        assert_eq!(upvalue.slot(), None);

        // The stack slot is dead now; writes land in the upvalue.
        stack[0] = Value::Nil;
        assert_eq!(upvalue.get(&stack), Value::Bool(true));
        upvalue.set(&mut stack, Value::Number(3.0));
        assert_eq!(upvalue.get(&stack), Value::Number(3.0));
        assert_eq!(stack[0], Value::Nil);

        // Closing twice does not re-read the stack.
        upvalue.close(&stack);
        assert_eq!(upvalue.get(&stack), Value::Number(3.0));
    }

    #[test]
    fn it_shares_an_open_upvalue_per_slot() {
        let mut heap = Heap::new(HeapConfig::default());
        let mut open = OpenUpvalues::new();
        let first = open.capture(&mut heap, &(), 3).unwrap();
        let second = open.capture(&mut heap, &(), 3).unwrap();
        let other = open.capture(&mut heap, &(), 1).unwrap();
        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(open.len(), 2);
    }

    #[test]
    fn it_closes_a_suffix_of_the_stack() {
        let mut heap = Heap::new(HeapConfig::default());
        let stack = vec![Value::Number(0.0), Value::Number(1.0), Value::Number(2.0)];
        let mut open = OpenUpvalues::new();
        let low = open.capture(&mut heap, &(), 0).unwrap();
        let middle = open.capture(&mut heap, &(), 1).unwrap();
        let high = open.capture(&mut heap, &(), 2).unwrap();

        open.close_from(&mut heap, &stack, 1);
        assert_eq!(open.len(), 1);
        assert!(heap.get(low).is_open());
        assert_eq!(heap.get(middle).state(), UpvalueState::Closed(Value::Number(1.0)));
        assert_eq!(heap.get(high).state(), UpvalueState::Closed(Value::Number(2.0)));
    }

    #[test]
    fn it_keeps_open_upvalues_alive_under_stress() {
        let config = HeapConfig::builder().stress(true).build().unwrap();
        let mut heap = Heap::new(config);
        let mut open = OpenUpvalues::new();
        let first = open.capture(&mut heap, &(), 0).unwrap();
        // Every allocation collects; the first upvalue is only reachable
        // through the open list.
        let _second = open.capture(&mut heap, &(), 1).unwrap();
        assert!(heap.contains(first));
    }
}
