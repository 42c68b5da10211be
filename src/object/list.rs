use std::mem;

use super::super::errors::HeapError;
use super::super::gc::{grow_capacity, GcTrace, Tracer};
use super::super::value::Value;

/// Growable sequence of values. The list object itself stays the same size;
/// the elements live in a separately owned buffer.
#[derive(Debug, Default)]
pub struct List {
    items: Vec<Value>,
}

impl List {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append in amortized O(1), doubling the buffer when it is full. The
    /// heap accounts for the growth; outside this crate go through
    /// `Heap::list_append`.
    pub(crate) fn append(&mut self, value: Value) -> Result<(), HeapError> {
        if self.items.len() == self.items.capacity() {
            let capacity = grow_capacity(self.items.capacity());
            self.items.try_reserve_exact(capacity - self.items.len())?;
        }
        self.items.push(value);
        Ok(())
    }

    /// Bytes the next `append` will add to the buffer.
    pub(crate) fn growth_size(&self) -> usize {
        if self.items.len() < self.items.capacity() {
            return 0;
        }
        (grow_capacity(self.items.capacity()) - self.items.capacity()) * mem::size_of::<Value>()
    }

    /// The index must be in bounds; the VM checks with `is_valid_index`.
    #[inline]
    pub fn get(&self, index: usize) -> Value {
        self.items[index]
    }

    /// The index must be in bounds; the VM checks with `is_valid_index`.
    #[inline]
    pub fn store(&mut self, index: usize, value: Value) {
        self.items[index] = value;
    }

    /// Remove the element at `index`, shifting everything after it down.
    pub fn remove(&mut self, index: usize) -> Value {
        self.items.remove(index)
    }

    /// Whether `index` addresses an element. An empty list has no valid
    /// index, 0 included.
    pub fn is_valid_index(&self, index: isize) -> bool {
        index >= 0 && (index as usize) < self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    pub(crate) fn heap_size(&self) -> usize {
        self.items.capacity() * mem::size_of::<Value>()
    }
}

impl GcTrace for List {
    fn trace(&self, tracer: &mut Tracer) {
        self.items.trace(tracer);
    }
}

#[cfg(test)]
mod tests {
    use super::List;
    use crate::value::Value;

    fn numbers(count: usize) -> List {
        let mut list = List::new();
        for number in 0..count {
            list.append(Value::Number(number as f64)).unwrap();
        }
        list
    }

    #[test]
    fn it_appends_in_order() {
        let list = numbers(20);
        assert_eq!(list.len(), 20);
        for index in 0..20 {
            assert_eq!(list.get(index), Value::Number(index as f64));
        }
    }

    #[test]
    fn it_doubles_its_capacity() {
        let mut list = List::new();
        assert_eq!(list.capacity(), 0);
        assert_eq!(list.growth_size(), 8 * std::mem::size_of::<Value>());
        list.append(Value::Nil).unwrap();
        assert_eq!(list.growth_size(), 0);
        assert_eq!(list.capacity(), 8);
        for _ in 1..9 {
            list.append(Value::Nil).unwrap();
        }
        assert_eq!(list.capacity(), 16);
    }

    #[test]
    fn it_removes_preserving_order() {
        let mut list = numbers(5);
        assert_eq!(list.remove(1), Value::Number(1.0));
        let remaining = list.iter().copied().collect::<Vec<Value>>();
        assert_eq!(
            remaining,
            vec![
                Value::Number(0.0),
                Value::Number(2.0),
                Value::Number(3.0),
                Value::Number(4.0),
            ]
        );
    }

    #[test]
    fn it_stores_by_index() {
        let mut list = numbers(3);
        list.store(2, Value::Bool(true));
        assert_eq!(list.get(2), Value::Bool(true));
    }

    #[test]
    fn it_rejects_every_index_when_empty() {
        let list = List::new();
        assert!(!list.is_valid_index(0));
        assert!(!list.is_valid_index(1));
        assert!(!list.is_valid_index(-1));
    }

    #[test]
    fn it_checks_bounds() {
        let list = numbers(2);
        assert!(list.is_valid_index(0));
        assert!(list.is_valid_index(1));
        assert!(!list.is_valid_index(2));
        assert!(!list.is_valid_index(-1));
    }
}
