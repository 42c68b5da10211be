use std::mem;

use super::errors::HeapError;
use super::gc::{grow_capacity, GcTrace, Tracer};
use super::value::Value;

/// Reserve the next step of `buffer`'s growth if it is full.
fn reserve_next<T>(buffer: &mut Vec<T>) -> Result<(), HeapError> {
    if buffer.len() == buffer.capacity() {
        let capacity = grow_capacity(buffer.capacity());
        buffer.try_reserve_exact(capacity - buffer.len())?;
    }
    Ok(())
}

fn growth_of<T>(buffer: &Vec<T>) -> usize {
    if buffer.len() < buffer.capacity() {
        return 0;
    }
    (grow_capacity(buffer.capacity()) - buffer.capacity()) * mem::size_of::<T>()
}

/// A function's compiled code: instruction bytes, their source lines and the
/// constant pool. The heap treats the bytes as opaque and only looks at the
/// constants, which it must keep alive.
#[derive(Clone, Debug, Default)]
pub struct Chunk {
    code: Vec<u8>,
    lines: Vec<u32>,
    constants: Vec<Value>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outside this crate go through `Heap::write_chunk`, which accounts
    /// for the growth.
    pub(crate) fn write(&mut self, byte: u8, line: u32) -> Result<(), HeapError> {
        reserve_next(&mut self.code)?;
        reserve_next(&mut self.lines)?;
        self.code.push(byte);
        self.lines.push(line);
        Ok(())
    }

    /// Returns the index of the newly added constant.
    pub(crate) fn add_constant(&mut self, value: Value) -> Result<usize, HeapError> {
        reserve_next(&mut self.constants)?;
        self.constants.push(value);
        Ok(self.constants.len() - 1)
    }

    /// Upper bound on the bytes the next `write` adds.
    pub(crate) fn write_growth(&self) -> usize {
        growth_of(&self.code) + growth_of(&self.lines)
    }

    /// Upper bound on the bytes the next `add_constant` adds.
    pub(crate) fn constant_growth(&self) -> usize {
        growth_of(&self.constants)
    }

    #[inline]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    #[inline]
    pub fn constant(&self, index: usize) -> Value {
        self.constants[index]
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    /// Source line of the instruction byte at `offset`.
    pub fn line(&self, offset: usize) -> Option<u32> {
        self.lines.get(offset).copied()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Bytes owned by the chunk's buffers.
    pub(crate) fn heap_size(&self) -> usize {
        self.code.capacity()
            + self.lines.capacity() * mem::size_of::<u32>()
            + self.constants.capacity() * mem::size_of::<Value>()
    }
}

impl GcTrace for Chunk {
    fn trace(&self, tracer: &mut Tracer) {
        self.constants.trace(tracer);
    }
}

#[cfg(test)]
mod tests {
    use super::Chunk;
    use crate::value::Value;

    #[test]
    fn it_writes_code_and_lines() {
        let mut chunk = Chunk::new();
        assert!(chunk.is_empty());
        chunk.write(1, 10).unwrap();
        chunk.write(2, 11).unwrap();
        assert_eq!(chunk.code(), &[1, 2]);
        assert_eq!(chunk.line(1), Some(11));
        assert_eq!(chunk.line(2), None);
    }

    #[test]
    fn it_indexes_constants() {
        let mut chunk = Chunk::new();
        assert_eq!(chunk.add_constant(Value::Number(1.0)).unwrap(), 0);
        assert_eq!(chunk.add_constant(Value::Nil).unwrap(), 1);
        assert_eq!(chunk.constant(0), Value::Number(1.0));
        assert_eq!(chunk.constants().len(), 2);
    }

    #[test]
    fn it_predicts_its_growth() {
        let mut chunk = Chunk::new();
        assert_eq!(chunk.write_growth(), 8 + 8 * std::mem::size_of::<u32>());
        let before = chunk.heap_size();
        chunk.write(0, 1).unwrap();
        assert_eq!(chunk.heap_size() - before, 8 + 8 * std::mem::size_of::<u32>());
        assert_eq!(chunk.write_growth(), 0);
        assert_eq!(chunk.constant_growth(), 8 * std::mem::size_of::<Value>());
    }
}
