use std::collections::TryReserveError;

use thiserror::Error;

/// Failure to reserve storage for a heap object or one of its buffers.
///
/// This is the only error the heap raises. Language-level errors (calling
/// something that isn't callable, missing properties) belong to the VM.
#[derive(Debug, Error)]
pub enum HeapError {
    #[error("OutOfMemory: requested {requested} bytes with {allocated} allocated (limit {limit})")]
    OutOfMemory {
        requested: usize,
        allocated: usize,
        limit: usize,
    },
    #[error("OutOfMemory: {0}")]
    AllocationFailed(#[from] TryReserveError),
}

impl HeapError {
    pub fn new_out_of_memory(requested: usize, allocated: usize, limit: usize) -> Self {
        HeapError::OutOfMemory {
            requested,
            allocated,
            limit,
        }
    }

    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, HeapError::OutOfMemory { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::HeapError;

    #[test]
    fn it_formats_out_of_memory() {
        let error = HeapError::new_out_of_memory(64, 1000, 1024);
        assert!(error.is_out_of_memory());
        assert_eq!(
            error.to_string(),
            "OutOfMemory: requested 64 bytes with 1000 allocated (limit 1024)"
        );
    }

    #[test]
    fn it_converts_reservation_failures() {
        let mut buffer: Vec<u8> = vec![];
        let reserve_error = buffer.try_reserve(usize::MAX).unwrap_err();
        let error: HeapError = reserve_error.into();
        assert!(!error.is_out_of_memory());
        assert!(error.to_string().starts_with("OutOfMemory: "));
    }
}
