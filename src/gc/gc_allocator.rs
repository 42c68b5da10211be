use humansize::{format_size, BINARY};
use slotmap::SlotMap;

use super::super::config::HeapConfig;
use super::super::errors::HeapError;
use super::super::object::Object;
use super::gc_ptr::{GcBox, ObjectKey};
use super::{GcTrace, Tracer};

/// Running totals across the life of an allocator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GcStats {
    pub collections: usize,
    pub objects_allocated: usize,
    pub objects_freed: usize,
    pub bytes_freed: usize,
}

/// What a single sweep reclaimed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub objects_freed: usize,
    pub bytes_freed: usize,
    pub live_bytes: usize,
}

/// Owns every object and decides when the heap should be collected.
///
/// The registry is a slot map rather than a chain of raw pointers, so the
/// sweep is a plain `retain` over owned boxes.
pub struct GcAllocator {
    boxes: SlotMap<ObjectKey, GcBox>,
    bytes_allocated: usize,
    next_gc: usize,
    initial_threshold: usize,
    grow_factor: usize,
    max_heap_size: usize,
    stress: bool,
    stats: GcStats,
}

impl GcAllocator {
    pub fn new(config: &HeapConfig) -> Self {
        Self {
            boxes: SlotMap::with_key(),
            bytes_allocated: 0,
            next_gc: config.initial_threshold,
            initial_threshold: config.initial_threshold,
            grow_factor: config.grow_factor.max(1),
            max_heap_size: config.max_heap_size,
            stress: config.stress,
            stats: GcStats::default(),
        }
    }

    /// Whether allocating `size` more bytes should first run a collection.
    pub fn needs_collection(&self, size: usize) -> bool {
        self.stress || self.bytes_allocated + size > self.next_gc
    }

    /// Check that `size` more bytes fit under the heap limit.
    pub fn reserve(&self, size: usize) -> Result<(), HeapError> {
        if self.max_heap_size != 0 && self.bytes_allocated + size > self.max_heap_size {
            return Err(HeapError::new_out_of_memory(
                size,
                self.bytes_allocated,
                self.max_heap_size,
            ));
        }
        Ok(())
    }

    /// Link a fully constructed object into the registry.
    pub fn insert(&mut self, object: Object) -> ObjectKey {
        let size = object.heap_size();
        let kind = object.kind();
        let key = self.boxes.insert(GcBox::new(object));
        self.bytes_allocated += size;
        self.stats.objects_allocated += 1;
        log::trace!(
            "{:?} allocate {} for {}",
            key,
            format_size(size, BINARY),
            kind
        );
        key
    }

    /// Account for `size` bytes an existing object's buffers grew by.
    pub fn charge(&mut self, size: usize) {
        self.bytes_allocated += size;
    }

    pub fn get(&self, key: ObjectKey) -> Option<&GcBox> {
        self.boxes.get(key)
    }

    pub fn object(&self, key: ObjectKey) -> &Object {
        match self.boxes.get(key) {
            Some(gc_box) => gc_box.object(),
            None => panic!("Use of collected object {:?}", key),
        }
    }

    pub fn object_mut(&mut self, key: ObjectKey) -> &mut Object {
        match self.boxes.get_mut(key) {
            Some(gc_box) => gc_box.object_mut(),
            None => panic!("Use of collected object {:?}", key),
        }
    }

    pub fn contains(&self, key: ObjectKey) -> bool {
        self.boxes.contains_key(key)
    }

    pub fn is_marked(&self, key: ObjectKey) -> bool {
        self.boxes
            .get(key)
            .map(|gc_box| gc_box.is_marked())
            .unwrap_or(false)
    }

    /// Drain the tracer's worklist, marking each object and tracing its
    /// contents. Objects already marked are skipped, which is what makes
    /// cycles terminate.
    pub fn mark(&mut self, tracer: &mut Tracer) {
        while let Some(key) = tracer.pop() {
            let gc_box = match self.boxes.get_mut(key) {
                Some(gc_box) => gc_box,
                None => {
                    log::warn!("{:?} traced after it was freed", key);
                    continue;
                }
            };
            if gc_box.is_marked() {
                continue;
            }
            gc_box.mark();
            log::trace!("{:?} mark {}", key, gc_box.object().kind());
            gc_box.object().trace(tracer);
        }
    }

    /// Free every unmarked object, clear the marks on survivors and pick the
    /// next collection threshold.
    pub fn sweep(&mut self) -> SweepReport {
        let mut report = SweepReport::default();
        self.boxes.retain(|key, gc_box| {
            let size = gc_box.object().heap_size();
            if gc_box.is_marked() {
                gc_box.unmark();
                report.live_bytes += size;
                true
            } else {
                log::trace!("{:?} free {}", key, gc_box.object().kind());
                report.objects_freed += 1;
                report.bytes_freed += size;
                false
            }
        });

        // Re-account from the survivors: owned buffers (lists, tables) grow
        // between collections without passing through `insert`.
        self.bytes_allocated = report.live_bytes;
        self.next_gc = report
            .live_bytes
            .saturating_mul(self.grow_factor)
            .max(self.initial_threshold);

        self.stats.collections += 1;
        self.stats.objects_freed += report.objects_freed;
        self.stats.bytes_freed += report.bytes_freed;
        report
    }

    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    pub fn next_gc(&self) -> usize {
        self.next_gc
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn stats(&self) -> &GcStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::GcAllocator;
    use crate::config::HeapConfig;
    use crate::gc::{GcPtr, GcTrace, Tracer};
    use crate::object::{List, Object};
    use crate::value::Value;

    fn allocator() -> GcAllocator {
        GcAllocator::new(&HeapConfig::default())
    }

    #[test]
    fn it_sweeps_unmarked_objects() {
        let mut allocator = allocator();
        let kept = allocator.insert(Object::List(List::new()));
        let dropped = allocator.insert(Object::List(List::new()));
        assert_eq!(allocator.len(), 2);

        let mut tracer = Tracer::new();
        GcPtr::<Object>::new(kept).trace(&mut tracer);
        allocator.mark(&mut tracer);
        assert!(allocator.is_marked(kept));
        assert!(!allocator.is_marked(dropped));

        let report = allocator.sweep();
        assert_eq!(report.objects_freed, 1);
        assert!(allocator.contains(kept));
        assert!(!allocator.contains(dropped));
        // Survivors are unmarked for the next cycle.
        assert!(!allocator.is_marked(kept));
        assert_eq!(allocator.stats().collections, 1);
        assert_eq!(allocator.stats().objects_freed, 1);
    }

    #[test]
    fn it_traces_through_contents() {
        let mut allocator = allocator();
        let inner = allocator.insert(Object::List(List::new()));
        let mut outer = List::new();
        outer
            .append(Value::Object(GcPtr::new(inner)))
            .expect("append");
        let outer = allocator.insert(Object::List(outer));

        let mut tracer = Tracer::new();
        tracer.mark(GcPtr::<Object>::new(outer));
        allocator.mark(&mut tracer);
        assert!(allocator.is_marked(inner));
        assert!(tracer.is_empty());
    }

    #[test]
    fn it_enforces_the_heap_limit() {
        let config = HeapConfig::builder()
            .initial_threshold(64)
            .max_heap_size(128)
            .build()
            .unwrap();
        let allocator = GcAllocator::new(&config);
        assert!(allocator.reserve(128).is_ok());
        assert!(allocator.reserve(129).unwrap_err().is_out_of_memory());
    }

    #[test]
    fn it_resets_the_threshold_after_sweeping() {
        let config = HeapConfig::builder()
            .initial_threshold(16)
            .build()
            .unwrap();
        let mut allocator = GcAllocator::new(&config);
        assert!(allocator.needs_collection(17));
        let key = allocator.insert(Object::List(List::new()));

        let mut tracer = Tracer::new();
        tracer.mark(GcPtr::<Object>::new(key));
        allocator.mark(&mut tracer);
        let report = allocator.sweep();

        assert_eq!(allocator.bytes_allocated(), report.live_bytes);
        assert_eq!(allocator.next_gc(), (report.live_bytes * 2).max(16));
    }

    #[test]
    fn it_saturates_the_threshold_for_huge_grow_factors() {
        let config = HeapConfig::builder()
            .grow_factor(usize::MAX)
            .build()
            .unwrap();
        let mut allocator = GcAllocator::new(&config);
        let key = allocator.insert(Object::List(List::new()));

        let mut tracer = Tracer::new();
        tracer.mark(GcPtr::<Object>::new(key));
        allocator.mark(&mut tracer);
        let report = allocator.sweep();

        assert!(report.live_bytes > 1);
        assert_eq!(allocator.next_gc(), usize::MAX);
    }

    #[test]
    fn it_charges_buffer_growth() {
        let mut allocator = allocator();
        allocator.insert(Object::List(List::new()));
        let before = allocator.bytes_allocated();
        allocator.charge(64);
        assert_eq!(allocator.bytes_allocated(), before + 64);
    }
}
