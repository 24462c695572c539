//! Allocation accounting for the process heap.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};

static LIVE_BYTES: AtomicU64 = AtomicU64::new(0);
static TOTAL_BYTES: AtomicU64 = AtomicU64::new(0);
static MALLOCS: AtomicU64 = AtomicU64::new(0);
static FREES: AtomicU64 = AtomicU64::new(0);

/// A [`GlobalAlloc`] that forwards to [`System`] and counts what passes
/// through it.
///
/// Install it in a binary with:
///
/// ```ignore
/// #[global_allocator]
/// static ALLOC: tally_collector::CountingAllocator = tally_collector::CountingAllocator;
/// ```
///
/// Without that, [`CountingAllocator::stats`] only reflects calls made on
/// the type directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingAllocator;

impl CountingAllocator {
    /// Current counter values.
    pub fn stats() -> AllocStats {
        AllocStats {
            live_bytes: LIVE_BYTES.load(Ordering::Relaxed),
            total_bytes: TOTAL_BYTES.load(Ordering::Relaxed),
            mallocs: MALLOCS.load(Ordering::Relaxed),
            frees: FREES.load(Ordering::Relaxed),
        }
    }

    fn record_alloc(size: usize) {
        LIVE_BYTES.fetch_add(size as u64, Ordering::Relaxed);
        TOTAL_BYTES.fetch_add(size as u64, Ordering::Relaxed);
        MALLOCS.fetch_add(1, Ordering::Relaxed);
    }

    fn record_dealloc(size: usize) {
        LIVE_BYTES.fetch_sub(size as u64, Ordering::Relaxed);
        FREES.fetch_add(1, Ordering::Relaxed);
    }
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            Self::record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            Self::record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        Self::record_dealloc(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        // A failed realloc leaves the old block in place.
        if !new_ptr.is_null() {
            Self::record_dealloc(layout.size());
            Self::record_alloc(new_size);
        }
        new_ptr
    }
}

/// Snapshot of the allocator counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Bytes currently allocated.
    pub live_bytes: u64,
    /// Bytes allocated over the process lifetime.
    pub total_bytes: u64,
    pub mallocs: u64,
    pub frees: u64,
}

impl AllocStats {
    /// Allocations not yet freed.
    pub fn heap_objects(&self) -> u64 {
        self.mallocs.saturating_sub(self.frees)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_objects_is_mallocs_minus_frees() {
        let stats = AllocStats {
            live_bytes: 0,
            total_bytes: 0,
            mallocs: 10,
            frees: 4,
        };
        assert_eq!(stats.heap_objects(), 6);
        assert_eq!(AllocStats::default().heap_objects(), 0);
    }

    #[test]
    fn direct_calls_are_counted() {
        let before = CountingAllocator::stats();
        let layout = Layout::from_size_align(256, 8).unwrap();

        unsafe {
            let ptr = CountingAllocator.alloc(layout);
            assert!(!ptr.is_null());
            let ptr = CountingAllocator.realloc(ptr, layout, 512);
            assert!(!ptr.is_null());
            CountingAllocator.dealloc(ptr, Layout::from_size_align(512, 8).unwrap());
        }

        let after = CountingAllocator::stats();
        // alloc + realloc(new) and realloc(old) + dealloc.
        assert!(after.mallocs >= before.mallocs + 2);
        assert!(after.frees >= before.frees + 2);
        assert!(after.total_bytes >= before.total_bytes + 256 + 512);
    }
}
