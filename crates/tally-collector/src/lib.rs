//! tally-collector — agent-side sampling.
//!
//! [`Collector::poll`] builds a fresh [`Report`](tally_core::Report) of
//! gauges from two sources: the [`CountingAllocator`] (when the binary
//! installs it as `#[global_allocator]`) and the operating system via
//! `sysinfo`.
//!
//! ```text
//! CountingAllocator ──► Alloc, TotalAlloc, Mallocs, Frees, HeapObjects
//! sysinfo::System   ──► ProcessResident, ProcessVirtual, CPUUtilization,
//!                       TotalMemory, FreeMemory, UsedMemory
//! rand              ──► RandomValue
//! ```

pub mod alloc;
pub mod collector;

pub use alloc::{AllocStats, CountingAllocator};
pub use collector::Collector;
