//! Collector — one poll cycle of process statistics.

use sysinfo::{Pid, System};
use tally_core::{Metric, Report};
use tracing::{debug, warn};

use crate::alloc::CountingAllocator;

/// Samples allocator and OS statistics.
///
/// Holds a `sysinfo::System` between polls so CPU usage is computed over
/// the interval since the previous refresh.
pub struct Collector {
    system: System,
    pid: Option<Pid>,
}

impl Collector {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                warn!(error = %e, "process statistics unavailable");
                None
            }
        };
        Self {
            system: System::new(),
            pid,
        }
    }

    /// Take one sample. Every call returns a fresh report.
    pub fn poll(&mut self) -> Report {
        let mut report = Report::new();

        let alloc = CountingAllocator::stats();
        report.add(Metric::gauge("Alloc", alloc.live_bytes as f64));
        report.add(Metric::gauge("TotalAlloc", alloc.total_bytes as f64));
        report.add(Metric::gauge("Mallocs", alloc.mallocs as f64));
        report.add(Metric::gauge("Frees", alloc.frees as f64));
        report.add(Metric::gauge("HeapObjects", alloc.heap_objects() as f64));

        if let Some(pid) = self.pid {
            self.system.refresh_process(pid);
            if let Some(process) = self.system.process(pid) {
                report.add(Metric::gauge("ProcessResident", process.memory() as f64));
                report.add(Metric::gauge("ProcessVirtual", process.virtual_memory() as f64));
                report.add(Metric::gauge("CPUUtilization", f64::from(process.cpu_usage())));
            }
        }

        self.system.refresh_memory();
        report.add(Metric::gauge("TotalMemory", self.system.total_memory() as f64));
        report.add(Metric::gauge("FreeMemory", self.system.free_memory() as f64));
        report.add(Metric::gauge("UsedMemory", self.system.used_memory() as f64));

        report.add(Metric::gauge("RandomValue", rand::random::<f64>()));

        debug!(metrics = report.len(), "poll complete");
        report
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}
