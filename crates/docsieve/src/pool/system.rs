//! Host resource probing.
//!
//! CPU usage is a delta between two samples. A shared sampler keeps the previous
//! sample, so back-to-back snapshots reuse it; a missing or old baseline is
//! refreshed first and measured over `MINIMUM_CPU_UPDATE_INTERVAL`.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use sysinfo::{MINIMUM_CPU_UPDATE_INTERVAL, System};

/// A baseline older than this no longer describes current load.
const MAX_BASELINE_AGE: Duration = Duration::from_secs(1);

struct CpuSampler {
    system: System,
    sampled_at: Option<Instant>,
}

static CPU_SAMPLER: Lazy<Mutex<CpuSampler>> = Lazy::new(|| {
    Mutex::new(CpuSampler {
        system: System::new(),
        sampled_at: None,
    })
});

/// Current global CPU usage in percent.
///
/// May block for up to `MINIMUM_CPU_UPDATE_INTERVAL` while it takes a baseline.
pub(crate) fn cpu_percent() -> f32 {
    let mut sampler = CPU_SAMPLER.lock();
    match sampler.sampled_at.map(|at| at.elapsed()) {
        Some(age) if age <= MAX_BASELINE_AGE => {
            if age < MINIMUM_CPU_UPDATE_INTERVAL {
                std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL - age);
            }
        }
        _ => {
            sampler.system.refresh_cpu_usage();
            std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
        }
    }
    sampler.system.refresh_cpu_usage();
    sampler.sampled_at = Some(Instant::now());
    sampler.system.global_cpu_usage()
}

/// Point-in-time view of host resources and pool state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub cpu_count: usize,
    pub cpu_percent: f32,
    pub memory_total: u64,
    pub memory_available: u64,
    pub memory_percent: f64,
    pub active_tasks: usize,
    pub max_processes: usize,
    pub memory_limit: u64,
    pub platform: String,
}

/// Memory and CPU readings from the host.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HostReadings {
    pub cpu_percent: f32,
    pub memory_total: u64,
    pub memory_available: u64,
}

impl HostReadings {
    pub fn capture() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        Self {
            cpu_percent: cpu_percent(),
            memory_total: sys.total_memory(),
            memory_available: sys.available_memory(),
        }
    }

    pub fn memory_percent(&self) -> f64 {
        if self.memory_total == 0 {
            return 0.0;
        }
        let used = self.memory_total.saturating_sub(self.memory_available);
        used as f64 / self.memory_total as f64 * 100.0
    }
}

/// Currently available memory in bytes.
pub(crate) fn available_memory() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.available_memory()
}

pub(crate) fn platform() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}
