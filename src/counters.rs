// Cumulative byte counters via sysinfo

use std::collections::HashMap;
use std::sync::Mutex;

use sysinfo::{Disks, Networks};

use crate::models::CounterSample;

/// On-demand access to cumulative per-device byte counters.
///
/// `poll` may block (it typically refreshes OS counters); the monitors call
/// it through `spawn_blocking`. An empty `names` slice means "everything the
/// source knows about".
pub trait CounterSource: Send + Sync + 'static {
    fn poll(&self, names: &[String]) -> anyhow::Result<HashMap<String, CounterSample>>;
}

/// Network interface counters: cumulative received/transmitted bytes, keyed
/// by interface name.
pub struct NetCounters {
    networks: Mutex<Networks>,
}

impl NetCounters {
    pub fn new() -> Self {
        Self {
            networks: Mutex::new(Networks::new_with_refreshed_list()),
        }
    }
}

impl Default for NetCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSource for NetCounters {
    fn poll(&self, names: &[String]) -> anyhow::Result<HashMap<String, CounterSample>> {
        let mut networks = self
            .networks
            .lock()
            .map_err(|e| anyhow::anyhow!("sysinfo networks lock poisoned: {}", e))?;
        networks.refresh(true);

        let mut out = HashMap::new();
        for (name, data) in networks.list().iter() {
            if !names.is_empty() && !names.iter().any(|n| n == name) {
                continue;
            }
            out.insert(
                name.clone(),
                CounterSample {
                    bytes_read: data.total_received(),
                    bytes_written: data.total_transmitted(),
                },
            );
        }
        Ok(out)
    }
}

/// Block device counters: cumulative read/written bytes, keyed by device
/// path (e.g. "/dev/sda1").
pub struct DiskCounters {
    disks: Mutex<Disks>,
}

impl DiskCounters {
    pub fn new() -> Self {
        Self {
            disks: Mutex::new(Disks::new_with_refreshed_list()),
        }
    }
}

impl Default for DiskCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSource for DiskCounters {
    fn poll(&self, names: &[String]) -> anyhow::Result<HashMap<String, CounterSample>> {
        let mut disks = self
            .disks
            .lock()
            .map_err(|e| anyhow::anyhow!("sysinfo disks lock poisoned: {}", e))?;
        disks.refresh(false);

        let mut out = HashMap::new();
        for disk in disks.list() {
            let name = disk.name().to_string_lossy().into_owned();
            if !names.is_empty() && !names.iter().any(|n| *n == name) {
                continue;
            }
            let usage = disk.usage();
            out.insert(
                name,
                CounterSample {
                    bytes_read: usage.total_read_bytes,
                    bytes_written: usage.total_written_bytes,
                },
            );
        }
        Ok(out)
    }
}
