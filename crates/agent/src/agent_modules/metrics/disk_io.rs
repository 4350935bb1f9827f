/*
Per-device I/O counters come from /proc/diskstats, one line per block device:

   8       1 sda1 192 1 67074 342 7 1 64 4 0 124 268 0 0 0 0

  1.  major number
  2.  minor number
  3.  device name
  4.  reads completed successfully
  5.  reads merged
  6.  sectors read
  7.  time spent reading (ms)
  8.  writes completed
  9.  writes merged
  10. sectors written
  11. time spent writing (ms)
  12. I/Os currently in progress
  13. time spent doing I/Os (ms)
  14. weighted time spent doing I/Os (ms)

Kernel 4.18+ appends four discard fields and 5.5+ two flush fields; they are ignored.
See https://www.kernel.org/doc/Documentation/admin-guide/iostats.rst
*/

use eagle_common::{DiskIoSample, DiskIoSnapshot};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error};

use super::disk::{DiskError, DiskSampler};
use crate::agent_modules::utils::host_name;

/// Sector size used by the kernel for diskstats accounting, independent of the device.
const SECTOR_SIZE: u64 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiskIoCounters {
    pub reads: u64,
    pub sectors_read: u64,
    pub read_time_ms: u64,
    pub writes: u64,
    pub sectors_written: u64,
    pub write_time_ms: u64,
}

pub trait DiskStatsSource: Send + Sync {
    /// Counters keyed by kernel device name (`sda1`, `nvme0n1p2`, ...).
    fn read(&self) -> Result<HashMap<String, DiskIoCounters>, DiskError>;
}

#[derive(Debug, Clone)]
pub struct ProcDiskStats {
    path: PathBuf,
}

impl Default for ProcDiskStats {
    fn default() -> Self {
        Self::new("/proc/diskstats")
    }
}

impl ProcDiskStats {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DiskStatsSource for ProcDiskStats {
    fn read(&self) -> Result<HashMap<String, DiskIoCounters>, DiskError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| DiskError::Read {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(parse_diskstats(&contents))
    }
}

/// Parses a diskstats listing. Short or non-numeric lines are skipped.
pub fn parse_diskstats(contents: &str) -> HashMap<String, DiskIoCounters> {
    contents
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 14 {
                return None;
            }
            let number = |idx: usize| fields[idx].parse::<u64>().ok();
            let counters = DiskIoCounters {
                reads: number(3)?,
                sectors_read: number(5)?,
                read_time_ms: number(6)?,
                writes: number(7)?,
                sectors_written: number(9)?,
                write_time_ms: number(10)?,
            };
            Some((fields[2].to_string(), counters))
        })
        .collect()
}

#[derive(Clone)]
pub struct DiskIoSampler {
    volumes: DiskSampler,
    stats: Arc<dyn DiskStatsSource>,
}

impl DiskIoSampler {
    pub fn new(volumes: DiskSampler, stats: Arc<dyn DiskStatsSource>) -> Self {
        Self { volumes, stats }
    }

    /// I/O counters for the same volumes the usage report includes, in the same order.
    pub fn sample(&self) -> DiskIoSnapshot {
        let counters = match self.stats.read() {
            Ok(counters) => counters,
            Err(e) => {
                error!(error = %e, "Error reading disk I/O counters.");
                return Vec::new();
            }
        };

        let hostname = host_name();
        self.volumes
            .eligible_volumes()
            .iter()
            .filter_map(|volume| {
                let device_name = volume.device_name();
                let Some(io) = counters.get(&device_name) else {
                    debug!(device = %device_name, "No diskstats entry for device.");
                    return None;
                };
                Some(DiskIoSample {
                    hostname: hostname.clone(),
                    device_name,
                    mount_path: volume.mount_path(),
                    reads: io.reads,
                    writes: io.writes,
                    read_bytes: io.sectors_read * SECTOR_SIZE,
                    write_bytes: io.sectors_written * SECTOR_SIZE,
                    write_time: io.write_time_ms,
                    read_time: io.read_time_ms,
                })
            })
            .collect()
    }
}
