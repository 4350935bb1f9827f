use eagle_common::{DiskSnapshot, DiskVolumeSample};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sysinfo::Disks;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::agent_modules::utils::{format_megabytes, host_name, used_percent};

// Only SCSI-style disk names carry a removable flag we look at; NVMe and virtio are never matched.
static SD_DISK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/dev/(sd[a-z])[0-9]?").expect("static regex is valid"));

#[derive(Error, Debug)]
pub enum DiskError {
    #[error("failed to list partitions: {0}")]
    Partitions(String),
    #[error("mount point {path} is not statable: {source}")]
    Stat {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to query usage for {path}: {reason}")]
    Usage { path: String, reason: String },
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

/// One entry of the platform's mounted-partition list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Backing device path, e.g. `/dev/sda1`.
    pub device: String,
    pub mount_point: PathBuf,
    pub fs_type: String,
}

/// Capacity of a mounted filesystem in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VolumeUsage {
    pub total: u64,
    /// Space available to unprivileged users.
    pub free: u64,
    pub used: u64,
}

/// OS facilities the disk sampler depends on.
pub trait DiskPlatform: Send + Sync {
    /// Mounted partitions in listing order. Platforms whose listing cannot
    /// fail (such as the `sysinfo`-backed one) always return `Ok`.
    fn partitions(&self) -> Result<Vec<Partition>, DiskError>;

    fn stat_mount(&self, mount_point: &Path) -> Result<(), DiskError>;

    fn usage(&self, mount_point: &Path) -> Result<VolumeUsage, DiskError>;

    /// Filesystem types the kernel registers as `nodev`.
    fn pseudo_filesystems(&self) -> Result<HashSet<String>, DiskError>;

    /// Removable flag of a whole block device such as `sda`. Unreadable flags count as fixed.
    fn is_removable(&self, block_device: &str) -> bool;
}

/// Linux implementation: partitions come from `sysinfo`, capacity from
/// `statvfs`, and the filesystem registry and removable flags from procfs and sysfs.
#[derive(Debug, Clone)]
pub struct SystemDiskPlatform {
    proc_root: PathBuf,
    sys_root: PathBuf,
}

impl Default for SystemDiskPlatform {
    fn default() -> Self {
        Self::with_roots("/proc", "/sys")
    }
}

impl SystemDiskPlatform {
    pub fn with_roots(proc_root: impl Into<PathBuf>, sys_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            sys_root: sys_root.into(),
        }
    }
}

impl DiskPlatform for SystemDiskPlatform {
    // `sysinfo` swallows mount-table read errors and yields an empty list instead.
    fn partitions(&self) -> Result<Vec<Partition>, DiskError> {
        let disks = Disks::new_with_refreshed_list();
        Ok(disks
            .list()
            .iter()
            .map(|disk| Partition {
                device: disk.name().to_string_lossy().into_owned(),
                mount_point: disk.mount_point().to_path_buf(),
                fs_type: disk.file_system().to_string_lossy().into_owned(),
            })
            .collect())
    }

    fn stat_mount(&self, mount_point: &Path) -> Result<(), DiskError> {
        fs::metadata(mount_point)
            .map(|_| ())
            .map_err(|source| DiskError::Stat {
                path: mount_point.display().to_string(),
                source,
            })
    }

    fn usage(&self, mount_point: &Path) -> Result<VolumeUsage, DiskError> {
        let stat = nix::sys::statvfs::statvfs(mount_point).map_err(|e| DiskError::Usage {
            path: mount_point.display().to_string(),
            reason: e.to_string(),
        })?;

        let fragment_size = stat.fragment_size() as u64;
        let blocks = stat.blocks() as u64;
        let total = blocks * fragment_size;
        let free = stat.blocks_available() as u64 * fragment_size;
        let used = blocks.saturating_sub(stat.blocks_free() as u64) * fragment_size;
        Ok(VolumeUsage { total, free, used })
    }

    fn pseudo_filesystems(&self) -> Result<HashSet<String>, DiskError> {
        let path = self.proc_root.join("filesystems");
        let contents = fs::read_to_string(&path).map_err(|source| DiskError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(parse_nodev_filesystems(&contents))
    }

    fn is_removable(&self, block_device: &str) -> bool {
        let path = self.sys_root.join("block").join(block_device).join("removable");
        match fs::read_to_string(&path) {
            Ok(flag) => flag.trim_end_matches('\n') == "1",
            Err(e) => {
                debug!(path = ?path, error = %e, "Removable flag unreadable, treating device as fixed.");
                false
            }
        }
    }
}

/// Extracts the `nodev` entries of a `/proc/filesystems` listing.
pub fn parse_nodev_filesystems(contents: &str) -> HashSet<String> {
    contents
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            match (fields.next(), fields.next(), fields.next()) {
                (Some("nodev"), Some(name), None) => Some(name.trim_end().to_string()),
                _ => None,
            }
        })
        .collect()
}

/// Whole-disk name (`sda`) for `/dev/sdX` partitions, `None` for every other device naming scheme.
pub fn removable_candidate(device: &str) -> Option<&str> {
    SD_DISK_RE
        .captures(device)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// A partition that passed every eligibility check, with its capacity.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EligibleVolume {
    pub(crate) partition: Partition,
    pub(crate) usage: VolumeUsage,
    pub(crate) used_percent: f64,
}

impl EligibleVolume {
    pub(crate) fn device_name(&self) -> String {
        self.partition.device.replace("/dev/", "")
    }

    pub(crate) fn mount_path(&self) -> String {
        self.partition.mount_point.to_string_lossy().into_owned()
    }

    fn to_sample(&self, hostname: &str) -> DiskVolumeSample {
        DiskVolumeSample {
            hostname: hostname.to_string(),
            device_name: self.device_name(),
            mount_path: self.mount_path(),
            filesystem_type: self.partition.fs_type.clone(),
            total_mb: format_megabytes(self.usage.total),
            free_mb: format_megabytes(self.usage.free),
            used_mb: format_megabytes(self.usage.used),
            used_percent: self.used_percent,
        }
    }
}

#[derive(Clone)]
pub struct DiskSampler {
    platform: Arc<dyn DiskPlatform>,
}

impl DiskSampler {
    pub fn new(platform: Arc<dyn DiskPlatform>) -> Self {
        Self { platform }
    }

    /// Usage of every real, fixed, non-empty volume in partition-listing order.
    /// Per-volume failures drop that volume only.
    pub fn sample(&self) -> DiskSnapshot {
        let hostname = host_name();
        self.eligible_volumes()
            .iter()
            .map(|volume| volume.to_sample(&hostname))
            .collect()
    }

    pub(crate) fn eligible_volumes(&self) -> Vec<EligibleVolume> {
        let partitions = match self.platform.partitions() {
            Ok(partitions) => partitions,
            Err(e) => {
                error!(error = %e, "Error getting disk partitions.");
                return Vec::new();
            }
        };

        let pseudo_filesystems = self.platform.pseudo_filesystems().unwrap_or_else(|e| {
            warn!(error = %e, "Can not read filesystem registry, no type will be treated as pseudo.");
            HashSet::new()
        });

        partitions
            .into_iter()
            .filter_map(|partition| self.check_volume(partition, &pseudo_filesystems))
            .collect()
    }

    fn check_volume(
        &self,
        partition: Partition,
        pseudo_filesystems: &HashSet<String>,
    ) -> Option<EligibleVolume> {
        if let Err(e) = self.platform.stat_mount(&partition.mount_point) {
            debug!(error = %e, "Skipping unstatable mount point.");
            return None;
        }

        let usage = match self.platform.usage(&partition.mount_point) {
            Ok(usage) => usage,
            Err(e) => {
                warn!(error = %e, "Error getting disk usage for mount.");
                return None;
            }
        };

        if pseudo_filesystems.contains(&partition.fs_type) {
            debug!(mount_point = ?partition.mount_point, fstype = %partition.fs_type, "Skipping pseudo filesystem.");
            return None;
        }

        if let Some(block_device) = removable_candidate(&partition.device) {
            if self.platform.is_removable(block_device) {
                debug!(device = %partition.device, "Skipping removable device.");
                return None;
            }
        }

        let Some(used_percent) = used_percent(usage.used, usage.total) else {
            debug!(
                mount_point = ?partition.mount_point,
                total = usage.total,
                used = usage.used,
                "Skipping volume with zero capacity or usage."
            );
            return None;
        };

        Some(EligibleVolume {
            partition,
            usage,
            used_percent,
        })
    }
}
