//! Wire shapes reported by the agent's HTTP endpoints.
//!
//! Field names are part of the public JSON contract and must not change.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 1/5/15-minute load average of the host.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoadSample {
    #[serde(rename = "HostName")]
    pub hostname: String,
    #[serde(rename = "Loadavg1")]
    pub load1: f64,
    #[serde(rename = "Loadavg5")]
    pub load5: f64,
    #[serde(rename = "Loadavg15")]
    pub load15: f64,
}

/// Capacity of one mounted volume. Sizes are whole megabytes rendered as strings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DiskVolumeSample {
    #[serde(rename = "Hostname")]
    pub hostname: String,
    #[serde(rename = "name")]
    pub device_name: String,
    #[serde(rename = "path")]
    pub mount_path: String,
    #[serde(rename = "fstype")]
    pub filesystem_type: String,
    #[serde(rename = "total")]
    pub total_mb: String,
    #[serde(rename = "free")]
    pub free_mb: String,
    #[serde(rename = "used")]
    pub used_mb: String,
    #[serde(rename = "percent")]
    pub used_percent: f64,
}

/// Cumulative I/O counters of one mounted volume's block device.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DiskIoSample {
    #[serde(rename = "Hostname")]
    pub hostname: String,
    #[serde(rename = "name")]
    pub device_name: String,
    #[serde(rename = "path")]
    pub mount_path: String,
    pub reads: u64,
    pub writes: u64,
    #[serde(rename = "bytes.read")]
    pub read_bytes: u64,
    #[serde(rename = "bytes.write")]
    pub write_bytes: u64,
    /// Milliseconds spent writing.
    pub write_time: u64,
    /// Milliseconds spent reading.
    pub read_time: u64,
}

pub type DiskSnapshot = Vec<DiskVolumeSample>;

pub type DiskIoSnapshot = Vec<DiskIoSample>;

macro_rules! display_as_json {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                    f.write_str(&json)
                }
            }
        )*
    };
}

display_as_json!(LoadSample, DiskVolumeSample, DiskIoSample);
