//! Point-in-time host samplers. Each sampler reads the OS through a small
//! trait so the filtering and arithmetic can run against synthetic data.

pub mod disk;
pub mod disk_io;
pub mod load;

pub use disk::{DiskError, DiskPlatform, DiskSampler, Partition, SystemDiskPlatform, VolumeUsage};
pub use disk_io::{DiskIoCounters, DiskIoSampler, DiskStatsSource, ProcDiskStats};
pub use load::{LoadSampler, LoadSource, SamplingError, SystemLoadSource};
