pub mod models;

pub use models::{DiskIoSample, DiskIoSnapshot, DiskSnapshot, DiskVolumeSample, LoadSample};
