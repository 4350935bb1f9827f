use eagle_common::LoadSample;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::agent_modules::utils::host_name;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SamplingError {
    #[error("failed to get loadavg: OS reported {reported} of 3 values")]
    Incomplete { reported: i32 },
    #[error("load average is not available on this platform")]
    Unsupported,
}

/// Source of the 1/5/15-minute load averages.
pub trait LoadSource: Send + Sync {
    fn load_average(&self) -> Result<[f64; 3], SamplingError>;
}

/// Reads the kernel's load averages through `getloadavg(3)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLoadSource;

impl LoadSource for SystemLoadSource {
    #[cfg(unix)]
    fn load_average(&self) -> Result<[f64; 3], SamplingError> {
        let mut values = [0.0_f64; 3];
        // SAFETY: `getloadavg` writes at most `nelem` doubles into the buffer, which holds 3.
        let reported = unsafe { libc::getloadavg(values.as_mut_ptr(), 3) };
        if reported != 3 {
            return Err(SamplingError::Incomplete { reported });
        }
        Ok(values)
    }

    #[cfg(not(unix))]
    fn load_average(&self) -> Result<[f64; 3], SamplingError> {
        Err(SamplingError::Unsupported)
    }
}

#[derive(Clone)]
pub struct LoadSampler {
    source: Arc<dyn LoadSource>,
}

impl LoadSampler {
    pub fn new(source: Arc<dyn LoadSource>) -> Self {
        Self { source }
    }

    /// Takes one load-average reading stamped with the local hostname.
    pub fn sample(&self) -> Result<LoadSample, SamplingError> {
        let [load1, load5, load15] = self.source.load_average()?;
        debug!(load1, load5, load15, "Sampled load average.");
        Ok(LoadSample {
            hostname: host_name(),
            load1,
            load5,
            load15,
        })
    }
}
