//! Cooperative progress reporting and cancellation.

use crate::error::ReorgError;

pub trait ProgressMonitor {
    fn begin_task(&mut self, name: &str, total_work: usize);
    fn sub_task(&mut self, name: &str);
    fn worked(&mut self, units: usize);
    fn done(&mut self);
    fn is_cancelled(&self) -> bool;
}

#[derive(Debug, Default)]
pub struct NullProgressMonitor {
    cancelled: bool,
}

impl NullProgressMonitor {
    /// A monitor that reports cancellation at the first checkpoint.
    pub fn cancelled() -> Self {
        Self { cancelled: true }
    }
}

impl ProgressMonitor for NullProgressMonitor {
    fn begin_task(&mut self, _name: &str, _total_work: usize) {}
    fn sub_task(&mut self, _name: &str) {}
    fn worked(&mut self, _units: usize) {}
    fn done(&mut self) {}
    fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// `Err(Cancelled)` once the monitor asks to stop.
pub fn checkpoint(monitor: &dyn ProgressMonitor) -> Result<(), ReorgError> {
    if monitor.is_cancelled() {
        Err(ReorgError::Cancelled)
    } else {
        Ok(())
    }
}
