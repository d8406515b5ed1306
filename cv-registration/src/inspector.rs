use cv_core::PointCloud;
use log::*;
use std::sync::{Arc, Mutex};

/// Observes the intermediate clouds of a registration.
///
/// Registration reports the filtered and recentered reference as `"reference"`, and the
/// reading as it is fed to the matcher in iteration `k` as `"i{k}"`. Inspectors only observe:
/// they cannot change the clouds and cannot abort the registration.
pub trait Inspector: Send + Sync {
    fn inspect(&self, cloud: &PointCloud, label: &str);
}

impl<I: Inspector + ?Sized> Inspector for Box<I> {
    fn inspect(&self, cloud: &PointCloud, label: &str) {
        (**self).inspect(cloud, label)
    }
}

impl<I: Inspector + ?Sized> Inspector for Arc<I> {
    fn inspect(&self, cloud: &PointCloud, label: &str) {
        (**self).inspect(cloud, label)
    }
}

/// Ignores everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoOpInspector;

impl Inspector for NoOpInspector {
    fn inspect(&self, _: &PointCloud, _: &str) {}
}

/// Logs the size and centroid of every cloud at the `debug` level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoggingInspector;

impl Inspector for LoggingInspector {
    fn inspect(&self, cloud: &PointCloud, label: &str) {
        match cloud.mean() {
            Some(mean) => debug!(
                "{}: {} points centered at ({:.4}, {:.4}, {:.4})",
                label,
                cloud.len(),
                mean.x,
                mean.y,
                mean.z
            ),
            None => debug!("{}: empty", label),
        }
    }
}

/// Keeps a copy of every cloud it sees, in order.
///
/// Wrap it in an [`Arc`] to keep a handle after handing it to a registration.
#[derive(Debug, Default)]
pub struct RecordingInspector {
    records: Mutex<Vec<(String, PointCloud)>>,
}

impl RecordingInspector {
    pub fn new() -> Self {
        Default::default()
    }

    /// The labels seen so far.
    pub fn labels(&self) -> Vec<String> {
        self.with_records(|records| records.iter().map(|(label, _)| label.clone()).collect())
    }

    /// The most recent cloud reported under `label`.
    pub fn cloud(&self, label: &str) -> Option<PointCloud> {
        self.with_records(|records| {
            records
                .iter()
                .rev()
                .find(|(l, _)| l == label)
                .map(|(_, cloud)| cloud.clone())
        })
    }

    pub fn len(&self) -> usize {
        self.with_records(|records| records.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.with_records(|records| records.clear())
    }

    /// Takes all records out of the inspector.
    pub fn take(&self) -> Vec<(String, PointCloud)> {
        self.with_records(std::mem::take)
    }

    fn with_records<T>(&self, f: impl FnOnce(&mut Vec<(String, PointCloud)>) -> T) -> T {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut records)
    }
}

impl Inspector for RecordingInspector {
    fn inspect(&self, cloud: &PointCloud, label: &str) {
        self.with_records(|records| records.push((label.to_owned(), cloud.clone())));
    }
}
