//! Progress reporting for volume and batch conversions.
//!
//! A volume runs through five weighted [`Stage`]s. [`ProgressTracker`] turns "stage X is
//! N% done" into a single fraction in `[0, 1]`, maps it into the volume's slice of a batch,
//! and never lets the reported value go backwards.

use std::sync::{Arc, Mutex};

/// Receives progress fractions in `[0, 1]`.
pub trait ProgressSink: Send + Sync {
    fn report(&self, fraction: f32);
}

impl<F> ProgressSink for F
where
    F: Fn(f32) + Send + Sync,
{
    fn report(&self, fraction: f32) {
        self(fraction)
    }
}

/// Pipeline stages of one volume, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Intake,
    SizeResolution,
    Splitting,
    Sequencing,
    Packaging,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Intake,
        Stage::SizeResolution,
        Stage::Splitting,
        Stage::Sequencing,
        Stage::Packaging,
    ];

    /// Share of the volume's progress bar owned by this stage. Weights sum to 1.
    pub fn weight(self) -> f32 {
        match self {
            Stage::Intake => 0.40,
            Stage::SizeResolution => 0.05,
            Stage::Splitting => 0.30,
            Stage::Sequencing => 0.05,
            Stage::Packaging => 0.20,
        }
    }

    /// Volume-local fraction at which this stage begins.
    pub fn start(self) -> f32 {
        Stage::ALL
            .iter()
            .take_while(|s| **s != self)
            .map(|s| s.weight())
            .sum()
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Intake => "intake",
            Stage::SizeResolution => "size resolution",
            Stage::Splitting => "splitting",
            Stage::Sequencing => "sequencing",
            Stage::Packaging => "packaging",
        }
    }
}

/// Monotonic progress reporter for one volume.
pub struct ProgressTracker {
    sink: Option<Arc<dyn ProgressSink>>,
    offset: f32,
    span: f32,
    last: Mutex<f32>,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("offset", &self.offset)
            .field("span", &self.span)
            .finish_non_exhaustive()
    }
}

impl ProgressTracker {
    /// Tracker covering the whole `[0, 1]` range.
    pub fn new(sink: Option<Arc<dyn ProgressSink>>) -> Self {
        Self::sliced(sink, 0, 1)
    }

    /// Tracker for volume `index` of `total`, covering `[index/total, (index+1)/total]`.
    pub fn sliced(sink: Option<Arc<dyn ProgressSink>>, index: usize, total: usize) -> Self {
        let total = total.max(1);
        let span = 1.0 / total as f32;
        Self {
            sink,
            offset: index.min(total - 1) as f32 * span,
            span,
            last: Mutex::new(f32::NEG_INFINITY),
        }
    }

    /// Reports that `stage` is `fraction` (0..=1) complete.
    pub fn stage(&self, stage: Stage, fraction: f32) {
        let local = stage.start() + stage.weight() * fraction.clamp(0.0, 1.0);
        self.local(local);
    }

    /// Reports the end of the volume.
    pub fn complete(&self) {
        self.local(1.0);
    }

    fn local(&self, local: f32) {
        let Some(sink) = &self.sink else {
            return;
        };
        let global = (self.offset + self.span * local.clamp(0.0, 1.0)).clamp(0.0, 1.0);

        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if global < *last {
            return;
        }
        *last = global;
        sink.report(global);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_sink() -> (Arc<Mutex<Vec<f32>>>, Arc<dyn ProgressSink>) {
        let values = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&values);
        let sink: Arc<dyn ProgressSink> = Arc::new(move |f: f32| {
            captured.lock().unwrap().push(f);
        });
        (values, sink)
    }

    #[test]
    fn test_stage_weights_sum_to_one() {
        let total: f32 = Stage::ALL.iter().map(|s| s.weight()).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert_eq!(Stage::Intake.start(), 0.0);
        assert!((Stage::Packaging.start() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_progress_never_decreases() {
        let (values, sink) = recording_sink();
        let tracker = ProgressTracker::new(Some(sink));
        tracker.stage(Stage::Splitting, 0.5);
        tracker.stage(Stage::Intake, 1.0);
        tracker.stage(Stage::Packaging, 0.0);
        tracker.complete();

        let values = values.lock().unwrap();
        assert_eq!(values.len(), 3);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*values.last().unwrap(), 1.0);
    }

    #[test]
    fn test_batch_slices_are_disjoint() {
        let (values, sink) = recording_sink();
        let second = ProgressTracker::sliced(Some(Arc::clone(&sink)), 1, 4);
        second.stage(Stage::Intake, 0.0);
        second.complete();

        let values = values.lock().unwrap();
        assert!((values[0] - 0.25).abs() < 1e-6);
        assert!((values[1] - 0.5).abs() < 1e-6);
    }
}
