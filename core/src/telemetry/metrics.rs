/// Per-run counters. The pipeline is single-threaded, so plain fields suffice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunMetrics {
    pub plotted: usize,
    pub skipped: usize,
    pub trials_averaged: usize,
}

#[derive(Debug, Default)]
pub struct MetricsRecorder {
    inner: RunMetrics,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_plotted(&mut self, nave: usize) {
        self.inner.plotted += 1;
        self.inner.trials_averaged += nave;
    }

    pub fn record_skipped(&mut self) {
        self.inner.skipped += 1;
    }

    pub fn snapshot(&self) -> RunMetrics {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_accumulates_counts() {
        let mut recorder = MetricsRecorder::new();
        recorder.record_plotted(10);
        recorder.record_plotted(4);
        recorder.record_skipped();
        assert_eq!(
            recorder.snapshot(),
            RunMetrics {
                plotted: 2,
                skipped: 1,
                trials_averaged: 14,
            }
        );
    }
}
