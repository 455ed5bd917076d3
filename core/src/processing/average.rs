use ndarray::{Array1, Array2, Axis};

use crate::epochs::{Condition, Epochs};
use crate::math::stats::StatsHelper;
use crate::prelude::{ProcessingStage, StageConfig, StageError, StageResult};
use crate::telemetry::log::LogManager;

/// Across-trial mean of one condition, channels × samples.
#[derive(Debug, Clone)]
pub struct EvokedWaveform {
    pub comment: String,
    pub condition: Condition,
    pub nave: usize,
    pub data: Array2<f64>,
    pub ch_names: Vec<String>,
    pub sfreq: f64,
    pub tmin: f64,
}

impl EvokedWaveform {
    pub fn n_times(&self) -> usize {
        self.data.ncols()
    }

    pub fn times(&self) -> Array1<f64> {
        Array1::from_iter((0..self.n_times()).map(|i| self.tmin + i as f64 / self.sfreq))
    }

    pub fn tmax(&self) -> f64 {
        self.tmin + self.n_times().saturating_sub(1) as f64 / self.sfreq
    }

    /// Latency (s) and value of the global-field-power maximum.
    pub fn gfp_peak(&self) -> Option<(f64, f64)> {
        let gfp = StatsHelper::global_field_power(self.data.view());
        StatsHelper::argmax(&gfp).map(|(idx, value)| (self.tmin + idx as f64 / self.sfreq, value))
    }
}

/// Averages the trials of one condition over a borrowed epoch collection.
pub struct AverageStage<'a> {
    epochs: &'a Epochs,
    config: Option<StageConfig>,
    logger: LogManager,
}

impl<'a> AverageStage<'a> {
    pub fn new(epochs: &'a Epochs) -> Self {
        Self {
            epochs,
            config: None,
            logger: LogManager::new("average"),
        }
    }
}

impl ProcessingStage for AverageStage<'_> {
    type Input = Condition;
    /// `None` when the condition has no trials.
    type Output = Option<EvokedWaveform>;

    fn initialize(&mut self, config: &StageConfig) -> StageResult<()> {
        self.config = Some(config.clone());
        Ok(())
    }

    fn execute(&mut self, condition: Condition) -> StageResult<Option<EvokedWaveform>> {
        if self.config.is_none() {
            return Err(StageError::Internal("stage not initialized".into()));
        }

        let indices = self.epochs.select(&condition);
        if indices.is_empty() {
            self.logger
                .warn(&format!("no epochs for condition {}", condition.name));
            return Ok(None);
        }

        let subset = self.epochs.data().select(Axis(0), &indices);
        let data = subset
            .mean_axis(Axis(0))
            .ok_or_else(|| StageError::Internal("mean over an empty trial axis".into()))?;

        if data.iter().any(|v| !v.is_finite()) {
            return Err(StageError::InvalidInput(format!(
                "average of condition {} contains non-finite samples",
                condition.name
            )));
        }

        self.logger.record(&format!(
            "{}: averaged {} epochs, rms {:.4}",
            condition.name,
            indices.len(),
            StatsHelper::rms(data.as_slice().unwrap_or_default())
        ));

        Ok(Some(EvokedWaveform {
            comment: condition.name.clone(),
            condition,
            nave: indices.len(),
            data,
            ch_names: self.epochs.ch_names().to_vec(),
            sfreq: self.epochs.sfreq(),
            tmin: self.epochs.tmin(),
        }))
    }

    fn cleanup(&mut self) {
        self.config = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epochs::EpochsFile;
    use std::collections::BTreeMap;

    fn epochs(events: Vec<i64>, data: Vec<Vec<Vec<f64>>>) -> Epochs {
        let mut event_id = BTreeMap::new();
        event_id.insert("A".to_string(), 1);
        event_id.insert("B".to_string(), 2);
        Epochs::try_from(EpochsFile {
            sfreq: 10.0,
            tmin: 0.0,
            ch_names: vec!["C3".into(), "C4".into()],
            event_id,
            events,
            data,
        })
        .unwrap()
    }

    fn condition(epochs: &Epochs, name: &str) -> Condition {
        epochs.conditions().get(name).unwrap().clone()
    }

    #[test]
    fn average_is_samplewise_mean_of_matching_trials() {
        let epochs = epochs(
            vec![1, 2, 1],
            vec![
                vec![vec![1.0, 3.0], vec![0.0, 2.0]],
                vec![vec![100.0, 100.0], vec![100.0, 100.0]],
                vec![vec![3.0, 5.0], vec![2.0, 4.0]],
            ],
        );
        let mut stage = AverageStage::new(&epochs);
        stage.initialize(&StageConfig::default()).unwrap();

        let evoked = stage.execute(condition(&epochs, "A")).unwrap().unwrap();
        assert_eq!(evoked.nave, 2);
        assert_eq!(evoked.comment, "A");
        assert_eq!(evoked.data, ndarray::array![[2.0, 4.0], [1.0, 3.0]]);
        stage.cleanup();
    }

    #[test]
    fn empty_condition_is_skipped() {
        let epochs = epochs(vec![1], vec![vec![vec![1.0], vec![1.0]]]);
        let mut stage = AverageStage::new(&epochs);
        stage.initialize(&StageConfig::default()).unwrap();
        assert!(stage.execute(condition(&epochs, "B")).unwrap().is_none());
    }

    #[test]
    fn non_finite_average_is_an_error() {
        let epochs = epochs(vec![1], vec![vec![vec![f64::NAN], vec![1.0]]]);
        let mut stage = AverageStage::new(&epochs);
        stage.initialize(&StageConfig::default()).unwrap();
        let err = stage.execute(condition(&epochs, "A")).unwrap_err();
        assert!(matches!(err, StageError::InvalidInput(_)));
    }

    #[test]
    fn execute_requires_initialize() {
        let epochs = epochs(vec![1], vec![vec![vec![1.0], vec![1.0]]]);
        let mut stage = AverageStage::new(&epochs);
        assert!(matches!(
            stage.execute(condition(&epochs, "A")),
            Err(StageError::Internal(_))
        ));
    }

    #[test]
    fn gfp_peak_reports_latency() {
        let epochs = epochs(
            vec![1],
            vec![vec![vec![0.0, 2.0, 0.5], vec![0.0, -2.0, -0.5]]],
        );
        let mut stage = AverageStage::new(&epochs);
        stage.initialize(&StageConfig::default()).unwrap();
        let evoked = stage.execute(condition(&epochs, "A")).unwrap().unwrap();
        let (latency, value) = evoked.gfp_peak().unwrap();
        assert!((latency - 0.1).abs() < 1e-12);
        assert!((value - 2.0).abs() < 1e-12);
        assert!((evoked.tmax() - 0.2).abs() < 1e-12);
    }
}
