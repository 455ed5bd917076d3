use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ndarray::{Array1, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::epochs::conditions::{Condition, ConditionMap};
use crate::prelude::{StageError, StageResult};

/// On-disk layout of an epochs file. `data` is trials × channels × samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochsFile {
    pub sfreq: f64,
    pub tmin: f64,
    pub ch_names: Vec<String>,
    pub event_id: BTreeMap<String, i64>,
    pub events: Vec<i64>,
    pub data: Vec<Vec<Vec<f64>>>,
}

impl EpochsFile {
    pub fn read<P: AsRef<Path>>(path: P) -> StageResult<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| StageError::io(path_ref, err))?;
        serde_json::from_str(&contents)
            .map_err(|err| StageError::Parse(format!("{}: {}", path_ref.display(), err)))
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> StageResult<()> {
        let path_ref = path.as_ref();
        let json = serde_json::to_string(self)
            .map_err(|err| StageError::Encode(format!("serializing epochs: {}", err)))?;
        fs::write(path_ref, json).map_err(|err| StageError::io(path_ref, err))
    }
}

/// Fully loaded, validated epoch collection.
#[derive(Debug, Clone)]
pub struct Epochs {
    data: Array3<f64>,
    events: Vec<i64>,
    conditions: ConditionMap,
    ch_names: Vec<String>,
    sfreq: f64,
    tmin: f64,
}

impl Epochs {
    /// Reads and validates an epochs file; any structural problem is fatal.
    pub fn load<P: AsRef<Path>>(path: P) -> StageResult<Self> {
        Self::try_from(EpochsFile::read(path)?)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn conditions(&self) -> &ConditionMap {
        &self.conditions
    }

    pub fn ch_names(&self) -> &[String] {
        &self.ch_names
    }

    pub fn n_channels(&self) -> usize {
        self.ch_names.len()
    }

    pub fn n_times(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    pub fn sfreq(&self) -> f64 {
        self.sfreq
    }

    pub fn tmin(&self) -> f64 {
        self.tmin
    }

    pub fn times(&self) -> Array1<f64> {
        Array1::from_iter((0..self.n_times()).map(|i| self.tmin + i as f64 / self.sfreq))
    }

    /// Indices of the trials labelled with `condition`.
    pub fn select(&self, condition: &Condition) -> Vec<usize> {
        self.events
            .iter()
            .enumerate()
            .filter(|(_, &code)| code == condition.id)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Channels × samples view of one trial.
    pub fn trial(&self, index: usize) -> ArrayView2<'_, f64> {
        self.data.index_axis(Axis(0), index)
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }
}

impl TryFrom<EpochsFile> for Epochs {
    type Error = StageError;

    fn try_from(file: EpochsFile) -> StageResult<Self> {
        if !file.sfreq.is_finite() || file.sfreq <= 0.0 {
            return Err(StageError::Parse(format!(
                "sampling rate must be positive, got {}",
                file.sfreq
            )));
        }
        if !file.tmin.is_finite() {
            return Err(StageError::Parse("tmin must be finite".into()));
        }
        if file.events.len() != file.data.len() {
            return Err(StageError::Parse(format!(
                "{} event labels for {} trials",
                file.events.len(),
                file.data.len()
            )));
        }

        let conditions = ConditionMap::from_event_id(&file.event_id)?;
        if let Some(code) = file.events.iter().find(|&&code| !conditions.contains_id(code)) {
            return Err(StageError::Parse(format!(
                "event code {} has no entry in event_id",
                code
            )));
        }

        let n_trials = file.data.len();
        let n_channels = file.ch_names.len();
        let n_times = file
            .data
            .first()
            .and_then(|trial| trial.first())
            .map_or(0, |row| row.len());

        let mut flat = Vec::with_capacity(n_trials * n_channels * n_times);
        for (trial_idx, trial) in file.data.iter().enumerate() {
            if trial.len() != n_channels {
                return Err(StageError::Parse(format!(
                    "trial {} has {} channels, expected {}",
                    trial_idx,
                    trial.len(),
                    n_channels
                )));
            }
            for (ch_idx, row) in trial.iter().enumerate() {
                if row.len() != n_times {
                    return Err(StageError::Parse(format!(
                        "trial {} channel {} has {} samples, expected {}",
                        trial_idx,
                        ch_idx,
                        row.len(),
                        n_times
                    )));
                }
                flat.extend_from_slice(row);
            }
        }

        let data = Array3::from_shape_vec((n_trials, n_channels, n_times), flat)
            .map_err(|err| StageError::Internal(format!("assembling epochs array: {}", err)))?;

        Ok(Self {
            data,
            events: file.events,
            conditions,
            ch_names: file.ch_names,
            sfreq: file.sfreq,
            tmin: file.tmin,
        })
    }
}
