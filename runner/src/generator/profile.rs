use anyhow::{ensure, Context};
use erpcore::epochs::EpochsFile;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One simulated condition: trial count and the latency/amplitude of its deflection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionProfile {
    pub name: String,
    pub id: i64,
    pub trials: usize,
    pub latency: f64,
    pub amplitude: f64,
}

impl ConditionProfile {
    fn new(name: &str, id: i64, trials: usize, latency: f64, amplitude: f64) -> Self {
        Self {
            name: name.to_string(),
            id,
            trials,
            latency,
            amplitude,
        }
    }
}

/// Configuration for generating synthetic epochs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub channels: usize,
    pub samples: usize,
    pub sfreq: f64,
    pub tmin: f64,
    pub width: f64,
    pub noise: f64,
    pub seed: u64,
    pub conditions: Vec<ConditionProfile>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            channels: 8,
            samples: 150,
            sfreq: 250.0,
            tmin: -0.1,
            width: 0.025,
            noise: 1.5,
            seed: 0,
            conditions: vec![
                ConditionProfile::new("auditory/left", 1, 30, 0.10, 6.0),
                ConditionProfile::new("auditory/right", 2, 30, 0.11, 5.0),
                ConditionProfile::new("visual/left", 3, 20, 0.17, 8.0),
                ConditionProfile::new("visual/right", 4, 20, 0.18, 7.5),
                ConditionProfile::new("catch trial", 5, 0, 0.30, 3.0),
            ],
        }
    }
}

impl GeneratorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading generator profile {}", path_ref.display()))?;
        let config: GeneratorConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing generator profile {}", path_ref.display()))?;
        Ok(config)
    }
}

/// Spatial gain of `channel`; polarity flips across the montage.
fn topography(channel: usize, channels: usize) -> f64 {
    if channels <= 1 {
        return 1.0;
    }
    1.0 - 2.0 * channel as f64 / (channels - 1) as f64 * 0.75
}

pub fn build_epochs_file(config: &GeneratorConfig) -> anyhow::Result<EpochsFile> {
    ensure!(config.channels > 0, "generator needs at least one channel");
    ensure!(
        config.sfreq.is_finite() && config.sfreq > 0.0,
        "generator sampling rate must be positive"
    );
    ensure!(config.width > 0.0, "generator deflection width must be positive");

    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut events: Vec<i64> = config
        .conditions
        .iter()
        .flat_map(|condition| std::iter::repeat(condition.id).take(condition.trials))
        .collect();
    events.shuffle(&mut rng);

    let mut data = Vec::with_capacity(events.len());
    for &code in &events {
        let profile = config
            .conditions
            .iter()
            .find(|condition| condition.id == code)
            .context("event code without a condition profile")?;
        let mut trial = Vec::with_capacity(config.channels);
        for channel in 0..config.channels {
            let gain = topography(channel, config.channels) * profile.amplitude;
            let row = (0..config.samples)
                .map(|i| {
                    let t = config.tmin + i as f64 / config.sfreq;
                    let z = (t - profile.latency) / config.width;
                    let jitter = if config.noise > 0.0 {
                        rng.gen_range(-config.noise..config.noise)
                    } else {
                        0.0
                    };
                    gain * (-0.5 * z * z).exp() + jitter
                })
                .collect();
            trial.push(row);
        }
        data.push(trial);
    }

    let event_id: BTreeMap<String, i64> = config
        .conditions
        .iter()
        .map(|condition| (condition.name.clone(), condition.id))
        .collect();

    Ok(EpochsFile {
        sfreq: config.sfreq,
        tmin: config.tmin,
        ch_names: (1..=config.channels)
            .map(|i| format!("EEG {:03}", i))
            .collect(),
        event_id,
        events,
        data,
    })
}
