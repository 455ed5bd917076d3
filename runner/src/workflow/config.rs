use anyhow::{ensure, Context};
use erpcore::prelude::{FigureGeometry, StageConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_dpi_file() -> u32 {
    150
}

fn default_dpi_inline() -> u32 {
    80
}

fn default_fig_width() -> f64 {
    FigureGeometry::default().width_in
}

fn default_fig_height() -> f64 {
    FigureGeometry::default().height_in
}

/// Job configuration; unknown keys from the pipeline's config object are ignored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub epo: Option<PathBuf>,
    #[serde(default = "default_dpi_file")]
    pub dpi_file: u32,
    #[serde(default = "default_dpi_inline")]
    pub dpi_inline: u32,
    #[serde(default = "default_fig_width")]
    pub fig_width_in: f64,
    #[serde(default = "default_fig_height")]
    pub fig_height_in: f64,
    #[serde(default)]
    pub font: Option<PathBuf>,
}

impl JobConfig {
    /// Reads and validates the config; YAML by extension, JSON otherwise.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading job config {}", path_ref.display()))?;
        let config = Self::parse(path_ref, &contents)
            .with_context(|| format!("parsing job config {}", path_ref.display()))?;
        config
            .validate()
            .with_context(|| format!("validating job config {}", path_ref.display()))?;
        Ok(config)
    }

    fn parse(path: &Path, contents: &str) -> anyhow::Result<Self> {
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        let config = if is_yaml {
            serde_yaml::from_str(contents)?
        } else {
            serde_json::from_str(contents)?
        };
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.epochs_path()?;
        ensure!(
            self.dpi_file > 0 && self.dpi_inline > 0,
            "dpi_file and dpi_inline must be positive"
        );
        ensure!(
            self.fig_width_in.is_finite()
                && self.fig_width_in > 0.0
                && self.fig_height_in.is_finite()
                && self.fig_height_in > 0.0,
            "figure size must be positive"
        );
        Ok(())
    }

    pub fn epochs_path(&self) -> anyhow::Result<&Path> {
        let path = self
            .epo
            .as_deref()
            .context("missing required field 'epo'")?;
        ensure!(
            path.is_file(),
            "epochs file {} does not exist",
            path.display()
        );
        Ok(path)
    }

    pub fn to_stage_config(&self, text_rendering: bool) -> StageConfig {
        StageConfig {
            geometry: FigureGeometry {
                width_in: self.fig_width_in,
                height_in: self.fig_height_in,
            },
            dpi_file: self.dpi_file,
            dpi_inline: self.dpi_inline,
            text_rendering,
        }
    }
}

/// Output locations, all anchored at one root directory.
#[derive(Clone, Debug)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root.join("out_dir")
    }

    pub fn figs_dir(&self) -> PathBuf {
        self.root.join("out_figs")
    }

    pub fn report_dir(&self) -> PathBuf {
        self.root.join("out_report")
    }

    pub fn report_path(&self) -> PathBuf {
        self.report_dir().join("report.html")
    }

    pub fn product_path(&self) -> PathBuf {
        self.root.join("product.json")
    }

    /// Creates the three output directories; existing ones are left alone.
    pub fn ensure(&self) -> anyhow::Result<()> {
        for dir in [self.out_dir(), self.figs_dir(), self.report_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("creating output directory {}", dir.display()))?;
        }
        Ok(())
    }
}
