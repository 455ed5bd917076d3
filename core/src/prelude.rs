use serde::{Deserialize, Serialize};

/// Figure resolution and size in inches, shared by every plotting stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FigureGeometry {
    pub width_in: f64,
    pub height_in: f64,
}

impl FigureGeometry {
    /// Pixel dimensions for a rendering at `dpi`.
    pub fn pixels(&self, dpi: u32) -> (u32, u32) {
        let scale = dpi as f64;
        (
            (self.width_in * scale).round().max(1.0) as u32,
            (self.height_in * scale).round().max(1.0) as u32,
        )
    }
}

impl Default for FigureGeometry {
    fn default() -> Self {
        Self {
            width_in: 6.4,
            height_in: 4.8,
        }
    }
}

/// Shared configuration for each processing stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub geometry: FigureGeometry,
    pub dpi_file: u32,
    pub dpi_inline: u32,
    /// Set by backend selection; when false no text primitives are drawn.
    pub text_rendering: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            geometry: FigureGeometry::default(),
            dpi_file: 150,
            dpi_inline: 80,
            text_rendering: false,
        }
    }
}

/// Common error type for loading, stage execution and emission.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("i/o failure on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed input: {0}")]
    Parse(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("render failure: {0}")]
    Render(String),
    #[error("encoding failure: {0}")]
    Encode(String),
    #[error("template failure: {0}")]
    Template(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl StageError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        StageError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

pub type StageResult<T> = Result<T, StageError>;

/// Trait describing the per-condition processing stages.
///
/// A stage is initialized with the run's immutable [`StageConfig`], executed
/// once per condition and cleaned up afterwards so scratch buffers do not
/// accumulate across conditions.
pub trait ProcessingStage {
    type Input;
    type Output;

    fn initialize(&mut self, config: &StageConfig) -> StageResult<()>;
    fn execute(&mut self, input: Self::Input) -> StageResult<Self::Output>;
    fn cleanup(&mut self);
}
