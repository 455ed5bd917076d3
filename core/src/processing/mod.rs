pub mod average;
pub mod plot;

pub use average::{AverageStage, EvokedWaveform};
pub use plot::{figure_file_name, Figure, PlotStage, PlottedEvoked};
