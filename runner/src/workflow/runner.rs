use crate::workflow::config::OutputLayout;
use anyhow::Context;
use erpcore::epochs::{Condition, Epochs};
use erpcore::prelude::{ProcessingStage, StageConfig};
use erpcore::processing::{figure_file_name, AverageStage, PlotStage};
use erpcore::report::{Product, Report};
use erpcore::telemetry::{MetricsRecorder, RunMetrics};
use log::{info, warn};
use std::collections::HashSet;
use std::path::PathBuf;

pub const REPORT_TITLE: &str = "Average ERPs by Condition";

pub struct WorkflowResult {
    pub total_epochs: usize,
    pub conditions: Vec<String>,
    pub figures: Vec<PathBuf>,
    pub report: Option<PathBuf>,
    pub product: PathBuf,
    pub metrics: RunMetrics,
}

#[derive(Clone)]
pub struct Runner {
    config: StageConfig,
    layout: OutputLayout,
}

impl Runner {
    pub fn new(config: StageConfig, layout: OutputLayout) -> Self {
        Self { config, layout }
    }

    /// Averages and plots every condition in ascending identifier order, then
    /// writes the report (when anything was plotted) and the manifest.
    pub fn execute(&self, epochs: &Epochs) -> anyhow::Result<WorkflowResult> {
        let mut product = Product::new();
        let mut report = Report::new(REPORT_TITLE);
        let mut metrics = MetricsRecorder::new();
        let mut used_names = HashSet::new();
        let mut conditions = Vec::new();
        let mut figures = Vec::new();

        for condition in epochs.conditions() {
            info!("Processing condition: {}", condition.name);

            let mut average_stage = AverageStage::new(epochs);
            average_stage
                .initialize(&self.config)
                .context("initializing average stage")?;
            let evoked = average_stage
                .execute(condition.clone())
                .with_context(|| format!("averaging condition {}", condition.name))?;
            average_stage.cleanup();

            let Some(evoked) = evoked else {
                warn!("  Warning: No epochs for condition {}", condition.name);
                metrics.record_skipped();
                continue;
            };
            let nave = evoked.nave;

            let mut plot_stage = PlotStage::new();
            plot_stage
                .initialize(&self.config)
                .context("initializing plot stage")?;
            let plotted = plot_stage
                .execute(evoked)
                .with_context(|| format!("plotting condition {}", condition.name))?;
            plot_stage.cleanup();

            let file_name = unique_file_name(condition, &mut used_names);
            let path = self.layout.figs_dir().join(&file_name);
            plotted
                .figure
                .save(&path)
                .with_context(|| format!("saving figure {}", path.display()))?;
            product.add_image(file_name.as_str(), plotted.figure.inline_base64());
            report.add_evoked(&plotted);

            info!("  Saved: {} ({} epochs averaged)", file_name, nave);
            metrics.record_plotted(nave);
            conditions.push(condition.name.clone());
            figures.push(path);
        }

        product.add_info(format!("Processed {} epochs", epochs.len()));
        product.add_info(format!("Conditions: {}", conditions.join(", ")));
        product.add_info(format!("Channels: {}", epochs.n_channels()));
        product.add_info(format!("Sampling rate: {:?} Hz", epochs.sfreq()));

        let report_path = if report.is_empty() {
            info!("No evoked waveforms; skipping HTML report");
            None
        } else {
            let path = self.layout.report_path();
            report
                .save(&path)
                .with_context(|| format!("writing report {}", path.display()))?;
            info!("HTML report saved to {}", path.display());
            Some(path)
        };

        let product_path = self.layout.product_path();
        product
            .write(&product_path)
            .with_context(|| format!("writing product {}", product_path.display()))?;

        Ok(WorkflowResult {
            total_epochs: epochs.len(),
            conditions,
            figures,
            report: report_path,
            product: product_path,
            metrics: metrics.snapshot(),
        })
    }
}

/// Figure name for `condition`. When another condition already produced the
/// same safe name it is suffixed with the identifier, then with a counter,
/// until the name is unused.
fn unique_file_name(condition: &Condition, used: &mut HashSet<String>) -> String {
    let name = figure_file_name(&condition.name);
    if used.insert(name.clone()) {
        return name;
    }
    let base = format!("{}_{}", condition.name, condition.id);
    let mut fallback = figure_file_name(&base);
    let mut counter = 2;
    while !used.insert(fallback.clone()) {
        fallback = figure_file_name(&format!("{}_{}", base, counter));
        counter += 1;
    }
    warn!(
        "condition {} collides with an earlier figure name; using {}",
        condition.name, fallback
    );
    fallback
}
