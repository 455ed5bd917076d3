use anyhow::Context;
use clap::Parser;
use erpcore::epochs::Epochs;
use generator::profile::{build_epochs_file, GeneratorConfig};
use std::path::PathBuf;
use workflow::backend::RenderBackend;
use workflow::config::{JobConfig, OutputLayout};
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Average epochs by condition and emit ERP figures, an HTML report and product.json"
)]
struct Args {
    /// Job configuration (JSON, or YAML for .yaml/.yml files)
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
    /// Directory receiving out_dir/, out_figs/, out_report/ and product.json
    #[arg(long, default_value = ".")]
    output_root: PathBuf,
    /// Write a synthetic epochs file to PATH and exit
    #[arg(long, value_name = "PATH")]
    synthesize: Option<PathBuf>,
    /// YAML generator profile used with --synthesize
    #[arg(long, requires = "synthesize")]
    profile: Option<PathBuf>,
    /// Seed used with --synthesize (overrides the profile's seed)
    #[arg(long, requires = "synthesize")]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Some(path) = args.synthesize {
        let mut generator_config = match args.profile {
            Some(profile) => GeneratorConfig::load(profile)?,
            None => GeneratorConfig::default(),
        };
        if let Some(seed) = args.seed {
            generator_config.seed = seed;
        }
        build_epochs_file(&generator_config)?
            .write(&path)
            .with_context(|| format!("writing synthetic epochs {}", path.display()))?;
        println!("Synthetic epochs written to {}", path.display());
        return Ok(());
    }

    let config = JobConfig::load(&args.config)?;
    let backend = workflow::backend::select(config.font.as_deref())?;
    let stage_config = config.to_stage_config(backend.text_rendering());
    match &backend {
        RenderBackend::Text { font } => println!("Rendering text with {}", font.display()),
        RenderBackend::Bundled => println!("Rendering text with the bundled DejaVu Sans font"),
        RenderBackend::TextFree => println!("No usable font; rendering figures without text"),
    }

    let epochs_path = config.epochs_path()?;
    println!("Loading epochs from: {}", epochs_path.display());
    let epochs = Epochs::load(epochs_path)
        .with_context(|| format!("loading epochs {}", epochs_path.display()))?;
    println!("Total epochs: {}", epochs.len());
    let event_names: Vec<String> = epochs
        .conditions()
        .iter()
        .map(|condition| format!("{}: {}", condition.name, condition.id))
        .collect();
    println!("Event names: {{{}}}", event_names.join(", "));

    let layout = OutputLayout::new(args.output_root);
    layout.ensure()?;

    let runner = Runner::new(stage_config, layout);
    let result = runner.execute(&epochs)?;

    if let Some(report) = &result.report {
        println!("HTML report saved to {}", report.display());
    }
    println!("Conditions: {}", result.conditions.join(", "));
    println!("Product JSON written to {}", result.product.display());
    println!(
        "Completed: {} of {} epochs averaged into {} conditions ({} skipped, {} figures)",
        result.metrics.trials_averaged,
        result.total_epochs,
        result.metrics.plotted,
        result.metrics.skipped,
        result.figures.len()
    );
    Ok(())
}
