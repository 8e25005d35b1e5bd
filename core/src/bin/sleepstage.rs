//! sleepstage entry point.

use anyhow::Context;
use chrono::Utc;
use clap::Parser;

use sleepstage_core::cli::{self, Cli, Commands, PipelineArgs};
use sleepstage_core::storage::{self, SampleRecord};
use sleepstage_core::{
    metrics, synthetic, Classifier, NormalizationStats, Normalizer, PipelineConfig, PredictionCoordinator,
    TreeEnsemble, Unloaded,
};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay { input, pipeline } => {
            let records = storage::read_samples_csv(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            run(&records, &pipeline)?;
        }
        Commands::Simulate { minutes, seed, pipeline } => {
            let records = synthetic::session_script(minutes, seed);
            run(&records, &pipeline)?;
        }
        Commands::Features { input, config } => {
            let cfg = load_config(config.as_deref())?;
            let records = storage::read_samples_csv(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            match cli::features_for_records(&records, &cfg)? {
                Some(features) => cli::print_features(&features),
                None => anyhow::bail!(
                    "not enough data: {} samples, need {} epochs",
                    records.len(),
                    cfg.min_history
                ),
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<PipelineConfig> {
    Ok(match path {
        Some(p) => storage::load_config(p).with_context(|| format!("config {}", p.display()))?,
        None => PipelineConfig::default(),
    })
}

fn run(records: &[SampleRecord], args: &PipelineArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let stats = match &args.stats {
        Some(p) => NormalizationStats::load(p).with_context(|| format!("stats {}", p.display()))?,
        None => NormalizationStats::training(),
    };
    let classifier: Box<dyn Classifier> = match &args.model {
        Some(p) => Box::new(TreeEnsemble::load(p).with_context(|| format!("model {}", p.display()))?),
        None => {
            log::warn!("no model given, predictions fall back to stage 0");
            Box::new(Unloaded)
        }
    };

    let stage_map = cfg.stage_map;
    let mut coordinator = PredictionCoordinator::with_config(cfg, Normalizer::new(stats), classifier)?;
    let report = cli::run_session(&mut coordinator, records, &stage_map, args.start.unwrap_or_else(Utc::now))
        .context("replaying session")?;
    cli::print_session_report(&report);

    if args.metrics {
        println!("{}", metrics::gather_text());
    }
    Ok(())
}
