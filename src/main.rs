use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

use modular_snn::config::{NetworkConfig, RateConfig, WindowAlignment};
use modular_snn::error::SNNError;
use modular_snn::persist::load_or_run_trials;
use modular_snn::trial::{random_probabilities, run_trials, TrialSettings};

#[derive(Parser, Debug)]
struct Args {
    /// The seed used for network sampling, rewiring and simulation
    #[arg(long, default_value = "0")]
    seed: u64,
    /// The number of independent trials
    #[arg(short = 'n', long, default_value = "8")]
    trials: usize,
    /// The rewiring probability, drawn uniformly for each trial if not provided
    #[arg(short = 'p', long)]
    p: Option<f64>,
    /// The simulation duration (ms)
    #[arg(short = 'T', long, default_value = "1000")]
    duration: usize,
    /// The mean number of Poisson events per neuron and per ms
    #[arg(long, default_value = "0.01")]
    rate: f64,
    /// The initial transient discarded before computing firing rates (ms)
    #[arg(long, default_value = "0")]
    warmup: usize,
    /// Center the averaging windows on the sample points
    #[arg(long)]
    centered: bool,
    /// A JSON file with the network configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// The directory where the firing-rate series are saved
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
    /// A file receiving the logs instead of the console
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<(), SNNError> {
    let encoder = Box::new(PatternEncoder::new("{d(%H:%M:%S)} {l} - {m}\n"));
    let appender = match log_file {
        Some(path) => Appender::builder().build(
            "logfile",
            Box::new(
                FileAppender::builder()
                    .encoder(encoder)
                    .build(path)
                    .map_err(|e| SNNError::IOError(e.to_string()))?,
            ),
        ),
        None => Appender::builder().build(
            "console",
            Box::new(ConsoleAppender::builder().encoder(encoder).build()),
        ),
    };
    let name = appender.name().to_string();

    let config = Config::builder()
        .appender(appender)
        .build(Root::builder().appender(name).build(LevelFilter::Info))
        .map_err(|e| SNNError::IOError(e.to_string()))?;

    log4rs::init_config(config).map_err(|e| SNNError::IOError(e.to_string()))?;
    Ok(())
}

fn main() -> Result<(), SNNError> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;
    log::info!("{:?}", args);

    let config = match &args.config {
        Some(path) => NetworkConfig::from_json_file(path)?,
        None => NetworkConfig::default(),
    };
    let settings = TrialSettings {
        duration: args.duration,
        rate: args.rate,
        rate_config: RateConfig {
            warmup: args.warmup,
            alignment: if args.centered {
                WindowAlignment::Centered
            } else {
                WindowAlignment::Trailing
            },
            ..Default::default()
        },
        ..Default::default()
    };

    let ps = match args.p {
        Some(p) => vec![p; args.trials],
        None => random_probabilities(args.trials, &mut ChaCha8Rng::seed_from_u64(args.seed)),
    };
    let sweep = match &args.output {
        Some(dir) => load_or_run_trials(dir, &ps, &config, &settings, args.seed)?,
        None => run_trials(&ps, &config, &settings, args.seed)?,
    };

    for failure in sweep.failures.iter() {
        log::warn!(
            "Trial {} (p = {:.3}) skipped after {} runs: {}",
            failure.index,
            failure.p,
            failure.attempts,
            failure.error
        );
    }
    for result in sweep.results.iter() {
        log::info!(
            "p = {:.3}: mean module firing rate {:.4}",
            result.p,
            result.mean_rate()
        );
    }
    Ok(())
}
