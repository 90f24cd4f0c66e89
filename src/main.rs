use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use balanced_staging::core::dataset::collect_stats;
use balanced_staging::logging::{default_log_dir, setup_logging};
use balanced_staging::report::report;
use balanced_staging::{plan, run_training, CommandTrainer, PipelineConfig, StagingResult};

/// Balance a class-per-directory dataset and stage it for training.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    overrides: ConfigArgs,

    /// Directory for the log file. Defaults to the platform data directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Only log to stdout.
    #[arg(long, global = true, default_value_t = false)]
    no_log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report per-class counts of the source tree.
    Stats,
    /// Report the balanced and split sizes without copying anything.
    Plan,
    /// Stage the dataset, run a training command against it, then clean up.
    Run {
        /// Training program followed by its arguments.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        train_command: Vec<String>,
    },
}

/// Flags that override fields of the JSON config.
#[derive(Args, Debug, Default)]
struct ConfigArgs {
    /// JSON config file. Flags below take precedence over it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory with one subdirectory per class.
    #[arg(long, global = true)]
    source_root: Option<PathBuf>,
    /// Comma separated class labels.
    #[arg(long, global = true, value_delimiter = ',')]
    classes: Option<Vec<String>>,
    /// Fraction of each class used for validation.
    #[arg(long, global = true)]
    validation_proportion: Option<f64>,
    /// Seed for the validation sampler.
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Number of copy threads.
    #[arg(long, global = true)]
    workers: Option<usize>,
    /// Where to create the staging directories.
    #[arg(long, global = true)]
    staging_dir: Option<PathBuf>,
}

impl ConfigArgs {
    fn resolve(self) -> StagingResult<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(root) = self.source_root {
            config.source_root = root;
        }
        if let Some(classes) = self.classes {
            config.classes = classes;
        }
        if let Some(proportion) = self.validation_proportion {
            config.validation_proportion = proportion;
        }
        if self.seed.is_some() {
            config.random_seed = self.seed;
        }
        if let Some(workers) = self.workers {
            config.copy_workers = workers;
        }
        if self.staging_dir.is_some() {
            config.staging_dir = self.staging_dir;
        }
        config.validate()?;
        Ok(config)
    }
}

fn execute(command: Command, config: &PipelineConfig) -> StagingResult<()> {
    match command {
        Command::Stats => {
            let stats = collect_stats(&config.classes, &config.source_root)?;
            report("Input data stats:", &stats);
        }
        Command::Plan => {
            let plan = plan(config)?;
            info!(
                "Balanced size {} per class: {} train / {} validation (seed {})",
                plan.target_size,
                plan.train_per_class(),
                plan.validation_per_class(),
                plan.seed
            );
        }
        Command::Run { train_command } => {
            let mut parts = train_command.into_iter();
            let program = parts.next().unwrap_or_default();
            let mut trainer = CommandTrainer::new(program, parts.collect());
            let model_path = run_training(config, &mut trainer)?;
            info!("Model artifact: {:?}", model_path);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_dir = if cli.no_log_file {
        None
    } else {
        cli.log_dir.clone().or_else(default_log_dir)
    };
    if let Err(e) = setup_logging(log_dir.as_deref()) {
        eprintln!("Failed to set up logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Starting balanced-staging");

    let result = cli
        .overrides
        .resolve()
        .and_then(|config| execute(cli.command, &config));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
