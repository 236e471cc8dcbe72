use std::error::Error;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;
use cutflow_core::errors::{AnaError, ErrorInfo};
use cutflow_core::event::DataOrigin;
use cutflow_engine::builder::{PipelineBuilder, VaryMode};
use cutflow_engine::config::{load_cut_table, CutTable};
use cutflow_engine::histo::ArtifactLayout;
use cutflow_engine::runlog::RunLog;
use cutflow_engine::source::{EventSource, JsonLinesSource, SourceConfig, SyntheticSource};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "cutflow",
    version,
    about = "Run the ordered cut-flow over one event sample"
)]
struct Cli {
    /// Sample name; names the log and every artefact.
    sample: String,
    /// Maximum number of events to read; zero or negative reads everything.
    #[arg(allow_negative_numbers = true)]
    max_events: i64,
    /// 1 for simulation, 0 for recorded data.
    #[arg(value_parser = clap::value_parser!(u8).range(0..=1))]
    is_mc: u8,
    /// Cut-variation token; must mention `met`, `jet` or both.
    token: String,
    /// Output directory for the log and artefacts.
    folder: PathBuf,
    /// JSON-lines event file (defaults to `<sample>.jsonl`).
    #[arg(long, conflicts_with = "synthetic")]
    input: Option<PathBuf>,
    /// Generate events from this seed instead of reading a file.
    #[arg(long, value_name = "SEED")]
    synthetic: Option<u64>,
    /// Number of synthetic events when no cap is given.
    #[arg(long, default_value_t = 1000, requires = "synthetic")]
    events: u64,
    /// YAML cut table overriding the built-in thresholds.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Trace every event and stage verdict.
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            err.print()?;
            std::process::exit(1);
        }
    };
    init_tracing(cli.debug);
    run(cli).map_err(|err| -> Box<dyn Error> {
        tracing::error!(error = %err, "cutflow run failed");
        Box::new(err)
    })
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), AnaError> {
    let mode = VaryMode::from_token(&cli.token)?;
    let origin = DataOrigin::from_flag(cli.is_mc).ok_or_else(|| {
        AnaError::Usage(
            ErrorInfo::new("is_mc_flag", "isMC must be 0 or 1").with_context("value", cli.is_mc),
        )
    })?;
    let table = match &cli.config {
        Some(path) => load_cut_table(path)?,
        None => CutTable::default(),
    };
    let config = SourceConfig::from_cli_cap(cli.sample.as_str(), cli.max_events, origin);
    let mut source = open_source(&cli, config)?;

    std::fs::create_dir_all(&cli.folder).map_err(|err| {
        AnaError::Io(
            ErrorInfo::new("output_dir", err.to_string())
                .with_context("path", cli.folder.display()),
        )
    })?;
    let log = RunLog::create(&cli.folder.join(format!("{}.log", cli.sample)))?;
    let mut manager = PipelineBuilder::new(&table, mode)
        .with_artifacts(ArtifactLayout::new(&cli.folder, cli.sample.as_str()))
        .with_log(log)
        .with_debug(cli.debug)
        .build()?;

    let report = manager.run(source.as_mut())?;
    report.write_json(&cli.folder.join(format!("{}_cutflow.json", cli.sample)))?;
    println!("{}", report.render_table());
    Ok(())
}

fn open_source(cli: &Cli, config: SourceConfig) -> Result<Box<dyn EventSource>, AnaError> {
    if let Some(seed) = cli.synthetic {
        let events = config.max_events.unwrap_or(cli.events);
        return Ok(Box::new(SyntheticSource::new(config, seed, events)));
    }
    let path = cli
        .input
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.jsonl", cli.sample)));
    Ok(Box::new(JsonLinesSource::open(&path, config)?))
}
