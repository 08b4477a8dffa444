//! Gesture Dwell CLI
//!
//! Replays recorded `<x> <y>` signals through the dwell detector.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gesture_dwell::{
    config::Config,
    core::{ClusterEvent, ClusterMerger, FrameMeans, MergeConfig, StreamClusterDetector, Strategy},
    source::{Sample, SignalReader, SourceError},
    stats::{create_shared_stats_with_persistence, DetectorStats},
    CancelToken, TraceBuilder, VERSION,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gesture-dwell")]
#[command(version = VERSION)]
#[command(about = "Streaming dwell-point detector for gesture typing", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Use this configuration file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect dwell clusters in a recorded signal
    Detect(DetectArgs),

    /// Show configuration
    Config {
        /// Write the default configuration to the config file
        #[arg(long)]
        init: bool,
    },

    /// Show cumulative statistics
    Stats {
        /// Reset the cumulative counters
        #[arg(long)]
        reset: bool,
    },
}

#[derive(clap::Args)]
struct DetectArgs {
    /// Signal file with one `<x> <y>` pair per line (stdin if omitted)
    #[arg(long, short)]
    input: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Tick measurement strategy (velocity or bearing)
    #[arg(long)]
    strategy: Option<Strategy>,

    /// Lookahead distance in ticks
    #[arg(long)]
    velocity_window: Option<usize>,

    /// Displacement below which a tick counts towards a dwell
    #[arg(long)]
    dx_threshold: Option<f64>,

    /// Displacement that closes a confirmed dwell
    #[arg(long)]
    inner_dx_threshold: Option<f64>,

    /// Consecutive slow ticks required to confirm a dwell
    #[arg(long)]
    trigger_threshold: Option<u32>,

    /// Average non-overlapping frames of this many samples before detection
    #[arg(long)]
    smooth: Option<usize>,

    /// Merge neighbouring clusters closer than this distance
    #[arg(long)]
    merge_separation: Option<f64>,

    /// Write a gesture trace document to this path
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Label stored in the gesture trace (e.g. the intended word)
    #[arg(long)]
    label: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Jsonl,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::load().context("loading configuration")?,
    };

    match cli.command {
        Commands::Detect(args) => cmd_detect(config, args),
        Commands::Config { init } => cmd_config(&config, init, cli.config),
        Commands::Stats { reset } => cmd_stats(&config, reset),
    }
}

fn cmd_detect(mut config: Config, args: DetectArgs) -> Result<()> {
    apply_overrides(&mut config, &args);

    let mut detector = StreamClusterDetector::new(config.detector.clone())
        .context("invalid detector parameters")?;
    let stats = create_shared_stats_with_persistence(config.stats_path());

    let cancel = CancelToken::new();
    let token = cancel.clone();
    ctrlc::set_handler(move || token.cancel()).context("installing Ctrl+C handler")?;

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    info!(
        velocity_window = config.detector.velocity_window,
        dx_threshold = config.detector.dx_threshold,
        inner_dx_threshold = config.detector.inner_dx_threshold,
        trigger_threshold = config.detector.trigger_threshold,
        strategy = ?config.detector.strategy,
        "starting detection"
    );

    let mut sink = ClusterSink::new(args.format, config.merge.clone());
    let mut read_error: Option<SourceError> = None;
    {
        let samples = SignalReader::new(reader)
            .map_while(|result| match result {
                Ok(sample) => Some(Some(sample)),
                Err(e @ SourceError::Malformed { .. }) => {
                    warn!("skipping input: {e}");
                    Some(None)
                }
                Err(e) => {
                    read_error = Some(e);
                    None
                }
            })
            .flatten();
        let samples: Box<dyn Iterator<Item = Sample> + '_> = match config.smoothing() {
            Some(frame) => Box::new(samples.frame_means(frame)),
            None => Box::new(samples),
        };

        for sample in samples {
            if cancel.is_cancelled() {
                break;
            }
            stats.record_sample();
            if let Some(event) = detector.feed(sample)? {
                sink.push(event)?;
            }
        }
    }

    if let Some(e) = read_error {
        return Err(e).context("reading samples");
    }

    if cancel.is_cancelled() {
        if detector.cancel() {
            stats.record_discarded_dwell();
        }
        warn!(
            samples = detector.samples_seen(),
            "detection cancelled, in-progress dwell discarded"
        );
    } else {
        if let Some(event) = detector.finish()? {
            sink.push(event)?;
        }
        stats.record_stream_completed();
    }
    sink.finish()?;

    let merges = sink.merges();
    stats.record_merges(merges);
    stats.record_clusters(sink.clusters.len() as u64);

    if args.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&sink.clusters)?);
    }

    if let Some(path) = &args.trace {
        let builder = match &args.label {
            Some(label) => TraceBuilder::new().with_label(label.clone()),
            None => TraceBuilder::new(),
        };
        let json = builder.build_json(
            &config.detector,
            config.merge.as_ref(),
            detector.samples_seen(),
            sink.clusters.clone(),
        )?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!("wrote gesture trace to {}", path.display());
    }

    info!(
        samples = detector.samples_seen(),
        clusters = sink.clusters.len(),
        merges,
        "detection complete"
    );

    if let Err(e) = stats.save() {
        warn!("Could not save detector stats: {e}");
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, args: &DetectArgs) {
    if let Some(strategy) = args.strategy {
        config.detector.strategy = strategy;
    }
    if let Some(window) = args.velocity_window {
        config.detector.velocity_window = window;
    }
    if let Some(dx) = args.dx_threshold {
        config.detector.dx_threshold = dx;
    }
    if let Some(inner) = args.inner_dx_threshold {
        config.detector.inner_dx_threshold = inner;
    }
    if let Some(trigger) = args.trigger_threshold {
        config.detector.trigger_threshold = trigger;
    }
    if let Some(frame) = args.smooth {
        config.smoothing_frame = frame;
    }
    if let Some(separation) = args.merge_separation {
        config.merge = Some(MergeConfig::new(separation));
    }
}

/// Routes clusters through the optional merger to the output.
struct ClusterSink {
    format: OutputFormat,
    merger: Option<ClusterMerger>,
    clusters: Vec<ClusterEvent>,
}

impl ClusterSink {
    fn new(format: OutputFormat, merge: Option<MergeConfig>) -> Self {
        Self {
            format,
            merger: merge.map(ClusterMerger::new),
            clusters: Vec::new(),
        }
    }

    fn push(&mut self, event: ClusterEvent) -> Result<()> {
        match self.merger.as_mut() {
            Some(merger) => match merger.push(event) {
                Some(ready) => self.emit(ready),
                None => Ok(()),
            },
            None => self.emit(event),
        }
    }

    fn finish(&mut self) -> Result<()> {
        match self.merger.as_mut().and_then(ClusterMerger::finish) {
            Some(ready) => self.emit(ready),
            None => Ok(()),
        }
    }

    fn merges(&self) -> u64 {
        self.merger.as_ref().map_or(0, ClusterMerger::merges)
    }

    fn emit(&mut self, event: ClusterEvent) -> Result<()> {
        debug!(index = self.clusters.len(), "cluster ready");
        match self.format {
            OutputFormat::Text => println!(
                "[{}] ({:.2}, {:.2})  ticks {}..{}  ({} samples)",
                self.clusters.len() + 1,
                event.mean_x,
                event.mean_y,
                event.start_tick,
                event.end_tick,
                event.sample_count
            ),
            OutputFormat::Jsonl => println!("{}", serde_json::to_string(&event)?),
            OutputFormat::Json => {}
        }
        self.clusters.push(event);
        Ok(())
    }
}

fn cmd_config(config: &Config, init: bool, explicit_path: Option<PathBuf>) -> Result<()> {
    let path = explicit_path.unwrap_or_else(Config::config_path);

    if init {
        let defaults = Config::default();
        defaults
            .save_to(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        defaults
            .ensure_directories()
            .context("creating data directories")?;
        println!("Wrote default configuration to {path:?}");
        return Ok(());
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {path:?}");
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn cmd_stats(config: &Config, reset: bool) -> Result<()> {
    let path = config.stats_path();
    if !path.exists() && !reset {
        println!("No previous detection data found.");
        println!("Run 'gesture-dwell detect' to process a signal.");
        return Ok(());
    }

    let stats = DetectorStats::with_persistence(path);
    if reset {
        stats.reset();
        stats.save().context("saving statistics")?;
        println!("Statistics reset.");
        return Ok(());
    }

    let snapshot = stats.stats();
    println!("Cumulative Statistics:");
    println!("  Samples processed: {}", snapshot.samples_processed);
    println!("  Clusters emitted: {}", snapshot.clusters_emitted);
    println!("  Clusters merged: {}", snapshot.clusters_merged);
    println!(
        "  Partial dwells discarded: {}",
        snapshot.partial_dwells_discarded
    );
    println!("  Streams completed: {}", snapshot.streams_completed);
    Ok(())
}
