//! ORB Lab CLI — engine runs and walk-forward validation.
//!
//! Commands:
//! - `run` — simulate the configured candidate over every session
//! - `validate` — three-stage walk-forward validation of the configured grid
//! - `presets` — list built-in instrument presets
//!
//! Logging goes to stderr through `tracing`; set `RUST_LOG` to adjust.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use orblab_core::domain::InstrumentSpec;
use orblab_runner::{
    execute, CandidateTrades, CsvBarFeed, DateRange, FileSink, ResultSink, RunConfig,
    RunMode, RunOutput, RunRequest, ValidationReport,
};

#[derive(Parser)]
#[command(name = "orblab", about = "ORB Lab — opening-range-breakout backtester and validator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Path to a TOML run config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Instrument preset with default strategy, grid and validator (e.g. ES).
    #[arg(long)]
    preset: Option<String>,

    /// Bar CSV file, or a directory holding `<SYMBOL>.csv`.
    #[arg(long)]
    bars: PathBuf,

    /// First session date (YYYY-MM-DD). Overrides the config.
    #[arg(long)]
    start: Option<String>,

    /// Last session date (YYYY-MM-DD). Overrides the config.
    #[arg(long)]
    end: Option<String>,

    /// Output directory; artifacts land in a per-run subdirectory.
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate the configured candidate over every session.
    Run(RunArgs),
    /// Walk-forward validation of the configured parameter grid.
    Validate(RunArgs),
    /// List built-in instrument presets.
    Presets,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run_cmd(&args, RunMode::Engine),
        Commands::Validate(args) => run_cmd(&args, RunMode::Validate),
        Commands::Presets => {
            print_presets();
            Ok(())
        }
    }
}

fn load_config(args: &RunArgs) -> Result<RunConfig> {
    let mut config = match (&args.config, &args.preset) {
        (Some(_), Some(_)) => bail!("--config and --preset are mutually exclusive"),
        (None, None) => bail!("one of --config or --preset is required"),
        (Some(path), None) => RunConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        (None, Some(symbol)) => RunConfig::for_preset(&symbol.to_ascii_uppercase()),
    };

    if args.start.is_some() || args.end.is_some() {
        let current = config.date_range.unwrap_or_else(DateRange::unbounded);
        let start = parse_date(args.start.as_deref())?.unwrap_or(current.start);
        let end = parse_date(args.end.as_deref())?.unwrap_or(current.end);
        config.date_range = Some(DateRange::new(start, end));
    }
    config.validate()?;
    Ok(config)
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("bad date '{s}'")))
        .transpose()
}

fn bar_feed(path: &Path) -> CsvBarFeed {
    if path.is_dir() {
        CsvBarFeed::from_dir(path)
    } else {
        CsvBarFeed::from_file(path)
    }
}

fn run_cmd(args: &RunArgs, mode: RunMode) -> Result<()> {
    let config = load_config(args)?;
    let run_id = config.run_id();
    let request = RunRequest::from_config(&config, mode)?;
    let feed = bar_feed(&args.bars);
    tracing::info!(%run_id, bars = %args.bars.display(), "starting {} run", mode_name(mode));

    let output = execute(&feed, &request)
        .with_context(|| format!("{} run for {}", mode_name(mode), config.symbol))?;

    let run_dir = args.output_dir.join(&run_id[..12]);
    let sink = FileSink::new(&run_dir)?;
    match output {
        RunOutput::Trades(batches) => {
            print_trades_summary(&config, &batches);
            sink.write_trades(&batches)?;
        }
        RunOutput::Verdict(report) => {
            print_verdict(&config, &report);
            sink.write_aggregates(&report.aggregates())?;
            sink.write_verdict(&report)?;
        }
    }
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn mode_name(mode: RunMode) -> &'static str {
    match mode {
        RunMode::Engine => "engine",
        RunMode::Validate => "validation",
    }
}

fn print_presets() {
    println!("{:<6} {:>9} {:>10} {:>11} {:>10}", "symbol", "tick", "tick $", "point $", "friction $");
    for symbol in InstrumentSpec::preset_symbols() {
        if let Ok(spec) = InstrumentSpec::preset(symbol) {
            println!(
                "{:<6} {:>9.2} {:>10.2} {:>11.2} {:>10.2}",
                spec.symbol,
                spec.tick_size,
                spec.tick_value,
                spec.point_value,
                spec.total_friction()
            );
        }
    }
}

fn print_trades_summary(config: &RunConfig, batches: &[CandidateTrades]) {
    println!();
    println!("=== Engine Run: {} ===", config.symbol);
    println!("Execution:      {}", config.strategy.execution_mode.name());
    println!("Confirm bars:   {}", config.strategy.confirm_bars);
    for batch in batches {
        let s = &batch.stats;
        println!();
        println!("--- {} ---", batch.candidate.label());
        println!("Sessions:       {}", s.sessions);
        println!("Trades:         {} ({} wins, {} losses)", s.sample_size, s.wins, s.losses);
        println!("Win Rate:       {:.1}%", s.win_rate * 100.0);
        println!("Expectancy:     {:+.3}R", s.expectancy_r);
        println!("Total:          {:+.2}R", s.total_r);
        println!(
            "No signal/fill: {} / {}",
            s.no_signal, s.no_fill
        );
        println!(
            "Skipped:        {} ({} cost gate)",
            s.skipped, s.cost_gated
        );
        println!("Unresolved:     {}", s.unresolved);
    }
}

fn print_verdict(config: &RunConfig, report: &ValidationReport) {
    let v = &report.verdict;
    let split = &report.split;
    println!();
    println!("=== Walk-Forward Validation: {} ===", config.symbol);
    println!("Train:          {} to {}", split.train.start, split.train.end);
    println!("Validation:     {} to {}", split.validation.start, split.validation.end);
    println!("Test:           {} to {}", split.test.start, split.test.end);
    println!();
    println!(
        "Stage 1:        {} ({} trades, {:+.3}R)",
        pass_label(Some(v.stage1_pass)),
        report.stage1.sample_size,
        report.stage1.expectancy_r
    );
    if let Some(selected) = &report.selected {
        println!(
            "Stage 2:        {} ({} trades, {:+.3}R on train)",
            selected.candidate.label(),
            selected.stats.sample_size,
            selected.stats.expectancy_r
        );
    }
    if let Some(test) = v.stage3_test_expectancy {
        println!("Stage 3:        {test:+.3}R on test");
    }
    if let Some(d) = v.degradation_pct {
        println!("Degradation:    {d:.1}%");
    }
    if v.stress_pass.is_some() {
        println!("Stress:         {}", pass_label(v.stress_pass));
    }
    if let Some(c) = v.control_comparison_result {
        println!(
            "Control:        {} (win rate {:.1}% vs {:.1}%, {:+.3}R vs {:+.3}R)",
            pass_label(Some(c.passed)),
            c.candidate_win_rate * 100.0,
            c.control_win_rate * 100.0,
            c.candidate_expectancy_r,
            c.control_expectancy_r
        );
    }
    println!();
    println!("Verdict:        {}", if v.passed { "PASS" } else { "FAIL" });
    for failure in &v.gate_failures {
        println!("  {}: {}", failure.gate(), failure.reason());
    }
}

fn pass_label(passed: Option<bool>) -> &'static str {
    match passed {
        Some(true) => "pass",
        Some(false) => "fail",
        None => "-",
    }
}
