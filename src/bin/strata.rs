use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "strata", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the z-order verification harness.
    Run(RunArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Number of full population/verification/teardown cycles. A negative
    /// value falls back to a small fixed count.
    #[arg(long, allow_negative_numbers = true, default_value_t = strata::harness::DEFAULT_ITERATIONS as i64)]
    iterations: i64,

    /// Determinism seed for the per-surface visibility coin flips.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Worker deployment mode.
    #[arg(long, value_enum, default_value_t = ModeChoice::Threaded)]
    mode: ModeChoice,

    /// Grace period, in milliseconds, for straggling workers.
    #[arg(long, default_value_t = 5000)]
    grace_ms: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeChoice {
    Threaded,
    Process,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
    }
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let iterations = if args.iterations < 0 {
        strata::harness::FALLBACK_ITERATIONS
    } else {
        args.iterations as u32
    };

    let config = strata::HarnessConfig {
        mode: match args.mode {
            ModeChoice::Threaded => strata::SpawnMode::Threaded,
            ModeChoice::Process => strata::SpawnMode::Process,
        },
        iterations,
        seed: args.seed,
        grace: Duration::from_millis(args.grace_ms),
        ..strata::HarnessConfig::default()
    };

    let catalog = strata::Catalog::default();
    let compositor: Arc<dyn strata::Compositor> = Arc::new(strata::SimCompositor::new(&catalog));

    let reports =
        strata::harness::run(&config, &catalog, compositor).context("run the harness")?;

    let mut failed = 0usize;
    for (i, report) in reports.iter().enumerate() {
        eprintln!(
            "iteration {i}: created {} released {} {}",
            report.total_created,
            report.released,
            if report.passed() { "ok" } else { "FAILED" },
        );
        if !report.passed() {
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} iteration(s) failed verification", reports.len());
    }
    eprintln!("all {} iteration(s) passed", reports.len());
    Ok(())
}
