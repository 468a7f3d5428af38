use clap::Parser;
use fmcg_planning::config::SweepConfig;
use fmcg_planning::solver::MicroLp;
use fmcg_planning::sweep::{self, Evaluation};
use log::{error, info};
use std::path::PathBuf;

/// Sweep the backorder cost ratio of a production-distribution planning instance and report
/// the average backorder of each optimal plan
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// JSON sweep configuration
    config: PathBuf,
    /// Evaluate these ratios instead of the configured sequence
    #[clap(short, long)]
    ratio: Vec<f64>,
    /// Solve every ratio on its own thread
    #[clap(long)]
    parallel: bool,
    /// Log the non-zero quantities of every plan
    #[clap(long)]
    show_plan: bool,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[clap(short, long, parse(from_occurrences))]
    verbose: usize,
}

fn report(evaluation: &Evaluation, show_plan: bool) {
    if show_plan {
        info!("plan for ratio {} (cost {}):", evaluation.ratio, evaluation.plan.cost);
        for (name, value) in evaluation.plan.nonzero() {
            info!("{}: {}", name, value);
        }
    }
    println!("{},{}", evaluation.ratio, evaluation.average_backorder);
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = SweepConfig::load(&args.config)?;
    let data = config.instance()?;

    let ratios = match args.ratio.is_empty() {
        true => config.ratios.ratios(),
        false => args.ratio,
    };

    let evaluations = sweep::sweep_with::<MicroLp>(
        &data,
        &config.options,
        &ratios,
        args.parallel || config.parallel,
    )?;

    for evaluation in &evaluations {
        report(evaluation, args.show_plan);
    }

    Ok(())
}

pub fn main() {
    let args = Args::parse();

    let level = match args.verbose.max(usize::from(args.show_plan)) {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    if let Err(err) = run(args) {
        error!("{}", err);
        std::process::exit(1);
    }
}
