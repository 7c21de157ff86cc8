use clap::Parser;
use log::info;
use std::path::PathBuf;
use stockflow::prelude::*;

/// Fit the streamflow coefficient of a linear reservoir to observed daily data.
#[derive(Debug, Parser)]
#[command(name = "leaf_river", version)]
struct Args {
    /// Whitespace separated table of precipitation, PET and streamflow.
    data: PathBuf,
    /// Header rows to skip.
    #[arg(long, default_value_t = 2)]
    skip_rows: usize,
    /// First day of the window.
    #[arg(long, default_value_t = 0)]
    start: usize,
    /// Day after the last day of the window.
    #[arg(long, default_value_t = 365)]
    end: usize,
    /// Number of coefficients, k = (i + 1) / members.
    #[arg(long, default_value_t = 8)]
    members: usize,
    /// Draw this many coefficients at random from [k_min, k_max) instead.
    #[arg(long)]
    sample: Option<usize>,
    /// Lower bound for sampled coefficients.
    #[arg(long, default_value_t = 0.01)]
    k_min: f64,
    /// Upper bound for sampled coefficients.
    #[arg(long, default_value_t = 1.0)]
    k_max: f64,
    /// Seed for sampled coefficients.
    #[arg(long, default_value_t = 1004)]
    seed: u64,
    /// Step the model discretely instead of integrating it.
    #[arg(long)]
    discrete: bool,
    /// Write every fit to this csv file.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Draw the best-fitting hydrograph to this png file.
    #[arg(long)]
    plot: Option<PathBuf>,
}

fn main() -> Result<(), SimError> {
    pretty_env_logger::init();
    let args = Args::parse();

    let opts = ReadOptions::new()
        .skip_rows(args.skip_rows)
        .rows(args.start..args.end);
    let forcing = Forcing::read(&args.data, &opts)?;
    let time = utils::arange(0.0, forcing.len() as f64, 1.0);

    let mode = if args.discrete {
        Mode::Discrete
    } else {
        Mode::default()
    };
    let config = Sweep::new(forcing.clone()).time(time.clone()).mode(mode);
    let config = match args.sample {
        Some(n) => config.sample(args.k_min..args.k_max, n, args.seed)?,
        None => config.members(args.members),
    };
    let trials = config.run()?;

    if let Some(path) = &args.output {
        utils::record(&sweep::fits(&trials), path)?;
        info!("Wrote {} fits to {}", trials.len(), path.display());
    }

    if let (Some(best), Some(worst)) = (sweep::best(&trials), sweep::worst(&trials)) {
        println!("best k = {}", best.fit.coefficient);
        println!("best rmse = {}", best.fit.rmse);
        println!("worst k = {}", worst.fit.coefficient);
        println!("worst rmse = {}", worst.fit.rmse);
        if let Some(path) = &args.plot {
            plot::hydrograph(&time, forcing.streamflow(), &best.streamflow, path)?;
        }
    }

    Ok(())
}
