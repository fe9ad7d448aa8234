mod args;
mod election;

use clap::Parser;
use log::{debug, warn};

use crate::args::Args;
use crate::election::config_reader::ConfigRules;
use crate::election::*;

fn run(args: &Args) -> ElectionResult<()> {
    if let Some(config_path) = args.config.clone() {
        return run_election_file(config_path, args.out.clone(), args.reference.clone());
    }

    let input = match args.input.as_ref() {
        Some(input) => input,
        None => {
            snafu::whatever!("Either --config or --input must be provided")
        }
    };
    let rules = ConfigRules {
        tiebreak_mode: args.tiebreak.clone(),
        random_seed: args.random_seed.clone(),
        defeat_measure: args.defeat_measure.clone(),
    };
    let input_type = args.input_type.clone().unwrap_or_else(|| "csv".to_string());
    let config = config_from_input(input, &input_type, args.candidates.clone(), rules)?;
    run_election(&config, "", args.out.clone(), args.reference.clone())
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    debug!("args: {:?}", args);

    if let Err(e) = run(&args) {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        std::process::exit(1);
    }
}
