use clap::Parser;

/// This is a Schulze (beatpath) election tabulation program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The file containing the election description in JSON format.
    /// For more information about the file format, read the documentation of the schulze_voting crate.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference file containing the outcome of an election in JSON format. If provided, beatpath will
    /// check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the election will be written in JSON format to the given
    /// location. Setting this option overrides the output directory that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) The input data: ballots or a pairwise tally. Used when no --config is given.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv) The type of the input: csv, tally_csv or tally_json.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (list of comma-separated values or not specified) The names of the candidates, in order. For ballots,
    /// any other name is rejected. For a tally, the names replace the indices or the header.
    #[clap(long, value_parser, value_delimiter = ',')]
    pub candidates: Option<Vec<String>>,

    /// (default unresolved) How to order tied candidates: unresolved, useCandidateOrder or random.
    #[clap(long, value_parser)]
    pub tiebreak: Option<String>,

    /// The seed for the random tiebreak mode.
    #[clap(long, value_parser)]
    pub random_seed: Option<String>,

    /// (default winningVotes) The strength of a defeat: winningVotes or margin.
    #[clap(long, value_parser)]
    pub defeat_measure: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
