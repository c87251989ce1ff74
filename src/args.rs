use clap::Parser;

/// Simulates (or tabulates) a multi-winner ranked-choice election.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the election. Without it, a default
    /// simulation is run over random ballots. See the `manual` module of quota_rcv for the format.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference file containing the outcome of an election in JSON format. If provided, rcvsim will
    /// check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the election will be written in JSON format to the given
    /// location. Setting this option overrides the output directory that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, the ballots are read from this CSV file instead of being generated.
    /// Setting this option overrides the ballot source of the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (random or csv) The type of the ballot source.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (list of comma-separated values or not specified) The names of the candidates. When reading a CSV file
    /// without candidates, they are inferred from the labels in the file.
    #[clap(long, value_parser, value_delimiter = ',')]
    pub candidates: Option<Vec<String>>,

    /// (default 8) The number of simulated candidates when no names are given.
    #[clap(long, value_parser)]
    pub num_candidates: Option<usize>,

    /// (default 10000) The number of simulated ballots.
    #[clap(long, value_parser)]
    pub num_ballots: Option<u64>,

    /// (default 1) The number of seats to fill.
    #[clap(short, long, value_parser)]
    pub winners: Option<u32>,

    /// Seed for the simulated ballots. Runs with the same seed produce the same ballots.
    #[clap(long, value_parser)]
    pub seed: Option<u64>,

    /// If passed as an argument, prints every ballot with its challenge annotations.
    #[clap(long, takes_value = false)]
    pub show_ballots: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
