mod challenges;
pub mod config_reader;
mod generator;
mod io_common;
mod io_csv;
mod report;

use log::{debug, info, warn};

use quota_rcv::builder::Builder;
use quota_rcv::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::sim::challenges::annotate_challenges;
use crate::sim::config_reader::*;
use crate::sim::generator::RandomBallots;
use crate::sim::io_csv::CsvBallots;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SimError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a number"))]
    ParsingJsonNumber {},
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("CSV line {lineno} is too short"))]
    CsvLineToShort { lineno: usize },
    #[snafu(display("Ballot {id} was rejected"))]
    Ingestion {
        source: TabulationError,
        id: String,
    },
    #[snafu(display("Invalid candidate weights"))]
    Generator {
        source: rand::distributions::WeightedError,
    },
    #[snafu(display("Tabulation failed"))]
    Tabulation { source: TabulationError },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Difference detected between calculated summary and reference summary"))]
    ReferenceMismatch {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SimResult<T> = Result<T, SimError>;

/// Anything that can produce a ballot table for the tabulator.
pub trait BallotSource {
    fn read_ballots(&mut self) -> SimResult<BallotTable>;
}

/// A ballot, as parsed by the readers.
/// This is before checking the candidate names and the ranking rules.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedBallot {
    pub id: Option<String>,
    pub choices: Vec<String>,
}

// Empty cells are unranked. Trailing blanks beyond the number of candidates
// are ignored, missing trailing positions are unranked.
fn validate_ballots(
    parsed_ballots: &[ParsedBallot],
    candidates: Option<&[String]>,
) -> SimResult<BallotTable> {
    let candidate_names: Vec<String> = match candidates {
        Some(cs) if !cs.is_empty() => cs.to_vec(),
        _ => {
            let mut seen: Vec<String> = parsed_ballots
                .iter()
                .flat_map(|pb| pb.choices.iter())
                .filter(|s| !s.is_empty())
                .cloned()
                .collect();
            seen.sort();
            seen.dedup();
            info!("validate_ballots: inferred candidates {:?}", seen);
            seen
        }
    };
    let width = candidate_names.len();
    let mut builder = Builder::new()
        .candidates(&candidate_names)
        .context(TabulationSnafu {})?;

    for (idx, pb) in parsed_ballots.iter().enumerate() {
        let mut choices: Vec<BallotChoice> = pb
            .choices
            .iter()
            .map(|s| match s.as_str() {
                "" => BallotChoice::Unranked,
                c => BallotChoice::Candidate(c.to_string()),
            })
            .collect();
        while choices.len() > width && choices.last().map_or(false, |c| c.is_unranked()) {
            choices.pop();
        }
        while choices.len() < width {
            choices.push(BallotChoice::Unranked);
        }
        debug!("Choices for ballot {:?}: {:?}", pb.id, choices);
        let id = pb.id.clone().unwrap_or_else(|| format!("#{}", idx + 1));
        builder
            .add_vote(&Vote { choices })
            .context(IngestionSnafu { id })?;
    }
    Ok(builder.build())
}

fn result_stats_to_json(rs: &ElectionResult) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for round_stat in rs.rounds.iter() {
        let mut tally: JSMap<String, JSValue> = JSMap::new();
        for (name, count) in round_stat.tally.iter() {
            tally.insert(name.clone(), json!(count.to_string()));
        }

        let transfers_of = |name: &String| -> JSMap<String, JSValue> {
            let mut transfers: JSMap<String, JSValue> = JSMap::new();
            if let Some(ts) = round_stat.transfers.iter().find(|ts| ts.name == *name) {
                for (to, count) in ts.transfers.iter() {
                    transfers.insert(to.clone(), json!(count.to_string()));
                }
                if ts.exhausted > 0 {
                    transfers.insert("exhausted".to_string(), json!(ts.exhausted.to_string()));
                }
            }
            transfers
        };

        let mut tally_results: Vec<JSValue> = Vec::new();
        for name in round_stat.eliminated.iter() {
            tally_results.push(json!({
                "eliminated": name,
                "transfers": transfers_of(name)
            }));
        }
        for name in round_stat.elected.iter() {
            tally_results.push(json!({
                "elected": name,
                "transfers": transfers_of(name)
            }));
        }

        let js = json!({"round": round_stat.round, "tally": tally, "tallyResults": tally_results});
        l.push(js);
    }
    l
}

fn build_summary_js(config: &SimConfig, table: &BallotTable, rv: &ElectionResult) -> JSValue {
    let c = OutputConfig {
        contest: config.output_settings.contest_name.clone(),
        date: config.output_settings.contest_date.clone(),
        jurisdiction: config.output_settings.contest_juridiction.clone(),
        office: config.output_settings.contest_office.clone(),
        threshold: Some(rv.final_threshold().to_string()),
        ballot_digest: table.digest(),
    };
    json!({
        "config": c,
        "winners": rv.winners,
        "results": result_stats_to_json(rv) })
}

// The command line takes precedence over the configuration file.
fn resolve_config(args: &Args) -> SimResult<(SimConfig, PathBuf)> {
    let (mut config, root) = match args.config.as_deref() {
        Some(path) => {
            let config = read_config(path)?;
            let root = Path::new(path)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default();
            (config, root)
        }
        None => (SimConfig::default_simulation(), PathBuf::new()),
    };

    // A file given on the command line is relative to the working directory.
    let root = if let Some(input) = args.input.clone() {
        config.ballot_source.file_path = Some(input);
        config.ballot_source.provider = "csv".to_string();
        PathBuf::new()
    } else {
        root
    };
    if let Some(input_type) = args.input_type.clone() {
        config.ballot_source.provider = input_type;
    }
    if let Some(names) = args.candidates.clone() {
        config.candidates = names
            .into_iter()
            .map(|name| SimCandidate {
                name,
                popularity: None,
            })
            .collect();
    }
    if let Some(n) = args.num_ballots {
        config.ballot_source.num_ballots = Some(n);
    }
    if let Some(seed) = args.seed {
        config.ballot_source.seed = Some(seed);
    }
    if let Some(winners) = args.winners {
        config.rules.number_of_winners = winners;
    }
    if config.candidates.is_empty() && config.ballot_source.provider == "random" {
        let n = args.num_candidates.unwrap_or(DEFAULT_NUM_CANDIDATES);
        config.candidates = generator::default_candidate_names(n)?
            .into_iter()
            .map(|name| SimCandidate {
                name,
                popularity: None,
            })
            .collect();
    }
    Ok((config, root))
}

fn make_source(config: &SimConfig, root: &Path) -> SimResult<Box<dyn BallotSource>> {
    let bs = &config.ballot_source;
    match bs.provider.as_str() {
        "random" => Ok(Box::new(RandomBallots::from_config(config)?)),
        "csv" => {
            let file_path = match bs.file_path.clone() {
                Some(p) => p,
                None => whatever!("The csv provider requires a file path"),
            };
            let p: PathBuf = root.join(file_path);
            let candidates: Vec<String> = config.candidates.iter().map(|c| c.name.clone()).collect();
            Ok(Box::new(CsvBallots::new(
                p.as_path().display().to_string(),
                bs.clone(),
                candidates,
            )))
        }
        x => whatever!("Provider not implemented {:?}", x),
    }
}

fn write_summary(out: &str, pretty_js_stats: &str) -> SimResult<()> {
    if out == "stdout" {
        println!("{}", pretty_js_stats);
        return Ok(());
    }
    info!("Writing summary to {}", out);
    fs::write(out, pretty_js_stats).context(WritingSummarySnafu { path: out })
}

pub fn run_simulation(args: &Args) -> SimResult<ElectionResult> {
    let (config, root) = resolve_config(args)?;
    info!("config: {:?}", config);

    let rules = validate_rules(&config.rules)?;

    let mut source = make_source(&config, &root)?;
    let table = source.read_ballots()?;
    report::log_line(&format!("{} ballots received.", report::thousands(table.len())));

    // The challenges only decorate the ballots and never reach the tabulation.
    if args.show_ballots {
        let mut rng = match config.ballot_source.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        let annotations = annotate_challenges(table.len(), config.percent_challenged(), &mut rng);
        print!("{}", report::format_ballots(&table, &annotations));
    }

    let result = run_tabulation(&table, &rules).context(TabulationSnafu {})?;

    print!("{}", report::format_rounds(&result));
    report::log_line(&format!(
        "Election analyzed in {} iterations.",
        result.num_rounds()
    ));
    report::log_line(&format!("Winner(s): {}", result.winners.join(", ")));

    // Assemble the final json
    let result_js = build_summary_js(&config, &table, &result);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    let out = args.out.clone().or_else(|| {
        config
            .output_settings
            .output_directory
            .as_ref()
            .map(|dir| root.join(dir).join("summary.json").display().to_string())
    });
    if let Some(out) = out {
        write_summary(&out, &pretty_js_stats)?;
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = args.reference.as_deref() {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            return ReferenceMismatchSnafu {}.fail();
        }
    }

    Ok(result)
}
