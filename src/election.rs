use log::{debug, info, warn};

use schulze_voting::builder::Builder;
use schulze_voting::*;
use snafu::{prelude::*, Snafu};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

pub mod config_reader;
pub mod io_csv;

use crate::election::config_reader::*;

#[derive(Debug, Snafu)]
pub enum ElectionError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a positive index, found {value}"))]
    ParsingJsonNumber { value: String },
    #[snafu(display("Error reading CSV line: {source}"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Line {lineno} is too short"))]
    CsvLineTooShort { lineno: usize },
    #[snafu(display("Line {lineno}: could not read the count {value:?}"))]
    CsvCount { lineno: usize, value: String },
    #[snafu(display("Line {lineno}, column {column}: {value:?} is not a number"))]
    CsvTallyEntry {
        lineno: usize,
        column: usize,
        value: String,
    },
    #[snafu(display("The CSV file is empty"))]
    CsvEmpty {},
    #[snafu(display("Missing parent directory for {path}"))]
    MissingParentDir { path: String },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Tabulation failed: {source}"))]
    Tabulation { source: SchulzeError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ElectionResult<T> = Result<T, ElectionError>;

/// A ballot, as parsed by the readers.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedBallot {
    pub lineno: usize,
    pub count: u64,
    pub choices: Vec<Vec<String>>,
}

fn names_of(ids: &[usize], names: &[String]) -> Vec<String> {
    ids.iter().map(|&cid| names[cid].clone()).collect()
}

fn build_summary_js(settings: &OutputSettings, names: &[String], rv: &SchulzeResult) -> JSValue {
    let c = OutputConfig {
        contest: settings.contest_name.clone(),
        date: settings.contest_date.clone(),
        jurisdiction: settings.contest_juridiction.clone(),
        office: settings.contest_office.clone(),
    };
    let beats: Vec<Vec<String>> = rv
        .ranking
        .beats
        .pairs()
        .iter()
        .map(|(w, l)| vec![names[*w].clone(), names[*l].clone()])
        .collect();
    let ranking: Vec<Vec<String>> = rv
        .ranking
        .tiers
        .iter()
        .map(|tier| names_of(tier, names))
        .collect();
    let wins: Vec<usize> = (0..names.len()).map(|cid| rv.ranking.beats.wins(cid)).collect();
    let order: Option<Vec<String>> = rv.order.as_ref().map(|o| names_of(o, names));
    json!({
        "config": c,
        "candidates": names,
        "defeats": rv.defeats.rows(),
        "strongestPaths": rv.strongest_paths.rows(),
        "beats": beats,
        "wins": wins,
        "ranking": ranking,
        "winners": names_of(&rv.ranking.winners(), names),
        "order": order,
    })
}

fn candidate_names(config: &ElectionConfig, num_candidates: usize) -> Vec<String> {
    if config.candidates.is_empty() {
        (0..num_candidates).map(|cid| cid.to_string()).collect()
    } else {
        config.candidates.iter().map(|c| c.name.clone()).collect()
    }
}

/// Maps the candidate codes of the configuration to the candidate names.
fn candidate_codes(config: &ElectionConfig) -> HashMap<String, String> {
    config
        .candidates
        .iter()
        .filter_map(|c| match c.code.as_deref() {
            Some(code) if !code.is_empty() => Some((code.to_string(), c.name.clone())),
            _ => None,
        })
        .collect()
}

fn ballots_to_tally(
    builder: &mut Builder,
    ballots: &[ParsedBallot],
    codes: &HashMap<String, String>,
) -> ElectionResult<()> {
    for pb in ballots.iter() {
        if pb.choices.iter().all(|c| c.is_empty()) {
            warn!("line {}: empty ballot, skipping", pb.lineno);
            continue;
        }
        let choices: Vec<Vec<String>> = pb
            .choices
            .iter()
            .map(|rank| {
                rank.iter()
                    .map(|choice| codes.get(choice).unwrap_or(choice).clone())
                    .collect()
            })
            .collect();
        builder
            .add_vote(&choices, pb.count)
            .context(TabulationSnafu {})?;
    }
    Ok(())
}

fn read_source_path(root_path: &str, cfs: &FileSource) -> String {
    let p: PathBuf = [root_path, cfs.file_path.as_str()].iter().collect();
    p.as_path().display().to_string()
}

/// Collects the candidate names and the tally described by the configuration.
fn load_tally(
    config: &ElectionConfig,
    root_path: &str,
) -> ElectionResult<(Vec<String>, PairwiseTally)> {
    if let Some(rows) = config.tally.as_ref() {
        ensure_whatever!(
            config.cvr_file_sources.is_empty(),
            "Both a tally and file sources were provided"
        );
        let tally = PairwiseTally::from_rows(rows).context(TabulationSnafu {})?;
        return Ok((candidate_names(config, tally.num_candidates()), tally));
    }

    ensure_whatever!(
        !config.cvr_file_sources.is_empty(),
        "No tally and no file sources detected"
    );

    let rules = validate_rules(&config.rules)?;
    let mut builder = Builder::new(&rules).context(TabulationSnafu {})?;
    if !config.candidates.is_empty() {
        let declared: Vec<String> = config.candidates.iter().map(|c| c.name.clone()).collect();
        builder = builder.candidates(&declared).context(TabulationSnafu {})?;
    }

    let codes = candidate_codes(config);
    for cfs in config.cvr_file_sources.iter() {
        let path = read_source_path(root_path, cfs);
        info!("Attempting to read file {:?}", path);
        match cfs.provider.as_str() {
            "csv" => {
                let file =
                    fs::File::open(&path).context(OpeningFileSnafu { path: path.clone() })?;
                let ballots = io_csv::read_csv_ranking(file, cfs)?;
                info!("{}: {} ballots", path, ballots.len());
                ballots_to_tally(&mut builder, &ballots, &codes)?;
            }
            "tally_csv" => {
                ensure_whatever!(
                    config.cvr_file_sources.len() == 1,
                    "A tally_csv source cannot be combined with other sources"
                );
                let file =
                    fs::File::open(&path).context(OpeningFileSnafu { path: path.clone() })?;
                let (names, rows) = io_csv::read_csv_tally(file)?;
                let tally = PairwiseTally::from_rows(&rows).context(TabulationSnafu {})?;
                let names = if config.candidates.is_empty() {
                    names
                } else {
                    candidate_names(config, tally.num_candidates())
                };
                return Ok((names, tally));
            }
            x => {
                whatever!("Provider not implemented {:?}", x)
            }
        }
    }
    builder.build().context(TabulationSnafu {})
}

/// Runs the election described by the configuration and returns its JSON summary.
pub fn tabulate(config: &ElectionConfig, root_path: &str) -> ElectionResult<JSValue> {
    let rules = validate_rules(&config.rules)?;
    let (names, tally) = load_tally(config, root_path)?;
    debug!("tabulate: candidates: {:?}, tally: {:?}", names, tally.rows());

    let result =
        run_schulze(&tally, &rules, Some(names.as_slice())).context(TabulationSnafu {})?;
    Ok(build_summary_js(&config.output_settings, &names, &result))
}

fn write_summary(pretty_js_stats: &str, out: Option<String>) -> ElectionResult<()> {
    match out.as_deref() {
        None | Some("stdout") => {
            println!("{}", pretty_js_stats);
        }
        Some(path) => {
            info!("Writing summary to {}", path);
            fs::write(path, pretty_js_stats).context(WritingSummarySnafu { path })?;
        }
    }
    Ok(())
}

fn check_reference(pretty_js_stats: &str, summary_p: String) -> ElectionResult<()> {
    let summary_ref = read_summary(summary_p)?;
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference string");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        whatever!("Difference detected between calculated summary and reference summary")
    }
    info!("The summary matches the reference");
    Ok(())
}

/// Tabulates, writes the summary and checks it against the reference, if any.
pub fn run_election(
    config: &ElectionConfig,
    root_path: &str,
    out: Option<String>,
    check_summary_path: Option<String>,
) -> ElectionResult<()> {
    info!("config: {:?}", config);
    let result_js = tabulate(config, root_path)?;
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    // The command line takes precedence over the output directory of the configuration.
    let out = out.or_else(|| {
        config.output_settings.output_directory.as_ref().map(|dir| {
            let p: PathBuf = [dir.as_str(), "summary.json"].iter().collect();
            p.display().to_string()
        })
    });
    write_summary(&pretty_js_stats, out)?;

    if let Some(summary_p) = check_summary_path {
        check_reference(&pretty_js_stats, summary_p)?;
    }
    Ok(())
}

/// Runs an election from a configuration file.
/// File sources are resolved relative to the directory of the configuration.
pub fn run_election_file(
    config_path: String,
    out: Option<String>,
    check_summary_path: Option<String>,
) -> ElectionResult<()> {
    let config = read_config(&config_path)?;
    let root_p = Path::new(config_path.as_str())
        .parent()
        .context(MissingParentDirSnafu {
            path: config_path.clone(),
        })?;
    let root = root_p.display().to_string();
    run_election(&config, &root, out, check_summary_path)
}

/// Builds an in-memory configuration for a single input file.
pub fn config_from_input(
    input: &str,
    input_type: &str,
    candidates: Option<Vec<String>>,
    rules: ConfigRules,
) -> ElectionResult<ElectionConfig> {
    let output_settings = OutputSettings {
        contest_name: Path::new(input)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| input.to_string()),
        output_directory: None,
        contest_date: None,
        contest_juridiction: None,
        contest_office: None,
    };
    let candidates: Vec<ConfigCandidate> = candidates
        .unwrap_or_default()
        .into_iter()
        .map(|name| ConfigCandidate { name, code: None })
        .collect();
    let (tally, cvr_file_sources) = match input_type {
        "csv" | "tally_csv" => (None, vec![FileSource::new(input_type, input)]),
        "tally_json" => {
            let contents = fs::read_to_string(input).context(OpeningFileSnafu { path: input })?;
            let rows: Vec<Vec<i64>> =
                serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
            (Some(rows), vec![])
        }
        x => {
            whatever!("Input type not implemented {:?}", x)
        }
    };
    Ok(ElectionConfig {
        output_settings,
        candidates,
        rules,
        cvr_file_sources,
        tally,
    })
}
