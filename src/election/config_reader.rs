use crate::election::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
    #[serde(rename = "contestJurisdiction")]
    pub contest_juridiction: Option<String>,
    #[serde(rename = "contestOffice")]
    pub contest_office: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
    pub jurisdiction: Option<String>,
    pub office: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "firstVoteColumnIndex")]
    pub _first_vote_column_index: Option<JSValue>,
    #[serde(rename = "firstVoteRowIndex")]
    pub _first_vote_row_index: Option<JSValue>,
    #[serde(rename = "countColumnIndex")]
    pub count_column_index: Option<JSValue>,
    #[serde(rename = "tieDelimiter")]
    pub tie_delimiter: Option<String>,
}

impl FileSource {
    pub fn new(provider: &str, file_path: &str) -> FileSource {
        FileSource {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            _first_vote_column_index: None,
            _first_vote_row_index: None,
            count_column_index: None,
            tie_delimiter: None,
        }
    }

    /// Zero-based. Defaults to the first column.
    pub fn first_vote_column_index(&self) -> ElectionResult<usize> {
        match self._first_vote_column_index {
            None => Ok(0),
            Some(_) => Ok(read_js_int(&self._first_vote_column_index)? - 1),
        }
    }

    /// Zero-based. Defaults to the second row, after the header.
    pub fn first_vote_row_index(&self) -> ElectionResult<usize> {
        match self._first_vote_row_index {
            None => Ok(1),
            Some(_) => Ok(read_js_int(&self._first_vote_row_index)? - 1),
        }
    }

    /// Zero-based, if a count column is configured.
    pub fn count_column_index_int(&self) -> ElectionResult<Option<usize>> {
        if self.count_column_index.is_some() {
            read_js_int(&self.count_column_index).map(|x| Some(x - 1))
        } else {
            Ok(None)
        }
    }

    pub fn tie_delimiter(&self) -> String {
        self.tie_delimiter.clone().unwrap_or_else(|| "=".to_string())
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ConfigCandidate {
    pub name: String,
    /// Short form of the name that ballots may use instead.
    pub code: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigRules {
    #[serde(rename = "tiebreakMode")]
    pub tiebreak_mode: Option<String>,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<String>,
    #[serde(rename = "defeatMeasure")]
    pub defeat_measure: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(default)]
    pub candidates: Vec<ConfigCandidate>,
    #[serde(default)]
    pub rules: ConfigRules,
    #[serde(rename = "cvrFileSources", default)]
    pub cvr_file_sources: Vec<FileSource>,
    pub tally: Option<Vec<Vec<i64>>>,
}

pub fn read_config(path: &str) -> ElectionResult<ElectionConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    serde_json::from_str(&contents).context(ParsingJsonSnafu {})
}

pub fn read_summary(path: String) -> ElectionResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningFileSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

pub fn validate_rules(rules: &ConfigRules) -> ElectionResult<SchulzeRules> {
    let tiebreak_mode = match rules.tiebreak_mode.as_deref().unwrap_or("unresolved") {
        "unresolved" => TieBreakMode::Unresolved,
        "useCandidateOrder" => TieBreakMode::UseCandidateOrder,
        "random" => match rules.random_seed.as_ref().map(|s| s.parse::<u32>()) {
            Some(Ok(seed)) => TieBreakMode::Random(seed),
            x => {
                whatever!("Cannot use tiebreak mode random with seed {:?}", x)
            }
        },
        x => {
            whatever!("Unknown tiebreak mode {:?}", x)
        }
    };
    let defeat_measure = match rules.defeat_measure.as_deref().unwrap_or("winningVotes") {
        "winningVotes" => DefeatMeasure::WinningVotes,
        "margin" => DefeatMeasure::Margin,
        x => {
            whatever!("Unknown defeat measure {:?}", x)
        }
    };
    Ok(SchulzeRules {
        defeat_measure,
        tiebreak_mode,
    })
}

fn read_js_int(x: &Option<JSValue>) -> ElectionResult<usize> {
    let value = match x {
        Some(JSValue::Number(n)) => n.as_u64().map(|x| x as usize),
        Some(JSValue::String(s)) => s.parse::<usize>().ok(),
        _ => None,
    };
    // Indices start at 1.
    value.filter(|v| *v >= 1).context(ParsingJsonNumberSnafu {
        value: format!("{:?}", x),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_source_defaults() {
        let cfs = FileSource::new("csv", "ballots.csv");
        assert_eq!(cfs.first_vote_column_index().unwrap(), 0);
        assert_eq!(cfs.first_vote_row_index().unwrap(), 1);
        assert_eq!(cfs.count_column_index_int().unwrap(), None);
        assert_eq!(cfs.tie_delimiter(), "=");
    }

    #[test]
    fn file_source_indices_from_strings_and_numbers() {
        let cfs: FileSource = serde_json::from_str(
            r#"{"provider": "csv", "filePath": "b.csv", "firstVoteColumnIndex": "3",
                "firstVoteRowIndex": 1, "countColumnIndex": 2}"#,
        )
        .unwrap();
        assert_eq!(cfs.first_vote_column_index().unwrap(), 2);
        assert_eq!(cfs.first_vote_row_index().unwrap(), 0);
        assert_eq!(cfs.count_column_index_int().unwrap(), Some(1));
    }

    #[test]
    fn zero_index_is_rejected() {
        let cfs: FileSource = serde_json::from_str(
            r#"{"provider": "csv", "filePath": "b.csv", "firstVoteColumnIndex": 0}"#,
        )
        .unwrap();
        assert!(matches!(
            cfs.first_vote_column_index(),
            Err(ElectionError::ParsingJsonNumber { .. })
        ));
    }

    #[test]
    fn candidate_code_is_optional() {
        let cands: Vec<ConfigCandidate> =
            serde_json::from_str(r#"[{ "name": "Anna", "code": "A" }, { "name": "Bob" }]"#)
                .unwrap();
        assert_eq!(cands[0].code.as_deref(), Some("A"));
        assert_eq!(cands[1].code, None);
    }

    #[test]
    fn rules_defaults() {
        let rules = validate_rules(&ConfigRules::default()).unwrap();
        assert_eq!(rules, SchulzeRules::DEFAULT_RULES);
    }

    #[test]
    fn rules_random_needs_a_seed() {
        let mut rules = ConfigRules {
            tiebreak_mode: Some("random".to_string()),
            ..ConfigRules::default()
        };
        assert!(validate_rules(&rules).is_err());
        rules.random_seed = Some("17".to_string());
        assert_eq!(
            validate_rules(&rules).unwrap().tiebreak_mode,
            TieBreakMode::Random(17)
        );
    }

    #[test]
    fn rules_unknown_values() {
        let rules = ConfigRules {
            defeat_measure: Some("ratio".to_string()),
            ..ConfigRules::default()
        };
        let err = validate_rules(&rules).unwrap_err();
        assert!(err.to_string().contains("ratio"));
    }
}
