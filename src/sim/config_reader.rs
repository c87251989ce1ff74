use crate::sim::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

pub const DEFAULT_NUM_CANDIDATES: usize = 8;
pub const DEFAULT_NUM_BALLOTS: u64 = 10_000;
pub const DEFAULT_PERCENT_CHALLENGED: f64 = 5.0;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
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

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
    pub jurisdiction: Option<String>,
    pub office: Option<String>,
    pub threshold: Option<String>,
    #[serde(rename = "ballotDigest")]
    pub ballot_digest: String,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BallotSourceSettings {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(rename = "firstVoteColumnIndex")]
    pub _first_vote_column_index: Option<JSValue>,
    #[serde(rename = "firstVoteRowIndex")]
    pub _first_vote_row_index: Option<JSValue>,
    #[serde(rename = "idColumnIndex")]
    pub id_column_index: Option<JSValue>,
    #[serde(rename = "numBallots")]
    pub num_ballots: Option<u64>,
    pub seed: Option<u64>,
    #[serde(rename = "stopWeight")]
    pub stop_weight: Option<f64>,
}

impl BallotSourceSettings {
    /// 0-based column of the first choice. Defaults to the first column.
    pub fn first_vote_column_index(&self) -> SimResult<usize> {
        match self._first_vote_column_index {
            None => Ok(0),
            ref x => Ok(read_js_int(x)?.saturating_sub(1)),
        }
    }

    /// 1-based row of the first ballot. Defaults to the first row.
    pub fn first_vote_row_index(&self) -> SimResult<usize> {
        match self._first_vote_row_index {
            None => Ok(1),
            ref x => Ok(read_js_int(x)?.max(1)),
        }
    }

    /// 0-based column of the ballot id, if any.
    pub fn id_column_index_int(&self) -> SimResult<Option<usize>> {
        match self.id_column_index {
            None => Ok(None),
            ref x => Ok(Some(read_js_int(x)?.saturating_sub(1))),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SimCandidate {
    pub name: String,
    pub popularity: Option<f64>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SimRules {
    #[serde(rename = "numberOfWinners")]
    pub number_of_winners: u32,
    #[serde(rename = "tiebreakMode")]
    pub tiebreak_mode: String,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeSettings {
    #[serde(rename = "percentChallenged")]
    pub percent_challenged: Option<f64>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "ballotSource")]
    pub ballot_source: BallotSourceSettings,
    #[serde(default)]
    pub candidates: Vec<SimCandidate>,
    pub rules: SimRules,
    pub challenges: Option<ChallengeSettings>,
}

impl SimConfig {
    /// The simulation run when no configuration is given: random ballots over
    /// 8 candidates, 10,000 voters, a single seat.
    pub fn default_simulation() -> SimConfig {
        SimConfig {
            output_settings: OutputSettings {
                contest_name: "Simulated election".to_string(),
                output_directory: None,
                contest_date: None,
                contest_juridiction: None,
                contest_office: None,
            },
            ballot_source: BallotSourceSettings {
                provider: "random".to_string(),
                file_path: None,
                _first_vote_column_index: None,
                _first_vote_row_index: None,
                id_column_index: None,
                num_ballots: Some(DEFAULT_NUM_BALLOTS),
                seed: None,
                stop_weight: None,
            },
            candidates: Vec::new(),
            rules: SimRules {
                number_of_winners: 1,
                tiebreak_mode: "candidateLabel".to_string(),
                random_seed: None,
            },
            challenges: None,
        }
    }

    pub fn percent_challenged(&self) -> f64 {
        self.challenges
            .as_ref()
            .and_then(|c| c.percent_challenged)
            .unwrap_or(DEFAULT_PERCENT_CHALLENGED)
    }
}

pub fn read_config(path: &str) -> SimResult<SimConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read_config: {} bytes from {}", contents.len(), path);
    let config: SimConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: &str) -> SimResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

pub fn validate_rules(sim_rules: &SimRules) -> SimResult<TabulationRules> {
    let tiebreak_mode = match sim_rules.tiebreak_mode.as_str() {
        "candidateLabel" => TieBreakMode::CandidateLabel,
        "useCandidateOrder" => TieBreakMode::UseCandidateOrder,
        "random" => {
            let seed = match sim_rules.random_seed.clone().map(|s| s.parse::<u32>()) {
                Some(Result::Ok(x)) => x,
                x => {
                    whatever!("Cannot use tiebreak mode random with seed {:?}", x)
                }
            };
            TieBreakMode::Random(seed)
        }
        x => {
            whatever!("Cannot use tiebreak mode {:?} (not implemented)", x)
        }
    };
    Ok(TabulationRules {
        number_of_winners: sim_rules.number_of_winners,
        tiebreak_mode,
    })
}

fn read_js_int(x: &Option<JSValue>) -> SimResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu {}),
        // Excel-style columns: "A" is the first column.
        Some(JSValue::String(s)) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => {
            s.to_ascii_lowercase()
                .chars()
                .try_fold(0usize, |acc, c| {
                    acc.checked_mul(26)?
                        .checked_add(c as usize - 'a' as usize + 1)
                })
                .context(ParsingJsonNumberSnafu {})
        }
        Some(JSValue::String(s)) => s.parse::<usize>().ok().context(ParsingJsonNumberSnafu {}),
        _ => None.context(ParsingJsonNumberSnafu {}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_column_indices() {
        assert_eq!(read_js_int(&Some(json!(3))).unwrap(), 3);
        assert_eq!(read_js_int(&Some(json!("4"))).unwrap(), 4);
        assert_eq!(read_js_int(&Some(json!("B"))).unwrap(), 2);
        assert_eq!(read_js_int(&Some(json!("AA"))).unwrap(), 27);
        assert!(read_js_int(&Some(json!("-"))).is_err());
        assert!(read_js_int(&None).is_err());
    }

    #[test]
    fn long_column_letters_are_rejected() {
        assert_eq!(read_js_int(&Some(json!("zz"))).unwrap(), 26 * 26 + 26);
        let res = read_js_int(&Some(json!("A".repeat(20))));
        assert!(matches!(res, Err(SimError::ParsingJsonNumber {})));
    }

    #[test]
    fn parses_config() {
        let js = json!({
            "outputSettings": {"contestName": "Board"},
            "ballotSource": {
                "provider": "csv",
                "filePath": "ballots.csv",
                "firstVoteColumnIndex": 2,
                "idColumnIndex": "A"
            },
            "candidates": [{"name": "Ann"}, {"name": "Bo", "popularity": 2.5}],
            "rules": {"numberOfWinners": 2, "tiebreakMode": "random", "randomSeed": "17"}
        });
        let config: SimConfig = serde_json::from_value(js).unwrap();
        assert_eq!(config.ballot_source.first_vote_column_index().unwrap(), 1);
        assert_eq!(config.ballot_source.id_column_index_int().unwrap(), Some(0));
        assert_eq!(config.ballot_source.first_vote_row_index().unwrap(), 1);
        assert_eq!(config.candidates[1].popularity, Some(2.5));
        assert_eq!(config.percent_challenged(), DEFAULT_PERCENT_CHALLENGED);
        let rules = validate_rules(&config.rules).unwrap();
        assert_eq!(rules.number_of_winners, 2);
        assert_eq!(rules.tiebreak_mode, TieBreakMode::Random(17));
    }

    #[test]
    fn rejects_unknown_tiebreak() {
        let mut rules = SimConfig::default_simulation().rules;
        rules.tiebreak_mode = "stopCountingAndAsk".to_string();
        assert!(validate_rules(&rules).is_err());
        rules.tiebreak_mode = "random".to_string();
        assert!(validate_rules(&rules).is_err());
    }
}
