// ********* Input data structures ***********

use snafu::Snafu;

/// The content of one position in a ballot.
///
/// In most cases, it is enough to use the higher-level builder API.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum BallotChoice {
    /// A ranked candidate, referred to by its label.
    Candidate(String),
    /// Nothing ranked at this position. All the following positions must
    /// also be unranked.
    Unranked,
}

impl BallotChoice {
    pub fn is_unranked(&self) -> bool {
        matches!(self, BallotChoice::Unranked)
    }
}

/// One voter's ranked ballot, as submitted.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Vote {
    pub choices: Vec<BallotChoice>,
}

// ******** Output data structures *********

/// Where the ballots led by a removed candidate went in the next round.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TransferStats {
    pub name: String,
    pub transfers: Vec<(String, u64)>,
    pub exhausted: u64,
}

/// Statistics for one round
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoundStats {
    pub round: u32,
    /// Leading-choice counts, by decreasing count.
    pub tally: Vec<(String, u64)>,
    /// Number of ballots that were not exhausted in this round.
    pub active_ballots: u64,
    /// Smallest count meeting the quota in this round.
    pub threshold: u64,
    pub elected: Vec<String>,
    pub eliminated: Vec<String>,
    pub transfers: Vec<TransferStats>,
}

impl RoundStats {
    pub fn count_for(&self, name: &str) -> Option<u64> {
        self.tally
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, count)| *count)
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ElectionResult {
    /// The winners, sorted by label.
    pub winners: Vec<String>,
    pub rounds: Vec<RoundStats>,
}

impl ElectionResult {
    pub fn num_rounds(&self) -> usize {
        self.rounds.len()
    }

    pub fn final_threshold(&self) -> u64 {
        self.rounds.last().map(|r| r.threshold).unwrap_or(0)
    }
}

/// Errors that prevent the algorithm from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TabulationError {
    #[snafu(display("no candidates were registered"))]
    NoCandidates,
    #[snafu(display("candidate {name:?} is registered more than once"))]
    DuplicateCandidate { name: String },
    #[snafu(display(
        "cannot elect {number_of_winners} winner(s) out of {candidates} candidate(s)"
    ))]
    InvalidConfiguration {
        number_of_winners: u32,
        candidates: usize,
    },
    #[snafu(display("ballot {row} is malformed: {reason}"))]
    MalformedBallot { row: usize, reason: String },
    #[snafu(display(
        "all ballots were exhausted after electing {} winner(s)",
        winners.len()
    ))]
    InsufficientBallots { winners: Vec<String> },
}

// ********* Configuration **********

/// How candidates with the same count are ordered within a round.
///
/// The order decides which tied candidates are elected when there are
/// fewer seats left than tied leaders, and the order in which winners of
/// the same round are reported. It is deterministic in every mode.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TieBreakMode {
    /// Ascending candidate label.
    CandidateLabel,
    /// The order in which the candidates were registered.
    UseCandidateOrder,
    // Uses a cryptographic hash on the seed, round and candidate names.
    Random(u32),
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TabulationRules {
    pub number_of_winners: u32,
    pub tiebreak_mode: TieBreakMode,
}

impl TabulationRules {
    pub const DEFAULT_RULES: TabulationRules = TabulationRules {
        number_of_winners: 1,
        tiebreak_mode: TieBreakMode::CandidateLabel,
    };

    pub fn with_winners(number_of_winners: u32) -> TabulationRules {
        TabulationRules {
            number_of_winners,
            ..TabulationRules::DEFAULT_RULES
        }
    }
}

impl Default for TabulationRules {
    fn default() -> Self {
        TabulationRules::DEFAULT_RULES
    }
}
