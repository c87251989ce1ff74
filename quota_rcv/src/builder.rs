use std::collections::{HashMap, HashSet};

use log::debug;
use snafu::ensure;

pub use crate::config::*;
use crate::{CandidateId, Slot};

/// A builder for assembling a ballot table.
///
/// Every ballot is checked when it is added. A ballot that does not follow
/// the ranking rules is rejected with [`TabulationError::MalformedBallot`],
/// and the builder is left as it was.
///
/// ```
/// use quota_rcv::builder::Builder;
/// # use quota_rcv::TabulationError;
///
/// let mut builder = Builder::new()
///     .candidates(&["Anna".to_string(), "Bob".to_string(), "Clara".to_string()])?;
///
/// builder.add_vote_simple(&["Anna", "Clara"])?;
/// builder.add_vote_simple(&["Bob", "Anna", "Clara"])?;
/// let table = builder.build();
/// assert_eq!(table.len(), 2);
///
/// # Ok::<(), TabulationError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    _candidates: Vec<String>,
    _ids: HashMap<String, CandidateId>,
    _ballots: Vec<Vec<Slot>>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Registers the candidates, in order. This resets any ballot already added.
    pub fn candidates(self, cands: &[String]) -> Result<Builder, TabulationError> {
        ensure!(!cands.is_empty(), NoCandidatesSnafu);
        let mut ids: HashMap<String, CandidateId> = HashMap::new();
        for (idx, name) in cands.iter().enumerate() {
            ensure!(
                !ids.contains_key(name),
                DuplicateCandidateSnafu { name: name.clone() }
            );
            ids.insert(name.clone(), CandidateId(idx as u32));
        }
        Ok(Builder {
            _candidates: cands.to_vec(),
            _ids: ids,
            _ballots: Vec::new(),
        })
    }

    /// Adds a ballot given as the ranked labels, most preferred first.
    ///
    /// The positions after the last label are left unranked.
    pub fn add_vote_simple(&mut self, ranked: &[&str]) -> Result<(), TabulationError> {
        let mut choices: Vec<BallotChoice> = ranked
            .iter()
            .map(|s| BallotChoice::Candidate(s.to_string()))
            .collect();
        while choices.len() < self._candidates.len() {
            choices.push(BallotChoice::Unranked);
        }
        self.add_vote(&Vote { choices })
    }

    /// Adds a full-width ballot.
    pub fn add_vote(&mut self, vote: &Vote) -> Result<(), TabulationError> {
        let row = self._ballots.len() + 1;
        let slots = self.check_vote(row, vote)?;
        self._ballots.push(slots);
        Ok(())
    }

    fn check_vote(&self, row: usize, vote: &Vote) -> Result<Vec<Slot>, TabulationError> {
        let width = self._candidates.len();
        ensure!(
            vote.choices.len() == width,
            MalformedBallotSnafu {
                row,
                reason: format!(
                    "expected {} positions but found {}",
                    width,
                    vote.choices.len()
                ),
            }
        );
        ensure!(
            !vote.choices.first().map_or(false, |c| c.is_unranked()),
            MalformedBallotSnafu {
                row,
                reason: "the first choice is blank",
            }
        );

        let mut seen: HashSet<CandidateId> = HashSet::new();
        let mut slots: Vec<Slot> = Vec::with_capacity(width);
        let mut blank_at: Option<usize> = None;
        for (pos, choice) in vote.choices.iter().enumerate() {
            match choice {
                BallotChoice::Unranked => {
                    blank_at.get_or_insert(pos);
                    slots.push(Slot::Unranked);
                }
                BallotChoice::Candidate(name) => {
                    if let Some(blank) = blank_at {
                        return MalformedBallotSnafu {
                            row,
                            reason: format!(
                                "{:?} is ranked at position {} after a blank at position {}",
                                name,
                                pos + 1,
                                blank + 1
                            ),
                        }
                        .fail();
                    }
                    let cid = match self._ids.get(name) {
                        Some(cid) => *cid,
                        None => {
                            return MalformedBallotSnafu {
                                row,
                                reason: format!("{:?} is not a registered candidate", name),
                            }
                            .fail();
                        }
                    };
                    ensure!(
                        seen.insert(cid),
                        MalformedBallotSnafu {
                            row,
                            reason: format!("{:?} is ranked more than once", name),
                        }
                    );
                    slots.push(Slot::Ranked(cid));
                }
            }
        }
        Ok(slots)
    }

    pub fn build(self) -> BallotTable {
        debug!(
            "build: {} ballots over {} candidates",
            self._ballots.len(),
            self._candidates.len()
        );
        BallotTable {
            candidates: self._candidates,
            ballots: self._ballots,
        }
    }
}

/// A validated set of ballots. Every ballot has one position per candidate.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BallotTable {
    candidates: Vec<String>,
    pub(crate) ballots: Vec<Vec<Slot>>,
}

impl BallotTable {
    /// The registered candidates, in registration order.
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn num_candidates(&self) -> usize {
        self.candidates.len()
    }

    pub fn len(&self) -> usize {
        self.ballots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ballots.is_empty()
    }

    pub(crate) fn name(&self, cid: CandidateId) -> &str {
        self.candidates[cid.0 as usize].as_str()
    }

    /// The ballot at `idx` (0-based) as labels, `None` for unranked positions.
    pub fn row(&self, idx: usize) -> Option<Vec<Option<&str>>> {
        self.ballots.get(idx).map(|slots| {
            slots
                .iter()
                .map(|slot| match slot {
                    Slot::Ranked(cid) => Some(self.name(*cid)),
                    Slot::Unranked => None,
                })
                .collect()
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<Option<&str>>> + '_ {
        (0..self.ballots.len()).filter_map(move |idx| self.row(idx))
    }

    /// SHA-256 fingerprint of the candidates and ballots, in hexadecimal.
    pub fn digest(&self) -> String {
        let mut text = self.candidates.join("\t");
        for row in self.rows() {
            text.push('\n');
            let cells: Vec<&str> = row.iter().map(|c| c.unwrap_or("")).collect();
            text.push_str(cells.join("\t").as_str());
        }
        sha256::digest(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Builder {
        Builder::new()
            .candidates(&["A".to_string(), "B".to_string(), "C".to_string()])
            .unwrap()
    }

    fn full(names: &[Option<&str>]) -> Vote {
        Vote {
            choices: names
                .iter()
                .map(|n| match n {
                    Some(s) => BallotChoice::Candidate(s.to_string()),
                    None => BallotChoice::Unranked,
                })
                .collect(),
        }
    }

    fn reason_of(err: TabulationError) -> (usize, String) {
        match err {
            TabulationError::MalformedBallot { row, reason } => (row, reason),
            e => panic!("unexpected error {:?}", e),
        }
    }

    #[test]
    fn partial_ballot_is_padded() {
        let mut b = abc();
        b.add_vote_simple(&["B"]).unwrap();
        let table = b.build();
        assert_eq!(table.row(0), Some(vec![Some("B"), None, None]));
    }

    #[test]
    fn rejects_duplicate_registration() {
        let res = Builder::new().candidates(&["A".to_string(), "A".to_string()]);
        assert_eq!(
            res.err(),
            Some(TabulationError::DuplicateCandidate {
                name: "A".to_string()
            })
        );
        assert_eq!(
            Builder::new().candidates(&[]).err(),
            Some(TabulationError::NoCandidates)
        );
    }

    #[test]
    fn rejects_wrong_width() {
        let mut b = abc();
        let (row, _) = reason_of(b.add_vote(&full(&[Some("A"), Some("B")])).unwrap_err());
        assert_eq!(row, 1);
        assert!(b.add_vote_simple(&["A", "B", "C", "A"]).is_err());
    }

    #[test]
    fn rejects_blank_first_choice() {
        let mut b = abc();
        let err = b.add_vote(&full(&[None, None, None])).unwrap_err();
        assert!(reason_of(err).1.contains("first choice"));
    }

    #[test]
    fn rejects_ranking_after_blank() {
        let mut b = abc();
        b.add_vote_simple(&["A"]).unwrap();
        let err = b.add_vote(&full(&[Some("A"), None, Some("C")])).unwrap_err();
        let (row, reason) = reason_of(err);
        assert_eq!(row, 2);
        assert!(reason.contains("after a blank"));
        // The rejected ballot was not kept.
        assert_eq!(b.build().len(), 1);
    }

    #[test]
    fn rejects_unknown_and_repeated_candidates() {
        let mut b = abc();
        let err = b.add_vote_simple(&["A", "Z"]).unwrap_err();
        assert!(reason_of(err).1.contains("not a registered candidate"));
        let err = b.add_vote_simple(&["A", "B", "A"]).unwrap_err();
        assert!(reason_of(err).1.contains("more than once"));
    }

    #[test]
    fn digest_depends_on_content() {
        let mut b1 = abc();
        b1.add_vote_simple(&["A", "B"]).unwrap();
        let mut b2 = abc();
        b2.add_vote_simple(&["A", "B"]).unwrap();
        let mut b3 = abc();
        b3.add_vote_simple(&["A", "C"]).unwrap();
        let (t1, t2, t3) = (b1.build(), b2.build(), b3.build());
        assert_eq!(t1.digest(), t2.digest());
        assert_ne!(t1.digest(), t3.digest());
        assert_eq!(t1.digest().len(), 64);
    }
}
