/*!
Multi-winner ranked-choice tabulation with a proportional quota.

Each round, every ballot counts once for its highest-ranked candidate that is
still running. A candidate whose count reaches `N / (winners + 1)`, where `N`
is the number of ballots still counting, is elected. When nobody reaches it,
the candidates with the fewest votes are eliminated. Elected and eliminated
candidates are skipped on every ballot in the following rounds, which moves
each of their ballots, as a whole, to the next preference.

```
use quota_rcv::{builder::Builder, run_tabulation, TabulationRules};
# use quota_rcv::TabulationError;

let mut builder = Builder::new()
    .candidates(&["A".to_string(), "B".to_string(), "C".to_string()])?;
for ballot in [["A", "B", "C"], ["A", "C", "B"], ["B", "A", "C"], ["C", "B", "A"], ["A", "B", "C"]] {
    builder.add_vote_simple(&ballot)?;
}
let table = builder.build();

let result = run_tabulation(&table, &TabulationRules::with_winners(2))?;
assert_eq!(result.winners, vec!["A".to_string(), "B".to_string()]);
assert_eq!(result.rounds.len(), 2);
# Ok::<(), TabulationError>(())
```
*/

pub mod builder;
mod config;
pub mod manual;

use log::{debug, info};
use snafu::ensure;

use std::{cmp::Reverse, collections::HashMap, ops::AddAssign};

pub use crate::builder::BallotTable;
pub use crate::config::*;

// **** Private structures ****

type RoundId = u32;

/// Index of a candidate in the registration order of its table.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub(crate) struct CandidateId(pub(crate) u32);

// One position in a stored ballot.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub(crate) enum Slot {
    Ranked(CandidateId),
    Unranked,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum CandidateStatus {
    Active,
    Elected,
    Eliminated,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash, Default)]
struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);
    const ONE: VoteCount = VoteCount(1);
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

// A ballot that still counts: its index in the table and the position of
// its current leading choice.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
struct LiveBallot {
    ballot: usize,
    cursor: usize,
}

// For each removed candidate: the votes received by the next choices, and
// the number of exhausted ballots.
type TransferMap = HashMap<CandidateId, (HashMap<CandidateId, VoteCount>, VoteCount)>;

/// The working state of one tabulation. The ballots are never modified: the
/// statuses decide which ranked choices are skipped.
struct RoundState<'a> {
    table: &'a BallotTable,
    statuses: Vec<CandidateStatus>,
    live: Vec<LiveBallot>,
}

impl<'a> RoundState<'a> {
    fn new(table: &'a BallotTable) -> RoundState<'a> {
        RoundState {
            table,
            statuses: vec![CandidateStatus::Active; table.num_candidates()],
            live: (0..table.len())
                .map(|ballot| LiveBallot { ballot, cursor: 0 })
                .collect(),
        }
    }

    fn is_active(&self, cid: CandidateId) -> bool {
        self.statuses[cid.0 as usize] == CandidateStatus::Active
    }

    fn leader(&self, lb: &LiveBallot) -> CandidateId {
        match self.table.ballots[lb.ballot][lb.cursor] {
            Slot::Ranked(cid) => cid,
            // The cursor always stops on a ranked slot.
            Slot::Unranked => unreachable!("ballot {} points to a blank", lb.ballot),
        }
    }

    /// Moves every ballot to its highest-ranked active candidate and drops the
    /// exhausted ballots. Returns the movements of the ballots whose leading
    /// candidate was removed.
    fn compact(&mut self) -> TransferMap {
        let mut transfers: TransferMap = HashMap::new();
        let mut kept: Vec<LiveBallot> = Vec::with_capacity(self.live.len());
        for lb in self.live.iter() {
            let slots = &self.table.ballots[lb.ballot];
            let old_first = self.leader(lb);
            let next = advance_voting(slots, lb.cursor, |cid| self.is_active(cid));
            match next {
                Some(cursor) if cursor == lb.cursor => {
                    // Nothing to do, the first choice is the same.
                }
                Some(cursor) => {
                    // The ballot has been transfered. Record the transfer.
                    if let Slot::Ranked(new_first) = slots[cursor] {
                        let e = transfers
                            .entry(old_first)
                            .or_insert((HashMap::new(), VoteCount::EMPTY));
                        *e.0.entry(new_first).or_insert(VoteCount::EMPTY) += VoteCount::ONE;
                    }
                }
                None => {
                    // Ballot is now exhausted. Record the exhausted vote.
                    let e = transfers
                        .entry(old_first)
                        .or_insert((HashMap::new(), VoteCount::EMPTY));
                    e.1 += VoteCount::ONE;
                }
            }
            if let Some(cursor) = next {
                kept.push(LiveBallot {
                    ballot: lb.ballot,
                    cursor,
                });
            }
        }
        self.live = kept;
        transfers
    }

    fn compute_tally(&self) -> HashMap<CandidateId, VoteCount> {
        let mut tally: HashMap<CandidateId, VoteCount> = HashMap::new();
        for lb in self.live.iter() {
            *tally.entry(self.leader(lb)).or_insert(VoteCount::EMPTY) += VoteCount::ONE;
        }
        tally
    }
}

// Finds the first ranked and still valid choice at or after `from`.
// No choice may follow a blank, so the search stops at the first blank.
fn advance_voting<F>(slots: &[Slot], from: usize, still_valid: F) -> Option<usize>
where
    F: Fn(CandidateId) -> bool,
{
    for (idx, slot) in slots.iter().enumerate().skip(from) {
        match slot {
            Slot::Ranked(cid) if still_valid(*cid) => return Some(idx),
            Slot::Ranked(_) => {}
            Slot::Unranked => return None,
        }
    }
    None
}

/// The smallest count that satisfies `count >= active / (num_winners + 1)`.
fn get_threshold(active: VoteCount, num_winners: u32) -> VoteCount {
    let parts = num_winners as u64 + 1;
    VoteCount((active.0 + parts - 1) / parts)
}

/// Runs the rounds of an election.
///
/// The tabulator checks the rules against the table when it is created, so a
/// configuration error is reported before any round is counted.
#[derive(Debug, Clone)]
pub struct Tabulator<'a> {
    table: &'a BallotTable,
    rules: TabulationRules,
}

impl<'a> Tabulator<'a> {
    pub fn new(
        table: &'a BallotTable,
        rules: &TabulationRules,
    ) -> Result<Tabulator<'a>, TabulationError> {
        let num_winners = rules.number_of_winners;
        ensure!(
            num_winners >= 1 && (num_winners as usize) < table.num_candidates(),
            InvalidConfigurationSnafu {
                number_of_winners: num_winners,
                candidates: table.num_candidates(),
            }
        );
        Ok(Tabulator {
            table,
            rules: rules.clone(),
        })
    }

    /// Counts the ballots until all the seats are filled.
    ///
    /// Fails with [`TabulationError::InsufficientBallots`] if all the ballots
    /// are exhausted first.
    pub fn tabulate(&self) -> Result<ElectionResult, TabulationError> {
        let seats = self.rules.number_of_winners as usize;
        info!(
            "tabulate: {} ballots, {} candidates, {} seat(s)",
            self.table.len(),
            self.table.num_candidates(),
            seats
        );
        for (idx, name) in self.table.candidates().iter().enumerate() {
            debug!("Candidate: {}: {}", idx + 1, name);
        }

        let mut state = RoundState::new(self.table);
        state.compact();

        let mut winners: Vec<CandidateId> = Vec::new();
        let mut rounds: Vec<RoundStats> = Vec::new();
        let mut round_id: RoundId = 0;
        loop {
            round_id += 1;
            if state.live.is_empty() {
                info!(
                    "Round {}: all ballots exhausted with {} of {} seat(s) filled",
                    round_id,
                    winners.len(),
                    seats
                );
                return Err(TabulationError::InsufficientBallots {
                    winners: self.sorted_names(&winners),
                });
            }

            let tally = state.compute_tally();
            let active = VoteCount(state.live.len() as u64);
            debug_assert_eq!(tally.values().cloned().sum::<VoteCount>(), active);
            let threshold = get_threshold(active, self.rules.number_of_winners);
            let sorted_tally = self.sort_tally(&tally, round_id);
            debug!("Round {}: tally: {:?}", round_id, sorted_tally);
            info!(
                "Round {} ({} active ballots, winning threshold: {})",
                round_id, active.0, threshold.0
            );

            // The tally is never empty while some ballots are live.
            let top = sorted_tally[0].1;
            let mut elected: Vec<CandidateId> = Vec::new();
            let mut eliminated: Vec<CandidateId> = Vec::new();
            if top >= threshold {
                elected = sorted_tally
                    .iter()
                    .take_while(|(_, vc)| *vc == top)
                    .map(|(cid, _)| *cid)
                    .collect();
                let open_seats = seats - winners.len();
                if elected.len() > open_seats {
                    debug!(
                        "Round {}: {} candidates tied for {} seat(s), keeping {:?}",
                        round_id,
                        elected.len(),
                        open_seats,
                        &elected[..open_seats]
                    );
                    elected.truncate(open_seats);
                }
                for cid in elected.iter() {
                    state.statuses[cid.0 as usize] = CandidateStatus::Elected;
                }
                winners.extend(elected.iter().cloned());
            } else {
                let num_active = state
                    .statuses
                    .iter()
                    .filter(|s| **s == CandidateStatus::Active)
                    .count();
                eliminated = find_eliminated_candidates(&sorted_tally, num_active);
                for cid in eliminated.iter() {
                    state.statuses[cid.0 as usize] = CandidateStatus::Eliminated;
                }
            }

            for (cid, vc) in sorted_tally.iter() {
                let outcome = match state.statuses[cid.0 as usize] {
                    CandidateStatus::Elected => " -> elected",
                    CandidateStatus::Eliminated => " -> eliminated",
                    _ => "",
                };
                info!("      {} {}{}", vc.0, self.table.name(*cid), outcome);
            }

            let done = winners.len() == seats;
            // After the last seat is filled, no ballot moves anymore.
            let transfers = if done {
                TransferMap::new()
            } else {
                state.compact()
            };

            rounds.push(self.round_stats(
                round_id,
                &sorted_tally,
                active,
                threshold,
                &elected,
                &eliminated,
                &transfers,
                done,
            ));

            if done {
                info!("Election analyzed in {} rounds", round_id);
                return Ok(ElectionResult {
                    winners: self.sorted_names(&winners),
                    rounds,
                });
            }
        }
    }

    fn sorted_names(&self, cids: &[CandidateId]) -> Vec<String> {
        let mut names: Vec<String> = cids
            .iter()
            .map(|cid| self.table.name(*cid).to_string())
            .collect();
        names.sort();
        names
    }

    // Decreasing counts, ties in tie-break order.
    fn sort_tally(
        &self,
        tally: &HashMap<CandidateId, VoteCount>,
        round_id: RoundId,
    ) -> Vec<(CandidateId, VoteCount)> {
        let cids: Vec<CandidateId> = tally.keys().cloned().collect();
        let order: HashMap<CandidateId, usize> =
            tiebreak_order(&cids, self.rules.tiebreak_mode, self.table, round_id)
                .into_iter()
                .enumerate()
                .map(|(idx, cid)| (cid, idx))
                .collect();
        let mut sorted: Vec<(CandidateId, VoteCount)> =
            tally.iter().map(|(cid, vc)| (*cid, *vc)).collect();
        sorted.sort_by_key(|(cid, vc)| (Reverse(*vc), order.get(cid).cloned()));
        sorted
    }

    #[allow(clippy::too_many_arguments)]
    fn round_stats(
        &self,
        round_id: RoundId,
        sorted_tally: &[(CandidateId, VoteCount)],
        active: VoteCount,
        threshold: VoteCount,
        elected: &[CandidateId],
        eliminated: &[CandidateId],
        transfers: &TransferMap,
        last_round: bool,
    ) -> RoundStats {
        let name = |cid: &CandidateId| self.table.name(*cid).to_string();
        let mut transfer_stats: Vec<TransferStats> = Vec::new();
        let removed: &[CandidateId] = if last_round { &[] } else { elected };
        for cid in removed.iter().chain(eliminated.iter()) {
            let (moved, exhausted) = transfers.get(cid).cloned().unwrap_or_default();
            let mut pub_transfers: Vec<(String, u64)> =
                moved.iter().map(|(to, vc)| (name(to), vc.0)).collect();
            pub_transfers.sort();
            debug!(
                "Round {}: transfers from {}: {:?}, exhausted: {}",
                round_id,
                name(cid),
                pub_transfers,
                exhausted.0
            );
            transfer_stats.push(TransferStats {
                name: name(cid),
                transfers: pub_transfers,
                exhausted: exhausted.0,
            });
        }
        RoundStats {
            round: round_id,
            tally: sorted_tally.iter().map(|(cid, vc)| (name(cid), vc.0)).collect(),
            active_ballots: active.0,
            threshold: threshold.0,
            elected: elected.iter().map(name).collect(),
            eliminated: eliminated.iter().map(name).collect(),
            transfers: transfer_stats,
        }
    }
}

/// Runs the tabulation of `table` under `rules`.
///
/// Arguments:
/// * `table` the validated ballots
/// * `rules` the number of seats and the tie-break mode
pub fn run_tabulation(
    table: &BallotTable,
    rules: &TabulationRules,
) -> Result<ElectionResult, TabulationError> {
    Tabulator::new(table, rules)?.tabulate()
}

// All the candidates with the smallest count. If that would remove every
// active candidate, only the last one in tie-break order is removed.
// Active candidates that lead no ballot are not in the tally but still count.
fn find_eliminated_candidates(
    sorted_tally: &[(CandidateId, VoteCount)],
    num_active: usize,
) -> Vec<CandidateId> {
    let min_count = match sorted_tally.last() {
        Some((_, vc)) => *vc,
        None => return Vec::new(),
    };
    let all_smallest: Vec<CandidateId> = sorted_tally
        .iter()
        .filter(|(_, vc)| *vc == min_count)
        .map(|(cid, _)| *cid)
        .collect();
    debug!(
        "find_eliminated_candidates: all_smallest: {:?}",
        all_smallest
    );
    if all_smallest.len() == num_active && all_smallest.len() > 1 {
        return all_smallest.last().cloned().into_iter().collect();
    }
    all_smallest
}

fn tiebreak_order(
    cids: &[CandidateId],
    tiebreak: TieBreakMode,
    table: &BallotTable,
    num_round: RoundId,
) -> Vec<CandidateId> {
    let mut res = cids.to_vec();
    match tiebreak {
        TieBreakMode::CandidateLabel => {
            res.sort_by(|a, b| table.name(*a).cmp(table.name(*b)).then(a.cmp(b)));
        }
        TieBreakMode::UseCandidateOrder => {
            res.sort();
        }
        TieBreakMode::Random(seed) => {
            let cand_with_names: Vec<(CandidateId, &str)> =
                cids.iter().map(|cid| (*cid, table.name(*cid))).collect();
            res = candidate_permutation_crypto(&cand_with_names, seed, num_round);
        }
    }
    res
}

/// Generates a "random" permutation of the candidates. Random in this context means hard to guess in advance.
/// The same seed, round and names always give the same permutation.
fn candidate_permutation_crypto(
    candidates: &[(CandidateId, &str)],
    seed: u32,
    num_round: u32,
) -> Vec<CandidateId> {
    let mut data: Vec<(CandidateId, String)> = candidates
        .iter()
        .map(|(cid, name)| {
            (
                *cid,
                sha256::digest(format!("{:08}{:08}{}", seed, num_round, name)),
            )
        })
        .collect();
    data.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
    data.iter().map(|p| p.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    fn table(candidates: &[&str], ballots: &[&[&str]]) -> BallotTable {
        let names: Vec<String> = candidates.iter().map(|s| s.to_string()).collect();
        let mut b = Builder::new().candidates(&names).unwrap();
        for ballot in ballots {
            b.add_vote_simple(ballot).unwrap();
        }
        b.build()
    }

    #[test]
    fn threshold_rounds_up() {
        assert_eq!(get_threshold(VoteCount(5), 1), VoteCount(3));
        assert_eq!(get_threshold(VoteCount(5), 2), VoteCount(2));
        assert_eq!(get_threshold(VoteCount(6), 2), VoteCount(2));
        assert_eq!(get_threshold(VoteCount(4), 1), VoteCount(2));
        assert_eq!(get_threshold(VoteCount(1), 3), VoteCount(1));
    }

    #[test]
    fn advance_stops_at_blank() {
        let slots = vec![
            Slot::Ranked(CandidateId(0)),
            Slot::Ranked(CandidateId(2)),
            Slot::Unranked,
        ];
        assert_eq!(advance_voting(&slots, 0, |_| true), Some(0));
        assert_eq!(advance_voting(&slots, 0, |c| c != CandidateId(0)), Some(1));
        assert_eq!(advance_voting(&slots, 0, |c| c == CandidateId(1)), None);
    }

    #[test]
    fn compaction_records_transfers_and_exhaustion() {
        let t = table(&["A", "B", "C"], &[&["A", "B"], &["A"], &["B", "A"], &["C"]]);
        let mut state = RoundState::new(&t);
        assert!(state.compact().is_empty());
        state.statuses[0] = CandidateStatus::Elected;
        let transfers = state.compact();
        let (moved, exhausted) = transfers.get(&CandidateId(0)).unwrap();
        assert_eq!(moved.get(&CandidateId(1)), Some(&VoteCount(1)));
        assert_eq!(*exhausted, VoteCount(1));
        // The ballot led by B is untouched, the "A" only ballot is gone.
        assert_eq!(state.live.len(), 3);
        let tally = state.compute_tally();
        assert_eq!(tally.get(&CandidateId(1)), Some(&VoteCount(2)));
        assert_eq!(tally.get(&CandidateId(0)), None);
    }

    #[test]
    fn elimination_keeps_one_candidate_when_all_tied() {
        let sorted = vec![
            (CandidateId(0), VoteCount(2)),
            (CandidateId(1), VoteCount(2)),
            (CandidateId(2), VoteCount(2)),
        ];
        assert_eq!(find_eliminated_candidates(&sorted, 3), vec![CandidateId(2)]);
        // A fourth candidate is still running without any first choice.
        assert_eq!(
            find_eliminated_candidates(&sorted, 4),
            vec![CandidateId(0), CandidateId(1), CandidateId(2)]
        );
        let sorted = vec![
            (CandidateId(0), VoteCount(3)),
            (CandidateId(1), VoteCount(1)),
            (CandidateId(2), VoteCount(1)),
        ];
        assert_eq!(
            find_eliminated_candidates(&sorted, 3),
            vec![CandidateId(1), CandidateId(2)]
        );
    }

    #[test]
    fn tiebreak_modes_are_deterministic() {
        let t = table(&["Zed", "Amy", "Max"], &[&["Zed"]]);
        let cids = vec![CandidateId(0), CandidateId(1), CandidateId(2)];
        assert_eq!(
            tiebreak_order(&cids, TieBreakMode::CandidateLabel, &t, 1),
            vec![CandidateId(1), CandidateId(2), CandidateId(0)]
        );
        assert_eq!(
            tiebreak_order(&cids, TieBreakMode::UseCandidateOrder, &t, 1),
            cids
        );
        let r1 = tiebreak_order(&cids, TieBreakMode::Random(7), &t, 3);
        let r2 = tiebreak_order(&cids, TieBreakMode::Random(7), &t, 3);
        assert_eq!(r1, r2);
        assert_eq!(r1.len(), 3);
    }
}
