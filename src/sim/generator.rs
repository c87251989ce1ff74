// Random ballots for simulated elections.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::sim::*;

const LABELS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// `Candidate A`, `Candidate B`, ... for the first `n` letters.
pub fn default_candidate_names(n: usize) -> SimResult<Vec<String>> {
    if n == 0 || n > LABELS.len() {
        whatever!("Cannot simulate {} candidates (1 to {})", n, LABELS.len())
    }
    Ok(LABELS
        .chars()
        .take(n)
        .map(|c| format!("Candidate {}", c))
        .collect())
}

/// Draws ranked ballots one position at a time.
///
/// The first position always names a candidate. Every later position draws
/// among the candidates not ranked yet and the option to stop ranking, in
/// proportion to their weights. With all weights equal, every remaining
/// option is equally likely.
pub struct RandomBallots {
    candidates: Vec<String>,
    weights: Vec<f64>,
    stop_weight: f64,
    num_ballots: u64,
    rng: StdRng,
}

impl RandomBallots {
    pub fn new(
        candidates: Vec<String>,
        weights: Vec<f64>,
        stop_weight: f64,
        num_ballots: u64,
        seed: Option<u64>,
    ) -> SimResult<RandomBallots> {
        ensure_whatever!(
            candidates.len() == weights.len(),
            "Expected {} weights, found {}",
            candidates.len(),
            weights.len()
        );
        ensure_whatever!(
            weights.iter().chain([stop_weight].iter()).all(|w| w.is_finite() && *w >= 0.0),
            "Weights must be finite and non-negative"
        );
        ensure_whatever!(
            weights.iter().any(|w| *w > 0.0),
            "At least one candidate needs a positive popularity"
        );
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(RandomBallots {
            candidates,
            weights,
            stop_weight,
            num_ballots,
            rng,
        })
    }

    pub fn from_config(config: &SimConfig) -> SimResult<RandomBallots> {
        let bs = &config.ballot_source;
        RandomBallots::new(
            config.candidates.iter().map(|c| c.name.clone()).collect(),
            config
                .candidates
                .iter()
                .map(|c| c.popularity.unwrap_or(1.0))
                .collect(),
            bs.stop_weight.unwrap_or(1.0),
            bs.num_ballots.unwrap_or(DEFAULT_NUM_BALLOTS),
            bs.seed,
        )
    }

    fn draw_ballot(&mut self) -> SimResult<Vec<BallotChoice>> {
        let width = self.candidates.len();
        let mut remaining: Vec<usize> = (0..width).collect();
        let mut choices: Vec<BallotChoice> = Vec::with_capacity(width);
        while choices.len() < width {
            let mut options: Vec<f64> = remaining.iter().map(|idx| self.weights[*idx]).collect();
            if !choices.is_empty() {
                options.push(self.stop_weight);
            }
            // Only zero weights are left: nothing more gets ranked.
            if options.iter().all(|w| *w == 0.0) {
                break;
            }
            let dist = WeightedIndex::new(&options).context(GeneratorSnafu {})?;
            let pick = dist.sample(&mut self.rng);
            if pick == remaining.len() {
                break;
            }
            let cidx = remaining.remove(pick);
            choices.push(BallotChoice::Candidate(self.candidates[cidx].clone()));
        }
        while choices.len() < width {
            choices.push(BallotChoice::Unranked);
        }
        Ok(choices)
    }
}

impl BallotSource for RandomBallots {
    fn read_ballots(&mut self) -> SimResult<BallotTable> {
        info!(
            "Generating {} ballots over {} candidates",
            self.num_ballots,
            self.candidates.len()
        );
        let mut builder = Builder::new()
            .candidates(&self.candidates)
            .context(TabulationSnafu {})?;
        for idx in 0..self.num_ballots {
            let choices = self.draw_ballot()?;
            builder
                .add_vote(&Vote { choices })
                .context(IngestionSnafu {
                    id: format!("#{}", idx + 1),
                })?;
        }
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(weights: Vec<f64>, stop_weight: f64, seed: u64) -> RandomBallots {
        let names = default_candidate_names(weights.len()).unwrap();
        RandomBallots::new(names, weights, stop_weight, 500, Some(seed)).unwrap()
    }

    #[test]
    fn names_follow_the_alphabet() {
        let names = default_candidate_names(3).unwrap();
        assert_eq!(names, vec!["Candidate A", "Candidate B", "Candidate C"]);
        assert!(default_candidate_names(0).is_err());
        assert!(default_candidate_names(27).is_err());
    }

    #[test]
    fn ballots_respect_the_contract() {
        let table = source(vec![1.0; 6], 1.0, 3).read_ballots().unwrap();
        assert_eq!(table.len(), 500);
        for row in table.rows() {
            assert_eq!(row.len(), 6);
            assert!(row[0].is_some());
            let ranked = row.iter().take_while(|c| c.is_some()).count();
            assert!(row[ranked..].iter().all(|c| c.is_none()));
        }
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let t1 = source(vec![1.0; 5], 1.0, 9).read_ballots().unwrap();
        let t2 = source(vec![1.0; 5], 1.0, 9).read_ballots().unwrap();
        assert_eq!(t1.digest(), t2.digest());
    }

    #[test]
    fn weights_shape_the_ballots() {
        // Without a stop option every ballot is complete.
        let table = source(vec![1.0; 4], 0.0, 5).read_ballots().unwrap();
        assert!(table.rows().all(|row| row.iter().all(|c| c.is_some())));

        // A candidate without popularity is never ranked first.
        let table = source(vec![1.0, 0.0, 1.0], 1.0, 5).read_ballots().unwrap();
        assert!(table.rows().all(|row| row[0] != Some("Candidate B")));
    }

    #[test]
    fn rejects_bad_weights() {
        let names = default_candidate_names(2).unwrap();
        assert!(RandomBallots::new(names.clone(), vec![1.0], 1.0, 1, None).is_err());
        assert!(RandomBallots::new(names.clone(), vec![0.0, 0.0], 1.0, 1, None).is_err());
        assert!(RandomBallots::new(names, vec![1.0, -1.0], 1.0, 1, None).is_err());
    }
}
