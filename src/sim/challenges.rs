// Challenge and resolution marks shown next to the ballots. They are only
// decoration: the tabulation never reads them.

use rand::Rng;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct BallotAnnotation {
    pub is_challenged: bool,
    /// `None` as long as the ballot was not challenged.
    pub is_resolved: Option<bool>,
}

/// Marks about `percent` percent of the ballots as challenged, then resolved.
///
/// Ballots are drawn with replacement, so a ballot may be drawn twice and
/// slightly fewer ballots than the target end up marked.
pub fn annotate_challenges<R: Rng>(
    num_ballots: usize,
    percent: f64,
    rng: &mut R,
) -> Vec<BallotAnnotation> {
    let mut annotations = vec![BallotAnnotation::default(); num_ballots];
    if num_ballots == 0 || percent <= 0.0 {
        return annotations;
    }
    let draws = (num_ballots as f64 * percent.min(100.0) / 100.0).ceil() as usize;
    for _ in 0..draws {
        let idx = rng.gen_range(0..num_ballots);
        annotations[idx] = BallotAnnotation {
            is_challenged: true,
            is_resolved: Some(true),
        };
    }
    annotations
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn marks_a_share_of_the_ballots() {
        let mut rng = StdRng::seed_from_u64(1);
        let annotations = annotate_challenges(1000, 5.0, &mut rng);
        let challenged: Vec<&BallotAnnotation> =
            annotations.iter().filter(|a| a.is_challenged).collect();
        assert!(!challenged.is_empty() && challenged.len() <= 50);
        assert!(challenged.iter().all(|a| a.is_resolved == Some(true)));
        assert!(annotations
            .iter()
            .filter(|a| !a.is_challenged)
            .all(|a| a.is_resolved.is_none()));
    }

    #[test]
    fn nothing_to_mark() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(annotate_challenges(0, 5.0, &mut rng).is_empty());
        assert!(annotate_challenges(10, 0.0, &mut rng)
            .iter()
            .all(|a| !a.is_challenged));
    }
}
