//! Pair selection: which two images should the judge see next?
//!
//! Exhaustive pairwise scoring over the rated images. O(n²) is fine
//! here — subsets are human-curated image sets, and a human vote takes
//! seconds. The priority function favors under-compared items and
//! close ratings at the same time: an under-compared but wildly
//! mismatched pair yields low information, and a well-compared close
//! pair is already resolved.

use rand::Rng;

use crate::constants::{CLOSENESS_WINDOW, SAME_GROUP_PENALTY};
use crate::error::Error;

/// A rated image as the selector sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub rating: f64,
    pub matches: u32,
    pub group: String,
}

impl Candidate {
    fn in_same_group(&self, other: &Candidate) -> bool {
        !self.group.is_empty() && self.group != "NONE" && self.group == other.group
    }
}

/// Priority of comparing `a` against `b`. Higher is better.
pub fn pair_score(a: &Candidate, b: &Candidate) -> f64 {
    let match_score = 1.0 / (a.matches.min(b.matches) as f64 + 1.0);
    let elo_score = (CLOSENESS_WINDOW - (a.rating - b.rating).abs()).max(0.0);
    let mut score = match_score * elo_score;
    if a.in_same_group(b) {
        score *= SAME_GROUP_PENALTY;
    }
    score
}

/// Select the highest-priority pair, returned as indices into
/// `candidates`.
///
/// Ties go to the first pair encountered, so a caller that supplies a
/// stable candidate order gets a deterministic selection. The returned
/// order of the two indices is randomized — presentation order must
/// not leak which side the selector considered first.
pub fn select_pair(candidates: &[Candidate]) -> Result<(usize, usize), Error> {
    if candidates.len() < 2 {
        return Err(Error::InsufficientCandidates);
    }

    let mut best = (0, 1);
    let mut best_score = pair_score(&candidates[0], &candidates[1]);

    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            let score = pair_score(&candidates[i], &candidates[j]);
            if score > best_score {
                best = (i, j);
                best_score = score;
            }
        }
    }

    let mut rng = rand::rng();
    if rng.random::<f64>() < 0.5 {
        Ok(best)
    } else {
        Ok((best.1, best.0))
    }
}
