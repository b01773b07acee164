//! The entity store: every rating mutation flows through here.
//!
//! [`SubsetStore`] owns all subsets for one collection and is the only
//! writer of rating state, which keeps the invariants (unique names,
//! rated-iff-counted, one-way seeding) in a single place. The
//! caller owns the store and passes it by reference — there are no
//! globals.
//!
//! Mutations are synchronous and single-threaded by construction; a
//! caller that shares a store across threads wraps it in its own lock.

use std::collections::HashMap;

use rand::seq::SliceRandom;

use crate::elo::{star_to_elo, update_ratings};
use crate::error::Error;
use crate::matchmaker::{select_pair, Candidate};
use crate::types::{
    EloScore, ImageEntry, Progress, RankedGroup, RankedImage, RatingState, Subset, Summary,
};

/// What the judge should do next for a subset.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// These images still need star ratings, in randomized order.
    /// Matchmaking is blocked until the subset is fully seeded.
    Seeding(Vec<String>),
    /// The next pair to compare, in randomized presentation order.
    Pair(String, String),
}

/// Result of [`SubsetStore::seeding_status`].
#[derive(Debug, Clone, PartialEq)]
pub struct SeedingStatus {
    pub needs_seeding: bool,
    /// Unrated image names, sorted for stable display.
    pub unrated: Vec<String>,
}

/// In-memory store of all subsets in a collection.
#[derive(Debug, Default)]
pub struct SubsetStore {
    subsets: HashMap<String, Subset>,
}

impl SubsetStore {
    pub fn new() -> Self {
        SubsetStore::default()
    }

    /// Register a loaded subset, replacing any previous one of the
    /// same name. Group models referenced by image entries are created
    /// on the spot so no vote can ever hit a missing model.
    pub fn insert(&mut self, name: impl Into<String>, mut subset: Subset) {
        let group_names: Vec<String> = subset
            .images
            .values()
            .filter(|img| img.has_group())
            .map(|img| img.group.clone())
            .collect();
        for group in &group_names {
            subset.ensure_group(group);
        }
        self.subsets.insert(name.into(), subset);
    }

    /// Subset names, sorted for stable listings.
    pub fn subset_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.subsets.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn subset(&self, name: &str) -> Result<&Subset, Error> {
        self.subsets
            .get(name)
            .ok_or_else(|| Error::SubsetNotFound(name.to_string()))
    }

    fn subset_mut(&mut self, name: &str) -> Result<&mut Subset, Error> {
        self.subsets
            .get_mut(name)
            .ok_or_else(|| Error::SubsetNotFound(name.to_string()))
    }

    /// Whether the subset still has unrated images, and which ones.
    pub fn seeding_status(&self, name: &str) -> Result<SeedingStatus, Error> {
        let subset = self.subset(name)?;
        let mut unrated: Vec<String> = subset
            .images
            .iter()
            .filter(|(_, img)| !img.state.is_rated())
            .map(|(name, _)| name.clone())
            .collect();
        unrated.sort();
        Ok(SeedingStatus {
            needs_seeding: !unrated.is_empty(),
            unrated,
        })
    }

    /// Apply star ratings (1–10) to unrated images.
    ///
    /// This is the one-time Unrated → Rated transition. Entries naming
    /// unknown images, already-rated images, or out-of-range stars are
    /// skipped, not fatal: the judge may resubmit an overlapping batch
    /// after an interrupted session. Returns how many images actually
    /// transitioned; a batch that seeds nothing is a validation error
    /// so callers never save (or report success) for no-op input.
    pub fn seed_ratings(
        &mut self,
        name: &str,
        ratings: impl IntoIterator<Item = (String, u8)>,
    ) -> Result<usize, Error> {
        let subset = self.subset_mut(name)?;
        let mut seeded = 0;

        for (image, star) in ratings {
            if !(1..=10).contains(&star) {
                continue;
            }
            if let Some(entry) = subset.images.get_mut(&image) {
                if !entry.state.is_rated() {
                    entry.state = RatingState::Rated(EloScore {
                        rating: star_to_elo(star),
                        matches: 0,
                    });
                    seeded += 1;
                }
            }
        }

        if seeded == 0 {
            return Err(Error::validation(
                "no unrated images matched the provided star ratings",
            ));
        }
        Ok(seeded)
    }

    /// Decide the next action for a subset: seed, or compare.
    ///
    /// Matchmaking is blocked while *any* image remains unrated — a
    /// half-seeded subset would bias early pairings toward whichever
    /// images happened to be seeded first.
    pub fn next_match(&self, name: &str) -> Result<MatchOutcome, Error> {
        let status = self.seeding_status(name)?;
        if status.needs_seeding {
            let mut unrated = status.unrated;
            unrated.shuffle(&mut rand::rng());
            return Ok(MatchOutcome::Seeding(unrated));
        }

        let subset = self.subset(name)?;
        let mut candidates: Vec<Candidate> = subset
            .images
            .iter()
            .filter_map(|(img_name, img)| {
                img.state.score().map(|score| Candidate {
                    name: img_name.clone(),
                    rating: score.rating,
                    matches: score.matches,
                    group: img.group.clone(),
                })
            })
            .collect();
        // Stable order so tie-breaking is deterministic.
        candidates.sort_by(|a, b| a.name.cmp(&b.name));

        let (first, second) = select_pair(&candidates)?;
        Ok(MatchOutcome::Pair(
            candidates[first].name.clone(),
            candidates[second].name.clone(),
        ))
    }

    /// Record one comparison outcome.
    ///
    /// Updates both image ratings, and — when the two images belong to
    /// distinct, real groups — propagates the same outcome to the two
    /// group models. Both images must already be rated; the seeding
    /// gate in [`next_match`](Self::next_match) makes that the normal
    /// case, and direct callers get a validation error otherwise.
    pub fn record_vote(&mut self, name: &str, winner: &str, loser: &str) -> Result<(), Error> {
        if winner == loser {
            return Err(Error::validation("an image cannot be compared with itself"));
        }

        let subset = self.subset_mut(name)?;

        let winner_entry = subset.images.get(winner).ok_or_else(|| Error::ImageNotFound {
            subset: name.to_string(),
            image: winner.to_string(),
        })?;
        let loser_entry = subset.images.get(loser).ok_or_else(|| Error::ImageNotFound {
            subset: name.to_string(),
            image: loser.to_string(),
        })?;

        let (Some(mut winner_score), Some(mut loser_score)) =
            (winner_entry.state.score(), loser_entry.state.score())
        else {
            return Err(Error::validation("cannot vote on unseeded images"));
        };

        let winner_group = winner_entry.group.clone();
        let loser_group = loser_entry.group.clone();
        let cross_group = winner_entry.has_group()
            && loser_entry.has_group()
            && winner_group != loser_group;

        update_ratings(&mut winner_score, &mut loser_score);
        if let Some(entry) = subset.images.get_mut(winner) {
            entry.state = RatingState::Rated(winner_score);
        }
        if let Some(entry) = subset.images.get_mut(loser) {
            entry.state = RatingState::Rated(loser_score);
        }

        if cross_group {
            // Models exist for every group referenced by an image
            // (enforced at insert); a missing one is skipped rather
            // than invented mid-vote.
            if let (Some(mut wg), Some(mut lg)) = (
                subset.groups.get(&winner_group).copied(),
                subset.groups.get(&loser_group).copied(),
            ) {
                update_ratings(&mut wg, &mut lg);
                subset.groups.insert(winner_group, wg);
                subset.groups.insert(loser_group, lg);
            }
        }

        Ok(())
    }

    /// Remove an image from the subset. Group models are left as they
    /// are; their ratings already reflect the votes that happened.
    pub fn delete_image(&mut self, name: &str, image: &str) -> Result<(), Error> {
        let subset = self.subset_mut(name)?;
        if subset.images.remove(image).is_none() {
            return Err(Error::ImageNotFound {
                subset: name.to_string(),
                image: image.to_string(),
            });
        }
        Ok(())
    }

    /// Rated images sorted by rating descending (name as tiebreak).
    pub fn image_rankings(&self, name: &str) -> Result<Vec<RankedImage>, Error> {
        let subset = self.subset(name)?;
        let mut ranked: Vec<RankedImage> = subset
            .images
            .iter()
            .filter_map(|(img_name, img)| {
                img.state.score().map(|score| RankedImage {
                    name: img_name.clone(),
                    rating: score.rating,
                    matches: score.matches,
                    group: img.group.clone(),
                })
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(ranked)
    }

    /// Group models sorted by rating descending (name as tiebreak).
    pub fn group_rankings(&self, name: &str) -> Result<Vec<RankedGroup>, Error> {
        let subset = self.subset(name)?;
        let mut ranked: Vec<RankedGroup> = subset
            .groups
            .iter()
            .map(|(group, score)| RankedGroup {
                name: group.clone(),
                rating: score.rating,
                matches: score.matches,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(ranked)
    }

    /// Coverage floor: the smallest match count among rated images.
    pub fn progress(&self, name: &str) -> Result<Progress, Error> {
        let subset = self.subset(name)?;
        let rated: Vec<EloScore> = subset
            .images
            .values()
            .filter_map(|img| img.state.score())
            .collect();
        let minimal_matches = rated.iter().map(|s| s.matches).min().unwrap_or(0);
        Ok(Progress {
            minimal_matches,
            total_images: subset.images.len(),
            rated_images: rated.len(),
        })
    }

    /// Count and averages over rated images.
    pub fn image_summary(&self, name: &str) -> Result<Summary, Error> {
        let subset = self.subset(name)?;
        let scores: Vec<EloScore> = subset
            .images
            .values()
            .filter_map(|img| img.state.score())
            .collect();
        Ok(summarize(&scores))
    }

    /// Count and averages over group models.
    pub fn group_summary(&self, name: &str) -> Result<Summary, Error> {
        let subset = self.subset(name)?;
        let scores: Vec<EloScore> = subset.groups.values().copied().collect();
        Ok(summarize(&scores))
    }
}

fn summarize(scores: &[EloScore]) -> Summary {
    if scores.is_empty() {
        return Summary {
            count: 0,
            average_rating: 0.0,
            average_matches: 0.0,
        };
    }
    let count = scores.len();
    Summary {
        count,
        average_rating: scores.iter().map(|s| s.rating).sum::<f64>() / count as f64,
        average_matches: scores.iter().map(|s| s.matches as f64).sum::<f64>() / count as f64,
    }
}
