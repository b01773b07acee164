//! Core data model: rated entities, subsets, and read-only projections.
//!
//! Images and group models share one rating representation
//! ([`EloScore`]); images additionally carry a seeding lifecycle
//! expressed as an explicit sum type ([`RatingState`]) rather than a
//! nullable field, so "partially initialized" is unrepresentable.

use std::collections::HashMap;

use crate::constants::{DEFAULT_RATING, NO_GROUP};

/// Rating and match count of an initialized entity.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EloScore {
    pub rating: f64,
    pub matches: u32,
}

impl Default for EloScore {
    fn default() -> Self {
        EloScore {
            rating: DEFAULT_RATING,
            matches: 0,
        }
    }
}

/// Seeding lifecycle of an image. `Rated` is terminal: the only way
/// back to `Unrated` is deleting the image entirely.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RatingState {
    Unrated,
    Rated(EloScore),
}

impl RatingState {
    pub fn is_rated(&self) -> bool {
        matches!(self, RatingState::Rated(_))
    }

    pub fn score(&self) -> Option<EloScore> {
        match self {
            RatingState::Rated(score) => Some(*score),
            RatingState::Unrated => None,
        }
    }
}

/// One image within a subset. The name is the map key in [`Subset`].
///
/// `group` is `""` for ungrouped subsets, the sentinel `"NONE"` for an
/// image known to carry no provenance, or the provenance string shared
/// by a group of images.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageEntry {
    pub group: String,
    pub state: RatingState,
}

impl ImageEntry {
    /// A fresh, unseeded image.
    pub fn unrated(group: impl Into<String>) -> Self {
        ImageEntry {
            group: group.into(),
            state: RatingState::Unrated,
        }
    }

    /// An image restored from persisted rating state.
    pub fn rated(group: impl Into<String>, rating: f64, matches: u32) -> Self {
        ImageEntry {
            group: group.into(),
            state: RatingState::Rated(EloScore { rating, matches }),
        }
    }

    /// Whether this image participates in group-model rankings.
    pub fn has_group(&self) -> bool {
        !self.group.is_empty() && self.group != NO_GROUP
    }
}

/// A named, independently ranked collection of images, plus the group
/// models tracked for grouped subsets (empty map for ungrouped ones).
///
/// Group models are always initialized — they start at the default
/// rating the moment a group name is first encountered and begin
/// participating in Elo updates as soon as two images from different
/// groups are compared.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Subset {
    pub images: HashMap<String, ImageEntry>,
    pub groups: HashMap<String, EloScore>,
}

impl Subset {
    /// Register `group` lazily, leaving an existing model untouched.
    pub fn ensure_group(&mut self, group: &str) {
        if !group.is_empty() && group != NO_GROUP && !self.groups.contains_key(group) {
            self.groups.insert(group.to_string(), EloScore::default());
        }
    }
}

/// Snapshot of one rated image, for ranking and export.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedImage {
    pub name: String,
    pub rating: f64,
    pub matches: u32,
    pub group: String,
}

/// Snapshot of one group model, for ranking and export.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedGroup {
    pub name: String,
    pub rating: f64,
    pub matches: u32,
}

/// Comparison progress over a subset: how thinly the least-compared
/// rated image has been covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Progress {
    pub minimal_matches: u32,
    pub total_images: usize,
    pub rated_images: usize,
}

/// Aggregate statistics over rated images or group models.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Summary {
    pub count: usize,
    pub average_rating: f64,
    pub average_matches: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_score_is_neutral() {
        let score = EloScore::default();
        assert_eq!(score.rating, 1000.0);
        assert_eq!(score.matches, 0);
    }

    #[test]
    fn rating_state_accessors() {
        assert!(!RatingState::Unrated.is_rated());
        assert!(RatingState::Unrated.score().is_none());

        let rated = RatingState::Rated(EloScore { rating: 1200.0, matches: 3 });
        assert!(rated.is_rated());
        assert_eq!(rated.score().unwrap().matches, 3);
    }

    #[test]
    fn group_membership_excludes_sentinels() {
        assert!(!ImageEntry::unrated("").has_group());
        assert!(!ImageEntry::unrated("NONE").has_group());
        assert!(ImageEntry::unrated("styleA:0.8").has_group());
    }

    #[test]
    fn ensure_group_is_lazy_and_idempotent() {
        let mut subset = Subset::default();
        subset.ensure_group("");
        subset.ensure_group("NONE");
        assert!(subset.groups.is_empty());

        subset.ensure_group("styleA");
        let model = subset.groups["styleA"];
        assert_eq!(model.rating, 1000.0);

        // A second encounter must not reset an existing model.
        subset.groups.get_mut("styleA").unwrap().rating = 1100.0;
        subset.ensure_group("styleA");
        assert_eq!(subset.groups["styleA"].rating, 1100.0);
    }
}
