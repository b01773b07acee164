//! blindrank-core: Elo rating, matchmaking, and binning engine.
//!
//! Pairwise human comparisons → incremental Elo ratings → discrete
//! aesthetic category labels. No IO, no filesystem — just math and an
//! in-memory store. Bring your own judge.
//!
//! The flow: a [`SubsetStore`] is populated from an external image
//! source merged with persisted rating state. Unrated images must be
//! seeded with a 1–10 star rating before matchmaking begins; after
//! that, [`SubsetStore::next_match`] picks the most informative pair,
//! [`SubsetStore::record_vote`] applies the Elo update (propagating to
//! group models where both sides carry distinct provenance), and the
//! binning strategies in [`binning`] turn final ratings into tags.
//!
//! # Quick start
//!
//! ```rust
//! use blindrank_core::{ImageEntry, MatchOutcome, Subset, SubsetStore};
//!
//! let mut subset = Subset::default();
//! subset.images.insert("a.png".into(), ImageEntry::unrated(""));
//! subset.images.insert("b.png".into(), ImageEntry::unrated(""));
//!
//! let mut store = SubsetStore::new();
//! store.insert("pets", subset);
//!
//! let stars = [("a.png".to_string(), 5u8), ("b.png".to_string(), 7u8)];
//! store.seed_ratings("pets", stars.iter().cloned()).unwrap();
//!
//! match store.next_match("pets").unwrap() {
//!     MatchOutcome::Pair(one, two) => {
//!         store.record_vote("pets", &one, &two).unwrap();
//!     }
//!     MatchOutcome::Seeding(_) => unreachable!("both images are seeded"),
//! }
//! ```

pub mod binning;
pub mod constants;
pub mod elo;
pub mod error;
pub mod kmeans;
pub mod matchmaker;
pub mod store;
pub mod types;

// Re-export primary public API at crate root.
pub use binning::{apply_strategy, build_strategy, BinningStrategy, RatedImage, StrategySpec};
pub use elo::{k_factor, star_to_elo, update_ratings};
pub use error::Error;
pub use kmeans::{kmeans_1d, KMeansResult};
pub use matchmaker::{pair_score, select_pair, Candidate};
pub use store::{MatchOutcome, SeedingStatus, SubsetStore};
pub use types::{
    EloScore, ImageEntry, Progress, RankedGroup, RankedImage, RatingState, Subset, Summary,
};
