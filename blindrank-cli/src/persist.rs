//! Rating persistence.
//!
//! One JSON file per subset under the data dir, in the established
//! camelCase layout so existing rating files keep working:
//!
//! ```json
//! {
//!   "ratings": { "img.png": 1032.0 },
//!   "matchCount": { "img.png": 1 },
//!   "groupModelRatings": { "styleA:0.8": { "rating": 1032.0, "count": 1 } }
//! }
//! ```
//!
//! Loads are forgiving (a missing or corrupted file is an empty
//! state); saves are fire-and-forget through [`Saver`] so a slow disk
//! never stalls an interactive session. In-memory state stays
//! authoritative either way.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use blindrank_core::{EloScore, Subset};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedGroupModel {
    pub rating: f64,
    pub count: u32,
}

/// On-disk snapshot of one subset. Unrated images are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SavedRatings {
    pub ratings: HashMap<String, f64>,
    pub match_count: HashMap<String, u32>,
    pub group_model_ratings: HashMap<String, SavedGroupModel>,
}

impl SavedRatings {
    /// Build a snapshot of everything rated in a subset.
    pub fn snapshot(subset: &Subset) -> SavedRatings {
        let mut saved = SavedRatings::default();
        for (name, entry) in &subset.images {
            if let Some(score) = entry.state.score() {
                saved.ratings.insert(name.clone(), score.rating);
                saved.match_count.insert(name.clone(), score.matches);
            }
        }
        for (group, score) in &subset.groups {
            saved.group_model_ratings.insert(
                group.clone(),
                SavedGroupModel {
                    rating: score.rating,
                    count: score.matches,
                },
            );
        }
        saved
    }

    /// Saved score for an image, if it was rated when last saved.
    pub fn image_score(&self, name: &str) -> Option<EloScore> {
        let rating = *self.ratings.get(name)?;
        let matches = self.match_count.get(name).copied().unwrap_or(0);
        Some(EloScore { rating, matches })
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty() && self.group_model_ratings.is_empty()
    }
}

const GROUPED_PREFIX: &str = "ratings-";
const PLAIN_PREFIX: &str = "ratings-plain-";

/// Rating file path for a subset.
pub fn rating_file(data_dir: &Path, subset: &str, grouped: bool) -> PathBuf {
    let prefix = if grouped { GROUPED_PREFIX } else { PLAIN_PREFIX };
    data_dir.join(format!("{prefix}{subset}.json"))
}

/// Load a subset's saved ratings. Missing file is an empty state;
/// anything unreadable or unparsable is logged and treated the same,
/// so one corrupted file can't take the collection down.
pub fn load_ratings(path: &Path) -> SavedRatings {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no rating file yet");
            return SavedRatings::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read rating file, starting empty");
            return SavedRatings::default();
        }
    };
    match serde_json::from_str(&content) {
        Ok(saved) => saved,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupted rating file, starting empty");
            SavedRatings::default()
        }
    }
}

/// Subset names that have a rating file in the data dir, whether or
/// not their images still exist on disk.
pub fn persisted_subsets(data_dir: &Path, grouped: bool) -> Vec<String> {
    let entries = match std::fs::read_dir(data_dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut names = Vec::new();
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let Some(stem) = file_name.strip_suffix(".json") else {
            continue;
        };
        let subset = if grouped {
            // Grouped files share the plain prefix's first half.
            match stem.strip_prefix(GROUPED_PREFIX) {
                Some(rest) if !stem.starts_with(PLAIN_PREFIX) => rest,
                _ => continue,
            }
        } else {
            match stem.strip_prefix(PLAIN_PREFIX) {
                Some(rest) => rest,
                None => continue,
            }
        };
        if !subset.is_empty() {
            names.push(subset.to_string());
        }
    }
    names.sort();
    names
}

struct SaveJob {
    path: PathBuf,
    payload: String,
}

/// Background rating writer.
///
/// Mutating code serializes a snapshot on its own thread and hands the
/// bytes over a channel; a single task performs the writes in order.
/// Failures are logged, never surfaced — ratings live in memory and
/// the next save overwrites whatever state the file was left in.
pub struct Saver {
    tx: mpsc::UnboundedSender<SaveJob>,
    worker: tokio::task::JoinHandle<()>,
}

impl Saver {
    pub fn spawn() -> Saver {
        let (tx, mut rx) = mpsc::unbounded_channel::<SaveJob>();
        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                if let Err(e) = tokio::fs::write(&job.path, &job.payload).await {
                    warn!(path = %job.path.display(), error = %e, "failed to save ratings");
                } else {
                    debug!(path = %job.path.display(), "ratings saved");
                }
            }
        });
        Saver { tx, worker }
    }

    /// Queue a snapshot for writing. Serialization happens here, on
    /// the caller's thread, so the writer only ever sees final bytes.
    pub fn enqueue(&self, path: PathBuf, snapshot: &SavedRatings) {
        match serde_json::to_string_pretty(snapshot) {
            Ok(payload) => {
                if self.tx.send(SaveJob { path, payload }).is_err() {
                    warn!("save worker is gone, dropping snapshot");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize ratings snapshot"),
        }
    }

    /// Flush pending writes and stop the worker.
    pub async fn finish(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            warn!(error = %e, "save worker ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blindrank_core::ImageEntry;

    fn sample_subset() -> Subset {
        let mut subset = Subset::default();
        subset
            .images
            .insert("a.png".to_string(), ImageEntry::rated("g1", 1032.0, 3));
        subset
            .images
            .insert("b.png".to_string(), ImageEntry::unrated("g2"));
        subset.groups.insert(
            "g1".to_string(),
            EloScore {
                rating: 1010.0,
                matches: 2,
            },
        );
        subset
    }

    #[test]
    fn snapshot_omits_unrated_images() {
        let saved = SavedRatings::snapshot(&sample_subset());
        assert_eq!(saved.ratings.len(), 1);
        assert_eq!(saved.ratings["a.png"], 1032.0);
        assert_eq!(saved.match_count["a.png"], 3);
        assert!(!saved.ratings.contains_key("b.png"));
        assert_eq!(saved.group_model_ratings["g1"].count, 2);
    }

    #[test]
    fn round_trip_preserves_scores() {
        let dir = tempfile::tempdir().unwrap();
        let path = rating_file(dir.path(), "pets", true);

        let saved = SavedRatings::snapshot(&sample_subset());
        std::fs::write(&path, serde_json::to_string_pretty(&saved).unwrap()).unwrap();

        let loaded = load_ratings(&path);
        assert_eq!(loaded, saved);
        let score = loaded.image_score("a.png").unwrap();
        assert_eq!(score.rating, 1032.0);
        assert_eq!(score.matches, 3);
        assert!(loaded.image_score("b.png").is_none());
    }

    #[test]
    fn camel_case_field_names_on_disk() {
        let saved = SavedRatings::snapshot(&sample_subset());
        let json = serde_json::to_string(&saved).unwrap();
        assert!(json.contains("\"matchCount\""));
        assert!(json.contains("\"groupModelRatings\""));
    }

    #[test]
    fn missing_or_corrupted_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(load_ratings(&missing).is_empty());

        let corrupted = dir.path().join("bad.json");
        std::fs::write(&corrupted, "{ not json").unwrap();
        assert!(load_ratings(&corrupted).is_empty());
    }

    #[test]
    fn rating_file_names() {
        let dir = Path::new("/data");
        assert_eq!(
            rating_file(dir, "pets", true),
            Path::new("/data/ratings-pets.json")
        );
        assert_eq!(
            rating_file(dir, "pets", false),
            Path::new("/data/ratings-plain-pets.json")
        );
    }

    #[test]
    fn discovery_separates_grouped_and_plain() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ratings-cats.json"), "{}").unwrap();
        std::fs::write(dir.path().join("ratings-plain-dogs.json"), "{}").unwrap();
        std::fs::write(dir.path().join("unrelated.txt"), "x").unwrap();

        assert_eq!(persisted_subsets(dir.path(), true), vec!["cats"]);
        assert_eq!(persisted_subsets(dir.path(), false), vec!["dogs"]);
    }

    #[tokio::test]
    async fn saver_writes_queued_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let path = rating_file(dir.path(), "pets", false);

        let saver = Saver::spawn();
        saver.enqueue(path.clone(), &SavedRatings::snapshot(&sample_subset()));
        saver.finish().await;

        let loaded = load_ratings(&path);
        assert_eq!(loaded.ratings["a.png"], 1032.0);
    }
}
