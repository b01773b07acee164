//! Library scanning: turning directories of images into subsets.
//!
//! A subset is a first-level directory under the library root. Grouped
//! subsets are PNG-only and carry provenance metadata; plain subsets
//! take any common image format. Saved rating state is merged in at
//! load time, and a subset whose directory has disappeared still loads
//! from its rating file alone.

use std::path::{Path, PathBuf};

use blindrank_core::{ImageEntry, Subset};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::metadata::extract_provenance;
use crate::persist::{load_ratings, persisted_subsets, rating_file, SavedRatings};

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "webp", "bmp", "gif"];

pub fn is_image_file(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        }
        _ => false,
    }
}

/// Path of an image inside its subset directory.
pub fn image_path(library: &Path, subset: &str, image: &str) -> PathBuf {
    library.join(subset).join(image)
}

/// All subset names: first-level directories under the library root,
/// plus subsets that only survive as rating files in the data dir.
pub fn discover_subsets(library: &Path, data_dir: &Path, grouped: bool) -> Vec<String> {
    let mut names: Vec<String> = WalkDir::new(library)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();

    names.extend(persisted_subsets(data_dir, grouped));
    names.sort();
    names.dedup();
    names
}

/// Load one subset, merging on-disk images with saved rating state.
///
/// Grouped subsets track a PNG only when it carries provenance
/// metadata or already has a saved rating; plain subsets track every
/// image file. Images present only in the rating file are kept too, so
/// accumulated ratings survive the files being moved away.
pub fn load_subset(library: &Path, data_dir: &Path, name: &str, grouped: bool) -> Subset {
    let saved = load_ratings(&rating_file(data_dir, name, grouped));
    let subset_dir = library.join(name);

    let mut subset = Subset::default();
    for (group, model) in &saved.group_model_ratings {
        subset.groups.insert(
            group.clone(),
            blindrank_core::EloScore {
                rating: model.rating,
                matches: model.count,
            },
        );
    }

    let online = subset_dir.is_dir();
    if online {
        for entry in WalkDir::new(&subset_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let Some(file_name) = entry.file_name().to_str() else {
                continue;
            };
            if let Some(image) = scan_image(entry.path(), file_name, grouped, &saved) {
                subset.images.insert(file_name.to_string(), image);
            }
        }
    } else {
        warn!(subset = name, dir = %subset_dir.display(), "subset directory missing, loading offline");
    }

    // Ratings for images no longer on disk are kept, not discarded.
    for image in saved.ratings.keys() {
        if !subset.images.contains_key(image) {
            if let Some(score) = saved.image_score(image) {
                subset
                    .images
                    .insert(image.clone(), ImageEntry::rated("", score.rating, score.matches));
            }
        }
    }

    info!(
        subset = name,
        images = subset.images.len(),
        groups = subset.groups.len(),
        mode = if online { "online" } else { "offline" },
        "loaded subset"
    );
    subset
}

fn scan_image(
    path: &Path,
    file_name: &str,
    grouped: bool,
    saved: &SavedRatings,
) -> Option<ImageEntry> {
    if !grouped {
        if !is_image_file(file_name) {
            return None;
        }
        return Some(entry_with_group(file_name, "", saved));
    }

    if !file_name.to_ascii_lowercase().ends_with(".png") {
        return None;
    }

    let provenance = match extract_provenance(path) {
        Ok(provenance) => provenance,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "metadata extraction failed");
            String::new()
        }
    };

    // Grouped subsets only track images with provenance or history.
    if provenance.is_empty() && !saved.ratings.contains_key(file_name) {
        return None;
    }
    Some(entry_with_group(file_name, &provenance, saved))
}

fn entry_with_group(file_name: &str, group: &str, saved: &SavedRatings) -> ImageEntry {
    match saved.image_score(file_name) {
        Some(score) => ImageEntry::rated(group, score.rating, score.matches),
        None => ImageEntry::unrated(group),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::SavedGroupModel;

    /// Minimal PNG with one tEXt chunk. CRC bytes are zero; the
    /// metadata walker never checks them.
    fn png_bytes(keyword: &str, text: &str) -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
        let mut data = keyword.as_bytes().to_vec();
        data.push(0);
        data.extend_from_slice(text.as_bytes());
        bytes.extend_from_slice(&(data.len() as u32).to_be_bytes());
        bytes.extend_from_slice(b"tEXt");
        bytes.extend_from_slice(&data);
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(b"IEND");
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes
    }

    fn bare_png() -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(b"IEND");
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        bytes
    }

    #[test]
    fn image_file_detection() {
        assert!(is_image_file("a.png"));
        assert!(is_image_file("b.JPEG"));
        assert!(is_image_file("c.webp"));
        assert!(!is_image_file("notes.txt"));
        assert!(!is_image_file("noextension"));
        assert!(!is_image_file(".png"));
    }

    #[test]
    fn plain_subset_takes_every_image_file() {
        let lib = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let dir = lib.path().join("pets");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("a.jpg"), b"x").unwrap();
        std::fs::write(dir.join("b.png"), b"x").unwrap();
        std::fs::write(dir.join("notes.txt"), b"x").unwrap();

        let subset = load_subset(lib.path(), data.path(), "pets", false);
        assert_eq!(subset.images.len(), 2);
        assert!(!subset.images["a.jpg"].state.is_rated());
        assert!(subset.groups.is_empty());
    }

    #[test]
    fn grouped_subset_filters_on_metadata_or_history() {
        let lib = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let dir = lib.path().join("gens");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(
            dir.join("with_meta.png"),
            png_bytes("parameters", "x <lora:styleA:0.8> y"),
        )
        .unwrap();
        std::fs::write(dir.join("bare.png"), bare_png()).unwrap();
        std::fs::write(dir.join("saved.png"), bare_png()).unwrap();
        std::fs::write(dir.join("photo.jpg"), b"x").unwrap();

        let mut saved = SavedRatings::default();
        saved.ratings.insert("saved.png".to_string(), 1100.0);
        saved.match_count.insert("saved.png".to_string(), 4);
        std::fs::write(
            rating_file(data.path(), "gens", true),
            serde_json::to_string(&saved).unwrap(),
        )
        .unwrap();

        let subset = load_subset(lib.path(), data.path(), "gens", true);
        assert_eq!(subset.images.len(), 2, "bare.png and photo.jpg dropped");
        assert_eq!(subset.images["with_meta.png"].group, "styleA:0.8");
        let score = subset.images["saved.png"].state.score().unwrap();
        assert_eq!(score.rating, 1100.0);
        assert_eq!(score.matches, 4);
    }

    #[test]
    fn offline_subset_loads_from_rating_file() {
        let lib = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();

        let mut saved = SavedRatings::default();
        saved.ratings.insert("gone.png".to_string(), 950.0);
        saved.match_count.insert("gone.png".to_string(), 12);
        saved.group_model_ratings.insert(
            "styleA".to_string(),
            SavedGroupModel {
                rating: 1040.0,
                count: 6,
            },
        );
        std::fs::write(
            rating_file(data.path(), "archived", true),
            serde_json::to_string(&saved).unwrap(),
        )
        .unwrap();

        let subset = load_subset(lib.path(), data.path(), "archived", true);
        assert_eq!(subset.images.len(), 1);
        assert_eq!(
            subset.images["gone.png"].state.score().unwrap().matches,
            12
        );
        assert_eq!(subset.groups["styleA"].rating, 1040.0);

        let names = discover_subsets(lib.path(), data.path(), true);
        assert_eq!(names, vec!["archived"]);
    }

    #[test]
    fn discovery_unions_directories_and_rating_files() {
        let lib = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        std::fs::create_dir(lib.path().join("beta")).unwrap();
        std::fs::create_dir(lib.path().join("alpha")).unwrap();
        std::fs::write(lib.path().join("loose.png"), b"x").unwrap();
        std::fs::write(rating_file(data.path(), "beta", false), "{}").unwrap();
        std::fs::write(rating_file(data.path(), "gamma", false), "{}").unwrap();

        let names = discover_subsets(lib.path(), data.path(), false);
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    }
}
