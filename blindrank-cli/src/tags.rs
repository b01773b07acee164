//! Sidecar tag files.
//!
//! Each image `foo.png` gets a `foo.txt` next to it holding a
//! comma-separated tag list. Writing an aesthetic tag replaces any
//! previous tag carrying the same prefix and leaves everything else
//! alone.

use std::path::Path;

use anyhow::{Context, Result};

/// Default prefix for aesthetic tags.
pub const DEFAULT_TAG_PREFIX: &str = "aesthetic_rating_";

/// Sidecar path for an image: same stem, `.txt` extension.
pub fn sidecar_path(image_path: &Path) -> std::path::PathBuf {
    image_path.with_extension("txt")
}

/// Write `prefix + tag` into the sidecar for `image_path`, dropping
/// any existing tags that start with `prefix`. Tags are stored as a
/// single comma-separated line; empty entries are discarded.
pub fn merge_tag(image_path: &Path, prefix: &str, tag: &str) -> Result<()> {
    let sidecar = sidecar_path(image_path);

    let current = match std::fs::read_to_string(&sidecar) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", sidecar.display()));
        }
    };

    let mut tags: Vec<String> = current
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.starts_with(prefix))
        .map(str::to_string)
        .collect();
    tags.push(format!("{prefix}{tag}"));

    std::fs::write(&sidecar, tags.join(", "))
        .with_context(|| format!("failed to write {}", sidecar.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_sidecar_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.png");

        merge_tag(&image, "aesthetic_rating_", "t3").unwrap();

        let content = std::fs::read_to_string(dir.path().join("a.txt")).unwrap();
        assert_eq!(content, "aesthetic_rating_t3");
    }

    #[test]
    fn preserves_unrelated_tags() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.png");
        std::fs::write(dir.path().join("a.txt"), "portrait, outdoors,  sunny ").unwrap();

        merge_tag(&image, "aesthetic_rating_", "t1").unwrap();

        let content = std::fs::read_to_string(dir.path().join("a.txt")).unwrap();
        assert_eq!(content, "portrait, outdoors, sunny, aesthetic_rating_t1");
    }

    #[test]
    fn replaces_previous_prefixed_tag() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.png");
        std::fs::write(
            dir.path().join("a.txt"),
            "portrait, aesthetic_rating_t0, outdoors",
        )
        .unwrap();

        merge_tag(&image, "aesthetic_rating_", "t4").unwrap();

        let content = std::fs::read_to_string(dir.path().join("a.txt")).unwrap();
        assert_eq!(content, "portrait, outdoors, aesthetic_rating_t4");
    }

    #[test]
    fn drops_empty_entries() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.png");
        std::fs::write(dir.path().join("a.txt"), "one,, two, ,").unwrap();

        merge_tag(&image, "score_", "7").unwrap();

        let content = std::fs::read_to_string(dir.path().join("a.txt")).unwrap();
        assert_eq!(content, "one, two, score_7");
    }

    #[test]
    fn sidecar_path_swaps_extension() {
        assert_eq!(
            sidecar_path(Path::new("/imgs/cat.PNG")),
            Path::new("/imgs/cat.txt")
        );
    }
}
