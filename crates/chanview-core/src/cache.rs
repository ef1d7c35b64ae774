//! On-disk logo cache keyed by sanitized channel name.
//!
//! One file per key, always named `<key>.png` whatever the source format.
//! Existence of the file is the hit signal; entries never expire. Two names
//! that sanitize to the same key share (and overwrite) one file.

use std::path::{Path, PathBuf};

use tracing::debug;

const PNG_MAGIC: &[u8] = b"\x89PNG";
const JPEG_MAGIC: &[u8] = b"\xFF\xD8\xFF";
const GIF_MAGIC: &[u8] = b"GIF8";

#[derive(Debug, Clone)]
pub struct AssetCache {
    dir: PathBuf,
}

impl AssetCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache file for a channel name, or `None` when nothing of the name
    /// survives sanitization.
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        let key = sanitize_key(name);
        if key.is_empty() {
            return None;
        }
        Some(self.dir.join(format!("{}.png", key)))
    }

    /// Path of an existing cached file for `name`.
    pub async fn lookup(&self, name: &str) -> Option<PathBuf> {
        let path = self.path_for(name)?;
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Some(path),
            _ => None,
        }
    }

    /// Write `bytes` as the cached file for `name`. The bytes land in a
    /// sibling `.part` file first and are renamed into place, so a
    /// half-written file is never taken for a hit.
    pub async fn store(&self, name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.path_for(name).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("no cache key for {:?}", name),
            )
        })?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let partial = path.with_extension("png.part");
        tokio::fs::write(&partial, bytes).await?;
        if let Err(e) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
        debug!("cache: stored {} bytes at {:?}", bytes.len(), path);
        Ok(path)
    }
}

/// Keep alphanumerics, spaces, `-` and `_`; drop everything else and trim
/// trailing whitespace. The result is always a single safe path segment.
pub fn sanitize_key(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    kept.trim_end().to_string()
}

/// Cheap signature sniff: PNG, JPEG or GIF.
pub fn looks_like_image(bytes: &[u8]) -> bool {
    bytes.starts_with(PNG_MAGIC) || bytes.starts_with(JPEG_MAGIC) || bytes.starts_with(GIF_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("La 1 HD"), "La 1 HD");
        assert_eq!(sanitize_key("ES | Antena-3_HD"), "ES  Antena-3_HD");
        assert_eq!(sanitize_key("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_key("C:\\logo?*<>"), "Clogo");
        assert_eq!(sanitize_key("Canal ñ  "), "Canal ñ");
        assert_eq!(sanitize_key("|||"), "");
    }

    #[test]
    fn test_path_for_stays_inside_dir() {
        let cache = AssetCache::new("/cache");
        let path = cache.path_for("../escape/me").unwrap();
        assert_eq!(path, PathBuf::from("/cache/escapeme.png"));
        assert!(cache.path_for("???").is_none());
    }

    #[test]
    fn test_looks_like_image() {
        assert!(looks_like_image(b"\x89PNG\r\n\x1a\n...."));
        assert!(looks_like_image(b"\xFF\xD8\xFF\xE0...."));
        assert!(looks_like_image(b"GIF89a...."));
        assert!(!looks_like_image(b"<html><body>404</body></html>"));
        assert!(!looks_like_image(b""));
    }

    #[tokio::test]
    async fn test_store_then_lookup() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = AssetCache::new(tmp.path().join("logos"));

        assert!(cache.lookup("Uno").await.is_none());
        let stored = cache.store("Uno", b"GIF89a").await.unwrap();
        assert_eq!(cache.lookup("Uno").await, Some(stored.clone()));
        assert_eq!(std::fs::read(stored).unwrap(), b"GIF89a");
    }

    #[tokio::test]
    async fn test_store_leaves_no_partial_file() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = AssetCache::new(tmp.path());

        cache.store("Uno", b"GIF89a").await.unwrap();
        cache.store("Uno", b"\x89PNG....").await.unwrap();

        let mut names: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["Uno.png".to_string()]);
        assert_eq!(std::fs::read(tmp.path().join("Uno.png")).unwrap(), b"\x89PNG....");
    }

    #[tokio::test]
    async fn test_interrupted_write_is_not_a_hit() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = AssetCache::new(tmp.path());
        std::fs::write(tmp.path().join("Uno.png.part"), b"\x89PN").unwrap();

        assert!(cache.lookup("Uno").await.is_none());
        let stored = cache.store("Uno", b"GIF89a").await.unwrap();
        assert_eq!(cache.lookup("Uno").await, Some(stored));
        assert!(!tmp.path().join("Uno.png.part").exists());
    }
}
