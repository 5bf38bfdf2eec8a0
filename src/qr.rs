//! On-disk QR image cache
//!
//! Each chest number maps to a deterministic PNG artifact at
//! `<cache_dir>/qr_<number>.png`. The payload, module margin, pixel size and
//! palette are fixed, so identical numbers always produce byte-identical
//! artifacts and a cached file can be reused across requests and restarts.
//!
//! # Concurrency
//!
//! There is no cross-process lock around the existence check: two concurrent
//! first-time requests for the same number may both synthesize and persist
//! the same bytes. Because writes are atomic (temp file + rename) and the
//! content is deterministic, the race is benign - wasteful at worst, never
//! a partial or mixed artifact.
//!
//! The API is blocking; callers run it on `spawn_blocking`.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::Luma;
use qrcode::QrCode;
use tempfile::NamedTempFile;

use crate::error::{AppError, Result};

/// Minimum rendered QR size in pixels.
const QR_PIXELS: u32 = 300;

/// Filesystem-backed QR image cache, shared across requests.
#[derive(Clone)]
pub struct QrCache {
    dir: PathBuf,
    generations: Arc<AtomicU64>,
}

impl QrCache {
    /// Open a cache rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(QrCache {
            dir,
            generations: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Deterministic artifact path for a number.
    pub fn path_for(&self, number: u32) -> PathBuf {
        self.dir.join(format!("qr_{}.png", number))
    }

    /// Number of syntheses performed by this cache handle. Cache hits do not
    /// increment it, which makes the no-new-work property testable.
    pub fn generations(&self) -> u64 {
        self.generations.load(Ordering::Relaxed)
    }

    /// Ensure the QR artifact for `number` exists on disk and return its path.
    ///
    /// Idempotent: an existing artifact is returned unchanged without any
    /// synthesis. A failed synthesis never leaves a partial file visible at
    /// the final path.
    pub fn ensure(&self, number: u32) -> Result<PathBuf> {
        let path = self.path_for(number);
        if path.exists() {
            return Ok(path);
        }

        let png = render_png(number)?;
        self.persist_atomic(&path, &png)?;
        self.generations.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("cached QR for {} at {}", number, path.display());
        Ok(path)
    }

    /// Write bytes to a temp file in the cache directory, then rename onto
    /// the final path. Rename within one directory is atomic on POSIX.
    ///
    /// An I/O failure here means the artifact could not be produced, so it
    /// reports as a code-generation failure rather than an ambient I/O error.
    fn persist_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let write = || -> std::io::Result<()> {
            let mut tmp = NamedTempFile::new_in(&self.dir)?;
            tmp.write_all(bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(path).map_err(|e| e.error)?;
            Ok(())
        };
        write().map_err(|e| {
            AppError::CodeGeneration(format!(
                "failed to persist QR artifact {}: {}",
                path.display(),
                e
            ))
        })
    }
}

/// Synthesize the QR PNG for a number.
///
/// The payload is the plain decimal string of the number; the visual
/// configuration (size, quiet zone, black-on-white) is fixed so the output
/// is deterministic.
fn render_png(number: u32) -> Result<Vec<u8>> {
    let code = QrCode::new(number.to_string().as_bytes())?;
    let img = code
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .min_dimensions(QR_PIXELS, QR_PIXELS)
        .dark_color(Luma([0u8]))
        .light_color(Luma([255u8]))
        .build();

    let mut png = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn ensure_creates_artifact() {
        let dir = TempDir::new().unwrap();
        let cache = QrCache::new(dir.path()).unwrap();

        let path = cache.ensure(7).unwrap();
        assert!(path.exists());
        assert_eq!(path, cache.path_for(7));
        assert_eq!(cache.generations(), 1);

        // PNG magic
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn second_ensure_is_a_cache_hit() {
        let dir = TempDir::new().unwrap();
        let cache = QrCache::new(dir.path()).unwrap();

        let first = std::fs::read(cache.ensure(42).unwrap()).unwrap();
        let second = std::fs::read(cache.ensure(42).unwrap()).unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.generations(), 1, "cache hit must not re-synthesize");
    }

    #[test]
    fn artifacts_are_deterministic_across_caches() {
        let dir_a = TempDir::new().unwrap();
        let dir_b = TempDir::new().unwrap();
        let a = QrCache::new(dir_a.path()).unwrap();
        let b = QrCache::new(dir_b.path()).unwrap();

        let bytes_a = std::fs::read(a.ensure(123).unwrap()).unwrap();
        let bytes_b = std::fs::read(b.ensure(123).unwrap()).unwrap();
        assert_eq!(bytes_a, bytes_b);
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let cache = QrCache::new(dir.path()).unwrap();
        cache.ensure(1).unwrap();
        cache.ensure(2).unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.starts_with("qr_") && n.ends_with(".png")));
    }

    #[cfg(unix)]
    #[test]
    fn unwritable_cache_reports_code_generation_failure() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let cache = QrCache::new(dir.path()).unwrap();
        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o555)).unwrap();

        let err = cache.ensure(9).unwrap_err();
        assert!(matches!(err, AppError::CodeGeneration(_)), "got {:?}", err);

        // Restore so TempDir can clean up, then confirm nothing partial
        // became visible at the final path.
        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(!cache.path_for(9).exists());
        assert_eq!(cache.generations(), 0);
    }

    #[test]
    fn distinct_numbers_get_distinct_artifacts() {
        let dir = TempDir::new().unwrap();
        let cache = QrCache::new(dir.path()).unwrap();

        let one = std::fs::read(cache.ensure(1).unwrap()).unwrap();
        let two = std::fs::read(cache.ensure(2).unwrap()).unwrap();
        assert_ne!(one, two);
    }
}
