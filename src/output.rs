// src/output.rs
use crate::error::{RenderError, RenderResult};
use chrono::{DateTime, TimeZone};
use std::collections::hash_map::DefaultHasher;
use std::fmt::Display;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// `dir/map_YYYYmmdd_HHMMSS_NNNN.png`, where `NNNN` is derived from the two addresses.
/// Creates `dir` when it does not exist yet.
pub fn timestamped_output_path<Tz>(
    dir: &Path,
    origin: &str,
    destination: &str,
    now: &DateTime<Tz>,
) -> RenderResult<PathBuf>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    fs::create_dir_all(dir).map_err(|source| RenderError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut hasher = DefaultHasher::new();
    origin.hash(&mut hasher);
    destination.hash(&mut hasher);
    let tag = hasher.finish() % 10_000;

    Ok(dir.join(format!("map_{}_{tag:04}.png", now.format("%Y%m%d_%H%M%S"))))
}

/// A render smaller than `min_bytes` is almost always a blank or error tile.
pub fn is_usable_map_image(path: &Path, min_bytes: u64) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > min_bytes)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn output_name_has_timestamp_and_tag() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("temp_maps");
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 14, 3, 9).unwrap();

        let path = timestamped_output_path(&dir, "高雄市苓雅區", "高雄市鼓山區", &at).unwrap();
        assert!(dir.is_dir());

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("map_20261017_140309_"), "{name}");
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "map_20261017_140309_0000.png".len());
    }

    #[test]
    fn same_trip_same_name() {
        let tmp = TempDir::new().unwrap();
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let a = timestamped_output_path(tmp.path(), "A", "B", &at).unwrap();
        let b = timestamped_output_path(tmp.path(), "A", "B", &at).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn small_or_missing_files_are_unusable() {
        let tmp = TempDir::new().unwrap();
        let small = tmp.path().join("small.png");
        fs::write(&small, vec![0u8; 512]).unwrap();
        let big = tmp.path().join("big.png");
        fs::write(&big, vec![0u8; 20_000]).unwrap();

        assert!(!is_usable_map_image(&small, 10_240));
        assert!(is_usable_map_image(&big, 10_240));
        assert!(!is_usable_map_image(&tmp.path().join("missing.png"), 10_240));
    }
}
