//! Ready-made folders and configs for engine tests.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use adswap_types::AdSwapConfig;

/// A few PNG-ish bytes; enough for the inventory loader, which never
/// decodes pixels.
const STUB_IMAGE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Create a temp folder containing creatives with the given filenames.
pub fn creative_folder(names: &[&str]) -> TempDir {
    let dir = TempDir::new().expect("create temp creative folder");
    for name in names {
        fs::write(dir.path().join(name), STUB_IMAGE).expect("write stub creative");
    }
    dir
}

/// A config tuned for tests: no settling, short timeouts, folders pointed
/// at the given locations.
pub fn test_config(creative_folder: &Path, screenshot_folder: &Path) -> AdSwapConfig {
    AdSwapConfig {
        base_url: "https://example.com".into(),
        creative_folder: creative_folder.to_path_buf(),
        screenshot_folder: screenshot_folder.to_path_buf(),
        page_timeout_secs: 1,
        settle_secs: 0,
        ..AdSwapConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creative_folder_writes_files() {
        let dir = creative_folder(&["img_300x250.jpg", "img_728x90.png"]);
        assert!(dir.path().join("img_300x250.jpg").is_file());
        assert!(dir.path().join("img_728x90.png").is_file());
    }

    #[test]
    fn test_config_points_at_folders() {
        let creatives = creative_folder(&["img_300x250.jpg"]);
        let shots = TempDir::new().unwrap();
        let config = test_config(creatives.path(), shots.path());
        assert_eq!(config.creative_folder, creatives.path());
        assert_eq!(config.settle_secs, 0);
    }
}
