//! Creative inventory: replacement images with dimensions parsed from
//! their filenames.
//!
//! Creatives are named `img_<W>x<H>.<ext>` or `google_<W>x<H>.<ext>`;
//! anything else in the folder is skipped with a warning. An empty result
//! is a setup failure — the session cannot do anything without creatives.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use regex::Regex;

use adswap_types::{Dimension, SwapError};

/// A replacement image with its declared target slot dimension.
///
/// `width`/`height` always equal the values parsed from the identifier.
/// `usage_count` is mutated only by the rotation policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creative {
    /// File stem, e.g. `img_300x250`. Doubles as the sort key.
    pub id: String,
    pub path: PathBuf,
    pub dimension: Dimension,
    pub usage_count: u32,
    pub usage_limit: Option<u32>,
}

impl Creative {
    /// MIME type inferred from the file extension.
    pub fn mime(&self) -> &'static str {
        match self.path.extension().and_then(|e| e.to_str()) {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            _ => "image/png",
        }
    }
}

fn dimension_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?:google_|img_)(\d+)x(\d+)").expect("valid pattern"))
}

/// Parse the slot dimension encoded in a creative filename.
pub fn parse_dimension(filename: &str) -> Option<Dimension> {
    let caps = dimension_pattern().captures(filename)?;
    let width = caps.get(1)?.as_str().parse().ok()?;
    let height = caps.get(2)?.as_str().parse().ok()?;
    Some(Dimension::new(width, height))
}

fn is_supported_image(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("jpg") | Some("jpeg") | Some("png")
    )
}

/// Load the creative folder into an identifier-sorted list.
///
/// Entries whose filenames do not encode a dimension are skipped with a
/// warning; an empty folder (or one with no parsable entries) is a
/// [`SwapError::Setup`].
pub fn load_creatives(folder: &Path) -> Result<Vec<Creative>, SwapError> {
    let entries = fs::read_dir(folder).map_err(|e| {
        SwapError::Setup(format!(
            "cannot read creative folder {}: {e}",
            folder.display()
        ))
    })?;

    let mut creatives = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SwapError::Setup(format!("reading folder entry: {e}")))?;
        let path = entry.path();
        if !path.is_file() || !is_supported_image(&path) {
            continue;
        }
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        match parse_dimension(filename) {
            Some(dimension) => {
                let id = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(filename)
                    .to_string();
                tracing::debug!(creative = %id, %dimension, "loaded creative");
                creatives.push(Creative {
                    id,
                    path: path.clone(),
                    dimension,
                    usage_count: 0,
                    usage_limit: None,
                });
            }
            None => {
                tracing::warn!(file = %filename, "skipping creative with unparsable name");
            }
        }
    }

    if creatives.is_empty() {
        return Err(SwapError::Setup(format!(
            "no usable creatives in {}",
            folder.display()
        )));
    }

    creatives.sort_by(|a, b| a.id.cmp(&b.id));
    tracing::info!(count = creatives.len(), folder = %folder.display(), "creative inventory loaded");
    Ok(creatives)
}

/// Read a creative's bytes and encode them as a `data:` URI for injection.
pub fn load_data_uri(creative: &Creative) -> Result<String, SwapError> {
    let bytes = fs::read(&creative.path).map_err(|e| {
        SwapError::Setup(format!(
            "cannot read creative {}: {e}",
            creative.path.display()
        ))
    })?;
    Ok(format!("data:{};base64,{}", creative.mime(), B64.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write as _;

    fn touch(dir: &Path, name: &str, bytes: &[u8]) {
        let mut f = File::create(dir.join(name)).unwrap();
        f.write_all(bytes).unwrap();
    }

    #[test]
    fn parses_both_prefixes() {
        assert_eq!(
            parse_dimension("img_300x250.jpg"),
            Some(Dimension::new(300, 250))
        );
        assert_eq!(
            parse_dimension("google_728x90.png"),
            Some(Dimension::new(728, 90))
        );
        assert_eq!(parse_dimension("logo.png"), None);
        assert_eq!(parse_dimension("img_300.jpg"), None);
        assert_eq!(parse_dimension("banner_970x90.jpg"), None);
    }

    #[test]
    fn load_skips_unparsable_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "img_728x90.jpg", b"x");
        touch(dir.path(), "img_300x250.jpg", b"x");
        touch(dir.path(), "holiday-photo.jpg", b"x");
        touch(dir.path(), "notes.txt", b"x");

        let creatives = load_creatives(dir.path()).unwrap();
        // 2 valid + 2 invalid in the folder yields exactly 2 creatives.
        assert_eq!(creatives.len(), 2);
        assert_eq!(creatives[0].id, "img_300x250");
        assert_eq!(creatives[1].id, "img_728x90");
        assert_eq!(creatives[0].dimension, Dimension::new(300, 250));
    }

    #[test]
    fn dimension_always_matches_identifier() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["img_970x90.png", "img_160x600.jpg", "google_320x50.jpeg"] {
            touch(dir.path(), name, b"x");
        }
        for creative in load_creatives(dir.path()).unwrap() {
            let from_id = parse_dimension(&creative.id).unwrap();
            assert_eq!(creative.dimension, from_id);
        }
    }

    #[test]
    fn empty_folder_is_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_creatives(dir.path()),
            Err(SwapError::Setup(_))
        ));

        touch(dir.path(), "unrelated.png", b"x");
        assert!(matches!(
            load_creatives(dir.path()),
            Err(SwapError::Setup(_))
        ));
    }

    #[test]
    fn data_uri_encodes_bytes_and_mime() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "img_300x250.jpg", &[0xFF, 0xD8, 0xFF]);
        let creatives = load_creatives(dir.path()).unwrap();
        let uri = load_data_uri(&creatives[0]).unwrap();
        assert!(uri.starts_with("data:image/jpeg;base64,"));
        let b64_part = uri.split(',').nth(1).unwrap();
        assert_eq!(B64.decode(b64_part).unwrap(), vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn png_mime_for_png_files() {
        let creative = Creative {
            id: "img_300x250".into(),
            path: PathBuf::from("img_300x250.png"),
            dimension: Dimension::new(300, 250),
            usage_count: 0,
            usage_limit: None,
        };
        assert_eq!(creative.mime(), "image/png");
    }
}
