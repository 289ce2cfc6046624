//! Embedded tag reading for audiobook files.
//!
//! Uses the lofty crate for format-independent tag access across the
//! supported containers (AAX, M4B, MP3, M4A). Extraction is best-effort: a
//! file with no tags yields a [`LocalFileInfo`] with empty fields, while a
//! file that is not a recognizable audio container is a read error.
//!
//! ASIN hunt order (most to least reliable):
//! 1. A dedicated `ASIN` tag item (TXXX:ASIN on ID3, freeform atom on MP4)
//! 2. A comment of the form `... ASIN: B002V5BRQ6 ...`
//! 3. The filename itself

use lofty::file::TaggedFileExt;
use lofty::picture::{MimeType, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::model::{EmbeddedCover, LocalFileInfo};

/// Audible ASINs are "B0" followed by eight alphanumerics.
static ASIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(B0[0-9A-Z]{8})\b").expect("valid ASIN pattern"));

/// Tag item keys that may carry an ASIN directly.
const ASIN_ITEM_KEYS: &[&str] = &["ASIN", "----:com.apple.iTunes:ASIN", "AUDIBLE_ASIN"];

/// Read embedded tags and cover art from an audio file.
///
/// Fails only when the file cannot be probed as a supported audio
/// container; missing individual tags are not an error.
pub fn read(path: &Path) -> Result<LocalFileInfo> {
    let tagged_file = Probe::open(path)
        .map_err(|e| Error::read(path, format!("failed to open file: {e}")))?
        .read()
        .map_err(|e| Error::read(path, format!("unsupported audio container: {e}")))?;

    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

    let title = tag
        .and_then(|t| t.title().map(|s| s.to_string()))
        .filter(|s| !s.is_empty());

    let author = tag
        .and_then(|t| t.artist().map(|s| s.to_string()))
        .filter(|s| !s.is_empty());

    let asin = tag.and_then(asin_from_tag);

    // The cover may live on a secondary tag even when the text fields don't
    let cover = tagged_file.tags().iter().find_map(cover_from_tag);

    Ok(LocalFileInfo {
        path: path.to_path_buf(),
        title,
        author,
        asin,
        cover,
    })
}

/// Extract an ASIN embedded in the filename, e.g. `My Book [B002V5BRQ6].m4b`.
pub fn asin_from_filename(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    ASIN_RE
        .captures(name)
        .map(|c| c[1].to_ascii_uppercase())
}

fn asin_from_tag(tag: &Tag) -> Option<String> {
    for key in ASIN_ITEM_KEYS {
        if let Some(value) = tag.get_string(&ItemKey::Unknown((*key).to_string())) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_ascii_uppercase());
            }
        }
    }

    tag.comment().and_then(|c| asin_from_comment(&c))
}

/// Parse an ASIN out of a comment field (`... ASIN: B002V5BRQ6 ...`).
fn asin_from_comment(comment: &str) -> Option<String> {
    let rest = comment.split("ASIN:").nth(1)?;
    let token = rest.split_whitespace().next()?;
    ASIN_RE
        .captures(token)
        .map(|c| c[1].to_ascii_uppercase())
}

fn cover_from_tag(tag: &Tag) -> Option<EmbeddedCover> {
    let pictures = tag.pictures();

    // Prefer front cover, fall back to first picture
    let picture = pictures
        .iter()
        .find(|p| p.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())?;

    if picture.data().is_empty() {
        return None;
    }

    let mime_type = match picture.mime_type() {
        Some(MimeType::Jpeg) => "image/jpeg",
        Some(MimeType::Png) => "image/png",
        Some(MimeType::Gif) => "image/gif",
        _ => "image/jpeg", // Default assumption
    };

    Some(EmbeddedCover {
        data: picture.data().to_vec(),
        mime_type: mime_type.to_string(),
    })
}
