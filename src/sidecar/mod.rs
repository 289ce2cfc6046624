//! Sidecar files written next to the organized audio.
//!
//! Every book folder gets a `metadata.json` (the serialized record). The
//! descriptor is either a comprehensive `book.opf` (EPUB-3-style package
//! document, Audiobookshelf-compatible) or, with `create_opf` off, the
//! plain-text pair `desc.txt`/`reader.txt`. Cover bytes land in
//! `cover.jpg`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Result, ResultExt};
use crate::model::{BookRecord, format_contributors};

pub const METADATA_FILE: &str = "metadata.json";
pub const OPF_FILE: &str = "book.opf";
pub const DESC_FILE: &str = "desc.txt";
pub const READER_FILE: &str = "reader.txt";
pub const COVER_FILE: &str = "cover.jpg";

/// Write the sidecar package for a finalized record.
///
/// The folder must already exist. Returns the paths written.
pub fn write_all(record: &BookRecord, folder: &Path, config: &Config) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    if config.organizer.create_opf {
        let opf_path = folder.join(OPF_FILE);
        fs::write(&opf_path, build_opf(record))
            .with_context(format!("writing {}", opf_path.display()))?;
        written.push(opf_path);
    } else {
        if let Some(description) = record.description.as_deref() {
            let desc_path = folder.join(DESC_FILE);
            fs::write(&desc_path, description)
                .with_context(format!("writing {}", desc_path.display()))?;
            written.push(desc_path);
        }
        if !record.narrators.is_empty() {
            let reader_path = folder.join(READER_FILE);
            let readers =
                format_contributors(&record.narrators, &config.formatting.multi_value_delimiter);
            fs::write(&reader_path, readers)
                .with_context(format!("writing {}", reader_path.display()))?;
            written.push(reader_path);
        }
    }

    let metadata_path = folder.join(METADATA_FILE);
    let json = serde_json::to_string_pretty(record).expect("a plain record always serializes");
    fs::write(&metadata_path, json)
        .with_context(format!("writing {}", metadata_path.display()))?;
    written.push(metadata_path);

    Ok(written)
}

/// Write downloaded or embedded cover bytes as `cover.jpg`.
pub fn write_cover(folder: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let path = folder.join(COVER_FILE);
    fs::write(&path, bytes).with_context(format!("writing {}", path.display()))?;
    Ok(path)
}

/// Build the `book.opf` package document.
fn build_opf(record: &BookRecord) -> String {
    let mut meta_lines: Vec<String> = Vec::new();

    let book_id = match record.asin.as_deref() {
        Some(asin) => format!("urn:asin:{asin}"),
        None => "urn:uuid:00000000-0000-0000-0000-000000000000".to_string(),
    };
    meta_lines.push(format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>",
        xml_escape(&book_id)
    ));
    if let Some(asin) = record.asin.as_deref() {
        meta_lines.push(format!(
            "    <dc:identifier opf:scheme=\"ASIN\">{}</dc:identifier>",
            xml_escape(asin)
        ));
    }

    meta_lines.push(format!("    <dc:title>{}</dc:title>", xml_escape(&record.title)));
    let language = record.language.as_deref().unwrap_or("en");
    meta_lines.push(format!(
        "    <dc:language>{}</dc:language>",
        xml_escape(language)
    ));

    if record.authors.is_empty() {
        meta_lines.push("    <dc:creator opf:role=\"aut\">Unknown Author</dc:creator>".to_string());
    }
    for name in &record.authors {
        meta_lines.push(format!(
            "    <dc:creator opf:role=\"aut\">{}</dc:creator>",
            xml_escape(name)
        ));
    }

    // 'nrt' is the standard machine-readable code for "narrator"
    for name in &record.narrators {
        meta_lines.push(format!(
            "    <dc:contributor opf:role=\"nrt\">{}</dc:contributor>",
            xml_escape(name)
        ));
    }

    if let Some(publisher) = record.publisher.as_deref() {
        meta_lines.push(format!(
            "    <dc:publisher>{}</dc:publisher>",
            xml_escape(publisher)
        ));
    }

    if let Some(date) = record.release_date.as_deref() {
        meta_lines.push(format!("    <dc:date>{}</dc:date>", xml_escape(date)));
    } else if let Some(year) = record.year {
        meta_lines.push(format!("    <dc:date>{year}</dc:date>"));
    }

    if let Some(description) = record.description.as_deref() {
        meta_lines.push(format!(
            "    <dc:description>{}</dc:description>",
            xml_escape(description)
        ));
    }

    meta_lines.push("    <meta name=\"cover\" content=\"cover-image\" />".to_string());

    if let Some(series) = record.series.as_deref() {
        meta_lines.push(format!(
            "    <meta property=\"schema:series\">{}</meta>",
            xml_escape(series)
        ));
        if let Some(part) = record.series_part.as_deref() {
            meta_lines.push(format!(
                "    <meta property=\"schema:seriesPosition\">{}</meta>",
                xml_escape(part)
            ));
        }
    }

    if let Some(runtime) = record.runtime_secs {
        meta_lines.push(format!(
            "    <meta property=\"media:duration\">{runtime}</meta>"
        ));
    }

    let metadata = meta_lines.join("\n");
    format!(
        r#"<?xml version='1.0' encoding='utf-8'?>
<package xmlns="http://www.idpf.org/2007/opf"
         xmlns:dc="http://purl.org/dc/elements/1.1/"
         xmlns:opf="http://www.idpf.org/2007/opf"
         xmlns:schema="http://schema.org/"
         unique-identifier="BookId" version="3.0">
  <metadata>
{metadata}
  </metadata>
  <manifest>
    <item id="cover-image" href="cover.jpg" media-type="image/jpeg" properties="cover-image" />
  </manifest>
  <spine toc="ncx">
  </spine>
</package>
"#
    )
}

/// Escape XML special characters.
fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_record() -> BookRecord {
        BookRecord {
            asin: Some("B002V5BRQ6".to_string()),
            title: "The Name of the Wind".to_string(),
            authors: vec!["Patrick Rothfuss".to_string()],
            narrators: vec!["Nick Podehl".to_string()],
            series: Some("Kingkiller Chronicle".to_string()),
            series_part: Some("01".to_string()),
            description: Some("My name is Kvothe.".to_string()),
            release_date: Some("2009-05-14".to_string()),
            year: Some(2009),
            publisher: Some("Brilliance Audio".to_string()),
            runtime_secs: Some(100740),
            ..Default::default()
        }
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(
            xml_escape(r#"Dust & "Decay" <unabridged>"#),
            "Dust &amp; &quot;Decay&quot; &lt;unabridged&gt;"
        );
    }

    #[test]
    fn test_build_opf_contains_all_fields() {
        let opf = build_opf(&sample_record());

        assert!(opf.contains("<dc:identifier id=\"BookId\">urn:asin:B002V5BRQ6</dc:identifier>"));
        assert!(opf.contains("<dc:title>The Name of the Wind</dc:title>"));
        assert!(opf.contains("<dc:creator opf:role=\"aut\">Patrick Rothfuss</dc:creator>"));
        assert!(opf.contains("<dc:contributor opf:role=\"nrt\">Nick Podehl</dc:contributor>"));
        assert!(opf.contains("<dc:publisher>Brilliance Audio</dc:publisher>"));
        assert!(opf.contains("<dc:date>2009-05-14</dc:date>"));
        assert!(opf.contains("<meta property=\"schema:series\">Kingkiller Chronicle</meta>"));
        assert!(opf.contains("<meta property=\"schema:seriesPosition\">01</meta>"));
        assert!(opf.contains("<meta property=\"media:duration\">100740</meta>"));
    }

    #[test]
    fn test_build_opf_escapes_values() {
        let mut record = sample_record();
        record.title = "Dust & Decay".to_string();

        let opf = build_opf(&record);
        assert!(opf.contains("<dc:title>Dust &amp; Decay</dc:title>"));
        assert!(!opf.contains("Dust & Decay<"));
    }

    #[test]
    fn test_build_opf_without_asin_uses_placeholder_id() {
        let mut record = sample_record();
        record.asin = None;

        let opf = build_opf(&record);
        assert!(opf.contains("urn:uuid:"));
        assert!(!opf.contains("opf:scheme=\"ASIN\""));
    }

    #[test]
    fn test_write_all_with_opf() {
        let temp = tempdir().unwrap();
        let config = Config::default();

        let written = write_all(&sample_record(), temp.path(), &config).unwrap();

        assert!(temp.path().join(OPF_FILE).exists());
        assert!(temp.path().join(METADATA_FILE).exists());
        assert!(!temp.path().join(DESC_FILE).exists());
        assert_eq!(written.len(), 2);

        // The metadata sidecar round-trips back into a record
        let json = fs::read_to_string(temp.path().join(METADATA_FILE)).unwrap();
        let parsed: BookRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample_record());
    }

    #[test]
    fn test_write_all_text_fallback() {
        let temp = tempdir().unwrap();
        let mut config = Config::default();
        config.organizer.create_opf = false;

        write_all(&sample_record(), temp.path(), &config).unwrap();

        assert!(!temp.path().join(OPF_FILE).exists());
        assert_eq!(
            fs::read_to_string(temp.path().join(DESC_FILE)).unwrap(),
            "My name is Kvothe."
        );
        assert_eq!(
            fs::read_to_string(temp.path().join(READER_FILE)).unwrap(),
            "Nick Podehl"
        );
        assert!(temp.path().join(METADATA_FILE).exists());
    }

    #[test]
    fn test_write_all_skips_empty_text_sidecars() {
        let temp = tempdir().unwrap();
        let mut config = Config::default();
        config.organizer.create_opf = false;

        let record = BookRecord {
            title: "Bare Record".to_string(),
            ..Default::default()
        };
        write_all(&record, temp.path(), &config).unwrap();

        assert!(!temp.path().join(DESC_FILE).exists());
        assert!(!temp.path().join(READER_FILE).exists());
        assert!(temp.path().join(METADATA_FILE).exists());
    }

    #[test]
    fn test_write_cover() {
        let temp = tempdir().unwrap();
        let path = write_cover(temp.path(), b"jpeg bytes").unwrap();

        assert_eq!(path, temp.path().join(COVER_FILE));
        assert_eq!(fs::read(path).unwrap(), b"jpeg bytes");
    }
}
