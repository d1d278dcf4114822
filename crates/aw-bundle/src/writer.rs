//! Bundle writer.
//!
//! Writes a [`Bundle`] as plain JSON Lines or as a ZIP archive holding a
//! single `sessions.jsonl` entry. ZIP entries carry a fixed timestamp so the
//! same bundle always produces the same bytes.

use crate::{Bundle, Result};
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::info;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// Name of the JSON Lines entry inside a ZIP bundle.
pub const BUNDLE_ENTRY_NAME: &str = "sessions.jsonl";

/// On-disk bundle encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BundleFormat {
    #[default]
    Jsonl,
    Zip,
}

impl BundleFormat {
    /// Pick a format from a file extension: `.zip` is ZIP, anything else
    /// JSON Lines.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("zip") => BundleFormat::Zip,
            _ => BundleFormat::Jsonl,
        }
    }
}

impl std::fmt::Display for BundleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BundleFormat::Jsonl => write!(f, "jsonl"),
            BundleFormat::Zip => write!(f, "zip"),
        }
    }
}

/// Serializes bundles.
pub struct BundleWriter {
    bundle: Bundle,
    format: BundleFormat,
}

impl BundleWriter {
    pub fn new(bundle: Bundle, format: BundleFormat) -> Self {
        Self { bundle, format }
    }

    pub fn bundle(&self) -> &Bundle {
        &self.bundle
    }

    pub fn format(&self) -> BundleFormat {
        self.format
    }

    /// Write the bundle to a byte vector.
    pub fn write_to_vec(&self) -> Result<Vec<u8>> {
        let jsonl = self.bundle.to_jsonl()?;
        let bytes = match self.format {
            BundleFormat::Jsonl => jsonl.into_bytes(),
            BundleFormat::Zip => {
                let mut buffer = Cursor::new(Vec::new());
                {
                    let mut zip = ZipWriter::new(&mut buffer);

                    let options: FileOptions<'_, ()> = FileOptions::default()
                        .compression_method(CompressionMethod::Deflated)
                        .last_modified_time(zip::DateTime::default())
                        .unix_permissions(0o644);

                    zip.start_file(BUNDLE_ENTRY_NAME, options)?;
                    zip.write_all(jsonl.as_bytes())?;
                    zip.finish()?;
                }
                buffer.into_inner()
            }
        };

        info!(
            bundle_id = %self.bundle.manifest.bundle_id,
            sessions = self.bundle.sessions.len(),
            format = %self.format,
            bytes = bytes.len(),
            "Bundle written to memory"
        );

        Ok(bytes)
    }

    /// Write the bundle to a file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let bytes = self.write_to_vec()?;
        std::fs::write(path, &bytes)?;

        info!(
            path = %path.display(),
            bundle_id = %self.bundle.manifest.bundle_id,
            "Bundle written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prepare::{prepare_sessions, PrepareConfig, RawSession};
    use serde_json::json;
    use std::io::Read;
    use tempfile::TempDir;

    fn bundle() -> Bundle {
        let raw: Vec<RawSession> = vec![json!({"correlation_id": "s1", "agent": "claude"}).into()];
        let result = prepare_sessions(&raw, &PrepareConfig::default()).unwrap();
        Bundle::from_preparation(&result, None).unwrap()
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(BundleFormat::from_path(Path::new("out.zip")), BundleFormat::Zip);
        assert_eq!(BundleFormat::from_path(Path::new("OUT.ZIP")), BundleFormat::Zip);
        assert_eq!(BundleFormat::from_path(Path::new("out.jsonl")), BundleFormat::Jsonl);
        assert_eq!(BundleFormat::from_path(Path::new("out")), BundleFormat::Jsonl);
    }

    #[test]
    fn test_jsonl_output_is_two_lines() {
        let bytes = BundleWriter::new(bundle(), BundleFormat::Jsonl)
            .write_to_vec()
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_zip_holds_single_entry() {
        let bytes = BundleWriter::new(bundle(), BundleFormat::Zip)
            .write_to_vec()
            .unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);

        let mut entry = archive.by_name(BUNDLE_ENTRY_NAME).unwrap();
        let mut text = String::new();
        entry.read_to_string(&mut text).unwrap();
        assert!(text.starts_with(r#"{"type":"manifest""#));
    }

    #[test]
    fn test_zip_is_byte_stable() {
        let a = BundleWriter::new(bundle(), BundleFormat::Zip)
            .write_to_vec()
            .unwrap();
        let b = BundleWriter::new(bundle(), BundleFormat::Zip)
            .write_to_vec()
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_write_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundle.jsonl");
        BundleWriter::new(bundle(), BundleFormat::Jsonl)
            .write(&path)
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(r#""type":"session""#));
    }
}
