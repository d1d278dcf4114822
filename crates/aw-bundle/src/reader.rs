//! Bundle reader and verifier.
//!
//! Accepts either encoding the writer produces. Verification recomputes every
//! session hash and runs the residue check again, so a bundle edited after
//! export is caught before upload.

use crate::manifest::{BundleLine, SessionRecord};
use crate::writer::{BundleFormat, BUNDLE_ENTRY_NAME};
use crate::{Bundle, BundleError, BundleManifest, Result};
use aw_redact::{residue_check_value, ResidueReport};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, info, warn};
use zip::ZipArchive;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Residue found in one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResidue {
    pub session_id: String,
    pub report: ResidueReport,
}

/// Outcome of [`BundleReader::verify`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub bundle_id: String,
    pub session_count: usize,
    /// Structural problem (version, count, bundle id), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure_error: Option<String>,
    /// Sessions whose content no longer matches their hash.
    #[serde(default)]
    pub hash_mismatches: Vec<String>,
    /// Residue in the manifest line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_residue: Option<ResidueReport>,
    /// Sessions with residue findings, checked over the whole session line.
    #[serde(default)]
    pub residue: Vec<SessionResidue>,
    /// True if the manifest or any session contains blocking residue.
    pub blocked: bool,
}

impl VerificationReport {
    /// True if the bundle is intact and nothing blocks it. Residue warnings
    /// alone do not invalidate a bundle.
    pub fn is_valid(&self) -> bool {
        self.structure_error.is_none() && self.hash_mismatches.is_empty() && !self.blocked
    }
}

/// A parsed bundle.
#[derive(Debug, Clone)]
pub struct BundleReader {
    bundle: Bundle,
    format: BundleFormat,
}

impl BundleReader {
    /// Open a bundle from a file path.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Parse a bundle from bytes, detecting ZIP by its magic number.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (text, format) = if bytes.starts_with(ZIP_MAGIC) {
            (read_zip_entry(bytes)?, BundleFormat::Zip)
        } else {
            let text = std::str::from_utf8(bytes)
                .map_err(|_| BundleError::Corrupted("bundle is not UTF-8".to_string()))?;
            (text.to_string(), BundleFormat::Jsonl)
        };

        let bundle = Bundle::from_jsonl(&text)?;

        info!(
            bundle_id = %bundle.manifest.bundle_id,
            sessions = bundle.sessions.len(),
            format = %format,
            "Bundle opened"
        );

        Ok(Self { bundle, format })
    }

    pub fn manifest(&self) -> &BundleManifest {
        &self.bundle.manifest
    }

    pub fn sessions(&self) -> &[SessionRecord] {
        &self.bundle.sessions
    }

    pub fn format(&self) -> BundleFormat {
        self.format
    }

    pub fn into_bundle(self) -> Bundle {
        self.bundle
    }

    /// Check structure, hashes and residue.
    pub fn verify(&self) -> VerificationReport {
        let mut report = VerificationReport {
            bundle_id: self.bundle.manifest.bundle_id.clone(),
            session_count: self.bundle.sessions.len(),
            structure_error: self.bundle.validate().err().map(|e| e.to_string()),
            ..VerificationReport::default()
        };

        let manifest_residue = line_residue(&BundleLine::Manifest(self.bundle.manifest.clone()));
        if !manifest_residue.is_clean() {
            debug!(blocked = manifest_residue.blocked, "Residue found in manifest");
            report.blocked |= manifest_residue.blocked;
            report.manifest_residue = Some(manifest_residue);
        }

        for session in &self.bundle.sessions {
            if let Err(e) = session.verify_hash() {
                warn!(session = %session.session_id, error = %e, "Verification failed");
                report.hash_mismatches.push(session.session_id.clone());
            }

            let residue = line_residue(&BundleLine::Session(session.clone()));
            if !residue.is_clean() {
                debug!(
                    session = %session.session_id,
                    blocked = residue.blocked,
                    "Residue found on read"
                );
                report.blocked |= residue.blocked;
                report.residue.push(SessionResidue {
                    session_id: session.session_id.clone(),
                    report: residue,
                });
            }
        }

        if report.is_valid() {
            info!(bundle_id = %report.bundle_id, "Bundle verified");
        } else {
            warn!(
                bundle_id = %report.bundle_id,
                mismatches = report.hash_mismatches.len(),
                blocked = report.blocked,
                "Bundle failed verification"
            );
        }
        report
    }
}

/// Residue over a line exactly as it is written, ids and metadata included.
fn line_residue(line: &BundleLine) -> ResidueReport {
    match serde_json::to_value(line) {
        Ok(value) => residue_check_value(&value),
        Err(e) => {
            warn!(error = %e, "Bundle line did not serialize; checking nothing");
            ResidueReport::default()
        }
    }
}

fn read_zip_entry(bytes: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entry = archive
        .by_name(BUNDLE_ENTRY_NAME)
        .map_err(|_| BundleError::MissingFile(BUNDLE_ENTRY_NAME.to_string()))?;
    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    Ok(text)
}
