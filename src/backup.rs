//! Portable attendance bundles: roster, holidays, the academic year start
//! and the persisted attendance document, each as a JSON entry in a zip
//! with per-entry SHA-256 digests in the manifest.
//!
//! Reading a bundle has no side effects; the caller applies a fully
//! verified [`WorkspaceBundle`].

use crate::attendance::holidays::validate_holidays;
use crate::attendance::store::assert_no_neutral_entries;
use crate::attendance::{Holiday, Snapshot, Student};
use crate::db::ClassEntry;
use anyhow::{anyhow, Context};
use chrono::{Local, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const BUNDLE_FORMAT: &str = "attendance-bundle-v1";

const MANIFEST_ENTRY: &str = "manifest.json";
const ROSTER_ENTRY: &str = "roster.json";
const HOLIDAYS_ENTRY: &str = "holidays.json";
const ATTENDANCE_ENTRY: &str = "attendance.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceBundle {
    pub classes: Vec<ClassEntry>,
    pub students: Vec<Student>,
    pub holidays: Vec<Holiday>,
    pub academic_year_start: Option<NaiveDate>,
    pub attendance: Snapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleSummary {
    pub bundle_format: String,
    pub classes: usize,
    pub students: usize,
    pub holidays: usize,
    pub dates: usize,
}

impl WorkspaceBundle {
    pub fn summary(&self) -> BundleSummary {
        BundleSummary {
            bundle_format: BUNDLE_FORMAT.to_string(),
            classes: self.classes.len(),
            students: self.students.len(),
            holidays: self.holidays.len(),
            dates: self.attendance.len(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RosterEntry {
    classes: Vec<ClassEntry>,
    students: Vec<Student>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    format: String,
    app_version: String,
    exported_at: String,
    academic_year_start: Option<NaiveDate>,
    /// entry name -> hex SHA-256 of its bytes
    digests: BTreeMap<String, String>,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub fn export_bundle(bundle: &WorkspaceBundle, out_path: &Path) -> anyhow::Result<BundleSummary> {
    assert_no_neutral_entries(&bundle.attendance)?;

    let roster = serde_json::to_vec_pretty(&RosterEntry {
        classes: bundle.classes.clone(),
        students: bundle.students.clone(),
    })
    .context("failed to encode roster")?;
    let holidays = serde_json::to_vec_pretty(&bundle.holidays).context("failed to encode holidays")?;
    let attendance =
        serde_json::to_vec_pretty(&bundle.attendance).context("failed to encode attendance")?;
    let entries = [
        (ROSTER_ENTRY, roster),
        (HOLIDAYS_ENTRY, holidays),
        (ATTENDANCE_ENTRY, attendance),
    ];

    let manifest = Manifest {
        format: BUNDLE_FORMAT.to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        exported_at: Local::now().to_rfc3339(),
        academic_year_start: bundle.academic_year_start,
        digests: entries
            .iter()
            .map(|(name, bytes)| (name.to_string(), sha256_hex(bytes)))
            .collect(),
    };

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let out_file = File::create(out_path)
        .with_context(|| format!("failed to create output file {}", out_path.display()))?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(&serde_json::to_vec_pretty(&manifest).context("failed to encode manifest")?)
        .context("failed to write manifest entry")?;
    for (name, bytes) in &entries {
        zip.start_file(*name, opts)
            .with_context(|| format!("failed to start {}", name))?;
        zip.write_all(bytes)
            .with_context(|| format!("failed to write {}", name))?;
    }
    zip.finish().context("failed to finalize bundle")?;

    Ok(bundle.summary())
}

/// Opens and fully checks a bundle: format, digests, JSON shape, holiday
/// rules, unique ids and the no-neutral rule for attendance.
pub fn read_bundle(in_path: &Path) -> anyhow::Result<WorkspaceBundle> {
    let file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.display()))?;
    let mut archive = ZipArchive::new(file).context("bundle is not a zip archive")?;

    let manifest: Manifest = serde_json::from_slice(&read_entry(&mut archive, MANIFEST_ENTRY)?)
        .context("manifest.json is invalid")?;
    if manifest.format != BUNDLE_FORMAT {
        return Err(anyhow!("unsupported bundle format: {}", manifest.format));
    }

    let roster: RosterEntry = verified_entry(&mut archive, &manifest, ROSTER_ENTRY)?;
    let holidays: Vec<Holiday> = verified_entry(&mut archive, &manifest, HOLIDAYS_ENTRY)?;
    let attendance: Snapshot = verified_entry(&mut archive, &manifest, ATTENDANCE_ENTRY)?;

    check_unique("class", roster.classes.iter().map(|c| c.id.as_str()))?;
    check_unique("student", roster.students.iter().map(|s| s.id.as_str()))?;
    validate_holidays(&holidays).context("bundle holidays are invalid")?;
    assert_no_neutral_entries(&attendance).context("bundle attendance is invalid")?;

    Ok(WorkspaceBundle {
        classes: roster.classes,
        students: roster.students,
        holidays,
        academic_year_start: manifest.academic_year_start,
        attendance,
    })
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    archive
        .by_name(name)
        .with_context(|| format!("bundle missing {}", name))?
        .read_to_end(&mut bytes)
        .with_context(|| format!("failed to read {}", name))?;
    Ok(bytes)
}

fn verified_entry<T: DeserializeOwned>(
    archive: &mut ZipArchive<File>,
    manifest: &Manifest,
    name: &str,
) -> anyhow::Result<T> {
    let bytes = read_entry(archive, name)?;
    let expected = manifest
        .digests
        .get(name)
        .ok_or_else(|| anyhow!("manifest has no digest for {}", name))?;
    let actual = sha256_hex(&bytes);
    if *expected != actual {
        return Err(anyhow!(
            "checksum mismatch for {}: manifest {} but entry {}",
            name,
            expected,
            actual
        ));
    }
    serde_json::from_slice(&bytes).with_context(|| format!("{} is invalid", name))
}

fn check_unique<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) -> anyhow::Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(anyhow!("bundle has duplicate {} id {}", kind, id));
        }
    }
    Ok(())
}
