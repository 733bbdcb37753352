//! Deterministic `.ankiaddon` packages of a staged module directory.
//!
//! A package is a zip archive with the module's contents at its root. Only
//! files are stored, sorted by path, deflated, with the zip epoch as their
//! timestamp and normalised permissions, so the same tree always yields the
//! same bytes.

use crate::error::PipelineResult;
use crate::stager::StagedTree;
use addonpack_types::{BuildUnit, Channel, ResolvedVersion, ToolkitVariant};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use sha2::{Digest, Sha256};
use std::io::{self, Seek, Write};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

pub const ARCHIVE_EXTENSION: &str = "ankiaddon";

/// `<module>-<version>-<variant>-<channel>.ankiaddon`
pub fn archive_name(
    module: &str,
    version: &ResolvedVersion,
    variant: ToolkitVariant,
    channel: Channel,
) -> String {
    format!("{module}-{version}-{variant}-{channel}.{ARCHIVE_EXTENSION}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutcome {
    pub path: Utf8PathBuf,
    /// Hex-encoded sha256 of the archive bytes.
    pub sha256: String,
    pub bytes: u64,
    /// Files written to the archive.
    pub entries: usize,
}

pub struct Packager {
    out_dir: Utf8PathBuf,
}

impl Packager {
    pub fn new(out_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Archive the module directory of `tree`, replacing any archive of the
    /// same name. Nothing is left at the destination if packaging fails.
    pub fn package(
        &self,
        tree: &StagedTree,
        unit: &BuildUnit,
        module: &str,
    ) -> PipelineResult<PackageOutcome> {
        let module_dir = tree.module_dir(module);
        if !module_dir.is_dir() {
            return Err(
                anyhow::anyhow!("module directory {module_dir} missing from staged tree").into(),
            );
        }
        fs::create_dir_all(&self.out_dir).with_context(|| format!("create {}", self.out_dir))?;

        let dest = self
            .out_dir
            .join(archive_name(module, &unit.version, unit.variant, unit.channel));
        let temp = NamedTempFile::new_in(&self.out_dir)
            .with_context(|| format!("create temp archive in {}", self.out_dir))?;

        let entries = write_archive(&module_dir, temp.as_file())
            .with_context(|| format!("archive {module_dir}"))?;
        temp.persist(&dest)
            .map_err(|e| e.error)
            .with_context(|| format!("write {dest}"))?;

        let bytes = fs::read(&dest).with_context(|| format!("read {dest}"))?;
        let outcome = PackageOutcome {
            sha256: hex::encode(Sha256::digest(&bytes)),
            bytes: bytes.len() as u64,
            entries,
            path: dest,
        };
        info!(
            archive = %outcome.path,
            sha256 = %outcome.sha256,
            bytes = outcome.bytes,
            entries = outcome.entries,
            "packaged"
        );
        Ok(outcome)
    }
}

fn write_archive<W: Write + Seek>(source: &Utf8Path, out: W) -> anyhow::Result<usize> {
    let mut zip = ZipWriter::new(out);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    let mut entries = 0;

    let walker = WalkDir::new(source)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded(e));
    for entry in walker {
        let entry = entry?;
        let rel = entry.path().strip_prefix(source)?;
        let rel = Utf8Path::from_path(rel)
            .with_context(|| format!("non utf-8 path {}", rel.display()))?;
        let path = entry.path();

        if entry.file_type().is_dir() {
            continue;
        }
        if !path.is_file() {
            debug!(%rel, "skipping special file");
            continue;
        }
        let metadata = fs::metadata(path)?;
        let mode = if is_executable(&metadata) { 0o755 } else { 0o644 };
        // Zip entry names always use forward slashes.
        let name = rel.components().map(|c| c.as_str()).collect::<Vec<_>>().join("/");
        zip.start_file(name, options.unix_permissions(mode))
            .with_context(|| format!("add {rel}"))?;
        io::copy(&mut fs::File::open(path)?, &mut zip)?;
        entries += 1;
    }

    zip.finish().context("finish zip archive")?;
    Ok(entries)
}

/// VCS metadata and Python bytecode never ship.
fn is_excluded(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with(".git") || name == "__pycache__" || name.ends_with(".pyc")
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    false
}
