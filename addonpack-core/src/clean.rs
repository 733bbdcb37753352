//! Removal of build output and Python bytecode.
//!
//! This is the only place staged trees are deleted.

use crate::error::PipelineResult;
use crate::settings::PipelineSettings;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub removed: Vec<Utf8PathBuf>,
}

pub fn clean(settings: &PipelineSettings) -> PipelineResult<CleanReport> {
    let mut report = CleanReport::default();

    if settings.build_dir.exists() {
        fs::remove_dir_all(&settings.build_dir)
            .with_context(|| format!("remove {}", settings.build_dir))?;
        report.removed.push(settings.build_dir.clone());
    }

    let src = settings.project_root.join("src");
    if src.is_dir() {
        for path in bytecode_paths(&src)? {
            if path.is_dir() {
                fs::remove_dir_all(&path).with_context(|| format!("remove {path}"))?;
            } else {
                fs::remove_file(&path).with_context(|| format!("remove {path}"))?;
            }
            debug!(%path, "removed");
            report.removed.push(path);
        }
    }

    info!(removed = report.removed.len(), "cleaned");
    Ok(report)
}

/// `__pycache__` directories and stray `*.pyc` files below `root`, sorted.
fn bytecode_paths(root: &Utf8Path) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let mut found = Vec::new();
    let mut walker = WalkDir::new(root).sort_by_file_name().into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy();
        let hit = if entry.file_type().is_dir() {
            name == "__pycache__"
        } else {
            name.ends_with(".pyc")
        };
        if !hit {
            continue;
        }
        if entry.file_type().is_dir() {
            walker.skip_current_dir();
        }
        let path = Utf8PathBuf::from_path_buf(entry.into_path())
            .map_err(|p| anyhow::anyhow!("non utf-8 path {}", p.display()))?;
        found.push(path);
    }
    Ok(found)
}
