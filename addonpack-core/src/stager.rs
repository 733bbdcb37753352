//! Materialize a source snapshot at a resolved version into a build directory.

use crate::error::{PipelineError, PipelineResult};
use crate::ports::VcsPort;
use addonpack_types::stage::STAGE_MARKER_FILE;
use addonpack_types::{Channel, ResolvedVersion, StageMarker, StageState, ToolkitVariant};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use tracing::{debug, info};
use walkdir::WalkDir;

/// A staged directory and its persisted marker.
#[derive(Debug, Clone)]
pub struct StagedTree {
    root: Utf8PathBuf,
    marker: StageMarker,
}

impl StagedTree {
    /// Open a previously staged tree, requiring it to have reached `required`
    /// for exactly `version`.
    pub fn open(
        dir: &Utf8Path,
        required: StageState,
        version: &ResolvedVersion,
    ) -> PipelineResult<Self> {
        let not_staged = |reason: String| PipelineError::NotStaged {
            dir: dir.to_path_buf(),
            required,
            reason,
        };

        let marker = match read_marker(dir) {
            Ok(Some(marker)) => marker,
            Ok(None) => return Err(not_staged("no stage marker found".to_string())),
            Err(e) => return Err(not_staged(format!("unreadable stage marker: {e:#}"))),
        };
        if marker.version != *version {
            return Err(not_staged(format!(
                "staged for version {}, requested {}",
                marker.version, version
            )));
        }
        if marker.state < required {
            return Err(not_staged(format!("tree is only {}", marker.state)));
        }
        Ok(Self {
            root: dir.to_path_buf(),
            marker,
        })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn marker(&self) -> &StageMarker {
        &self.marker
    }

    pub fn version(&self) -> &ResolvedVersion {
        &self.marker.version
    }

    pub fn state(&self) -> StageState {
        self.marker.state
    }

    /// Python package directory of the add-on inside the tree.
    pub fn module_dir(&self, module_name: &str) -> Utf8PathBuf {
        self.root.join("src").join(module_name)
    }

    pub fn set_state(&mut self, state: StageState) -> PipelineResult<()> {
        self.marker.state = state;
        self.save()
    }

    pub fn set_target(&mut self, variant: ToolkitVariant, channel: Channel) -> PipelineResult<()> {
        self.marker.variant = Some(variant);
        self.marker.channel = Some(channel);
        self.save()
    }

    fn save(&self) -> PipelineResult<()> {
        let path = self.root.join(STAGE_MARKER_FILE);
        let json = serde_json::to_string_pretty(&self.marker).context("serialize stage marker")?;
        fs::write(&path, json).with_context(|| format!("write {path}"))?;
        Ok(())
    }
}

/// Read the stage marker of `dir`, `Ok(None)` if it has none.
pub fn read_marker(dir: &Utf8Path) -> anyhow::Result<Option<StageMarker>> {
    let path = dir.join(STAGE_MARKER_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let contents = fs::read_to_string(&path)?;
    let marker = serde_json::from_str(&contents).with_context(|| format!("parse {path}"))?;
    Ok(Some(marker))
}

/// Stages working copies and committed trees into isolated directories.
///
/// The non-empty-foreign-directory check guards against staging over user
/// data. It is not a lock: two units must never share a destination.
pub struct WorkTreeStager<'a> {
    vcs: &'a dyn VcsPort,
    preserve: &'a [Utf8PathBuf],
    exclude: Vec<Utf8PathBuf>,
}

impl<'a> WorkTreeStager<'a> {
    pub fn new(vcs: &'a dyn VcsPort, preserve: &'a [Utf8PathBuf]) -> Self {
        Self {
            vcs,
            preserve,
            exclude: Vec::new(),
        }
    }

    /// Never copy `rel` (relative to the source root), e.g. the build directory.
    pub fn exclude(mut self, rel: impl Into<Utf8PathBuf>) -> Self {
        self.exclude.push(rel.into());
        self
    }

    pub fn stage(&self, version: &ResolvedVersion, dest: &Utf8Path) -> PipelineResult<StagedTree> {
        self.claim(dest)?;
        fs::create_dir_all(dest).with_context(|| format!("create {dest}"))?;

        let mut tree = StagedTree {
            root: dest.to_path_buf(),
            marker: StageMarker::new(version.clone()),
        };
        tree.save()?;

        let kept: Vec<&Utf8PathBuf> = self
            .preserve
            .iter()
            .filter(|p| dest.join(p).exists())
            .collect();

        let copied = match version.commit() {
            None => {
                info!(%dest, "staging working copy");
                let files = self.vcs.worktree_files()?;
                copy_files(self.vcs.root(), &files, dest, |rel| self.skip(rel, &kept))?
            }
            Some(commit) => {
                info!(%dest, commit, "staging committed tree");
                self.export_commit(commit, dest, &kept)?
            }
        };
        debug!(%dest, files = copied, "staged");

        tree.set_state(StageState::Staged)?;
        Ok(tree)
    }

    /// Make `dest` safe to stage into: absent, empty, or ours (then cleared).
    fn claim(&self, dest: &Utf8Path) -> PipelineResult<()> {
        if !dest.exists() {
            return Ok(());
        }
        let conflict = || PipelineError::StageConflict {
            dir: dest.to_path_buf(),
        };
        if !dest.is_dir() {
            return Err(conflict());
        }
        let mut entries = fs::read_dir(dest).with_context(|| format!("read {dest}"))?;
        if entries.next().is_none() {
            return Ok(());
        }
        match read_marker(dest) {
            Ok(Some(previous)) => {
                debug!(%dest, previous = %previous.version, "clearing previously staged tree");
                clear_except(dest, Utf8Path::new(""), self.preserve)?;
                Ok(())
            }
            Ok(None) | Err(_) => Err(conflict()),
        }
    }

    fn export_commit(
        &self,
        commit: &str,
        dest: &Utf8Path,
        kept: &[&Utf8PathBuf],
    ) -> PipelineResult<usize> {
        let parent = dest.parent().unwrap_or(dest);
        let scratch = tempfile::Builder::new()
            .prefix(".addonpack-export-")
            .tempdir_in(parent)
            .with_context(|| format!("create export scratch dir in {parent}"))?;
        let scratch_root = Utf8Path::from_path(scratch.path())
            .with_context(|| format!("non utf-8 path {}", scratch.path().display()))?;

        self.vcs
            .export_tree(commit, scratch_root)
            .with_context(|| format!("export {commit}"))?;

        let mut files = Vec::new();
        for entry in WalkDir::new(scratch_root).sort_by_file_name() {
            let entry = entry.context("walk exported tree")?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(scratch_root)
                .context("exported path outside scratch dir")?;
            let rel = Utf8Path::from_path(rel)
                .with_context(|| format!("non utf-8 path {}", rel.display()))?;
            files.push(rel.to_path_buf());
        }
        let copied = copy_files(scratch_root, &files, dest, |rel| self.skip(rel, kept))?;
        Ok(copied)
    }

    fn skip(&self, rel: &Utf8Path, kept: &[&Utf8PathBuf]) -> bool {
        rel.components().next().is_some_and(|c| c.as_str() == ".git")
            || rel.as_str() == STAGE_MARKER_FILE
            || self.exclude.iter().any(|ex| rel.starts_with(ex))
            || kept.iter().any(|keep| rel.starts_with(keep))
    }
}

fn copy_files(
    src_root: &Utf8Path,
    files: &[Utf8PathBuf],
    dest: &Utf8Path,
    skip: impl Fn(&Utf8Path) -> bool,
) -> anyhow::Result<usize> {
    let mut copied = 0;
    for rel in files {
        if skip(rel) {
            debug!(%rel, "not staged");
            continue;
        }
        let to = dest.join(rel);
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src_root.join(rel), &to)?;
        copied += 1;
    }
    Ok(copied)
}

/// Remove everything below `dir/rel` except the `preserve` paths.
fn clear_except(dir: &Utf8Path, rel: &Utf8Path, preserve: &[Utf8PathBuf]) -> anyhow::Result<()> {
    for entry in fs::read_dir(dir.join(rel))? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name
            .to_str()
            .with_context(|| format!("non utf-8 file name in {}", dir.join(rel)))?;
        let child = rel.join(name);
        if preserve.iter().any(|p| *p == child) {
            debug!(%child, "preserved");
            continue;
        }
        let path = dir.join(&child);
        let is_dir = entry.file_type()?.is_dir();
        if is_dir && preserve.iter().any(|p| p.starts_with(&child)) {
            clear_except(dir, &child, preserve)?;
        } else if is_dir {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use addonpack_vcs::InMemoryHistory;
    use semver::Version;
    use tempfile::TempDir;

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        (temp, root)
    }

    fn history() -> InMemoryHistory {
        InMemoryHistory::new("/unused")
            .commit(
                "1111aaaa",
                100,
                [
                    ("src/demo/__init__.py", "v1\n"),
                    ("designer/dialog.ui", "<ui/>"),
                ],
            )
            .tag("v1.0.0")
    }

    fn v1() -> ResolvedVersion {
        ResolvedVersion::committed(Version::new(1, 0, 0), "1111aaaa", 0, 100)
    }

    #[test]
    fn stages_committed_tree_and_marks_it() {
        let (_t, root) = temp_root();
        let dest = root.join("dist/qt5-local");
        let h = history();
        let tree = WorkTreeStager::new(&h, &[]).stage(&v1(), &dest).expect("stage");

        assert_eq!(tree.state(), StageState::Staged);
        assert_eq!(
            std::fs::read_to_string(dest.join("src/demo/__init__.py")).unwrap(),
            "v1\n"
        );
        let marker = read_marker(&dest).unwrap().unwrap();
        assert_eq!(marker.version, v1());
        assert_eq!(marker.state, StageState::Staged);
    }

    #[test]
    fn refuses_foreign_non_empty_directory() {
        let (_t, root) = temp_root();
        std::fs::write(root.join("precious.txt"), "user data").unwrap();
        let h = history();
        let err = WorkTreeStager::new(&h, &[]).stage(&v1(), &root).unwrap_err();
        assert!(matches!(err, PipelineError::StageConflict { .. }));
        assert!(root.join("precious.txt").exists());
    }

    #[test]
    fn empty_existing_directory_is_fine() {
        let (_t, root) = temp_root();
        let h = history();
        WorkTreeStager::new(&h, &[]).stage(&v1(), &root).expect("stage");
    }

    #[test]
    fn restaging_clears_transform_output_but_keeps_preserved() {
        let (_t, root) = temp_root();
        let dest = root.join("tree");
        let h = history();
        let preserve = vec![Utf8PathBuf::from("src/demo/vendor")];
        let stager = WorkTreeStager::new(&h, &preserve);

        stager.stage(&v1(), &dest).expect("stage");
        std::fs::write(dest.join("src/demo/manifest.json"), "{}").unwrap();
        std::fs::create_dir_all(dest.join("src/demo/vendor")).unwrap();
        std::fs::write(dest.join("src/demo/vendor/lib.py"), "built").unwrap();

        stager.stage(&v1(), &dest).expect("restage");
        assert!(!dest.join("src/demo/manifest.json").exists());
        assert_eq!(
            std::fs::read_to_string(dest.join("src/demo/vendor/lib.py")).unwrap(),
            "built"
        );
        assert!(dest.join("src/demo/__init__.py").exists());
    }

    #[test]
    fn open_checks_marker_state_and_version() {
        let (_t, root) = temp_root();
        let dest = root.join("tree");
        let h = history();

        let missing = StagedTree::open(&dest, StageState::Staged, &v1()).unwrap_err();
        assert!(matches!(missing, PipelineError::NotStaged { .. }));

        WorkTreeStager::new(&h, &[]).stage(&v1(), &dest).expect("stage");
        StagedTree::open(&dest, StageState::Staged, &v1()).expect("open staged");

        let not_built = StagedTree::open(&dest, StageState::Built, &v1()).unwrap_err();
        assert!(not_built.to_string().contains("only staged"));

        let other = ResolvedVersion::live(None);
        let wrong = StagedTree::open(&dest, StageState::Staged, &other).unwrap_err();
        assert!(wrong.to_string().contains("staged for version 1.0.0"));
    }
}
