//! Clap-free settings for the pipeline.

use addonpack_types::BuildUnit;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Where the pipeline reads from and writes to.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Project root (contains `src/` and `addon.json`).
    pub project_root: Utf8PathBuf,

    /// Build output root. Staged trees live under `<build_dir>/dist`, archives
    /// directly under `<build_dir>`.
    pub build_dir: Utf8PathBuf,

    /// Paths, relative to a staged tree, that survive re-staging.
    pub preserve: Vec<Utf8PathBuf>,

    /// Designer (`.ui`) sources, relative to a staged tree.
    pub designer_dir: Utf8PathBuf,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::new(Utf8PathBuf::from("."))
    }
}

impl PipelineSettings {
    pub fn new(project_root: Utf8PathBuf) -> Self {
        Self {
            build_dir: project_root.join("build"),
            project_root,
            preserve: Vec::new(),
            designer_dir: Utf8PathBuf::from("designer"),
        }
    }

    pub fn dist_dir(&self) -> Utf8PathBuf {
        self.build_dir.join("dist")
    }

    /// Unit-scoped staging directory.
    pub fn unit_dir(&self, unit: &BuildUnit) -> Utf8PathBuf {
        self.dist_dir().join(unit.label())
    }

    /// The build dir relative to the project root, when it lies strictly inside it.
    ///
    /// Both paths are made absolute against the current directory and compared
    /// lexically, so a root of `.` and a build dir of `out` give `out`.
    pub fn build_dir_in_project(&self) -> Option<Utf8PathBuf> {
        let root = lexical_absolute(&self.project_root)?;
        let build = lexical_absolute(&self.build_dir)?;
        let rel = build.strip_prefix(&root).ok()?;
        (!rel.as_str().is_empty()).then(|| rel.to_path_buf())
    }
}

fn lexical_absolute(path: &Utf8Path) -> Option<Utf8PathBuf> {
    let absolute = std::path::absolute(path).ok()?;
    let absolute = Utf8PathBuf::from_path_buf(absolute).ok()?;
    let mut out = Utf8PathBuf::new();
    for component in absolute.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_str()),
        }
    }
    Some(out)
}
