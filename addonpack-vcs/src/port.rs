//! Port trait abstracting read-only history queries.

use camino::{Utf8Path, Utf8PathBuf};

/// Nearest tag reachable from a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDistance {
    pub tag: String,
    /// Commits between the tag and the described commit.
    pub distance: u64,
}

/// Read-only version-control queries.
///
/// Implementations must be safe to share between build units; none of these
/// operations mutate the repository.
pub trait VcsPort {
    /// Working copy root.
    fn root(&self) -> &Utf8Path;

    /// Resolve a named reference (branch, tag, `HEAD`, full or abbreviated id)
    /// to a full commit id. `Ok(None)` when the name is unknown.
    fn resolve_commit(&self, reference: &str) -> anyhow::Result<Option<String>>;

    /// Whether `name` is a tag.
    fn is_tag(&self, name: &str) -> anyhow::Result<bool>;

    /// Nearest tag reachable from `commit`, ignoring the tags named in `skip`,
    /// or `Ok(None)` if none is.
    fn describe(&self, commit: &str, skip: &[String]) -> anyhow::Result<Option<TagDistance>>;

    /// Number of commits reachable from `commit`, itself included.
    fn commit_count(&self, commit: &str) -> anyhow::Result<u64>;

    /// Committer timestamp of `commit` in seconds since the epoch.
    fn commit_timestamp(&self, commit: &str) -> anyhow::Result<i64>;

    /// Files of the live working copy (tracked plus untracked-but-not-ignored),
    /// relative to [`root`](Self::root). Never includes VCS metadata.
    fn worktree_files(&self) -> anyhow::Result<Vec<Utf8PathBuf>>;

    /// Write the tree of `commit` into `dest`, which must exist.
    fn export_tree(&self, commit: &str, dest: &Utf8Path) -> anyhow::Result<()>;
}
