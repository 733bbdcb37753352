//! Turn a [`VersionRef`] into a concrete [`ResolvedVersion`].

use crate::port::{TagDistance, VcsPort};
use addonpack_types::version::{PLACEHOLDER_VERSION, version_from_tag};
use addonpack_types::{ResolvedVersion, VersionRef};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The reference names no tag or commit in history.
    #[error("unknown version reference '{reference}'")]
    UnknownReference { reference: String },

    /// `release` was requested but no version tag is reachable from `HEAD`.
    #[error("no release tag is reachable from HEAD")]
    NoReleaseFound,

    /// An explicitly named tag does not parse as a version.
    #[error("tag '{tag}' is not a semantic version")]
    UnparseableTag { tag: String },

    #[error("version control query failed: {0:#}")]
    Vcs(#[from] anyhow::Error),
}

/// Resolves version references against a read-only history.
///
/// Stateless apart from the borrowed port, so one resolver can serve every
/// build unit of a run.
pub struct VersionResolver<'a> {
    vcs: &'a dyn VcsPort,
}

impl<'a> VersionResolver<'a> {
    pub fn new(vcs: &'a dyn VcsPort) -> Self {
        Self { vcs }
    }

    pub fn resolve(&self, reference: &VersionRef) -> Result<ResolvedVersion, ResolveError> {
        let resolved = match reference {
            VersionRef::Dev => self.resolve_live()?,
            VersionRef::Current => {
                let head = self.head()?;
                self.resolve_commit(&head)?
            }
            VersionRef::Release => {
                let head = self
                    .vcs
                    .resolve_commit("HEAD")?
                    .ok_or(ResolveError::NoReleaseFound)?;
                let nearest = self
                    .nearest_version_tag(&head)?
                    .ok_or(ResolveError::NoReleaseFound)?;
                self.resolve_tag(&nearest.tag)?
            }
            VersionRef::Explicit(name) => {
                if self.vcs.is_tag(name)? {
                    self.resolve_tag(name)?
                } else {
                    let commit = self.vcs.resolve_commit(name)?.ok_or_else(|| {
                        ResolveError::UnknownReference {
                            reference: name.clone(),
                        }
                    })?;
                    self.resolve_commit(&commit)?
                }
            }
        };
        debug!(%reference, version = %resolved, live = resolved.is_live(), "resolved version");
        Ok(resolved)
    }

    fn head(&self) -> Result<String, ResolveError> {
        self.vcs
            .resolve_commit("HEAD")?
            .ok_or_else(|| ResolveError::UnknownReference {
                reference: "HEAD".to_string(),
            })
    }

    /// Nearest tag reachable from `commit` whose name parses as a version.
    ///
    /// Tags such as `nightly` are stepped over, so an older `v1.2.0` further
    /// back in history still counts.
    fn nearest_version_tag(&self, commit: &str) -> Result<Option<TagDistance>, ResolveError> {
        let mut skipped: Vec<String> = Vec::new();
        while let Some(nearest) = self.vcs.describe(commit, &skipped)? {
            if version_from_tag(&nearest.tag).is_some() {
                return Ok(Some(nearest));
            }
            if skipped.contains(&nearest.tag) {
                break;
            }
            debug!(tag = %nearest.tag, commit, "skipping tag that is not a version");
            skipped.push(nearest.tag);
        }
        Ok(None)
    }

    /// The working copy sits on top of the nearest version tag, if any.
    fn resolve_live(&self) -> Result<ResolvedVersion, ResolveError> {
        let Some(head) = self.vcs.resolve_commit("HEAD")? else {
            return Ok(ResolvedVersion::live(None));
        };
        let base = self
            .nearest_version_tag(&head)?
            .and_then(|nearest| version_from_tag(&nearest.tag));
        Ok(ResolvedVersion::live(base))
    }

    fn resolve_tag(&self, tag: &str) -> Result<ResolvedVersion, ResolveError> {
        let version = version_from_tag(tag).ok_or_else(|| ResolveError::UnparseableTag {
            tag: tag.to_string(),
        })?;
        let commit =
            self.vcs
                .resolve_commit(tag)?
                .ok_or_else(|| ResolveError::UnknownReference {
                    reference: tag.to_string(),
                })?;
        let committed_at = self.vcs.commit_timestamp(&commit)?;
        Ok(ResolvedVersion::committed(version, &commit, 0, committed_at))
    }

    /// Describe an arbitrary commit relative to its nearest tag.
    fn resolve_commit(&self, commit: &str) -> Result<ResolvedVersion, ResolveError> {
        let committed_at = self.vcs.commit_timestamp(commit)?;
        match self.nearest_version_tag(commit)? {
            Some(nearest) => {
                let base = version_from_tag(&nearest.tag).ok_or(ResolveError::UnparseableTag {
                    tag: nearest.tag.clone(),
                })?;
                Ok(ResolvedVersion::committed(
                    base,
                    commit,
                    nearest.distance,
                    committed_at,
                ))
            }
            None => {
                let count = self.vcs.commit_count(commit)?;
                Ok(ResolvedVersion::committed(
                    PLACEHOLDER_VERSION,
                    commit,
                    count,
                    committed_at,
                ))
            }
        }
    }
}
