use semver::{BuildMetadata, Version};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A user-supplied version reference, parsed once at the edge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum VersionRef {
    /// The uncommitted working copy.
    Dev,
    /// The latest commit on the active history line.
    Current,
    /// The most recent tag reachable from HEAD.
    #[default]
    Release,
    /// A tag name or commit reference.
    Explicit(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("version reference must not be empty")]
pub struct EmptyVersionRef;

impl FromStr for VersionRef {
    type Err = EmptyVersionRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s {
            "" => return Err(EmptyVersionRef),
            "dev" => VersionRef::Dev,
            "current" => VersionRef::Current,
            "release" => VersionRef::Release,
            other => VersionRef::Explicit(other.to_string()),
        })
    }
}

impl fmt::Display for VersionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRef::Dev => f.write_str("dev"),
            VersionRef::Current => f.write_str("current"),
            VersionRef::Release => f.write_str("release"),
            VersionRef::Explicit(r) => f.write_str(r),
        }
    }
}

/// Where a resolved version came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VersionOrigin {
    /// Uncommitted working copy. Never tagged in history.
    Live,
    /// A point in history.
    Committed {
        commit: String,
        /// Commits between the nearest reachable tag and `commit`.
        distance: u64,
        /// Committer timestamp, seconds since the epoch.
        committed_at: i64,
    },
}

/// A concrete, comparable version identifier.
///
/// Committed versions order by semantic-version precedence and then by their
/// distance past the tag they were derived from. The live working copy orders
/// above every committed version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedVersion {
    pub version: Version,
    pub origin: VersionOrigin,
}

/// Placeholder base used when no tag is reachable.
pub const PLACEHOLDER_VERSION: Version = Version::new(0, 0, 0);

impl ResolvedVersion {
    /// The live working copy on top of `base` (the nearest ancestor tag, if any).
    pub fn live(base: Option<Version>) -> Self {
        let mut version = base.unwrap_or(PLACEHOLDER_VERSION);
        version.build = BuildMetadata::new("dev").unwrap_or(BuildMetadata::EMPTY);
        Self {
            version,
            origin: VersionOrigin::Live,
        }
    }

    /// A committed point `distance` commits past a tag carrying `base`.
    ///
    /// When `distance` is non-zero the short commit id is recorded as build
    /// metadata so that two untagged commits never share a version string.
    pub fn committed(base: Version, commit: &str, distance: u64, committed_at: i64) -> Self {
        let mut version = base;
        version.build = BuildMetadata::EMPTY;
        if distance > 0 {
            let short: String = commit.chars().take(7).collect();
            if let Ok(meta) = BuildMetadata::new(&format!("{distance}.g{short}")) {
                version.build = meta;
            }
        }
        Self {
            version,
            origin: VersionOrigin::Committed {
                commit: commit.to_string(),
                distance,
                committed_at,
            },
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.origin, VersionOrigin::Live)
    }

    pub fn commit(&self) -> Option<&str> {
        match &self.origin {
            VersionOrigin::Live => None,
            VersionOrigin::Committed { commit, .. } => Some(commit),
        }
    }

    pub fn committed_at(&self) -> Option<i64> {
        match &self.origin {
            VersionOrigin::Live => None,
            VersionOrigin::Committed { committed_at, .. } => Some(*committed_at),
        }
    }
}

impl fmt::Display for ResolvedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version)
    }
}

impl Ord for ResolvedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank = match (&self.origin, &other.origin) {
            (VersionOrigin::Live, VersionOrigin::Committed { .. }) => Ordering::Greater,
            (VersionOrigin::Committed { .. }, VersionOrigin::Live) => Ordering::Less,
            (VersionOrigin::Live, VersionOrigin::Live) => {
                self.version.cmp_precedence(&other.version)
            }
            (
                VersionOrigin::Committed { distance: a, .. },
                VersionOrigin::Committed { distance: b, .. },
            ) => self
                .version
                .cmp_precedence(&other.version)
                .then_with(|| a.cmp(b)),
        };
        // Keep Ord consistent with Eq for divergent commits at equal rank.
        rank.then_with(|| self.version.cmp(&other.version))
            .then_with(|| self.commit().cmp(&other.commit()))
            .then_with(|| self.committed_at().cmp(&other.committed_at()))
    }
}

impl PartialOrd for ResolvedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Derive a semantic version from a tag name.
///
/// Accepts an optional `refs/tags/` prefix and a leading `v`/`V`. Tags with one
/// or two numeric components (`v2`, `v1.4`) are padded with zeros.
pub fn version_from_tag(tag: &str) -> Option<Version> {
    let name = tag.strip_prefix("refs/tags/").unwrap_or(tag);
    let name = name
        .strip_prefix('v')
        .or_else(|| name.strip_prefix('V'))
        .unwrap_or(name);

    if let Ok(v) = Version::parse(name) {
        return Some(v);
    }

    let parts: Vec<&str> = name.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    let mut nums = [0u64; 3];
    for (slot, part) in nums.iter_mut().zip(&parts) {
        *slot = part.parse().ok()?;
    }
    Some(Version::new(nums[0], nums[1], nums[2]))
}
