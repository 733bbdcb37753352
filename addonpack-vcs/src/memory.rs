//! In-memory `VcsPort` for embedding and testing.

use crate::port::{TagDistance, VcsPort};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use std::collections::BTreeMap;

/// One commit of a linear in-memory history.
#[derive(Debug, Clone)]
pub struct MemoryCommit {
    pub id: String,
    pub timestamp: i64,
    pub tags: Vec<String>,
    pub files: BTreeMap<Utf8PathBuf, Vec<u8>>,
}

/// Linear history whose last commit is `HEAD`.
///
/// Abbreviated ids resolve when the prefix is at least four characters and
/// unique. When several tags share a commit, the last one added wins in
/// [`describe`](VcsPort::describe).
#[derive(Debug, Clone)]
pub struct InMemoryHistory {
    root: Utf8PathBuf,
    commits: Vec<MemoryCommit>,
    worktree: Vec<Utf8PathBuf>,
}

impl InMemoryHistory {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            commits: Vec::new(),
            worktree: Vec::new(),
        }
    }

    /// Append a commit on top of `HEAD`.
    pub fn commit<P, C>(
        mut self,
        id: &str,
        timestamp: i64,
        files: impl IntoIterator<Item = (P, C)>,
    ) -> Self
    where
        P: Into<Utf8PathBuf>,
        C: Into<Vec<u8>>,
    {
        self.commits.push(MemoryCommit {
            id: id.to_string(),
            timestamp,
            tags: Vec::new(),
            files: files
                .into_iter()
                .map(|(p, c)| (p.into(), c.into()))
                .collect(),
        });
        self
    }

    /// Tag the current `HEAD`. Ignored on an empty history.
    pub fn tag(mut self, name: &str) -> Self {
        if let Some(head) = self.commits.last_mut() {
            head.tags.push(name.to_string());
        }
        self
    }

    /// Declare the working copy file list (files must exist under the root).
    pub fn worktree<P: Into<Utf8PathBuf>>(mut self, files: impl IntoIterator<Item = P>) -> Self {
        self.worktree = files.into_iter().map(Into::into).collect();
        self.worktree.sort();
        self
    }

    fn index_of(&self, reference: &str) -> Option<usize> {
        if reference == "HEAD" {
            return self.commits.len().checked_sub(1);
        }
        let name = reference.strip_prefix("refs/tags/").unwrap_or(reference);
        if let Some(i) = self
            .commits
            .iter()
            .rposition(|c| c.tags.iter().any(|t| t == name))
        {
            return Some(i);
        }
        if let Some(i) = self.commits.iter().position(|c| c.id == reference) {
            return Some(i);
        }
        if reference.len() < 4 {
            return None;
        }
        let mut matches = self
            .commits
            .iter()
            .enumerate()
            .filter(|(_, c)| c.id.starts_with(reference));
        match (matches.next(), matches.next()) {
            (Some((i, _)), None) => Some(i),
            _ => None,
        }
    }

    fn commit_at(&self, commit: &str) -> anyhow::Result<(usize, &MemoryCommit)> {
        let idx = self
            .index_of(commit)
            .with_context(|| format!("unknown commit {commit}"))?;
        let found = self
            .commits
            .get(idx)
            .with_context(|| format!("unknown commit {commit}"))?;
        Ok((idx, found))
    }
}

impl VcsPort for InMemoryHistory {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn resolve_commit(&self, reference: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .index_of(reference)
            .and_then(|i| self.commits.get(i))
            .map(|c| c.id.clone()))
    }

    fn is_tag(&self, name: &str) -> anyhow::Result<bool> {
        Ok(self.commits.iter().any(|c| c.tags.iter().any(|t| t == name)))
    }

    fn describe(&self, commit: &str, skip: &[String]) -> anyhow::Result<Option<TagDistance>> {
        let (idx, _) = self.commit_at(commit)?;
        let found = self
            .commits
            .iter()
            .take(idx + 1)
            .rev()
            .enumerate()
            .find_map(|(distance, c)| {
                c.tags
                    .iter()
                    .rev()
                    .find(|tag| !skip.contains(*tag))
                    .map(|tag| TagDistance {
                        tag: tag.clone(),
                        distance: distance as u64,
                    })
            });
        Ok(found)
    }

    fn commit_count(&self, commit: &str) -> anyhow::Result<u64> {
        let (idx, _) = self.commit_at(commit)?;
        Ok(idx as u64 + 1)
    }

    fn commit_timestamp(&self, commit: &str) -> anyhow::Result<i64> {
        Ok(self.commit_at(commit)?.1.timestamp)
    }

    fn worktree_files(&self) -> anyhow::Result<Vec<Utf8PathBuf>> {
        Ok(self.worktree.clone())
    }

    fn export_tree(&self, commit: &str, dest: &Utf8Path) -> anyhow::Result<()> {
        let (_, found) = self.commit_at(commit)?;
        for (rel, contents) in &found.files {
            let path = dest.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, contents)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> InMemoryHistory {
        let none: [(&str, &str); 0] = [];
        InMemoryHistory::new("/repo")
            .commit("aaaa1111", 10, none)
            .tag("v0.1.0")
            .commit("bbbb2222", 20, none)
            .commit("cccc3333", 30, none)
    }

    #[test]
    fn resolves_head_tags_ids_and_prefixes() {
        let h = history();
        assert_eq!(h.resolve_commit("HEAD").unwrap().as_deref(), Some("cccc3333"));
        assert_eq!(h.resolve_commit("v0.1.0").unwrap().as_deref(), Some("aaaa1111"));
        assert_eq!(h.resolve_commit("bbbb").unwrap().as_deref(), Some("bbbb2222"));
        assert_eq!(h.resolve_commit("bb").unwrap(), None);
        assert_eq!(h.resolve_commit("nope").unwrap(), None);
    }

    #[test]
    fn describe_counts_distance_to_nearest_tag() {
        let h = history();
        assert_eq!(
            h.describe("HEAD", &[]).unwrap(),
            Some(TagDistance {
                tag: "v0.1.0".to_string(),
                distance: 2
            })
        );
        assert_eq!(h.describe("HEAD", &["v0.1.0".to_string()]).unwrap(), None);
        assert_eq!(h.commit_count("bbbb2222").unwrap(), 2);
    }

    #[test]
    fn empty_history_has_no_head() {
        let h = InMemoryHistory::new("/repo");
        assert_eq!(h.resolve_commit("HEAD").unwrap(), None);
    }
}
