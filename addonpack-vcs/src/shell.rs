//! `VcsPort` backed by the `git` executable.

use crate::port::{TagDistance, VcsPort};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Cursor;
use std::process::{Command, Output};
use tracing::debug;

/// Git queries via the `git` binary found on `PATH`.
#[derive(Debug, Clone)]
pub struct ShellGit {
    root: Utf8PathBuf,
}

impl ShellGit {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn run(&self, args: &[&str]) -> anyhow::Result<Output> {
        debug!(root = %self.root, ?args, "git");
        Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .with_context(|| format!("run git {}", args.join(" ")))
    }

    /// Run git and return trimmed stdout, failing on a non-zero exit.
    fn stdout(&self, args: &[&str]) -> anyhow::Result<String> {
        let out = self.run(args)?;
        if !out.status.success() {
            anyhow::bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }
}

/// Reject names git would parse as options.
fn is_plain_ref(reference: &str) -> bool {
    !reference.is_empty() && !reference.starts_with('-')
}

/// `git describe --exclude` takes a glob; match `tag` literally.
fn escape_glob(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len());
    for c in tag.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Parse `git describe --long` output: `<tag>-<distance>-g<sha>`.
fn parse_long_describe(line: &str) -> Option<TagDistance> {
    let mut parts = line.rsplitn(3, '-');
    let hash = parts.next()?;
    let distance = parts.next()?.parse().ok()?;
    let tag = parts.next()?;
    if !hash.starts_with('g') || tag.is_empty() {
        return None;
    }
    Some(TagDistance {
        tag: tag.to_string(),
        distance,
    })
}

impl VcsPort for ShellGit {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn resolve_commit(&self, reference: &str) -> anyhow::Result<Option<String>> {
        if !is_plain_ref(reference) {
            return Ok(None);
        }
        let spec = format!("{reference}^{{commit}}");
        let out = self.run(&["rev-parse", "--verify", "--quiet", &spec])?;
        if !out.status.success() {
            return Ok(None);
        }
        let sha = String::from_utf8_lossy(&out.stdout).trim().to_string();
        Ok((!sha.is_empty()).then_some(sha))
    }

    fn is_tag(&self, name: &str) -> anyhow::Result<bool> {
        if !is_plain_ref(name) {
            return Ok(false);
        }
        let full = format!("refs/tags/{name}");
        let out = self.run(&["rev-parse", "--verify", "--quiet", &full])?;
        Ok(out.status.success())
    }

    fn describe(&self, commit: &str, skip: &[String]) -> anyhow::Result<Option<TagDistance>> {
        let excludes: Vec<String> = skip
            .iter()
            .map(|tag| format!("--exclude={}", escape_glob(tag)))
            .collect();
        let mut args = vec!["describe", "--tags", "--long", "--abbrev=40"];
        args.extend(excludes.iter().map(String::as_str));
        args.push(commit);
        let out = self.run(&args)?;
        if !out.status.success() {
            // No tag reachable (or no commits at all).
            debug!(
                commit,
                stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                "git describe found no tag"
            );
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&out.stdout).trim().to_string();
        parse_long_describe(&line)
            .map(Some)
            .with_context(|| format!("unexpected git describe output '{line}'"))
    }

    fn commit_count(&self, commit: &str) -> anyhow::Result<u64> {
        let count = self.stdout(&["rev-list", "--count", commit])?;
        count
            .parse()
            .with_context(|| format!("parse commit count '{count}'"))
    }

    fn commit_timestamp(&self, commit: &str) -> anyhow::Result<i64> {
        let ts = self.stdout(&["show", "-s", "--format=%ct", commit])?;
        ts.parse()
            .with_context(|| format!("parse commit timestamp '{ts}'"))
    }

    fn worktree_files(&self) -> anyhow::Result<Vec<Utf8PathBuf>> {
        let out = self.run(&["ls-files", "-z", "--cached", "--others", "--exclude-standard"])?;
        if !out.status.success() {
            anyhow::bail!(
                "git ls-files failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        let listing = String::from_utf8(out.stdout).context("git ls-files output is not utf-8")?;

        let mut files: Vec<Utf8PathBuf> = listing
            .split('\0')
            .filter(|p| !p.is_empty())
            .map(Utf8PathBuf::from)
            // Tracked but deleted in the working copy.
            .filter(|p| self.root.join(p).is_file())
            .collect();
        files.sort();
        files.dedup();
        Ok(files)
    }

    fn export_tree(&self, commit: &str, dest: &Utf8Path) -> anyhow::Result<()> {
        let out = self.run(&["archive", "--format=tar", commit])?;
        if !out.status.success() {
            anyhow::bail!(
                "git archive {} failed: {}",
                commit,
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        let mut archive = tar::Archive::new(Cursor::new(out.stdout));
        archive.set_preserve_mtime(false);
        archive
            .unpack(dest)
            .with_context(|| format!("unpack {commit} into {dest}"))
    }
}
