//! Version resolution and tree export against real git repositories.

use addonpack_types::VersionRef;
use addonpack_vcs::{ResolveError, ShellGit, VcsPort, VersionResolver};
use camino::{Utf8Path, Utf8PathBuf};
use pretty_assertions::assert_eq;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn run_git(root: &Utf8Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .expect("run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn init_repo() -> (TempDir, Utf8PathBuf) {
    let temp = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
    run_git(&root, &["init", "-q"]);
    run_git(&root, &["config", "user.email", "test@example.com"]);
    run_git(&root, &["config", "user.name", "Test User"]);
    run_git(&root, &["config", "commit.gpgsign", "false"]);
    run_git(&root, &["config", "tag.gpgsign", "false"]);
    (temp, root)
}

fn commit_file(root: &Utf8Path, rel: &str, contents: &str, message: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(&path, contents).expect("write");
    run_git(root, &["add", "."]);
    run_git(root, &["commit", "-q", "-m", message]);
}

fn resolve(git: &ShellGit, r: &str) -> Result<addonpack_types::ResolvedVersion, ResolveError> {
    VersionResolver::new(git).resolve(&r.parse::<VersionRef>().expect("ref"))
}

#[test]
fn resolves_keywords_against_tagged_history() {
    let (_temp, root) = init_repo();
    commit_file(&root, "src/demo/__init__.py", "v1\n", "first");
    run_git(&root, &["tag", "v1.0.0"]);
    commit_file(&root, "src/demo/__init__.py", "v2\n", "second");
    run_git(&root, &["tag", "-a", "v1.2.0", "-m", "annotated"]);
    commit_file(&root, "src/demo/__init__.py", "v3\n", "third");

    let git = ShellGit::new(root.clone());

    let release = resolve(&git, "release").expect("release");
    assert_eq!(release.to_string(), "1.2.0");

    let current = resolve(&git, "current").expect("current");
    let head = git.resolve_commit("HEAD").expect("head").expect("some head");
    assert_eq!(current.commit(), Some(head.as_str()));
    assert!(current.to_string().starts_with("1.2.0+1.g"));
    assert!(current > release);

    let dev = resolve(&git, "dev").expect("dev");
    assert_eq!(dev.to_string(), "1.2.0+dev");
    assert!(dev > release);
    assert!(dev > current);

    let old = resolve(&git, "v1.0.0").expect("explicit tag");
    assert_eq!(old.to_string(), "1.0.0");
    assert!(old < release);

    let short: String = head.chars().take(9).collect();
    assert_eq!(resolve(&git, &short).expect("short sha"), current);
}

#[test]
fn unknown_reference_and_missing_release() {
    let (_temp, root) = init_repo();
    commit_file(&root, "README.md", "hi\n", "first");
    let git = ShellGit::new(root);

    assert!(matches!(
        resolve(&git, "v9.9.9"),
        Err(ResolveError::UnknownReference { .. })
    ));
    assert!(matches!(
        resolve(&git, "release"),
        Err(ResolveError::NoReleaseFound)
    ));
    assert!(resolve(&git, "current")
        .expect("current")
        .to_string()
        .starts_with("0.0.0+1.g"));
}

#[test]
fn release_steps_over_newer_non_version_tags() {
    let (_temp, root) = init_repo();
    commit_file(&root, "src/demo/__init__.py", "v1\n", "first");
    run_git(&root, &["tag", "v1.2.0"]);
    commit_file(&root, "src/demo/__init__.py", "v2\n", "second");
    run_git(&root, &["tag", "nightly"]);
    commit_file(&root, "src/demo/__init__.py", "v3\n", "third");
    run_git(&root, &["tag", "-a", "deploy", "-m", "annotated"]);

    let git = ShellGit::new(root.clone());
    let tagged = git.resolve_commit("v1.2.0").expect("rev-parse").expect("tag commit");

    let release = resolve(&git, "release").expect("release");
    assert_eq!(release.to_string(), "1.2.0");
    assert_eq!(release.commit(), Some(tagged.as_str()));

    assert!(resolve(&git, "current").expect("current").to_string().starts_with("1.2.0+2.g"));
    assert_eq!(resolve(&git, "dev").expect("dev").to_string(), "1.2.0+dev");
    assert!(matches!(
        resolve(&git, "nightly"),
        Err(ResolveError::UnparseableTag { ref tag }) if tag == "nightly"
    ));
}

#[test]
fn export_tree_matches_commit_not_working_copy() {
    let (_temp, root) = init_repo();
    commit_file(&root, "src/demo/__init__.py", "committed\n", "first");
    run_git(&root, &["tag", "v0.1.0"]);

    // Dirty the working copy after tagging.
    fs::write(root.join("src/demo/__init__.py"), "dirty\n").expect("write");
    fs::write(root.join("src/demo/extra.py"), "untracked\n").expect("write");

    let git = ShellGit::new(root.clone());
    let dest_temp = TempDir::new().expect("temp dir");
    let dest = Utf8PathBuf::from_path_buf(dest_temp.path().to_path_buf()).expect("utf8");
    git.export_tree("v0.1.0", &dest).expect("export");

    assert_eq!(
        fs::read_to_string(dest.join("src/demo/__init__.py")).expect("read"),
        "committed\n"
    );
    assert!(!dest.join("src/demo/extra.py").exists());
    assert!(!dest.join(".git").exists());
}

#[test]
fn worktree_files_include_untracked_but_not_ignored() {
    let (_temp, root) = init_repo();
    commit_file(&root, ".gitignore", "*.pyc\n", "ignore");
    commit_file(&root, "src/demo/gone.py", "x\n", "tracked");
    fs::remove_file(root.join("src/demo/gone.py")).expect("rm");
    fs::write(root.join("src/demo/new.py"), "new\n").expect("write");
    fs::write(root.join("src/demo/cache.pyc"), "bin").expect("write");

    let git = ShellGit::new(root);
    let files: Vec<String> = git
        .worktree_files()
        .expect("files")
        .into_iter()
        .map(|p| p.to_string())
        .collect();
    assert_eq!(files, vec![".gitignore".to_string(), "src/demo/new.py".to_string()]);
}
