use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const IDENTITY: [(&str, &str); 7] = [
    ("GIT_AUTHOR_NAME", "Test"),
    ("GIT_AUTHOR_EMAIL", "test@test.com"),
    ("GIT_COMMITTER_NAME", "Test"),
    ("GIT_COMMITTER_EMAIL", "test@test.com"),
    ("GIT_MERGE_AUTOEDIT", "no"),
    ("GIT_CONFIG_NOSYSTEM", "1"),
    ("GIT_CONFIG_GLOBAL", "/dev/null"),
];

fn mdm(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("mdm").unwrap();
    cmd.current_dir(dir)
        .env("MDM_CONFIG", dir.join("no-such-config.toml"))
        .envs(IDENTITY);
    cmd
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .envs(IDENTITY)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim_end().to_string()
}

fn create_project(root: &Path, name: &str) -> PathBuf {
    let repo = root.join(name);
    std::fs::create_dir_all(&repo).unwrap();
    git(&repo, &["init", "-q"]);
    git(&repo, &["symbolic-ref", "HEAD", "refs/heads/master"]);
    std::fs::write(repo.join("alpha"), "alpha file\n").unwrap();
    git(&repo, &["add", "alpha"]);
    git(&repo, &["commit", "-q", "-m", &format!("commit 1 in {}", name)]);
    repo
}

/// A project with its own releases repo holding one release per version,
/// each carrying a file `beta` whose content names the version.
fn create_published_releases(root: &Path, versions: &[&str]) -> PathBuf {
    let project = create_project(root, "projectBeta");
    mdm(&project)
        .args(["release-init", "--use-defaults"])
        .assert()
        .success();
    for v in versions {
        std::fs::write(project.join("beta"), format!("beta {}", v)).unwrap();
        mdm(&project)
            .args(["release", "--version", v, "--files", "beta", "--skip-accumulation"])
            .assert()
            .success();
    }
    project.join("releases")
}

#[test]
fn help_exits_zero() {
    Command::cargo_bin("mdm")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("release-init"));
}

#[test]
fn no_args_shows_help() {
    Command::cargo_bin("mdm").unwrap().assert().failure();
}

#[test]
fn status_of_plain_repo() {
    let tmp = TempDir::new().unwrap();
    let project = create_project(tmp.path(), "projectAlpha");
    mdm(&project)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("no managed dependencies"));
}

#[test]
fn dash_c_changes_directory() {
    let tmp = TempDir::new().unwrap();
    create_project(tmp.path(), "projectAlpha");
    mdm(tmp.path())
        .args(["-C", "projectAlpha", "status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"modules\": []"));
}

#[test]
fn release_with_skip_accumulation_creates_exactly_its_refs() {
    let tmp = TempDir::new().unwrap();
    let project = create_project(tmp.path(), "projectAlpha");
    std::fs::write(project.join("whatever"), "placeholder").unwrap();

    mdm(&project)
        .args(["release-init", "--use-defaults"])
        .assert()
        .success()
        .stdout(predicate::str::contains(":D"));
    mdm(&project)
        .args(["release", "--version", "v1", "--files", "whatever", "--skip-accumulation"])
        .assert()
        .success()
        .stdout(predicate::str::contains("release version v1 complete"));

    let releases = project.join("releases");
    let refs = git(&releases, &["for-each-ref", "--format=%(refname)"]);
    let mut refs: Vec<&str> = refs.lines().collect();
    refs.sort();
    assert_eq!(
        refs,
        vec![
            "refs/heads/master",
            "refs/heads/mdm/init",
            "refs/heads/mdm/release/v1",
            "refs/tags/mdm/master/v1",
            "refs/tags/release/v1",
        ]
    );

    let master = git(&releases, &["ls-tree", "--name-only", "master"]);
    assert_eq!(master, "README");
    let released = git(&releases, &["ls-tree", "--name-only", "release/v1"]);
    assert_eq!(released, "whatever");

    assert_eq!(git(&project, &["status", "--porcelain", "--", "releases"]), "");
}

#[test]
fn repeated_release_is_refused() {
    let tmp = TempDir::new().unwrap();
    let project = create_project(tmp.path(), "projectAlpha");
    std::fs::write(project.join("whatever"), "placeholder").unwrap();
    mdm(&project)
        .args(["release-init", "--use-defaults"])
        .assert()
        .success();
    mdm(&project)
        .args(["release", "--version", "v1", "--files", "whatever"])
        .assert()
        .success();
    mdm(&project)
        .args(["release", "--version", "v1", "--files", "whatever"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(":("));
}

#[test]
fn add_then_status_json() {
    let tmp = TempDir::new().unwrap();
    let releases = create_published_releases(tmp.path(), &["v1.0", "v2.0"]);
    let project = create_project(tmp.path(), "projectAlpha");

    mdm(&project)
        .args(["add", releases.to_str().unwrap(), "--name", "beta", "--use-defaults"])
        .assert()
        .success();
    assert_eq!(
        std::fs::read_to_string(project.join("lib/beta/beta")).unwrap(),
        "beta v2.0"
    );

    mdm(&project)
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"path\": \"lib/beta\""))
        .stdout(predicate::str::contains("\"version_wanted\": \"v2.0\""));
}

#[test]
fn fresh_clone_updates_dependencies() {
    let tmp = TempDir::new().unwrap();
    let releases = create_published_releases(tmp.path(), &["v1.0"]);
    let project = create_project(tmp.path(), "projectAlpha");
    mdm(&project)
        .args(["add", releases.to_str().unwrap(), "--name", "beta", "--version", "v1.0"])
        .assert()
        .success();

    git(tmp.path(), &["clone", "-q", "projectAlpha", "clone"]);
    let clone = tmp.path().join("clone");
    mdm(&clone)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("-- uninitialized"));

    mdm(&clone).arg("update").assert().success();
    assert_eq!(
        std::fs::read_to_string(clone.join("lib/beta/beta")).unwrap(),
        "beta v1.0"
    );
}

#[test]
fn merge_taking_their_version() {
    let tmp = TempDir::new().unwrap();
    let releases = create_published_releases(tmp.path(), &["v1.0", "v2.0"]);
    let project = create_project(tmp.path(), "projectAlpha");
    mdm(&project)
        .args(["add", releases.to_str().unwrap(), "--name", "beta", "--version", "v1.0"])
        .assert()
        .success();

    git(&project, &["checkout", "-q", "-b", "upgrade"]);
    mdm(&project)
        .args(["alter", "lib/beta", "--version", "v2.0"])
        .assert()
        .success();
    git(&project, &["checkout", "-q", "master"]);
    mdm(&project).arg("update").assert().success();
    std::fs::write(project.join("alpha"), "alpha changed\n").unwrap();
    git(&project, &["commit", "-q", "-m", "unrelated change", "--", "alpha"]);

    git(&project, &["merge", "-q", "--no-edit", "upgrade"]);
    mdm(&project)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("-- currently v1.0 checked out"));

    mdm(&project).args(["update", "--strict"]).assert().success();
    assert_eq!(
        std::fs::read_to_string(project.join("lib/beta/beta")).unwrap(),
        "beta v2.0"
    );
}

#[test]
fn merge_keeping_our_version() {
    let tmp = TempDir::new().unwrap();
    let releases = create_published_releases(tmp.path(), &["v1.0", "v2.0"]);
    let project = create_project(tmp.path(), "projectAlpha");
    mdm(&project)
        .args(["add", releases.to_str().unwrap(), "--name", "beta", "--version", "v1.0"])
        .assert()
        .success();

    git(&project, &["checkout", "-q", "-b", "upgrade"]);
    mdm(&project)
        .args(["alter", "lib/beta", "--version", "v2.0"])
        .assert()
        .success();
    git(&project, &["checkout", "-q", "master"]);
    mdm(&project).arg("update").assert().success();

    git(&project, &["merge", "-q", "--no-edit", "-s", "ours", "upgrade"]);
    mdm(&project).args(["update", "--strict"]).assert().success();
    assert_eq!(
        std::fs::read_to_string(project.join("lib/beta/beta")).unwrap(),
        "beta v1.0"
    );
}

#[test]
fn missing_dependency_work_tree_is_restored() {
    let tmp = TempDir::new().unwrap();
    let releases = create_published_releases(tmp.path(), &["v1.0"]);
    let project = create_project(tmp.path(), "projectAlpha");
    mdm(&project)
        .args(["add", releases.to_str().unwrap(), "--name", "beta", "--version", "v1.0"])
        .assert()
        .success();

    std::fs::remove_dir_all(project.join("lib/beta")).unwrap();
    mdm(&project).args(["update", "--strict"]).assert().success();
    assert_eq!(
        std::fs::read_to_string(project.join("lib/beta/beta")).unwrap(),
        "beta v1.0"
    );
}

#[test]
fn strict_update_fails_on_unknown_version() {
    let tmp = TempDir::new().unwrap();
    let releases = create_published_releases(tmp.path(), &["v1.0"]);
    let project = create_project(tmp.path(), "projectAlpha");
    mdm(&project)
        .args(["add", releases.to_str().unwrap(), "--name", "beta", "--version", "v1.0"])
        .assert()
        .success();
    git(
        &project,
        &["config", "-f", ".gitmodules", "submodule.lib/beta.mdm-version", "v9.9"],
    );

    mdm(&project)
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains(":I"));
    mdm(&project)
        .args(["update", "--strict"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(":("));
}

#[test]
fn remove_outside_a_dependency_is_sad() {
    let tmp = TempDir::new().unwrap();
    let project = create_project(tmp.path(), "projectAlpha");
    mdm(&project)
        .args(["remove", "lib/nothing"])
        .assert()
        .code(1);
}
