#![cfg(test)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Once;
use tempfile::TempDir;

use crate::commands::{cmd_add, AddInputs, Mood};

const GIT_ENV: [(&str, &str); 7] = [
    ("GIT_AUTHOR_NAME", "Test"),
    ("GIT_AUTHOR_EMAIL", "test@test.com"),
    ("GIT_COMMITTER_NAME", "Test"),
    ("GIT_COMMITTER_EMAIL", "test@test.com"),
    ("GIT_MERGE_AUTOEDIT", "no"),
    ("GIT_CONFIG_NOSYSTEM", "1"),
    ("GIT_CONFIG_GLOBAL", "/dev/null"),
];

static GIT_ENV_INIT: Once = Once::new();

pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        // commands shell out to git themselves and inherit the process
        // environment; set it once, before any fixture runs git
        GIT_ENV_INIT.call_once(|| {
            for (key, value) in GIT_ENV {
                std::env::set_var(key, value);
            }
        });
        let dir = TempDir::new().expect("failed to create temp dir");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// A plain project on master with two tracked files and one commit.
    pub fn create_project(&self, name: &str) -> PathBuf {
        let repo_path = self.root().join(name);
        std::fs::create_dir_all(repo_path.join("dir")).unwrap();
        let run = git_in(repo_path.clone());

        run(&["init", "-q"]);
        run(&["symbolic-ref", "HEAD", "refs/heads/master"]);
        std::fs::write(repo_path.join("alpha"), "alpha file\n").unwrap();
        std::fs::write(repo_path.join("dir/alpha2"), "alpha2 file\n").unwrap();
        run(&["add", "--", "alpha", "dir/alpha2"]);
        run(&["commit", "-q", "-m", &format!("commit 1 in {}", name)]);

        repo_path
    }

    /// A releases repo laid out the way `mdm release-init` and `mdm release`
    /// leave one: README on master, `mdm/init`, and per version a
    /// `mdm/release/<v>` branch holding a single file `beta` plus its
    /// `release/<v>` tag.
    pub fn create_releases(&self, name: &str, versions: &[&str]) -> PathBuf {
        let repo_path = self.root().join(name);
        std::fs::create_dir_all(&repo_path).unwrap();
        let run = git_in(repo_path.clone());

        run(&["init", "-q"]);
        run(&["symbolic-ref", "HEAD", "refs/heads/master"]);
        std::fs::write(repo_path.join("README"), format!("releases for {}\n", name)).unwrap();
        run(&["add", "--", "README"]);
        run(&["commit", "-q", "-m", "initialize releases repo"]);
        run(&["branch", "mdm/init"]);

        for v in versions {
            let branch = format!("mdm/release/{}", v);
            run(&["checkout", "-q", "-b", &branch, "mdm/init"]);
            run(&["rm", "-q", "--", "README"]);
            std::fs::write(repo_path.join("beta"), format!("beta {}", v)).unwrap();
            run(&["add", "--", "beta"]);
            run(&["commit", "-q", "-m", &format!("release version {}", v)]);
            run(&["tag", &format!("release/{}", v)]);
            run(&["checkout", "-q", "master"]);
        }

        repo_path
    }

    /// Deletes the object holding `beta` in `version`'s release, so the
    /// release is still advertised but fetching it fails.
    pub fn break_release(&self, releases: &Path, version: &str) {
        let output = Command::new("git")
            .args(["rev-parse", &format!("mdm/release/{}:beta", version)])
            .current_dir(releases)
            .envs(GIT_ENV)
            .output()
            .expect("failed to run git");
        let id = String::from_utf8(output.stdout).unwrap().trim().to_string();
        assert_eq!(id.len(), 40, "no blob for beta in {}", version);
        let (dir, file) = id.split_at(2);
        std::fs::remove_file(releases.join(".git/objects").join(dir).join(file)).unwrap();
    }

    /// Runs `mdm add` for `releases` at `version`, landing in `lib/<name>`.
    pub fn add_dependency(&self, repo: &Path, releases: &Path, name: &str, version: &str) {
        let result = cmd_add(
            repo,
            AddInputs {
                url: releases.to_string_lossy().to_string(),
                name: Some(name.to_string()),
                version: Some(version.to_string()),
                lib: "lib".to_string(),
                use_defaults: true,
            },
        )
        .expect("mdm add failed");
        assert_eq!(result.mood, Mood::Joy, "{}", result.message);
    }
}

fn git_in(dir: PathBuf) -> impl Fn(&[&str]) {
    move |args: &[&str]| {
        let output = Command::new("git")
            .args(args)
            .current_dir(&dir)
            .envs(GIT_ENV)
            .output()
            .expect("failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}
