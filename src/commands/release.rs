use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::ExitMessage;
use crate::module::RELEASE_BRANCH_PREFIX;
use crate::plumbing::{INIT_BRANCH, MASTER_BRANCH};
use crate::prelude::*;

pub struct ReleaseInputs {
    pub version: String,
    pub files: Vec<String>,
    pub repo: String,
    pub skip_accumulation: bool,
}

// --- Types ---

#[derive(Debug)]
pub struct ReleasePlan {
    pub version: String,
    pub releases_repo: PathBuf,
    /// Absolute paths of everything going into the release.
    pub files: Vec<PathBuf>,
    pub release_branch: String,
    pub release_tag: String,
    pub accumulation_tag: String,
    /// `None` when skipping accumulation.
    pub accumulation_dir: Option<String>,
    /// Set when the releases repo is a registered releases module of the
    /// project in `cwd`; its gitlink gets committed at the end.
    pub parent_module_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReleaseResult {
    pub version: String,
    pub releases_repo: PathBuf,
    pub files: Vec<String>,
    pub refs: Vec<String>,
    pub accumulated: bool,
    pub parent_committed: bool,
    pub exit: ExitMessage,
}

// --- Planning (read-only) ---

/// Validates everything up front. `Ok(Err(msg))` is a refusal to release;
/// `Err` is something going wrong while looking.
pub fn plan_release(cwd: &Path, inputs: &ReleaseInputs) -> Result<Result<ReleasePlan, ExitMessage>> {
    let repo_path = normalize_module_path(&inputs.repo);
    let releases_repo = cwd.join(&repo_path);

    if !cgw::is_repo_root(&releases_repo)
        || !cgw::ref_exists(&releases_repo, &format!("refs/heads/{}", INIT_BRANCH))?
    {
        return Ok(Err(ExitMessage::sad(format!(
            "{} is not an mdm releases repo.  run `mdm release-init` first?",
            releases_repo.display()
        ))));
    }

    let version = inputs.version.trim().to_string();
    if let Err(e) = validate_version_name(&version) {
        return Ok(Err(ExitMessage::sad(e.to_string())));
    }
    let release_branch = format!("{}{}", RELEASE_BRANCH_PREFIX, version);
    if !cgw::check_ref_format(&releases_repo, &format!("refs/heads/{}", release_branch))? {
        return Ok(Err(ExitMessage::sad(format!(
            "{:?} cannot be used as a version name",
            version
        ))));
    }

    let release_tag = format!("release/{}", version);
    let accumulation_tag = format!("mdm/{}/{}", MASTER_BRANCH, version);
    for r in [
        format!("refs/heads/{}", release_branch),
        format!("refs/tags/{}", release_tag),
        format!("refs/tags/{}", accumulation_tag),
    ] {
        if cgw::ref_exists(&releases_repo, &r)? {
            return Ok(Err(ExitMessage::sad(format!(
                "version {} has already been released ({} exists)",
                version, r
            ))));
        }
    }

    let files = match resolve_files(cwd, &releases_repo, &inputs.files)? {
        Ok(f) => f,
        Err(msg) => return Ok(Err(msg)),
    };

    if !cgw::is_clean(&releases_repo)? {
        return Ok(Err(ExitMessage::sad(format!(
            "the releases repo at {} has uncommitted changes.  clean it up first.",
            releases_repo.display()
        ))));
    }

    let accumulation_dir = if inputs.skip_accumulation {
        None
    } else {
        let on_master = git(
            &releases_repo,
            &["ls-tree", "--name-only", MASTER_BRANCH, "--", &version],
        )?;
        if !on_master.is_empty() {
            return Ok(Err(ExitMessage::sad(format!(
                "{} already has a {} directory on {}",
                releases_repo.display(),
                version,
                MASTER_BRANCH
            ))));
        }
        Some(version.clone())
    };

    let parent_module_path = if cgw::is_repo_root(cwd) {
        let gitmodules = GitModules::load(cwd)?;
        MdmModule::load(cwd, &repo_path, &gitmodules)?
            .filter(|m| m.module_type == ModuleType::Releases)
            .map(|m| m.path)
    } else {
        None
    };

    Ok(Ok(ReleasePlan {
        version,
        releases_repo,
        files,
        release_branch,
        release_tag,
        accumulation_tag,
        accumulation_dir,
        parent_module_path,
    }))
}

fn resolve_files(
    cwd: &Path,
    releases_repo: &Path,
    patterns: &[String],
) -> Result<Result<Vec<PathBuf>, ExitMessage>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let full = cwd.join(pattern);
        let full = full
            .to_str()
            .with_context(|| format!("pattern is not valid UTF-8: {}", full.display()))?;
        let matches = glob(full).with_context(|| format!("bad --files pattern {:?}", pattern))?;
        let before = files.len();
        for entry in matches {
            let entry = entry.with_context(|| format!("failed to read a match of {:?}", pattern))?;
            if entry.starts_with(releases_repo) {
                return Ok(Err(ExitMessage::sad(format!(
                    "{} is inside the releases repo; releases are made from files outside it",
                    relpath(&entry, cwd).display()
                ))));
            }
            if !files.contains(&entry) {
                files.push(entry);
            }
        }
        if files.len() == before {
            return Ok(Err(ExitMessage::sad(format!(
                "no files matched {:?}",
                pattern
            ))));
        }
    }
    if files.is_empty() {
        return Ok(Err(ExitMessage::sad("no files given to release")));
    }

    let mut names: Vec<&std::ffi::OsStr> = Vec::new();
    for f in &files {
        let Some(name) = f.file_name() else {
            bail!("cannot release {}", f.display());
        };
        if names.contains(&name) {
            return Ok(Err(ExitMessage::sad(format!(
                "more than one file named {} would land in the release",
                name.to_string_lossy()
            ))));
        }
        names.push(name);
    }
    Ok(Ok(files))
}

// --- Execution (impure) ---

pub fn execute_release(cwd: &Path, plan: &ReleasePlan) -> Result<ReleaseResult> {
    let repo = &plan.releases_repo;
    let previous_branch = cgw::current_branch(repo)?;

    // the release branch starts from mdm/init and holds only the released files
    git(repo, &["checkout", "-q", "-b", &plan.release_branch, INIT_BRANCH])?;
    git(repo, &["rm", "-q", "-r", "--ignore-unmatch", "--", "."])?;
    for f in &plan.files {
        let name = f.file_name().context("released file has no name")?;
        cp(f, &repo.join(name))?;
    }
    git(repo, &["add", "-A", "--", "."])?;
    cgw::commit(repo, &format!("release version {}", plan.version), &[])?;
    git(repo, &["tag", &plan.release_tag])?;

    // master remembers every release; with accumulation it also keeps a copy
    git(repo, &["checkout", "-q", MASTER_BRANCH])?;
    let merge_message = format!("merge release version {} into {}", plan.version, MASTER_BRANCH);
    match &plan.accumulation_dir {
        None => {
            git(
                repo,
                &["merge", "-q", "--no-ff", "-s", "ours", "-m", &merge_message, &plan.release_branch],
            )?;
        }
        Some(dir) => {
            git(
                repo,
                &["merge", "-q", "--no-ff", "--no-commit", "-s", "ours", &plan.release_branch],
            )?;
            let target = repo.join(dir);
            for f in &plan.files {
                let name = f.file_name().context("released file has no name")?;
                cp(f, &target.join(name))?;
            }
            cgw::add(repo, &[dir.as_str()])?;
            cgw::commit(repo, &merge_message, &[])?;
        }
    }
    git(repo, &["tag", &plan.accumulation_tag])?;

    if let Some(branch) = previous_branch.filter(|b| b != MASTER_BRANCH) {
        if let Err(e) = git(repo, &["checkout", "-q", &branch]) {
            tracing::warn!("could not return the releases repo to {}: {:#}", branch, e);
        }
    }

    let parent_committed = match &plan.parent_module_path {
        Some(path) => {
            cgw::add(cwd, &[path.as_str()])?;
            cgw::commit(cwd, &format!("release version {}", plan.version), &[path.as_str()])?;
            true
        }
        None => false,
    };

    Ok(ReleaseResult {
        version: plan.version.clone(),
        releases_repo: plan.releases_repo.clone(),
        files: plan
            .files
            .iter()
            .map(|f| relpath(f, cwd).display().to_string())
            .collect(),
        refs: vec![
            format!("refs/heads/{}", plan.release_branch),
            format!("refs/tags/{}", plan.release_tag),
            format!("refs/tags/{}", plan.accumulation_tag),
        ],
        accumulated: plan.accumulation_dir.is_some(),
        parent_committed,
        exit: ExitMessage::joy(format!(
            "release version {} complete.  push the releases repo to publish it.",
            plan.version
        )),
    })
}

pub fn cmd_release(cwd: &Path, inputs: ReleaseInputs) -> Result<ReleaseResult> {
    let plan = match plan_release(cwd, &inputs)? {
        Ok(plan) => plan,
        Err(exit) => {
            return Ok(ReleaseResult {
                version: inputs.version,
                releases_repo: cwd.join(&inputs.repo),
                files: Vec::new(),
                refs: Vec::new(),
                accumulated: false,
                parent_committed: false,
                exit,
            })
        }
    };
    execute_release(cwd, &plan)
        .with_context(|| format!("release of {} failed part way", plan.version))
}

pub fn format_release_human(result: &ReleaseResult) -> String {
    let mut lines = Vec::new();
    if !result.refs.is_empty() {
        for f in &result.files {
            lines.push(format!("  released {}", f));
        }
        for r in &result.refs {
            lines.push(format!("  created {}", r));
        }
    }
    lines.push(super::format_exit_human(&result.exit));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{cmd_release_init, Mood, ReleaseInitInputs};
    use crate::testutil::TestEnv;

    fn project_with_releases(env: &TestEnv) -> PathBuf {
        let repo = env.create_project("projectAlpha");
        let init = cmd_release_init(
            &repo,
            ReleaseInitInputs {
                name: None,
                repo: None,
                use_defaults: true,
                remote_url: None,
                remote_publish_url: None,
                default_dir: "releases".to_string(),
            },
        )
        .unwrap();
        assert_eq!(init.mood, Mood::Joy, "{}", init.message);
        std::fs::write(repo.join("whatever"), "placeholder").unwrap();
        repo
    }

    fn inputs(version: &str, files: &[&str], skip: bool) -> ReleaseInputs {
        ReleaseInputs {
            version: version.to_string(),
            files: files.iter().map(|s| s.to_string()).collect(),
            repo: "releases".to_string(),
            skip_accumulation: skip,
        }
    }

    fn tree(repo: &Path, rev: &str) -> Vec<String> {
        git(repo, &["ls-tree", "-r", "--name-only", rev])
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn release_without_accumulation() {
        let env = TestEnv::new();
        let repo = project_with_releases(&env);

        let result = cmd_release(&repo, inputs("v1", &["whatever"], true)).unwrap();
        assert_eq!(result.exit.mood, Mood::Joy, "{}", result.exit.message);
        assert!(!result.accumulated);
        assert!(result.parent_committed);

        let releases = repo.join("releases");
        assert_eq!(tree(&releases, "refs/tags/release/v1"), vec!["whatever"]);
        assert_eq!(tree(&releases, "master"), vec!["README"]);
        assert!(cgw::ref_exists(&releases, "refs/tags/mdm/master/v1").unwrap());
        assert!(cgw::ref_exists(&releases, "refs/heads/mdm/release/v1").unwrap());

        // master has the release in its history
        git(&releases, &["merge-base", "--is-ancestor", "mdm/release/v1", "master"]).unwrap();

        let log = git(&repo, &["log", "-1", "--format=%s"]).unwrap();
        assert_eq!(log, "release version v1");
    }

    #[test]
    fn release_with_accumulation() {
        let env = TestEnv::new();
        let repo = project_with_releases(&env);
        std::fs::create_dir_all(repo.join("out")).unwrap();
        std::fs::write(repo.join("out/a.bin"), "a").unwrap();
        std::fs::write(repo.join("out/b.bin"), "b").unwrap();

        let result = cmd_release(&repo, inputs("v2.0", &["out/*.bin"], false)).unwrap();
        assert_eq!(result.exit.mood, Mood::Joy, "{}", result.exit.message);
        assert!(result.accumulated);

        let releases = repo.join("releases");
        assert_eq!(tree(&releases, "release/v2.0"), vec!["a.bin", "b.bin"]);
        assert_eq!(
            tree(&releases, "mdm/master/v2.0"),
            vec!["README", "v2.0/a.bin", "v2.0/b.bin"]
        );
        assert_eq!(cgw::current_branch(&releases).unwrap().as_deref(), Some("master"));
    }

    #[test]
    fn releasing_twice_is_sad() {
        let env = TestEnv::new();
        let repo = project_with_releases(&env);
        cmd_release(&repo, inputs("v1", &["whatever"], true)).unwrap();
        let again = cmd_release(&repo, inputs("v1", &["whatever"], true)).unwrap();
        assert_eq!(again.exit.mood, Mood::Sad);
        assert!(again.exit.message.contains("already been released"));
    }

    #[test]
    fn no_matching_files_is_sad() {
        let env = TestEnv::new();
        let repo = project_with_releases(&env);
        let result = cmd_release(&repo, inputs("v1", &["*.nothing"], false)).unwrap();
        assert_eq!(result.exit.mood, Mood::Sad);
        assert!(result.exit.message.contains("no files matched"));
    }

    #[test]
    fn bad_version_names_are_sad() {
        let env = TestEnv::new();
        let repo = project_with_releases(&env);
        for bad in ["", "v 1", "v1..2", "v1.lock"] {
            let result = cmd_release(&repo, inputs(bad, &["whatever"], false)).unwrap();
            assert_eq!(result.exit.mood, Mood::Sad, "accepted {:?}", bad);
        }
    }

    #[test]
    fn not_a_releases_repo_is_sad() {
        let env = TestEnv::new();
        let repo = env.create_project("projectAlpha");
        std::fs::write(repo.join("whatever"), "x").unwrap();
        let result = cmd_release(&repo, inputs("v1", &["whatever"], false)).unwrap();
        assert_eq!(result.exit.mood, Mood::Sad);
        assert!(result.exit.message.contains("not an mdm releases repo"));
    }

    #[test]
    fn files_inside_releases_repo_are_refused() {
        let env = TestEnv::new();
        let repo = project_with_releases(&env);
        let result = cmd_release(&repo, inputs("v1", &["releases/README"], false)).unwrap();
        assert_eq!(result.exit.mood, Mood::Sad);
    }

    #[test]
    fn colliding_file_names_are_refused() {
        let env = TestEnv::new();
        let repo = project_with_releases(&env);
        std::fs::create_dir_all(repo.join("x")).unwrap();
        std::fs::create_dir_all(repo.join("y")).unwrap();
        std::fs::write(repo.join("x/same"), "1").unwrap();
        std::fs::write(repo.join("y/same"), "2").unwrap();
        let result = cmd_release(&repo, inputs("v1", &["x/same", "y/same"], false)).unwrap();
        assert_eq!(result.exit.mood, Mood::Sad);
        assert!(result.exit.message.contains("more than one file named same"));
    }

    #[test]
    fn standalone_releases_repo_has_no_parent_commit() {
        let env = TestEnv::new();
        let releases = env.root().join("alpha-releases");
        std::fs::create_dir_all(&releases).unwrap();
        cmd_release_init(
            &releases,
            ReleaseInitInputs {
                name: Some("alpha".to_string()),
                repo: None,
                use_defaults: true,
                remote_url: None,
                remote_publish_url: None,
                default_dir: "releases".to_string(),
            },
        )
        .unwrap();
        std::fs::write(env.root().join("artifact"), "bits").unwrap();

        let result = cmd_release(
            env.root(),
            ReleaseInputs {
                version: "1.0.0".to_string(),
                files: vec!["artifact".to_string()],
                repo: "alpha-releases".to_string(),
                skip_accumulation: false,
            },
        )
        .unwrap();
        assert_eq!(result.exit.mood, Mood::Joy, "{}", result.exit.message);
        assert!(!result.parent_committed);
        assert_eq!(tree(&releases, "release/1.0.0"), vec!["artifact"]);
    }
}
