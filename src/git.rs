//! Porcelain over the `git` binary: config access, refs, the index, commits.

use anyhow::{Context, Result};
use std::path::Path;

use crate::sh::{exit_code, git};

/// Where a config read or write goes.
#[derive(Debug, Clone, Copy)]
pub enum ConfigFile<'a> {
    /// The repository's own `.git/config`.
    Local,
    /// A standalone file in git-config syntax, such as `.gitmodules`.
    File(&'a Path),
}

fn config_args<'a>(file: ConfigFile<'a>, rest: &[&'a str]) -> Result<Vec<&'a str>> {
    let mut args = vec!["config"];
    if let ConfigFile::File(path) = file {
        args.push("-f");
        args.push(
            path.to_str()
                .with_context(|| format!("path is not valid UTF-8: {}", path.display()))?,
        );
    }
    args.extend_from_slice(rest);
    Ok(args)
}

pub fn config_get(repo: &Path, file: ConfigFile, key: &str) -> Result<Option<String>> {
    let args = config_args(file, &["--get", key])?;
    match git(repo, &args) {
        Ok(value) => Ok(Some(value)),
        Err(e) if exit_code(&e) == Some(1) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn config_set(repo: &Path, file: ConfigFile, key: &str, value: &str) -> Result<()> {
    let args = config_args(file, &[key, value])?;
    git(repo, &args)?;
    Ok(())
}

/// Drops a whole `[section "sub"]`. A section that isn't there (or a config
/// file that doesn't exist) is fine; any other failure is returned.
pub fn config_remove_section(repo: &Path, file: ConfigFile, section: &str) -> Result<()> {
    if let ConfigFile::File(path) = file {
        if !path.exists() {
            return Ok(());
        }
    }
    let prefix = format!("{}.", section);
    if !config_list(repo, file)?
        .iter()
        .any(|(key, _)| key.starts_with(&prefix))
    {
        tracing::debug!("no section {} to remove", section);
        return Ok(());
    }
    let args = config_args(file, &["--remove-section", section])?;
    git(repo, &args)
        .with_context(|| format!("failed to remove config section {}", section))?;
    Ok(())
}

/// All entries, in file order, as (key, value) pairs.
pub fn config_list(repo: &Path, file: ConfigFile) -> Result<Vec<(String, String)>> {
    let args = config_args(file, &["-z", "--list"])?;
    let raw = git(repo, &args)?;
    Ok(parse_config_list(&raw))
}

/// Parses `git config -z --list` output: NUL-terminated entries, key and
/// value separated by a newline. A key without a newline has no value.
pub fn parse_config_list(raw: &str) -> Vec<(String, String)> {
    raw.split('\0')
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('\n') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (entry.to_string(), String::new()),
        })
        .collect()
}

/// Branch names (full ref names) advertised by `url`.
pub fn ls_remote_heads(repo: &Path, url: &str) -> Result<Vec<String>> {
    let output = git(repo, &["ls-remote", "--heads", url])
        .with_context(|| format!("could not list branches of {}", url))?;
    Ok(output
        .lines()
        .filter_map(|line| line.split_once('\t'))
        .map(|(_, name)| name.trim().to_string())
        .collect())
}

pub fn rev_parse(repo: &Path, rev: &str) -> Result<Option<String>> {
    let spec = format!("{}^{{commit}}", rev);
    match git(repo, &["rev-parse", "--verify", "-q", &spec]) {
        Ok(id) => Ok(Some(id)),
        Err(e) if exit_code(&e) == Some(1) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn ref_exists(repo: &Path, refname: &str) -> Result<bool> {
    Ok(rev_parse(repo, refname)?.is_some())
}

/// Short name of the checked out branch; `None` when HEAD is detached.
pub fn current_branch(repo: &Path) -> Result<Option<String>> {
    match git(repo, &["symbolic-ref", "-q", "--short", "HEAD"]) {
        Ok(name) => Ok(Some(name)),
        Err(e) if exit_code(&e) == Some(1) => Ok(None),
        Err(e) => Err(e),
    }
}

/// True if `dir` is the top of a work tree (has its own `.git`).
pub fn is_repo_root(dir: &Path) -> bool {
    dir.join(".git").exists()
}

/// Index entries under `path` as (mode, id, stage, path). Read with `-z`
/// so paths come back unquoted.
fn index_entries(repo: &Path, path: &str) -> Result<Vec<(String, String, String, String)>> {
    let output = git(repo, &["ls-files", "-s", "-z", "--", path])?;
    let mut entries = Vec::new();
    for record in output.split('\0').filter(|r| !r.is_empty()) {
        let Some((info, entry_path)) = record.split_once('\t') else {
            continue;
        };
        if let [mode, id, stage] = info.split_whitespace().collect::<Vec<_>>().as_slice() {
            entries.push((
                mode.to_string(),
                id.to_string(),
                stage.to_string(),
                entry_path.to_string(),
            ));
        }
    }
    Ok(entries)
}

/// Commit id recorded for a gitlink at `path` in the index, stage 0 only.
pub fn index_gitlink(repo: &Path, path: &str) -> Result<Option<String>> {
    Ok(index_entries(repo, path)?
        .into_iter()
        .find(|(mode, _, stage, entry_path)| mode == "160000" && stage == "0" && entry_path == path)
        .map(|(_, id, _, _)| id))
}

/// True if anything at all sits in the index under `path`.
pub fn index_has_path(repo: &Path, path: &str) -> Result<bool> {
    Ok(!index_entries(repo, path)?.is_empty())
}

pub fn is_clean(repo: &Path) -> Result<bool> {
    let output = git(repo, &["status", "--porcelain"])?;
    Ok(output.is_empty())
}

pub fn check_ref_format(repo: &Path, refname: &str) -> Result<bool> {
    match git(repo, &["check-ref-format", refname]) {
        Ok(_) => Ok(true),
        Err(e) if exit_code(&e).is_some() => Ok(false),
        Err(e) => Err(e),
    }
}

/// `git init` in `dir`, creating it if needed, with HEAD on `branch`.
pub fn init_repo(dir: &Path, branch: &str) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory {}", dir.display()))?;
    git(dir, &["init", "-q"])?;
    let head = format!("refs/heads/{}", branch);
    git(dir, &["symbolic-ref", "HEAD", &head])?;
    Ok(())
}

pub fn add(repo: &Path, paths: &[&str]) -> Result<()> {
    let mut args = vec!["add", "--"];
    args.extend_from_slice(paths);
    git(repo, &args)?;
    Ok(())
}

/// Commits exactly `paths` (as `git commit --only`), leaving anything else
/// staged alone. An empty `paths` commits the whole index.
pub fn commit(repo: &Path, message: &str, paths: &[&str]) -> Result<()> {
    let mut args = vec!["commit", "-q", "-m", message];
    if !paths.is_empty() {
        args.push("--");
        args.extend_from_slice(paths);
    }
    git(repo, &args)
        .with_context(|| format!("failed to commit in {}", repo.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestEnv;

    #[test]
    fn parse_config_list_splits_entries() {
        let raw = "submodule.lib/beta.path\nlib/beta\0submodule.lib/beta.mdm\ndependency\0core.bare\0";
        let entries = parse_config_list(raw);
        assert_eq!(
            entries,
            vec![
                ("submodule.lib/beta.path".to_string(), "lib/beta".to_string()),
                ("submodule.lib/beta.mdm".to_string(), "dependency".to_string()),
                ("core.bare".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn parse_config_list_keeps_multiline_values() {
        let entries = parse_config_list("a.b\nline1\nline2\0");
        assert_eq!(entries[0].1, "line1\nline2");
    }

    #[test]
    fn config_round_trip_on_file() {
        let env = TestEnv::new();
        let repo = env.create_project("proj");
        let file = repo.join(".gitmodules");

        config_set(&repo, ConfigFile::File(&file), "submodule.lib/x.url", "/tmp/x").unwrap();
        assert_eq!(
            config_get(&repo, ConfigFile::File(&file), "submodule.lib/x.url").unwrap(),
            Some("/tmp/x".to_string())
        );
        assert_eq!(
            config_get(&repo, ConfigFile::File(&file), "submodule.lib/x.mdm").unwrap(),
            None
        );

        config_remove_section(&repo, ConfigFile::File(&file), "submodule.lib/x").unwrap();
        assert_eq!(
            config_get(&repo, ConfigFile::File(&file), "submodule.lib/x.url").unwrap(),
            None
        );
        // second removal is a no-op
        config_remove_section(&repo, ConfigFile::File(&file), "submodule.lib/x").unwrap();
    }

    #[test]
    fn remove_section_reports_locked_config() {
        let env = TestEnv::new();
        let repo = env.create_project("proj");
        config_set(&repo, ConfigFile::Local, "submodule.lib/x.url", "/tmp/x").unwrap();
        std::fs::write(repo.join(".git/config.lock"), "").unwrap();

        assert!(config_remove_section(&repo, ConfigFile::Local, "submodule.lib/x").is_err());
        // nothing to remove needs no lock
        config_remove_section(&repo, ConfigFile::Local, "submodule.lib/y").unwrap();

        std::fs::remove_file(repo.join(".git/config.lock")).unwrap();
        assert_eq!(
            config_get(&repo, ConfigFile::Local, "submodule.lib/x.url").unwrap(),
            Some("/tmp/x".to_string())
        );
    }

    #[test]
    fn gitlink_lookup_handles_non_ascii_paths() {
        let env = TestEnv::new();
        let releases = env.create_releases("beta-releases", &["v1.0"]);
        let repo = env.create_project("proj");
        env.add_dependency(&repo, &releases, "bëta", "v1.0");

        let id = index_gitlink(&repo, "lib/bëta").unwrap();
        assert!(id.is_some());
        assert_eq!(id, rev_parse(&repo.join("lib/bëta"), "HEAD").unwrap());
        assert!(index_has_path(&repo, "lib/bëta").unwrap());
        assert!(!index_has_path(&repo, "lib/b").unwrap());
    }

    #[test]
    fn rev_parse_missing_ref_is_none() {
        let env = TestEnv::new();
        let repo = env.create_project("proj");
        assert!(rev_parse(&repo, "HEAD").unwrap().is_some());
        assert!(rev_parse(&repo, "refs/heads/nope").unwrap().is_none());
        assert!(!ref_exists(&repo, "refs/tags/nope").unwrap());
    }

    #[test]
    fn current_branch_reports_master() {
        let env = TestEnv::new();
        let repo = env.create_project("proj");
        assert_eq!(current_branch(&repo).unwrap(), Some("master".to_string()));
    }

    #[test]
    fn ls_remote_heads_lists_branches() {
        let env = TestEnv::new();
        let releases = env.create_releases("beta-releases", &["v1.0"]);
        let heads = ls_remote_heads(env.root(), releases.to_str().unwrap()).unwrap();
        assert!(heads.contains(&"refs/heads/master".to_string()));
        assert!(heads.contains(&"refs/heads/mdm/init".to_string()));
        assert!(heads.contains(&"refs/heads/mdm/release/v1.0".to_string()));
    }

    #[test]
    fn check_ref_format_rejects_bad_names() {
        let env = TestEnv::new();
        let repo = env.create_project("proj");
        assert!(check_ref_format(&repo, "refs/heads/mdm/release/v1.0").unwrap());
        assert!(!check_ref_format(&repo, "refs/heads/mdm/release/v1..0").unwrap());
    }

    #[test]
    fn init_repo_puts_head_on_branch() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("fresh");
        init_repo(&dir, "master").unwrap();
        assert!(is_repo_root(&dir));
        let head = git(&dir, &["symbolic-ref", "HEAD"]).unwrap();
        assert_eq!(head, "refs/heads/master");
    }

    #[test]
    fn commit_only_named_paths() {
        let env = TestEnv::new();
        let repo = env.create_project("proj");
        std::fs::write(repo.join("one"), "1").unwrap();
        std::fs::write(repo.join("two"), "2").unwrap();
        add(&repo, &["one", "two"]).unwrap();
        commit(&repo, "just one", &["one"]).unwrap();

        let status = git(&repo, &["status", "--porcelain"]).unwrap();
        assert_eq!(status, "A  two");
        assert!(!is_clean(&repo).unwrap());
    }
}
