use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::git::{config_set, init_repo, is_repo_root, ls_remote_heads, ConfigFile};
use crate::module::{MdmModule, ModuleStatus, RELEASE_BRANCH_PREFIX};
use crate::sh::git;
use crate::util::version_sort;

pub const INIT_BRANCH: &str = "mdm/init";
pub const MASTER_BRANCH: &str = "master";

/// Brings a module's work tree to the version its parent asks for,
/// initializing the module repository first if needed. Returns true if
/// anything was fetched and checked out.
pub fn fetch(repo: &Path, module: &mut MdmModule) -> Result<bool> {
    let status = module.status();
    tracing::debug!("fetch {}: status {}", module.handle, status);

    match status {
        ModuleStatus::Missing => {
            bail!(
                "module {} has no url in .gitmodules\n  hint: fix the entry, or remove the module and add it again",
                module.handle
            );
        }
        ModuleStatus::Uninitialized => {
            if !is_repo_root(&module.work_tree) {
                init_repo(&module.work_tree, MASTER_BRANCH).with_context(|| {
                    format!("failed to write data to submodule {}", module.handle)
                })?;
            }
            init_local_config(repo, module)
                .context("failed to save changes to local git configuration file")?;
            set_mdm_remote(module).with_context(|| {
                format!(
                    "failed to save changes to submodule git configuration file for {}",
                    module.handle
                )
            })?;
        }
        ModuleStatus::Initialized | ModuleStatus::RevCheckedOut => {}
    }

    // an uninitialized module may already hold the right release
    if status != ModuleStatus::RevCheckedOut {
        match &module.version_name {
            None => return Ok(false),
            Some(v) if module.version_actual.as_deref() == Some(v.as_str()) => {
                return Ok(false)
            }
            _ => {}
        }
    }

    let Some(branch) = module.release_branch() else {
        // freshly initialized but nothing requested
        return Ok(false);
    };

    // Fetch only the branch labelled with the version requested.
    let refspec = format!("+refs/heads/{0}:refs/heads/{0}", branch);
    git(
        &module.work_tree,
        &["fetch", "-q", "--update-head-ok", "origin", &refspec],
    )
    .with_context(|| {
        format!(
            "could not fetch {} for module {}\n  hint: check your connectivity and that the release exists",
            branch, module.handle
        )
    })?;

    // Drop the files into the working tree.
    git(&module.work_tree, &["checkout", "-q", "-f", &branch])
        .with_context(|| format!("failed to check out {} in {}", branch, module.handle))?;

    module.head_id = crate::git::rev_parse(&module.work_tree, "HEAD")?;
    module.version_actual = module.version_name.clone();
    Ok(true)
}

/// Similar to `git submodule init <module>`: copies the url from
/// `.gitmodules` into the parent's local config. Returns true if the config
/// was modified.
pub fn init_local_config(repo: &Path, module: &mut MdmModule) -> Result<bool> {
    if module.url_local.is_some() {
        return Ok(false);
    }
    let Some(url) = module.url_historic.clone() else {
        bail!("module {} has no url in .gitmodules", module.handle);
    };

    config_set(
        repo,
        ConfigFile::Local,
        &format!("submodule.{}.url", module.handle),
        &url,
    )?;
    config_set(
        repo,
        ConfigFile::Local,
        &format!("submodule.{}.update", module.handle),
        "none",
    )?;
    module.url_local = Some(url);
    Ok(true)
}

/// Github's http endpoints 404 some user agents unless the url ends in `.git`.
pub fn is_github_http_url(url: &str) -> bool {
    [
        "http://github.com",
        "http://www.github.com",
        "https://github.com",
        "https://www.github.com",
    ]
    .iter()
    .any(|prefix| url.starts_with(prefix))
}

/// Equivalent of `git remote add -t mdm/init origin <url>` in the module:
/// only `mdm/init` is tracked, so a plain `git pull` never drags every
/// release down from the network.
pub fn set_mdm_remote(module: &MdmModule) -> Result<()> {
    let Some(mut url) = module.url_local.clone() else {
        bail!("module {} has no url in the local config", module.handle);
    };
    if is_github_http_url(&url) && !url.ends_with(".git") {
        url.push_str(".git");
    }

    config_set(&module.work_tree, ConfigFile::Local, "remote.origin.url", &url)?;
    config_set(
        &module.work_tree,
        ConfigFile::Local,
        "remote.origin.fetch",
        &format!("+refs/heads/{0}:refs/remotes/origin/{0}", INIT_BRANCH),
    )?;
    Ok(())
}

/// Release names published at `releases_url`, oldest first.
pub fn get_version_manifest(repo: &Path, releases_url: &str) -> Result<Vec<String>> {
    let prefix = format!("refs/heads/{}", RELEASE_BRANCH_PREFIX);
    let mut versions: Vec<String> = ls_remote_heads(repo, releases_url)?
        .into_iter()
        .filter_map(|name| name.strip_prefix(&prefix).map(str::to_string))
        .collect();
    version_sort(&mut versions);
    Ok(versions)
}
