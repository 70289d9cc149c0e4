use anyhow::{Context, Result};

use super::ExitMessage;
use crate::gitmodules::{KEY_MDM, KEY_PATH, KEY_UPDATE, KEY_URL};
use crate::plumbing::{INIT_BRANCH, MASTER_BRANCH};
use crate::prelude::*;

pub struct ReleaseInitInputs {
    pub name: Option<String>,
    pub repo: Option<String>,
    pub use_defaults: bool,
    pub remote_url: Option<String>,
    pub remote_publish_url: Option<String>,
    /// Default location when run from a project root.
    pub default_dir: String,
}

/// What release-init is going to do, settled before anything is touched.
#[derive(Debug)]
pub struct ReleaseInitPlan {
    pub name: String,
    pub path: String,
    pub as_submodule: bool,
}

pub fn plan_release_init(cwd: &Path, inputs: &ReleaseInitInputs) -> Result<ReleaseInitPlan> {
    // inside a repo root the releases repo becomes a submodule of it
    let as_submodule = cgw::is_repo_root(cwd);

    let name = match &inputs.name {
        Some(n) if !n.trim().is_empty() => n.trim().to_string(),
        _ => {
            let suggestion = cwd
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .filter(|n| !n.is_empty());
            if inputs.use_defaults && suggestion.is_some() {
                suggestion.unwrap_or_default()
            } else {
                ask_name(if as_submodule { suggestion } else { None })?
            }
        }
    };

    let path = match &inputs.repo {
        Some(p) => p.clone(),
        None if as_submodule => inputs.default_dir.clone(),
        None => ".".to_string(),
    };
    let path = if as_submodule {
        normalize_module_path(&path)
    } else {
        path
    };

    Ok(ReleaseInitPlan {
        name,
        path,
        as_submodule,
    })
}

fn ask_name(suggestion: Option<String>) -> Result<String> {
    let mut prompt = "what's the name of this project".to_string();
    if let Some(s) = &suggestion {
        prompt.push_str(&format!(" [default: {}] ", s));
    }
    prompt.push('?');
    loop {
        let answer = input_prompt(&prompt)?;
        let answer = answer.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
        if let Some(s) = &suggestion {
            return Ok(s.clone());
        }
    }
}

pub fn cmd_release_init(cwd: &Path, inputs: ReleaseInitInputs) -> Result<ExitMessage> {
    let plan = plan_release_init(cwd, &inputs)?;
    let releases_dir = cwd.join(&plan.path);

    // check for a clean working area
    if plan.as_submodule && cgw::index_has_path(cwd, &plan.path)? {
        return Ok(ExitMessage::meh(
            "there's already a releases module!  No changes made.",
        ));
    }
    if plan.path != "." && releases_dir.exists() {
        return Ok(ExitMessage::sad(
            "something already exists at the location we want to initialize the releases repo.  clear it out and try again.",
        ));
    }

    make_release_repo(&releases_dir, &plan.name)?;

    if !plan.as_submodule {
        return Ok(ExitMessage::joy("releases repo initialized"));
    }

    let public_url = match inputs.remote_url {
        Some(u) => u,
        None if inputs.use_defaults => default_public_url(cwd, &plan.name)?,
        None => input_prompt(
            "Configure a remote url where this repo will be accessible?\n\
             This will be committed to the project's .gitmodules file, and so should be a publicly accessible url.\n\
             remote url: ",
        )?,
    };
    let public_url = public_url.trim().to_string();

    let publish_url = match inputs.remote_publish_url {
        Some(u) => u,
        None if inputs.use_defaults => public_url.clone(),
        None => input_prompt(
            "Configure a remote url you'll use to push this repo when making releases?\n\
             This will not be committed to the project; just set in your local config.\n\
             remote url [leave blank to use the same public url]: ",
        )?,
    };
    let publish_url = match publish_url.trim() {
        "" => public_url.clone(),
        u => u.to_string(),
    };

    // register the new releases repo as a submodule of the project
    let mut gitmodules = GitModules::load(cwd)?;
    gitmodules.set(&plan.path, KEY_PATH, &plan.path)?;
    gitmodules.set(&plan.path, KEY_URL, &public_url)?;
    gitmodules.set(&plan.path, KEY_MDM, ModuleType::Releases.as_str())?;
    gitmodules.set(&plan.path, KEY_UPDATE, "none")?;

    let mut module = MdmModule::require(cwd, &plan.path)?;
    plumbing::init_local_config(cwd, &mut module)?;

    cgw::config_set(
        &module.work_tree,
        cgw::ConfigFile::Local,
        "remote.origin.url",
        &publish_url,
    )?;
    cgw::config_set(
        &module.work_tree,
        cgw::ConfigFile::Local,
        "remote.origin.fetch",
        "+refs/heads/*:refs/remotes/origin/*",
    )?;

    cgw::add(cwd, &[plan.path.as_str(), ".gitmodules"])?;
    cgw::commit(
        cwd,
        &format!("initialize releases repo for {}.", plan.name),
        &[plan.path.as_str(), ".gitmodules"],
    )
    .context("your repository is in an invalid state!")?;

    Ok(ExitMessage::joy("releases repo and submodule initialized"))
}

/// `../<name>-releases.git` next to the project's own origin (or, lacking one,
/// next to the project directory).
fn default_public_url(cwd: &Path, name: &str) -> Result<String> {
    let parent_remote = match cgw::config_get(cwd, cgw::ConfigFile::Local, "remote.origin.url")? {
        Some(u) => u,
        None => cwd.to_string_lossy().to_string(),
    };
    let relative = format!("../{}-releases.git", name);
    Ok(resolve_relative_url(&parent_remote, &relative).unwrap_or(relative))
}

/// A fresh repository on master with one README commit, labelled `mdm/init`.
fn make_release_repo(dir: &Path, name: &str) -> Result<()> {
    cgw::init_repo(dir, MASTER_BRANCH)
        .with_context(|| format!("failed to create a release repo at {}", dir.display()))?;

    std::fs::write(
        dir.join("README"),
        format!("This is the releases repo for {}.\n", name),
    )
    .with_context(|| format!("failed to create a release repo at {}", dir.display()))?;

    cgw::add(dir, &["README"])?;
    cgw::commit(
        dir,
        &format!("initialize releases repo for {}.", name),
        &["README"],
    )?;
    git(dir, &["branch", INIT_BRANCH])?;
    Ok(())
}
