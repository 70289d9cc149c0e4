use anyhow::Result;

use super::ExitMessage;
use crate::gitmodules::{KEY_MDM, KEY_PATH, KEY_UPDATE, KEY_URL, KEY_VERSION};
use crate::prelude::*;

pub struct AddInputs {
    pub url: String,
    pub name: Option<String>,
    pub version: Option<String>,
    pub lib: String,
    pub use_defaults: bool,
}

pub fn cmd_add(repo: &Path, inputs: AddInputs) -> Result<ExitMessage> {
    if !cgw::is_repo_root(repo) {
        return Ok(ExitMessage::sad(
            "mdm add must be run from the root of a git repository",
        ));
    }

    let url = inputs.url.trim().to_string();
    let name = match inputs.name.or_else(|| dependency_name_from_url(&url)) {
        Some(n) => n,
        None => {
            return Ok(ExitMessage::sad(format!(
                "could not pick a name for {}; use --name",
                url
            )))
        }
    };
    let path = join(&inputs.lib, &name);

    if repo.join(&path).exists() || cgw::index_has_path(repo, &path)? {
        return Ok(ExitMessage::sad(format!(
            "something already exists at {}.  remove it or choose another --name.",
            path
        )));
    }

    let versions = match plumbing::get_version_manifest(repo, &url) {
        Ok(v) => v,
        Err(e) => {
            return Ok(ExitMessage::sad(format!(
                "could not read releases from {}: {:#}",
                url, e
            )))
        }
    };
    if versions.is_empty() {
        return Ok(ExitMessage::sad(format!(
            "no releases found at {}.  is that an mdm releases repo?",
            url
        )));
    }

    let version = match inputs.version {
        Some(v) => v,
        None if inputs.use_defaults => versions[versions.len() - 1].clone(),
        None => choose_version(&name, &versions)?,
    };
    if !versions.contains(&version) {
        return Ok(ExitMessage::sad(format!(
            "no version named {:?} at {}.  available: {}",
            version,
            url,
            versions.join(", ")
        )));
    }

    let mut gitmodules = GitModules::load(repo)?;
    let had_gitmodules = gitmodules.file().exists();
    gitmodules.set(&path, KEY_PATH, &path)?;
    gitmodules.set(&path, KEY_URL, &url)?;
    gitmodules.set(&path, KEY_MDM, ModuleType::Dependency.as_str())?;
    gitmodules.set(&path, KEY_VERSION, &version)?;
    gitmodules.set(&path, KEY_UPDATE, "none")?;

    let mut module = MdmModule::require(repo, &path)?;
    if let Err(e) = plumbing::fetch(repo, &mut module) {
        // undo the registration so a retry starts from a clean slate
        if had_gitmodules {
            gitmodules.remove(&path)?;
        } else {
            rm(&gitmodules.file())?;
        }
        cgw::config_remove_section(repo, cgw::ConfigFile::Local, &format!("submodule.{}", path))?;
        rm(&module.work_tree)?;
        return Err(e.context(format!("failed to fetch {} at {}", name, version)));
    }

    cgw::add(repo, &[".gitmodules", path.as_str()])?;
    cgw::commit(
        repo,
        &format!("adding dependency on {} at {}.", name, version),
        &[".gitmodules", path.as_str()],
    )?;

    Ok(ExitMessage::joy(format!(
        "added dependency on {}-{} at {}",
        name, version, path
    )))
}

fn choose_version(name: &str, versions: &[String]) -> Result<String> {
    let mut prompt = format!("available versions of {}:\n", name);
    for v in versions {
        prompt.push_str(&format!("  {}\n", v));
    }
    prompt.push_str(&format!(
        "which version do you want? [default: {}] ",
        versions[versions.len() - 1]
    ));
    let answer = input_prompt(&prompt)?;
    let answer = answer.trim();
    if answer.is_empty() {
        Ok(versions[versions.len() - 1].clone())
    } else {
        Ok(answer.to_string())
    }
}
