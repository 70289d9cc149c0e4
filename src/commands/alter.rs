use anyhow::Result;

use super::ExitMessage;
use crate::gitmodules::KEY_VERSION;
use crate::prelude::*;

pub fn cmd_alter(repo: &Path, module_path: &str, version: &str) -> Result<ExitMessage> {
    let module_path = normalize_module_path(module_path);
    let gitmodules = GitModules::load(repo)?;
    let module = match MdmModule::load(repo, &module_path, &gitmodules)? {
        Some(m) if m.module_type == ModuleType::Dependency => m,
        _ => {
            return Ok(ExitMessage::sad(format!(
                "there is no mdm dependency at {}",
                module_path
            )))
        }
    };

    if module.version_name.as_deref() == Some(version)
        && module.version_actual.as_deref() == Some(version)
    {
        return Ok(ExitMessage::meh(format!(
            "{} is already at version {}.  no changes made.",
            module.name(),
            version
        )));
    }

    let Some(url) = module.url_local.as_deref().or(module.url_historic.as_deref()) else {
        return Ok(ExitMessage::sad(format!(
            "{} has no url configured",
            module_path
        )));
    };
    let versions = match plumbing::get_version_manifest(repo, url) {
        Ok(v) => v,
        Err(e) => {
            return Ok(ExitMessage::sad(format!(
                "could not read releases from {}: {:#}",
                url, e
            )))
        }
    };
    if !versions.iter().any(|v| v == version) {
        return Ok(ExitMessage::sad(format!(
            "no version named {:?} for {}.  available: {}",
            version,
            module.name(),
            versions.join(", ")
        )));
    }

    let previous = module.version_name.clone();
    let mut gitmodules = gitmodules;
    gitmodules.set(&module.handle, KEY_VERSION, version)?;

    let mut module = MdmModule::require(repo, &module.handle)?;
    if let Err(e) = plumbing::fetch(repo, &mut module) {
        if let Some(previous) = &previous {
            gitmodules.set(&module.handle, KEY_VERSION, previous)?;
        }
        return Err(e.context(format!("failed to fetch {} at {}", module_path, version)));
    }

    cgw::add(repo, &[".gitmodules", module.path.as_str()])?;
    cgw::commit(
        repo,
        &format!("shifting dependency on {} to version {}.", module.name(), version),
        &[".gitmodules", module.path.as_str()],
    )?;

    Ok(ExitMessage::joy(format!(
        "altered dependency on {} to version {}",
        module.name(),
        version
    )))
}
