use anyhow::Result;

use super::ExitMessage;
use crate::prelude::*;

pub fn cmd_remove(repo: &Path, module_path: &str) -> Result<ExitMessage> {
    let module_path = normalize_module_path(module_path);
    let mut gitmodules = GitModules::load(repo)?;
    let module = match MdmModule::load(repo, &module_path, &gitmodules)? {
        Some(m) if m.module_type == ModuleType::Dependency => m,
        _ => {
            return Ok(ExitMessage::sad(format!(
                "there is no mdm dependency at {}",
                module_path
            )))
        }
    };

    if cgw::index_has_path(repo, &module.path)? {
        git(repo, &["rm", "-q", "--cached", "-r", "--", module.path.as_str()])?;
    }
    gitmodules.remove(&module.handle)?;
    cgw::config_remove_section(
        repo,
        cgw::ConfigFile::Local,
        &format!("submodule.{}", module.handle),
    )?;
    rm(&module.work_tree)?;

    cgw::add(repo, &[".gitmodules"])?;
    cgw::commit(
        repo,
        &format!("removing dependency on {}.", module.name()),
        &[".gitmodules", module.path.as_str()],
    )?;

    Ok(ExitMessage::joy(format!(
        "removed dependency on {}",
        module.name()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Mood;
    use crate::testutil::TestEnv;

    #[test]
    fn remove_unregisters_everything() {
        let env = TestEnv::new();
        let releases = env.create_releases("beta-releases", &["v1.0"]);
        let repo = env.create_project("proj");
        env.add_dependency(&repo, &releases, "beta", "v1.0");

        let result = cmd_remove(&repo, "lib/beta").unwrap();
        assert_eq!(result.mood, Mood::Joy, "{}", result.message);

        assert!(!repo.join("lib/beta").exists());
        assert!(!GitModules::load(&repo).unwrap().contains("lib/beta"));
        assert_eq!(
            cgw::config_get(&repo, cgw::ConfigFile::Local, "submodule.lib/beta.url").unwrap(),
            None
        );
        assert!(!cgw::index_has_path(&repo, "lib/beta").unwrap());
        assert!(cgw::is_clean(&repo).unwrap());
        let log = git(&repo, &["log", "-1", "--format=%s"]).unwrap();
        assert_eq!(log, "removing dependency on beta.");
    }

    #[test]
    fn remove_fails_when_local_config_is_locked() {
        let env = TestEnv::new();
        let releases = env.create_releases("beta-releases", &["v1.0"]);
        let repo = env.create_project("proj");
        env.add_dependency(&repo, &releases, "beta", "v1.0");
        std::fs::write(repo.join(".git/config.lock"), "").unwrap();

        assert!(cmd_remove(&repo, "lib/beta").is_err());

        std::fs::remove_file(repo.join(".git/config.lock")).unwrap();
        assert!(cgw::config_get(&repo, cgw::ConfigFile::Local, "submodule.lib/beta.url")
            .unwrap()
            .is_some());
    }

    #[test]
    fn remove_unknown_is_sad() {
        let env = TestEnv::new();
        let repo = env.create_project("proj");
        let result = cmd_remove(&repo, "lib/ghost").unwrap();
        assert_eq!(result.mood, Mood::Sad);
    }
}
