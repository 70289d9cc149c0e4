use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::git::{config_list, config_remove_section, config_set, ConfigFile};

pub const GITMODULES: &str = ".gitmodules";

pub const KEY_PATH: &str = "path";
pub const KEY_URL: &str = "url";
pub const KEY_UPDATE: &str = "update";
pub const KEY_MDM: &str = "mdm";
pub const KEY_VERSION: &str = "mdm-version";

/// The `[submodule "..."]` sections of a repository's `.gitmodules`.
#[derive(Debug, Clone)]
pub struct GitModules {
    repo: PathBuf,
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl GitModules {
    /// An absent `.gitmodules` loads as empty.
    pub fn load(repo: &Path) -> Result<Self> {
        let file = repo.join(GITMODULES);
        let entries = if file.exists() {
            config_list(repo, ConfigFile::File(&file))?
        } else {
            Vec::new()
        };
        Ok(Self {
            repo: repo.to_path_buf(),
            sections: sections_from_entries(&entries),
        })
    }

    pub fn file(&self) -> PathBuf {
        self.repo.join(GITMODULES)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    pub fn get(&self, name: &str, key: &str) -> Option<&str> {
        self.sections
            .get(name)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }

    /// Writes through to the file and keeps the in-memory copy current.
    pub fn set(&mut self, name: &str, key: &str, value: &str) -> Result<()> {
        let file = self.file();
        let full_key = format!("submodule.{}.{}", name, key);
        config_set(&self.repo, ConfigFile::File(&file), &full_key, value)?;
        self.sections
            .entry(name.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        let file = self.file();
        config_remove_section(
            &self.repo,
            ConfigFile::File(&file),
            &format!("submodule.{}", name),
        )?;
        self.sections.remove(name);
        Ok(())
    }
}

fn sections_from_entries(entries: &[(String, String)]) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    for (key, value) in entries {
        let Some(rest) = key.strip_prefix("submodule.") else {
            continue;
        };
        // the subsection may itself contain dots; the variable name cannot
        let Some((name, var)) = rest.rsplit_once('.') else {
            continue;
        };
        sections
            .entry(name.to_string())
            .or_default()
            .insert(var.to_string(), value.clone());
    }
    sections
}
