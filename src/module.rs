use anyhow::{bail, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::git::{config_get, current_branch, index_gitlink, is_repo_root, rev_parse, ConfigFile};
use crate::gitmodules::{GitModules, KEY_MDM, KEY_PATH, KEY_URL, KEY_VERSION};

pub const RELEASE_BRANCH_PREFIX: &str = "mdm/release/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    Dependency,
    Releases,
}

impl ModuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleType::Dependency => "dependency",
            ModuleType::Releases => "releases",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dependency" => Some(ModuleType::Dependency),
            "releases" => Some(ModuleType::Releases),
            _ => None,
        }
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    /// No url in `.gitmodules`.
    Missing,
    /// Not registered in the local config, or no repository in the work tree.
    Uninitialized,
    /// Checked out at the commit the parent's index records.
    Initialized,
    /// Checked out at some other commit than the parent's index records.
    RevCheckedOut,
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModuleStatus::Missing => "missing",
            ModuleStatus::Uninitialized => "uninitialized",
            ModuleStatus::Initialized => "initialized",
            ModuleStatus::RevCheckedOut => "rev checked out",
        })
    }
}

/// A submodule that mdm manages, as seen from its parent repository.
#[derive(Debug, Clone)]
pub struct MdmModule {
    /// Subsection name in `.gitmodules`.
    pub handle: String,
    pub path: String,
    pub module_type: ModuleType,
    /// `mdm-version` from `.gitmodules`.
    pub version_name: Option<String>,
    /// `url` from `.gitmodules`.
    pub url_historic: Option<String>,
    /// `submodule.<handle>.url` from the parent's `.git/config`.
    pub url_local: Option<String>,
    pub work_tree: PathBuf,
    pub index_id: Option<String>,
    pub head_id: Option<String>,
    /// Release name of the checked out `mdm/release/*` branch.
    pub version_actual: Option<String>,
}

impl MdmModule {
    /// `Ok(None)` when the section exists but isn't an mdm module (or isn't
    /// there at all).
    pub fn load(repo: &Path, handle: &str, gitmodules: &GitModules) -> Result<Option<Self>> {
        if !gitmodules.contains(handle) {
            return Ok(None);
        }
        let Some(kind) = gitmodules.get(handle, KEY_MDM) else {
            return Ok(None);
        };
        let Some(module_type) = ModuleType::parse(kind) else {
            tracing::warn!(
                "submodule {} has unknown mdm type {:?}; ignoring it",
                handle,
                kind
            );
            return Ok(None);
        };

        let path = gitmodules.get(handle, KEY_PATH).unwrap_or(handle).to_string();
        let work_tree = repo.join(&path);
        let url_local = config_get(
            repo,
            ConfigFile::Local,
            &format!("submodule.{}.url", handle),
        )?;
        let index_id = index_gitlink(repo, &path)?;

        let (head_id, version_actual) = if is_repo_root(&work_tree) {
            let head = rev_parse(&work_tree, "HEAD")?;
            let actual = current_branch(&work_tree)?
                .and_then(|b| b.strip_prefix(RELEASE_BRANCH_PREFIX).map(str::to_string));
            (head, actual)
        } else {
            (None, None)
        };

        Ok(Some(MdmModule {
            handle: handle.to_string(),
            path,
            module_type,
            version_name: gitmodules.get(handle, KEY_VERSION).map(str::to_string),
            url_historic: gitmodules.get(handle, KEY_URL).map(str::to_string),
            url_local,
            work_tree,
            index_id,
            head_id,
            version_actual,
        }))
    }

    /// Like [`MdmModule::load`], but a module that isn't there is an error.
    pub fn require(repo: &Path, handle: &str) -> Result<Self> {
        let gitmodules = GitModules::load(repo)?;
        match Self::load(repo, handle, &gitmodules)? {
            Some(m) => Ok(m),
            None => bail!(
                "{} is not an mdm module\n  hint: run `mdm status` to list modules",
                handle
            ),
        }
    }

    /// Every mdm module in `repo`, in `.gitmodules` name order.
    pub fn load_all(repo: &Path) -> Result<Vec<Self>> {
        let gitmodules = GitModules::load(repo)?;
        let mut modules = Vec::new();
        for handle in gitmodules.names() {
            if let Some(m) = Self::load(repo, handle, &gitmodules)? {
                modules.push(m);
            }
        }
        Ok(modules)
    }

    pub fn status(&self) -> ModuleStatus {
        if self.url_historic.is_none() {
            return ModuleStatus::Missing;
        }
        if self.url_local.is_none() || self.head_id.is_none() {
            return ModuleStatus::Uninitialized;
        }
        if self.head_id == self.index_id {
            ModuleStatus::Initialized
        } else {
            ModuleStatus::RevCheckedOut
        }
    }

    /// The final path component, used in commit messages.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn release_branch(&self) -> Option<String> {
        self.version_name
            .as_ref()
            .map(|v| format!("{}{}", RELEASE_BRANCH_PREFIX, v))
    }
}
