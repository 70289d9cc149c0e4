use anyhow::{bail, Result};
use serde::Serialize;

use super::ExitMessage;
use crate::prelude::*;

#[derive(Debug, Serialize)]
pub struct UpdateResult {
    pub strict: bool,
    pub modules: Vec<ModuleUpdate>,
    pub exit: ExitMessage,
}

#[derive(Debug, Serialize)]
pub struct ModuleUpdate {
    pub path: String,
    pub version: Option<String>,
    pub outcome: UpdateOutcome,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum UpdateOutcome {
    Updated,
    Unchanged,
    Failed { error: String },
}

pub fn cmd_update(repo: &Path, strict: bool) -> Result<UpdateResult> {
    if !cgw::is_repo_root(repo) {
        bail!(
            "{} is not the root of a git repository\n  hint: run mdm update from the top of your project",
            repo.display()
        );
    }

    let modules = MdmModule::load_all(repo)?;
    let mut updates = Vec::new();

    for mut module in modules
        .into_iter()
        .filter(|m| m.module_type == ModuleType::Dependency)
    {
        let outcome = update_one(repo, &mut module, strict);
        if let UpdateOutcome::Failed { error } = &outcome {
            tracing::warn!("{}: {}", module.path, error);
        }
        updates.push(ModuleUpdate {
            path: module.path,
            version: module.version_name,
            outcome,
        });
    }

    let failed = updates
        .iter()
        .filter(|u| matches!(u.outcome, UpdateOutcome::Failed { .. }))
        .count();
    let updated = updates
        .iter()
        .filter(|u| u.outcome == UpdateOutcome::Updated)
        .count();

    let exit = if failed > 0 {
        let message = format!(
            "{} of {} dependencies could not be updated",
            failed,
            updates.len()
        );
        if strict {
            ExitMessage::sad(message)
        } else {
            ExitMessage::meh(message)
        }
    } else if updated == 0 {
        ExitMessage::joy("all dependencies already up to date")
    } else {
        ExitMessage::joy(format!("updated {} of {} dependencies", updated, updates.len()))
    };

    Ok(UpdateResult {
        strict,
        modules: updates,
        exit,
    })
}

fn update_one(repo: &Path, module: &mut MdmModule, strict: bool) -> UpdateOutcome {
    if module.version_name.is_none() {
        return UpdateOutcome::Failed {
            error: "no mdm-version set in .gitmodules".to_string(),
        };
    }

    let fetched = match plumbing::fetch(repo, module) {
        Ok(f) => f,
        Err(e) => {
            return UpdateOutcome::Failed {
                error: format!("{:#}", e),
            }
        }
    };

    if strict {
        // re-read from disk rather than trusting what fetch reported
        match MdmModule::require(repo, &module.handle) {
            Ok(fresh) if fresh.version_actual == fresh.version_name => {}
            Ok(fresh) => {
                return UpdateOutcome::Failed {
                    error: format!(
                        "wanted {} but {} is checked out",
                        fresh.version_name.as_deref().unwrap_or("-"),
                        fresh.version_actual.as_deref().unwrap_or("nothing")
                    ),
                }
            }
            Err(e) => {
                return UpdateOutcome::Failed {
                    error: format!("{:#}", e),
                }
            }
        }
    }

    if fetched {
        UpdateOutcome::Updated
    } else {
        UpdateOutcome::Unchanged
    }
}

pub fn format_update_human(result: &UpdateResult) -> String {
    let mut lines = Vec::new();
    for m in &result.modules {
        let version = m.version.as_deref().unwrap_or("-");
        match &m.outcome {
            UpdateOutcome::Updated => lines.push(format!("{}: now at {}", m.path, version)),
            UpdateOutcome::Unchanged => {
                lines.push(format!("{}: already at {}", m.path, version))
            }
            UpdateOutcome::Failed { error } => {
                lines.push(format!("{}: failed to reach {}", m.path, version));
                for l in error.lines() {
                    lines.push(format!("  {}", l));
                }
            }
        }
    }
    lines.push(super::format_exit_human(&result.exit));
    lines.join("\n")
}
