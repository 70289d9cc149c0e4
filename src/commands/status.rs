use anyhow::Result;
use serde::Serialize;

use crate::prelude::*;

#[derive(Debug, Serialize)]
pub struct StatusResult {
    pub modules: Vec<ModuleSummary>,
}

#[derive(Debug, Serialize)]
pub struct ModuleSummary {
    pub path: String,
    pub module_type: ModuleType,
    pub status: ModuleStatus,
    pub version_wanted: Option<String>,
    pub version_actual: Option<String>,
    pub url: Option<String>,
}

impl ModuleSummary {
    /// A dependency is in sync when the checked out release is the one asked for.
    pub fn in_sync(&self) -> bool {
        self.module_type != ModuleType::Dependency
            || (self.version_wanted.is_some() && self.version_wanted == self.version_actual)
    }
}

pub fn cmd_status(repo: &Path) -> Result<StatusResult> {
    let modules = MdmModule::load_all(repo)?
        .into_iter()
        .map(|m| ModuleSummary {
            status: m.status(),
            path: m.path,
            module_type: m.module_type,
            version_wanted: m.version_name,
            version_actual: m.version_actual,
            url: m.url_historic,
        })
        .collect();
    Ok(StatusResult { modules })
}

pub fn format_status_human(result: &StatusResult) -> String {
    if result.modules.is_empty() {
        return " --- no managed dependencies --- ".to_string();
    }

    let width = result
        .modules
        .iter()
        .map(|m| m.path.len())
        .max()
        .unwrap_or(0);

    let mut lines = Vec::new();
    lines.push(format!("{:<width$}   {:<10}  version", "module", "type", width = width));
    lines.push(format!("{:<width$}   {:<10}  -------", "------", "----", width = width));
    for m in &result.modules {
        let wanted = m.version_wanted.as_deref().unwrap_or("-");
        let mut line = format!(
            "{:<width$}   {:<10}  {}",
            m.path,
            m.module_type.as_str(),
            if m.module_type == ModuleType::Dependency { wanted } else { "" },
            width = width
        );
        if m.module_type == ModuleType::Dependency {
            match (&m.status, &m.version_actual) {
                (ModuleStatus::Uninitialized, _) => line.push_str("  -- uninitialized"),
                (ModuleStatus::Missing, _) => line.push_str("  -- missing url"),
                _ if m.in_sync() => {}
                (_, Some(actual)) => {
                    line.push_str(&format!("  -- currently {} checked out", actual))
                }
                (_, None) => line.push_str("  -- no release checked out"),
            }
        }
        lines.push(line.trim_end().to_string());
    }
    lines.join("\n")
}
