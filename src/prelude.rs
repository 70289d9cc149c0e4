//! The handful of names nearly every command reaches for, re-exported one by
//! one so a command can start with `use crate::prelude::*;`. Anything not
//! listed here is imported by its full path.

// standard library
pub use std::io::stderr;
pub use std::path::{self, Path, PathBuf};

// file globbing
pub use glob::glob;

// paths, urls, versions, prompting
pub use crate::paths::{join, normalize_module_path, relpath};
pub use crate::util::{
    compare_versions, dependency_name_from_url, input_prompt, resolve_relative_url,
    validate_version_name, version_sort,
};

// running commands
pub use crate::sh::{cd, cp, git, pwd, rm, CommandError, Cwd};

// mdm itself
pub(crate) use crate::commands as cmd;
pub(crate) use crate::git as cgw;
pub use crate::gitmodules::GitModules;
pub use crate::module::{MdmModule, ModuleStatus, ModuleType};
pub(crate) use crate::plumbing;
