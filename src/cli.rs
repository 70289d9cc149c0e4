use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "mdm",
    about = "Dependency management with git submodules and releases repos"
)]
pub struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log every git command run
    #[arg(long, global = true)]
    pub debug: bool,

    /// Run as if mdm was started in <DIR>
    #[arg(short = 'C', global = true, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the state of every mdm-managed dependency
    Status,
    /// Fetch and check out the version of each dependency named in .gitmodules
    Update {
        /// Treat any dependency that fails to reach its version as fatal
        #[arg(long)]
        strict: bool,
    },
    /// Add a dependency on a releases repo
    Add {
        /// Url of the dependency's releases repo
        url: String,
        /// Directory name for the dependency (default: derived from the url)
        #[arg(long)]
        name: Option<String>,
        /// Version to depend on (default: ask, or the newest with --use-defaults)
        #[arg(long)]
        version: Option<String>,
        /// Directory dependencies live under (default from config: lib)
        #[arg(long)]
        lib: Option<String>,
        /// Take default answers instead of prompting
        #[arg(long)]
        use_defaults: bool,
    },
    /// Change the version of an existing dependency
    Alter {
        /// Path of the dependency, as listed by `mdm status`
        path: String,
        /// Version to switch to
        #[arg(long)]
        version: String,
    },
    /// Remove a dependency
    Remove {
        /// Path of the dependency, as listed by `mdm status`
        path: String,
    },
    /// Set up a releases repo, as a submodule when run from a project root
    #[command(name = "release-init")]
    ReleaseInit {
        /// Project name used in the releases repo's README and default url
        #[arg(long)]
        name: Option<String>,
        /// Where to create the releases repo (default from config: releases)
        #[arg(long)]
        repo: Option<String>,
        /// Take default answers instead of prompting
        #[arg(long)]
        use_defaults: bool,
        /// Public url recorded in .gitmodules
        #[arg(long)]
        remote_url: Option<String>,
        /// Url used to push releases (default: the public url)
        #[arg(long)]
        remote_publish_url: Option<String>,
    },
    /// Commit files as a new release in the releases repo
    Release {
        /// Name of the new version
        #[arg(long)]
        version: String,
        /// Files to release, as paths or glob patterns (repeatable)
        #[arg(long = "files", required = true, num_args = 1..)]
        files: Vec<String>,
        /// Location of the releases repo (default from config: releases)
        #[arg(long)]
        repo: Option<String>,
        /// Don't keep a copy of the release under <version>/ on master
        #[arg(long)]
        skip_accumulation: bool,
    },
}
