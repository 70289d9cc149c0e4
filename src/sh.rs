use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// A command that ran but exited unsuccessfully. Exit codes 1 and 2 get their
/// own variants because git uses them to mean "not found" / "usage".
#[derive(Debug)]
pub enum CommandError {
    ExitCode1 { command: String, dir: PathBuf, stderr: String },
    ExitCode2 { command: String, dir: PathBuf, stderr: String },
    Failed {
        command: String,
        dir: PathBuf,
        code: Option<i32>,
        stderr: String,
    },
}

impl CommandError {
    fn new(command: String, dir: &Path, code: Option<i32>, stderr: String) -> Self {
        let dir = dir.to_path_buf();
        match code {
            Some(1) => CommandError::ExitCode1 { command, dir, stderr },
            Some(2) => CommandError::ExitCode2 { command, dir, stderr },
            _ => CommandError::Failed {
                command,
                dir,
                code,
                stderr,
            },
        }
    }

    /// `None` when the process was killed by a signal.
    pub fn code(&self) -> Option<i32> {
        match self {
            CommandError::ExitCode1 { .. } => Some(1),
            CommandError::ExitCode2 { .. } => Some(2),
            CommandError::Failed { code, .. } => *code,
        }
    }

    pub fn stderr(&self) -> &str {
        match self {
            CommandError::ExitCode1 { stderr, .. }
            | CommandError::ExitCode2 { stderr, .. }
            | CommandError::Failed { stderr, .. } => stderr,
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (command, dir) = match self {
            CommandError::ExitCode1 { command, dir, .. }
            | CommandError::ExitCode2 { command, dir, .. }
            | CommandError::Failed { command, dir, .. } => (command, dir),
        };
        write!(
            f,
            "{} failed in {} (exit code: {})\nstderr: {}",
            command,
            dir.display(),
            self.code()
                .map_or("signal".to_string(), |c| c.to_string()),
            self.stderr().trim()
        )
    }
}

impl std::error::Error for CommandError {}

/// Exit code of the failed command behind `err`, if it was one.
pub fn exit_code(err: &anyhow::Error) -> Option<i32> {
    err.downcast_ref::<CommandError>().and_then(CommandError::code)
}

pub fn git(dir: &Path, args: &[&str]) -> Result<String> {
    tracing::debug!("git {} (in {})", args.join(" "), dir.display());
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .with_context(|| format!("failed to run git {:?} in {}", args, dir.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(CommandError::new(
            format!("git {}", args.join(" ")),
            dir,
            output.status.code(),
            stderr,
        )
        .into());
    }

    let stdout = String::from_utf8(output.stdout).context("git output was not valid UTF-8")?;
    Ok(stdout.trim_end().to_string())
}

/// Copy a file, or a directory tree, to `to`.
pub fn cp(from: &Path, to: &Path) -> Result<()> {
    let meta = std::fs::symlink_metadata(from)
        .with_context(|| format!("failed to stat {}", from.display()))?;
    if meta.is_dir() {
        std::fs::create_dir_all(to)
            .with_context(|| format!("failed to create directory {}", to.display()))?;
        for entry in std::fs::read_dir(from)
            .with_context(|| format!("failed to read directory {}", from.display()))?
        {
            let entry = entry?;
            cp(&entry.path(), &to.join(entry.file_name()))?;
        }
    } else {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        std::fs::copy(from, to)
            .with_context(|| format!("failed to copy {} to {}", from.display(), to.display()))?;
    }
    Ok(())
}

/// Remove a file or a directory tree. Nothing there is fine.
pub fn rm(path: &Path) -> Result<()> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to stat {}", path.display()));
        }
    };
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
    .with_context(|| format!("failed to remove {}", path.display()))
}

pub fn pwd() -> Result<PathBuf> {
    std::env::current_dir().context("failed to determine current directory")
}

/// Restores the previous working directory when dropped.
#[must_use = "the working directory is restored as soon as the guard drops"]
pub struct Cwd {
    previous: PathBuf,
}

impl Drop for Cwd {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            tracing::warn!(
                "could not return to {}: {}",
                self.previous.display(),
                e
            );
        }
    }
}

pub fn cd(dir: &Path) -> Result<Cwd> {
    let previous = pwd()?;
    std::env::set_current_dir(dir)
        .with_context(|| format!("failed to change directory to {}", dir.display()))?;
    Ok(Cwd { previous })
}
