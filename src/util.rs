use anyhow::{bail, Context, Result};
use std::cmp::Ordering;
use std::io::{BufRead, Write};
use url::Url;

// --- Version ordering ---

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Component {
    // declaration order matters: numbers sort before words
    Num(u64),
    Word(String),
}

fn components(version: &str) -> Vec<Component> {
    let mut out = Vec::new();
    let mut chars = version.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            let mut run = String::new();
            while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                run.push(d);
                chars.next();
            }
            match run.parse() {
                Ok(n) => out.push(Component::Num(n)),
                Err(_) => out.push(Component::Word(run)),
            }
        } else if c.is_alphabetic() {
            let mut run = String::new();
            while let Some(&a) = chars.peek().filter(|a| a.is_alphabetic()) {
                run.push(a);
                chars.next();
            }
            out.push(Component::Word(run));
        } else {
            chars.next();
        }
    }
    out
}

fn as_semver(version: &str) -> Option<semver::Version> {
    let bare = version.strip_prefix('v').unwrap_or(version);
    semver::Version::parse(bare).ok()
}

/// Orders release names. Names that are both semver (with or without a
/// leading `v`) use semver precedence; anything else is compared loosely,
/// run by run, with numeric runs compared as numbers.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    if let (Some(va), Some(vb)) = (as_semver(a), as_semver(b)) {
        return va.cmp(&vb).then_with(|| a.cmp(b));
    }
    components(a).cmp(&components(b)).then_with(|| a.cmp(b))
}

pub fn version_sort(versions: &mut [String]) {
    versions.sort_by(|a, b| compare_versions(a, b));
}

/// Release names become part of ref names, so they must survive
/// `git check-ref-format` as a single path component chain.
pub fn validate_version_name(version: &str) -> Result<()> {
    if version.is_empty() {
        bail!("version name must not be empty");
    }
    if version.chars().any(char::is_whitespace) {
        bail!("version name must not contain whitespace: {:?}", version);
    }
    if version.starts_with('-') || version.starts_with('/') || version.ends_with('/') {
        bail!("version name must not start with '-' or begin/end with '/': {:?}", version);
    }
    Ok(())
}

// --- Urls and names ---

/// Resolves `relative` against `base` the way a browser resolves a link:
/// `base` is treated as a directory. Only urls with a scheme and absolute
/// filesystem paths can act as a base.
pub fn resolve_relative_url(base: &str, relative: &str) -> Option<String> {
    if base.starts_with('/') {
        let dir = Url::from_directory_path(base).ok()?;
        let joined = dir.join(relative).ok()?;
        let path = joined.to_file_path().ok()?;
        return Some(path.to_string_lossy().to_string());
    }
    let dir = Url::parse(&format!("{}/", base.trim_end_matches('/'))).ok()?;
    if dir.cannot_be_a_base() {
        return None;
    }
    dir.join(relative).ok().map(String::from)
}

/// `https://host/team/beta-releases.git` -> `beta`
pub fn dependency_name_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed
        .rsplit(|c: char| c == '/' || c == ':' || c == '\\')
        .next()
        .unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);
    let name = name.strip_suffix("-releases").unwrap_or(name);
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

// --- Interaction ---

/// Prints `prompt` to stderr and reads one line from stdin, without the
/// trailing newline.
pub fn input_prompt(prompt: &str) -> Result<String> {
    let mut err = std::io::stderr();
    write!(err, "{}", prompt).context("failed to write prompt")?;
    err.flush().context("failed to write prompt")?;

    let mut line = String::new();
    let read = std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    if read == 0 {
        bail!("no input available for prompt\n  hint: pass the value as a flag, or use --use-defaults");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
