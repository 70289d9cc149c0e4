mod cli;
mod commands;
mod config;
mod git;
mod gitmodules;
mod logging;
mod module;
mod paths;
mod plumbing;
mod prelude;
mod sh;
mod testutil;
mod util;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.debug);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let _cwd = match &cli.dir {
        Some(dir) => Some(sh::cd(dir)?),
        None => None,
    };
    let cwd = sh::pwd()?;
    let config = config::load_default_config()?;
    let defaults = &config.defaults;

    let exit = match cli.command {
        Command::Status => {
            let result = commands::cmd_status(&cwd)?;
            output(&result, cli.json, commands::format_status_human)?;
            return Ok(0);
        }
        Command::Update { strict } => {
            let result = commands::cmd_update(&cwd, strict)?;
            output(&result, cli.json, commands::format_update_human)?;
            result.exit
        }
        Command::Add {
            url,
            name,
            version,
            lib,
            use_defaults,
        } => {
            let inputs = commands::AddInputs {
                url,
                name,
                version,
                lib: lib.unwrap_or_else(|| defaults.libs_dir.clone()),
                use_defaults: use_defaults || defaults.use_defaults,
            };
            let exit = commands::cmd_add(&cwd, inputs)?;
            output(&exit, cli.json, commands::format_exit_human)?;
            exit
        }
        Command::Alter { path, version } => {
            let exit = commands::cmd_alter(&cwd, &path, &version)?;
            output(&exit, cli.json, commands::format_exit_human)?;
            exit
        }
        Command::Remove { path } => {
            let exit = commands::cmd_remove(&cwd, &path)?;
            output(&exit, cli.json, commands::format_exit_human)?;
            exit
        }
        Command::ReleaseInit {
            name,
            repo,
            use_defaults,
            remote_url,
            remote_publish_url,
        } => {
            let inputs = commands::ReleaseInitInputs {
                name,
                repo,
                use_defaults: use_defaults || defaults.use_defaults,
                remote_url,
                remote_publish_url,
                default_dir: defaults.releases_dir.clone(),
            };
            let exit = commands::cmd_release_init(&cwd, inputs)?;
            output(&exit, cli.json, commands::format_exit_human)?;
            exit
        }
        Command::Release {
            version,
            files,
            repo,
            skip_accumulation,
        } => {
            let inputs = commands::ReleaseInputs {
                version,
                files,
                repo: repo.unwrap_or_else(|| defaults.releases_dir.clone()),
                skip_accumulation,
            };
            let result = commands::cmd_release(&cwd, inputs)?;
            output(&result, cli.json, commands::format_release_human)?;
            result.exit
        }
    };
    Ok(exit.exit_code())
}

fn output<T: serde::Serialize>(result: &T, json: bool, human_fn: fn(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        let text = human_fn(result);
        if !text.is_empty() {
            println!("{}", text);
        }
    }
    Ok(())
}
