use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let globals = GlobalArgs::new(
        matches
            .get_one::<String>("api-url")
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --api-url"))?,
        matches
            .get_one::<String>("state-file")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --state-file"))?,
    );

    // Closure to return subcommand matches
    let sub_m = |subcommand| -> Result<&clap::ArgMatches> {
        matches
            .subcommand_matches(subcommand)
            .context("arguments not found")
    };

    let action = match matches.subcommand_name() {
        Some("login") => {
            let matches = sub_m("login")?;
            Action::Login {
                email: matches
                    .get_one::<String>("email")
                    .map(|s| s.to_string())
                    .ok_or_else(|| anyhow::anyhow!("missing required argument: --email"))?,
                password: matches
                    .get_one::<String>("password")
                    .map(|s| SecretString::from(s.to_string()))
                    .ok_or_else(|| anyhow::anyhow!("missing required argument: --password"))?,
            }
        }
        Some("logout") => Action::Logout,
        Some("whoami") => Action::Whoami,
        Some("menu") => {
            let matches = sub_m("menu")?;
            Action::Menu {
                file: matches.get_one::<String>("file").map(PathBuf::from),
            }
        }
        _ => return Err(anyhow::anyhow!("missing subcommand")),
    };

    Ok((action, globals))
}
