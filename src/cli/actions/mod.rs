pub mod console;

use secrecy::SecretString;
use std::path::PathBuf;

/// Subcommand resolved from the command line.
#[derive(Debug)]
pub enum Action {
    Login {
        email: String,
        password: SecretString,
    },
    Logout,
    Whoami,
    Menu {
        file: Option<PathBuf>,
    },
}
