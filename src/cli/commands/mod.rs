use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("ingresso")
        .about("Client session and authorization manager")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg(
            Arg::new("api-url")
                .short('a')
                .long("api-url")
                .help("Portal API base URL, example: https://api.portal.tld")
                .env("INGRESSO_API_URL")
                .required(true),
        )
        .arg(
            Arg::new("state-file")
                .short('s')
                .long("state-file")
                .help("Path of the durable session state file")
                .default_value(".ingresso.json")
                .env("INGRESSO_STATE_FILE"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("INGRESSO_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in to the portal and persist the session")
                .arg(
                    Arg::new("email")
                        .short('e')
                        .long("email")
                        .help("Account email")
                        .env("INGRESSO_EMAIL")
                        .required(true),
                )
                .arg(
                    Arg::new("password")
                        .short('p')
                        .long("password")
                        .help("Account password")
                        .env("INGRESSO_PASSWORD")
                        .required(true),
                ),
        )
        .subcommand(Command::new("logout").about("Clear the local session"))
        .subcommand(Command::new("whoami").about("Show the current principal and its grants"))
        .subcommand(
            Command::new("menu")
                .about("Show the navigation the current principal may see")
                .arg(
                    Arg::new("file")
                        .short('f')
                        .long("file")
                        .help("Menu definition file (JSON), defaults to the built-in console navigation"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "ingresso");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            "Client session and authorization manager"
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_check_api_url_and_login_args() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "ingresso",
            "--api-url",
            "https://api.portal.tld",
            "--state-file",
            "/tmp/ingresso.json",
            "login",
            "--email",
            "ada@example.com",
            "--password",
            "hunter2",
        ]);

        assert_eq!(
            matches.get_one::<String>("api-url").map(|s| s.to_string()),
            Some("https://api.portal.tld".to_string())
        );
        assert_eq!(
            matches
                .get_one::<String>("state-file")
                .map(|s| s.to_string()),
            Some("/tmp/ingresso.json".to_string())
        );

        let (name, sub_matches) = matches.subcommand().unwrap();
        assert_eq!(name, "login");
        assert_eq!(
            sub_matches
                .get_one::<String>("email")
                .map(|s| s.to_string()),
            Some("ada@example.com".to_string())
        );
        assert_eq!(
            sub_matches
                .get_one::<String>("password")
                .map(|s| s.to_string()),
            Some("hunter2".to_string())
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("INGRESSO_API_URL", Some("https://api.portal.tld")),
                ("INGRESSO_STATE_FILE", Some("/tmp/state.json")),
                ("INGRESSO_EMAIL", Some("ada@example.com")),
                ("INGRESSO_PASSWORD", Some("hunter2")),
                ("INGRESSO_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["ingresso", "login"]);
                assert_eq!(
                    matches.get_one::<String>("api-url").map(|s| s.to_string()),
                    Some("https://api.portal.tld".to_string())
                );
                assert_eq!(
                    matches
                        .get_one::<String>("state-file")
                        .map(|s| s.to_string()),
                    Some("/tmp/state.json".to_string())
                );
                assert_eq!(matches.get_one::<u8>("verbosity").map(|s| *s), Some(2));

                let (name, sub_matches) = matches.subcommand().unwrap();
                assert_eq!(name, "login");
                assert_eq!(
                    sub_matches
                        .get_one::<String>("email")
                        .map(|s| s.to_string()),
                    Some("ada@example.com".to_string())
                );
            },
        );
    }

    #[test]
    fn test_state_file_default() {
        temp_env::with_vars(
            [
                ("INGRESSO_API_URL", Some("https://api.portal.tld")),
                ("INGRESSO_STATE_FILE", None::<&str>),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["ingresso", "logout"]);
                assert_eq!(
                    matches
                        .get_one::<String>("state-file")
                        .map(|s| s.to_string()),
                    Some(".ingresso.json".to_string())
                );
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars(
                [
                    ("INGRESSO_LOG_LEVEL", Some(level)),
                    ("INGRESSO_API_URL", Some("https://api.portal.tld")),
                ],
                || {
                    let command = new();
                    let matches = command.get_matches_from(vec!["ingresso", "whoami"]);
                    assert_eq!(
                        matches.get_one::<u8>("verbosity").map(|s| *s),
                        Some(index as u8)
                    );
                },
            );
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        // loop cover all possible value_parse
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars(
                [
                    ("INGRESSO_LOG_LEVEL", None::<String>),
                    (
                        "INGRESSO_API_URL",
                        Some("https://api.portal.tld".to_string()),
                    ),
                ],
                || {
                    let mut args = vec!["ingresso".to_string(), "whoami".to_string()];

                    // Add the appropriate number of "-v" flags based on the index
                    if index > 0 {
                        let v = format!("-{}", "v".repeat(index));
                        args.push(v);
                    }

                    let command = new();

                    let matches = command.get_matches_from(args);

                    assert_eq!(
                        matches.get_one::<u8>("verbosity").map(|s| *s),
                        Some(index as u8)
                    );
                },
            );
        }
    }
}
