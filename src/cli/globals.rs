use std::path::PathBuf;

/// Container for global runtime arguments shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    /// Base URL of the portal API.
    pub api_url: String,
    /// Path of the durable session state file.
    pub state_file: PathBuf,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(api_url: String, state_file: PathBuf) -> Self {
        Self {
            api_url,
            state_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(
            "https://api.portal.tld".to_string(),
            PathBuf::from(".ingresso.json"),
        );
        assert_eq!(args.api_url, "https://api.portal.tld");
        assert_eq!(args.state_file, PathBuf::from(".ingresso.json"));
    }
}
