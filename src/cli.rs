//! Command-line interface definition for lovenote
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for signing in and out, inspecting the session,
//! and issuing authenticated requests.

use clap::{Parser, Subcommand};

/// lovenote - session client for the lovenote note-sharing service
///
/// Signs in, keeps the session alive across runs, and sends authenticated
/// requests that survive access token expiry.
#[derive(Parser, Debug, Clone)]
#[command(name = "lovenote")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override the API base URL from config
    #[arg(long)]
    pub base_url: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for lovenote
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Sign in with a username and password
    Login {
        /// Account username
        username: String,

        /// Account password (prompted for when omitted)
        #[arg(short, long, env = "LOVENOTE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and sign in
    Register {
        /// Desired username
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Account password (prompted for when omitted)
        #[arg(short, long, env = "LOVENOTE_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Profile picture URL or object key
        #[arg(long)]
        profile_picture: Option<String>,
    },

    /// Show the signed-in user, restoring the session if possible
    Whoami {
        /// Print the user as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign out and forget the saved session
    Logout,

    /// Send an authenticated GET request and print the response body
    Get {
        /// Path relative to the API base URL (e.g. `notes`)
        path: String,
    },

    /// Start an interactive shell sharing one session
    Shell,
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            base_url: None,
            command: Commands::Whoami { json: false },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(!cli.json_logs);
        assert!(matches!(cli.command, Commands::Whoami { json: false }));
    }

    #[test]
    fn test_cli_parse_login_with_password() {
        let cli = Cli::try_parse_from(["lovenote", "login", "ada", "--password", "pw"]).unwrap();
        if let Commands::Login { username, password } = cli.command {
            assert_eq!(username, "ada");
            assert_eq!(password, Some("pw".to_string()));
        } else {
            panic!("Expected Login command");
        }
    }

    #[test]
    fn test_cli_parse_login_requires_username() {
        assert!(Cli::try_parse_from(["lovenote", "login"]).is_err());
    }

    #[test]
    fn test_cli_parse_register() {
        let cli = Cli::try_parse_from([
            "lovenote",
            "register",
            "eric",
            "--email",
            "eric@example.com",
            "-p",
            "secret",
            "--profile-picture",
            "avatars/eric.png",
        ])
        .unwrap();
        if let Commands::Register {
            username,
            email,
            password,
            profile_picture,
        } = cli.command
        {
            assert_eq!(username, "eric");
            assert_eq!(email, "eric@example.com");
            assert_eq!(password, Some("secret".to_string()));
            assert_eq!(profile_picture, Some("avatars/eric.png".to_string()));
        } else {
            panic!("Expected Register command");
        }
    }

    #[test]
    fn test_cli_parse_register_requires_email() {
        assert!(Cli::try_parse_from(["lovenote", "register", "eric"]).is_err());
    }

    #[test]
    fn test_cli_parse_whoami_json() {
        let cli = Cli::try_parse_from(["lovenote", "whoami", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Whoami { json: true }));
    }

    #[test]
    fn test_cli_parse_get() {
        let cli = Cli::try_parse_from(["lovenote", "get", "notes/3"]).unwrap();
        if let Commands::Get { path } = cli.command {
            assert_eq!(path, "notes/3");
        } else {
            panic!("Expected Get command");
        }
    }

    #[test]
    fn test_cli_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "lovenote",
            "-v",
            "--json-logs",
            "--base-url",
            "http://127.0.0.1:9/api/",
            "--config",
            "custom.yaml",
            "logout",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(cli.json_logs);
        assert_eq!(cli.base_url.as_deref(), Some("http://127.0.0.1:9/api/"));
        assert_eq!(cli.config, Some("custom.yaml".to_string()));
        assert!(matches!(cli.command, Commands::Logout));
    }

    #[test]
    fn test_cli_parse_shell() {
        let cli = Cli::try_parse_from(["lovenote", "shell"]).unwrap();
        assert!(matches!(cli.command, Commands::Shell));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["lovenote"]).is_err());
    }
}
