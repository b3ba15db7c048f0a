//! Command-line interface parsing for the fallback client
//!
//! Global flags configure the client and the fallback cache; the `get`
//! subcommand performs a single cached GET.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::auth::Authenticator;
use crate::config::{
    ClientConfig, FallbackConfig, DEFAULT_CACHE_EXPIRE_SECS, DEFAULT_LOG_THROTTLE_SECS,
    DEFAULT_TIMEOUT_SECS,
};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// A `--param` value was not of the form `key=value`
    #[error("Invalid query parameter: '{0}'. Expected key=value")]
    InvalidParam(String),
}

/// Fallback client - fetch API resources with a degraded-mode cache
#[derive(Parser, Debug)]
#[command(name = "fallback-client")]
#[command(about = "Signed API client with a stale-while-revalidate fallback cache")]
#[command(version)]
pub struct Cli {
    /// Base URL every request path is joined onto
    #[arg(long, env = "FALLBACK_CLIENT_BASE_URL")]
    pub base_url: String,

    /// Shared secret used to sign requests
    #[arg(long, env = "FALLBACK_CLIENT_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Sender identifier sent with the signature
    #[arg(long, env = "FALLBACK_CLIENT_SENDER_ID")]
    pub sender_id: String,

    /// Request timeout in seconds
    #[arg(long, env = "FALLBACK_CLIENT_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Directory for cached responses (defaults to the XDG cache directory)
    #[arg(long, env = "FALLBACK_CLIENT_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Lifetime of cached content and validators, in seconds
    #[arg(long, env = "FALLBACK_CLIENT_CACHE_EXPIRE_SECONDS", default_value_t = DEFAULT_CACHE_EXPIRE_SECS)]
    pub cache_expire_seconds: u64,

    /// Cooldown between repeated fallback log lines, in seconds
    #[arg(long, env = "FALLBACK_CLIENT_LOG_THROTTLE_SECONDS", default_value_t = DEFAULT_LOG_THROTTLE_SECS)]
    pub log_throttle_seconds: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a resource through the fallback cache
    ///
    /// Examples:
    ///   fallback-client get /some/path/ --param a=b
    ///   fallback-client get /me/ --bearer-token abc123
    Get {
        /// Path relative to the base URL
        path: String,

        /// Query parameter as key=value; may be repeated
        #[arg(long = "param", short = 'p', value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Authenticate with a bearer token
        #[arg(long, env = "FALLBACK_CLIENT_BEARER_TOKEN", hide_env_values = true)]
        bearer_token: Option<String>,

        /// Authenticate with an SSO session id
        #[arg(long, env = "FALLBACK_CLIENT_SSO_SESSION_ID", hide_env_values = true)]
        sso_session_id: Option<String>,
    },
}

/// Parses a `key=value` argument into a query pair.
///
/// The value may be empty and may itself contain `=`.
pub fn parse_param_arg(s: &str) -> Result<(String, String), CliError> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(CliError::InvalidParam(s.to_string())),
    }
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url, &self.api_key, &self.sender_id)
            .with_timeout(Duration::from_secs(self.timeout))
    }

    pub fn fallback_config(&self) -> FallbackConfig {
        FallbackConfig::default()
            .with_cache_expire_seconds(self.cache_expire_seconds)
            .with_log_throttle_seconds(self.log_throttle_seconds)
    }
}

impl Command {
    /// Query pairs from the repeated `--param` flags
    pub fn query_params(&self) -> Result<Vec<(String, String)>, CliError> {
        match self {
            Command::Get { params, .. } => params.iter().map(|p| parse_param_arg(p)).collect(),
        }
    }

    /// The authenticator implied by the credential flags, if any were given
    pub fn authenticator(&self) -> Option<Authenticator> {
        match self {
            Command::Get {
                bearer_token,
                sso_session_id,
                ..
            } => Authenticator::negotiate(bearer_token.as_deref(), sso_session_id.as_deref()).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 7] = [
        "fallback-client",
        "--base-url",
        "https://example.com/",
        "--api-key",
        "secret",
        "--sender-id",
        "sender",
    ];

    fn parse(extra: &[&str]) -> Cli {
        let args: Vec<&str> = REQUIRED.iter().chain(extra.iter()).copied().collect();
        Cli::parse_from(args)
    }

    #[test]
    fn test_parse_param_arg() {
        assert_eq!(
            parse_param_arg("a=b").unwrap(),
            ("a".to_string(), "b".to_string())
        );
        assert_eq!(
            parse_param_arg("q=x=y").unwrap(),
            ("q".to_string(), "x=y".to_string())
        );
        assert_eq!(parse_param_arg("empty=").unwrap().1, "");
    }

    #[test]
    fn test_parse_param_arg_invalid() {
        for bad in ["novalue", "=b", ""] {
            let err = parse_param_arg(bad).unwrap_err();
            assert!(err.to_string().contains("Invalid query parameter"));
        }
    }

    #[test]
    fn test_cli_parse_get() {
        let cli = parse(&["get", "/some/path/", "--param", "x=y", "-p", "a=b"]);
        let Command::Get { ref path, .. } = cli.command;
        assert_eq!(path, "/some/path/");
        assert_eq!(
            cli.command.query_params().unwrap(),
            vec![
                ("x".to_string(), "y".to_string()),
                ("a".to_string(), "b".to_string())
            ]
        );
        assert!(cli.command.authenticator().is_none());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = parse(&["get", "/"]);
        assert_eq!(cli.timeout, DEFAULT_TIMEOUT_SECS);
        assert!(cli.cache_dir.is_none());

        let fallback = cli.fallback_config();
        assert_eq!(fallback, FallbackConfig::default());
    }

    #[test]
    fn test_cli_bearer_token() {
        let cli = parse(&["get", "/", "--bearer-token", "abc"]);
        assert_eq!(
            cli.command.authenticator(),
            Some(Authenticator::Bearer("abc".to_string()))
        );
    }

    #[test]
    fn test_cli_sso_session() {
        let cli = parse(&["get", "/", "--sso-session-id", "123"]);
        assert_eq!(
            cli.command.authenticator(),
            Some(Authenticator::SessionSso("123".to_string()))
        );
    }

    #[test]
    fn test_cli_config_mapping() {
        let cli = parse(&[
            "--timeout",
            "2",
            "--cache-expire-seconds",
            "100",
            "--log-throttle-seconds",
            "60",
            "get",
            "/",
        ]);

        let client = cli.client_config();
        assert_eq!(client.timeout, Duration::from_secs(2));
        assert_eq!(client.sender_id, "sender");

        let fallback = cli.fallback_config();
        assert_eq!(fallback.cache_expire, Duration::from_secs(100));
        assert_eq!(fallback.log_throttle, Duration::from_secs(60));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let args: Vec<&str> = REQUIRED.to_vec();
        assert!(Cli::try_parse_from(args).is_err());
    }
}
