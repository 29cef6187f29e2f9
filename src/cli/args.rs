//! Command line argument parsing

use crate::cipher::DriverHint;
use crate::platform::client::{ClientType, HttpClientConfig};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::time::Duration;

/// rysig - Resolve and apply a player script's signature cipher
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("source").required(true).args(["script", "video"])))]
pub struct Args {
    /// Local player script file
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Video URL or ID whose player script should be fetched
    #[arg(long, value_name = "URL")]
    pub video: Option<String>,

    /// Driver function name (located automatically when omitted)
    #[arg(long, value_name = "NAME")]
    pub driver: Option<String>,

    /// Encrypted signature to decipher (repeatable)
    #[arg(short = 's', long = "sig", value_name = "SIG")]
    pub signatures: Vec<String>,

    /// Form-encoded signatureCipher value to resolve into a stream URL
    #[arg(long, value_name = "QUERY")]
    pub signature_cipher: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// HTTP timeout (e.g., 30s, 1m)
    #[arg(long, value_name = "DURATION", default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Browser identity to present (chrome, firefox, safari, android)
    #[arg(long, value_name = "NAME", default_value = "chrome")]
    pub client: ClientType,

    /// Override User-Agent header
    #[arg(long, value_name = "USER_AGENT")]
    pub user_agent: Option<String>,

    /// Proxy URL (http/https/socks)
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Get HTTP timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    /// Driver hint selected by `--driver`
    pub fn driver_hint(&self) -> DriverHint {
        match &self.driver {
            Some(name) if !name.trim().is_empty() => DriverHint::Name(name.trim().to_string()),
            _ => DriverHint::Auto,
        }
    }

    /// HTTP client settings from the network flags
    pub fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: self.timeout_duration(),
            user_agent: self.user_agent.clone(),
            proxy_url: self.proxy.clone(),
            client_type: self.client,
            ..HttpClientConfig::default()
        }
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// Default log filter for the chosen verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbosity_level() {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "info",
            VerbosityLevel::Verbose => "debug",
        }
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (debug info)
    Verbose,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            script: None,
            video: None,
            driver: None,
            signatures: Vec::new(),
            signature_cipher: None,
            json: false,
            timeout: humantime::Duration::from(Duration::from_secs(30)),
            client: ClientType::Chrome,
            user_agent: None,
            proxy: None,
            verbose: false,
            quiet: false,
        }
    }
}
