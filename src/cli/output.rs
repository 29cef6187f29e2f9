//! Output formatting for resolver reports

use crate::cipher::{OperationKind, ResolvedCipher};
use crate::cli::args::VerbosityLevel;
use crate::error::RysigError;
use colored::Colorize;
use serde::Serialize;

/// Outcome of deciphering one signature
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SignatureOutcome {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SignatureOutcome {
    pub fn new(input: &str, result: Result<String, RysigError>) -> Self {
        match result {
            Ok(output) => Self {
                input: input.to_string(),
                output: Some(output),
                error: None,
            },
            Err(e) => Self {
                input: input.to_string(),
                output: None,
                error: Some(e.to_string()),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything one CLI run found out
#[derive(Debug, Clone, Serialize)]
pub struct Report<'a> {
    #[serde(flatten)]
    pub cipher: &'a ResolvedCipher,
    pub signatures: Vec<SignatureOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
}

impl Report<'_> {
    /// True when every requested signature deciphered
    pub fn is_success(&self) -> bool {
        self.signatures.iter().all(SignatureOutcome::is_ok)
    }
}

/// Output formatter for rysig
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
    json: bool,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel, json: bool) -> Self {
        Self { verbosity, json }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("{} {}", "warning:".yellow().bold(), message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "error:".red().bold(), message);
    }

    /// Print a full report in the configured format
    pub fn print_report(&self, report: &Report<'_>) -> Result<(), RysigError> {
        if self.json {
            println!("{}", render_json(report)?);
        } else {
            print!("{}", self.render_text(report));
        }
        Ok(())
    }

    /// Human readable report
    ///
    /// Quiet mode keeps only the deciphered values and the stream URL so the
    /// output stays usable in pipelines.
    pub fn render_text(&self, report: &Report<'_>) -> String {
        let mut out = String::new();

        if self.verbosity != VerbosityLevel::Quiet {
            let cipher = report.cipher;
            out.push_str(&format!(
                "{} {}\n",
                "Script version:".bold(),
                cipher.version()
            ));
            out.push_str(&format!("{}\n", "Helpers:".bold()));
            for kind in OperationKind::ALL {
                out.push_str(&format!(
                    "  {:<10} {}\n",
                    kind.to_string(),
                    cipher.names().name_of(kind).cyan()
                ));
            }

            let recipe = cipher.recipe();
            out.push_str(&format!(
                "{} {} step(s)\n",
                "Recipe:".bold(),
                recipe.len()
            ));
            if self.verbosity == VerbosityLevel::Verbose {
                for (index, operation) in recipe.iter().enumerate() {
                    out.push_str(&format!("  {:>3}. {}\n", index + 1, operation));
                }
            } else if !recipe.is_empty() {
                out.push_str(&format!("  {}\n", recipe));
            }
        }

        for outcome in &report.signatures {
            match (&outcome.output, &outcome.error) {
                (Some(output), _) if self.verbosity == VerbosityLevel::Quiet => {
                    out.push_str(&format!("{}\n", output));
                }
                (Some(output), _) => {
                    out.push_str(&format!("{} -> {}\n", outcome.input, output.green()));
                }
                (None, Some(error)) => {
                    out.push_str(&format!("{} -> {}\n", outcome.input, error.red()));
                }
                (None, None) => {}
            }
        }

        if let Some(url) = &report.stream_url {
            if self.verbosity == VerbosityLevel::Quiet {
                out.push_str(&format!("{}\n", url));
            } else {
                out.push_str(&format!("{} {}\n", "Stream URL:".bold(), url));
            }
        }

        out
    }
}

/// Report as pretty-printed JSON
pub fn render_json(report: &Report<'_>) -> Result<String, RysigError> {
    Ok(serde_json::to_string_pretty(report)?)
}
