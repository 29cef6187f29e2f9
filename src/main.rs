//! Main entry point for rysig CLI

use clap::Parser;
use rysig::cli::output::{Report, SignatureOutcome};
use rysig::cli::{Args, OutputFormatter};
use rysig::platform::{SignatureDecipherer, VideoClient};
use rysig::utils::url::SignatureCipher;
use rysig::{ResolvedCipher, RysigError, ScriptVersion};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.log_level());
    debug!("Starting rysig with args: {:?}", args);

    let formatter = OutputFormatter::new(args.verbosity_level(), args.json);

    match run(&args, &formatter).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            if e.is_format_change() {
                formatter.warning("the player script layout may have changed");
            }
            formatter.error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Resolve the cipher, decipher every requested value and print the report
///
/// Returns whether every signature deciphered.
async fn run(args: &Args, formatter: &OutputFormatter) -> Result<bool, RysigError> {
    let cipher = load_cipher(args).await?;
    info!("Using cipher for script {}", cipher.version());

    let report = build_report(args, &cipher)?;
    formatter.print_report(&report)?;
    Ok(report.is_success())
}

/// Resolve the cipher from a local script file or a video's player script
async fn load_cipher(args: &Args) -> Result<Arc<ResolvedCipher>, RysigError> {
    if let Some(path) = &args.script {
        let script = tokio::fs::read_to_string(path).await?;
        debug!("Read {} bytes from {}", script.len(), path.display());
        let version = ScriptVersion::from_content(&script);
        return Ok(Arc::new(ResolvedCipher::from_script(
            &script,
            version,
            &args.driver_hint(),
        )?));
    }

    let video = args
        .video
        .as_deref()
        .ok_or_else(|| RysigError::InvalidUrl("no --script or --video given".to_string()))?;
    let client = VideoClient::new(args.http_config())?;
    let decipherer = SignatureDecipherer::new(client).with_driver_hint(args.driver_hint());
    decipherer.cipher_for_video(video).await
}

/// Apply the cipher to the signatures and `signatureCipher` value from the arguments
fn build_report<'a>(args: &Args, cipher: &'a ResolvedCipher) -> Result<Report<'a>, RysigError> {
    let mut signatures: Vec<SignatureOutcome> = args
        .signatures
        .iter()
        .map(|sig| SignatureOutcome::new(sig, cipher.decipher(sig).map_err(RysigError::from)))
        .collect();

    let mut stream_url = None;
    if let Some(query) = &args.signature_cipher {
        let parsed = SignatureCipher::parse(query)?;
        let deciphered = cipher.decipher(&parsed.signature).map_err(RysigError::from);
        if let Ok(value) = &deciphered {
            stream_url = Some(parsed.stream_url(value)?);
        }
        signatures.push(SignatureOutcome::new(&parsed.signature, deciphered));
    }

    Ok(Report {
        cipher,
        signatures,
        stream_url,
    })
}

/// Initialize logging system
fn init_logging(default_level: &str) {
    // RUST_LOG wins over the verbosity flags
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}
