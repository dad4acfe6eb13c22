//! StemWeaver bundler - package build orchestrator.
//!
//! Builds AppImage, deb, rpm, Windows installer and source archive artifacts
//! of the StemWeaver application and verifies every one of them.

use std::process;
use stemweaver_bundler::cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = cli::Args::parse_args();

    // Initialize logging; RUST_LOG wins over the flag-derived default
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_filter()))
        .format_timestamp(None)
        .init();

    // Run CLI and get exit code
    let exit_code = match cli::run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };

    process::exit(exit_code);
}
