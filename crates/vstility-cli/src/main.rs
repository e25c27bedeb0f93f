//! vstility — render an audio file through a VST3 effect offline.
//!
//! ```text
//! vstility --input in.wav --output out.wav --vst3 /path/Effect.vst3 [--y]
//! ```
//!
//! Exit codes: 0 success (including a declined overwrite), 1 render
//! failure, 2 usage error.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use vstility_plugin::{discovery::BUILTIN_SCHEME, PluginError};
use vstility_render::{probe, render_file, RenderError};

#[derive(Parser, Debug)]
#[command(
    name = "vstility",
    version,
    about = "Renders an audio file through a single VST3 effect and writes 16-bit PCM WAV"
)]
struct Args {
    /// Input audio file path
    #[arg(long)]
    input: PathBuf,

    /// Output audio file path
    #[arg(long)]
    output: PathBuf,

    /// VST3 plugin file path
    #[arg(long)]
    vst3: PathBuf,

    /// Overwrites the output file if exists without notice
    #[arg(long = "y")]
    yes: bool,
}

/// Interpret one line of overwrite-prompt input
fn parse_confirmation(line: &str) -> Option<bool> {
    let trimmed = line.trim();
    if trimmed.len() != 1 {
        return None;
    }
    match trimmed.chars().next()?.to_ascii_lowercase() {
        'y' => Some(true),
        'n' => Some(false),
        _ => None,
    }
}

/// Prompt until the user answers y or n
fn confirm_overwrite(input: &mut impl BufRead) -> bool {
    loop {
        print!("Output file already exists. Overwrite? [y/n]: ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        if input.read_line(&mut line).is_err() || line.is_empty() {
            // stdin closed: treat as declined
            return false;
        }

        match parse_confirmation(&line) {
            Some(answer) => return answer,
            None => println!("Invalid input. Please enter 'y' or 'n'."),
        }
    }
}

fn bundle_exists(vst3: &Path) -> bool {
    vst3.to_string_lossy().starts_with(BUILTIN_SCHEME) || vst3.exists()
}

fn report_error(err: &RenderError) {
    match err {
        RenderError::InputNotFound(_) | RenderError::DecodeError(_) => {
            println!("Could not read input file.");
        }
        RenderError::Plugin(PluginError::NotFound(_))
        | RenderError::Plugin(PluginError::NoEffectFound(_))
        | RenderError::Plugin(PluginError::ScanFailed(_)) => {
            println!("Could not find VST3 plugin.");
        }
        RenderError::Plugin(PluginError::InstantiationFailed(message)) => {
            println!("Could not create plugin instance: {}", message);
        }
        RenderError::OutputStreamError(_) => {
            println!("Error: Could not create output file stream.");
        }
        RenderError::EncodeWriterError(_) => {
            println!("Error: Could not create output file writer.");
        }
        other => {
            println!("Error: {}", other);
        }
    }
    log::error!("Render failed: {}", err);
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    log::info!("Starting vstility");

    if !args.input.exists() || !bundle_exists(&args.vst3) {
        println!("Error: Input file or VST3 file not found.");
        return ExitCode::FAILURE;
    }

    if args.output.exists() && !args.yes {
        let stdin = io::stdin();
        if !confirm_overwrite(&mut stdin.lock()) {
            println!("Operation cancelled.");
            return ExitCode::SUCCESS;
        }
    }

    if let Ok(info) = probe(&args.input) {
        log::info!(
            "Input: {} Hz, {} ch, ~{} frames",
            info.sample_rate,
            info.channels,
            info.frames
        );
    }

    match render_file(&args.input, &args.output, &args.vst3) {
        Ok(report) => {
            log::info!(
                "Rendered {} frames through {} (peak {:.2} dBFS)",
                report.info.frames,
                report.effect,
                report.peak_db
            );
            println!(
                "Processing complete. Output saved to: {}",
                report.output.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_confirmation_accepts_single_letters() {
        assert_eq!(parse_confirmation("y\n"), Some(true));
        assert_eq!(parse_confirmation("Y\n"), Some(true));
        assert_eq!(parse_confirmation("n\n"), Some(false));
        assert_eq!(parse_confirmation("N"), Some(false));
    }

    #[test]
    fn test_parse_confirmation_rejects_everything_else() {
        assert_eq!(parse_confirmation("yes\n"), None);
        assert_eq!(parse_confirmation("no\n"), None);
        assert_eq!(parse_confirmation("\n"), None);
        assert_eq!(parse_confirmation("maybe"), None);
        assert_eq!(parse_confirmation("q"), None);
    }

    #[test]
    fn test_confirm_overwrite_reprompts_until_valid() {
        let mut input = io::Cursor::new(b"what\nn\n".to_vec());
        assert!(!confirm_overwrite(&mut input));

        let mut input = io::Cursor::new(b"\nyes\ny\n".to_vec());
        assert!(confirm_overwrite(&mut input));
    }

    #[test]
    fn test_confirm_overwrite_declines_on_closed_stdin() {
        let mut input = io::Cursor::new(Vec::new());
        assert!(!confirm_overwrite(&mut input));
    }

    #[test]
    fn test_bundle_exists_accepts_builtin_scheme() {
        assert!(bundle_exists(Path::new("builtin:bypass")));
        assert!(!bundle_exists(Path::new("/tmp/absent_plugin.vst3")));
    }

    #[test]
    fn test_args_require_all_paths() {
        let err = Args::try_parse_from(["vstility", "--input", "a.wav"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let ok = Args::try_parse_from([
            "vstility", "--input", "a.wav", "--output", "b.wav", "--vst3", "fx.vst3", "--y",
        ])
        .unwrap();
        assert!(ok.yes);
        assert_eq!(ok.vst3, PathBuf::from("fx.vst3"));
    }
}
