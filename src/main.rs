use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use rayon::prelude::*;

use photoreport_pdf::{
    CancelToken, DirectorySink, Error, LayoutConfig, ReportSink, generate, manifest,
};

#[derive(Parser)]
#[command(
    name = "photoreport-pdf",
    about = "Lay out photographic reports as paginated PDF documents",
    version
)]
struct Cli {
    /// Report manifests (.json) or bundles (.zip)
    #[arg(required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,

    /// Directory for the generated PDFs
    #[arg(short = 'o', long = "out-dir", default_value = ".")]
    out_dir: PathBuf,

    /// Exact output file, only valid with a single input
    #[arg(long, conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Layout configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log per-block layout decisions
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = match &cli.config {
        Some(path) => match LayoutConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => LayoutConfig::default(),
    };

    if let Some(output) = &cli.output {
        if cli.inputs.len() != 1 {
            log::error!("--output takes exactly one input, got {}", cli.inputs.len());
            return ExitCode::FAILURE;
        }
        return match photoreport_pdf::convert_manifest_to_pdf(&cli.inputs[0], output, &config) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                log::error!("{}: {e}", cli.inputs[0].display());
                ExitCode::FAILURE
            }
        };
    }

    let cancel = CancelToken::new();
    let failures = cli
        .inputs
        .par_iter()
        .filter(|input| {
            match convert_into(input, &cli.out_dir, &config, &cancel) {
                Ok(path) => {
                    log::info!("{} → {}", input.display(), path.display());
                    false
                }
                Err(e) => {
                    log::error!("{}: {e}", input.display());
                    true
                }
            }
        })
        .count();

    if failures > 0 {
        log::error!("{failures} of {} report(s) failed", cli.inputs.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn convert_into(
    input: &Path,
    out_dir: &Path,
    config: &LayoutConfig,
    cancel: &CancelToken,
) -> Result<PathBuf, Error> {
    let doc = manifest::load(input)?;
    let mut sink = DirectorySink::new(out_dir);
    let name = generate(&doc, config, &mut sink as &mut dyn ReportSink, cancel)?;
    Ok(sink.dir().join(name))
}
