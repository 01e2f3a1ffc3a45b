//! # stvd, the Stevedore CLI
//!
//! Converts container-orchestration configuration between schemas
//! (docker-compose, ECS task definitions, systemd units) through the
//! shared canonical model. Text decoding and file I/O live here; the
//! conversion itself is pure and deterministic.

mod pipeline;

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Parser;
use stevedore_common::config::ConvertConfig;
use stevedore_common::constants::BIN_NAME;
use stevedore_common::error::StevedoreError;
use stevedore_common::types::Format;
use stevedore_core::ident::UuidGenerator;

/// Container configuration converter.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
struct Cli {
    /// Path to the source document, or `-` for stdin.
    #[arg(default_value = "docker-compose.yml")]
    file: PathBuf,

    /// Schema of the source document.
    #[arg(long = "from", value_parser = clap::value_parser!(Format))]
    input_format: Format,

    /// Schema of the destination document.
    #[arg(long = "to", value_parser = clap::value_parser!(Format))]
    output_format: Format,

    /// Write output to a file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Task family for ECS output (defaults to the built-in project
    /// name).
    #[arg(long)]
    family: Option<String>,
}

#[allow(clippy::print_stdout)]
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let input = read_source(&cli.file)?;
    tracing::info!(
        path = %cli.file.display(),
        from = %cli.input_format,
        to = %cli.output_format,
        "converting document"
    );

    let mut config = ConvertConfig::new(cli.input_format, cli.output_format);
    if let Some(family) = cli.family {
        config = config.with_family(family);
    }
    let output = pipeline::run(&config, &input, &UuidGenerator)?;

    if let Some(ref out_path) = cli.output {
        std::fs::write(out_path, &output).map_err(|source| StevedoreError::Io {
            path: out_path.clone(),
            source,
        })?;
        println!("Converted {} -> {}", cli.file.display(), out_path.display());
    } else {
        println!("{output}");
    }
    Ok(())
}

/// Reads the source text, from stdin when the path is `-`. The file
/// handle is scoped to this call; nothing is retained.
fn read_source(path: &Path) -> Result<String, StevedoreError> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        let _ = std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|source| StevedoreError::Io {
                path: path.to_owned(),
                source,
            })?;
        return Ok(text);
    }
    std::fs::read_to_string(path).map_err(|source| StevedoreError::Io {
        path: path.to_owned(),
        source,
    })
}
