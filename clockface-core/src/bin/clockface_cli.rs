//! ClockFace CLI - JSON bridge to the dial engine
//!
//! Commands: presets, render, export
//! Outputs JSON to stdout, logs to stderr
//! Returns non-zero when a configuration or export fails

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clockface_core::{ExportFormat, PresetRegistry, Session};

#[derive(Parser)]
#[command(name = "clockface-cli")]
#[command(about = "ClockFace CLI - Dial Render and Export Engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory of extra preset JSON files
    #[arg(short, long, default_value = "presets")]
    presets_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// List available presets
    Presets,

    /// Print the primitive list for a configuration
    Render {
        #[command(flatten)]
        source: ConfigSource,
    },

    /// Export a configuration to a file
    Export {
        #[command(flatten)]
        source: ConfigSource,

        #[arg(short, long, value_enum)]
        format: FormatArg,

        /// Raster resolution; defaults to canvas.dpi
        #[arg(long)]
        dpi: Option<u32>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(clap::Args)]
struct ConfigSource {
    /// Preset id applied first
    #[arg(long)]
    preset: Option<String>,

    /// Partial configuration JSON merged last
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Png,
    Svg,
}

impl From<FormatArg> for ExportFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Png => ExportFormat::Png,
            FormatArg::Svg => ExportFormat::Svg,
        }
    }
}

fn init_logging() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn emit(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => println!(r#"{{"success": false, "error": "{}"}}"#, e),
    }
}

fn fail(error: impl std::fmt::Display) -> ExitCode {
    emit(&json!({ "success": false, "error": error.to_string() }));
    ExitCode::FAILURE
}

/// Build a session from `--preset` then `--config`, and settle the background image.
fn open_session(registry: &PresetRegistry, source: &ConfigSource) -> Result<Session, String> {
    let mut session = Session::new();

    if let Some(id) = &source.preset {
        session.apply_preset(registry, id).map_err(|e| e.to_string())?;
    }
    if let Some(config) = &source.config {
        let patch: Value =
            serde_json::from_str(config).map_err(|e| format!("Invalid config: {}", e))?;
        session.load_preset(&patch).map_err(|e| e.to_string())?;
    }

    session.load_background_image_blocking();
    Ok(session)
}

fn export(session: &Session, format: ExportFormat, dpi: Option<u32>, out: &Path) -> Result<Value, String> {
    let file = match format {
        ExportFormat::Png => session.export_raster(dpi),
        ExportFormat::Svg => session.export_vector(),
    }
    .map_err(|e| e.to_string())?;

    let path = file.write_to_dir(out).map_err(|e| e.to_string())?;
    Ok(json!({
        "success": true,
        "path": path.display().to_string(),
        "mimeType": file.format.mime_type(),
        "file": file,
    }))
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let mut registry = PresetRegistry::with_builtins();
    if let Err(e) = registry.load_from_dir(&cli.presets_dir) {
        return fail(format!("Failed to load presets: {}", e));
    }

    match cli.command {
        Commands::Presets => {
            let presets: Vec<_> = registry
                .list()
                .iter()
                .map(|p| {
                    json!({
                        "id": p.id,
                        "name": p.name,
                        "description": p.description,
                        "engineMinVersion": p.engine_min_version,
                    })
                })
                .collect();

            emit(&Value::Array(presets));
            ExitCode::SUCCESS
        }

        Commands::Render { source } => {
            let session = match open_session(&registry, &source) {
                Ok(s) => s,
                Err(e) => return fail(e),
            };

            emit(&json!({
                "success": true,
                "version": session.version(),
                "imageStatus": session.image_status(),
                "scene": session.scene(),
            }));
            ExitCode::SUCCESS
        }

        Commands::Export {
            source,
            format,
            dpi,
            out,
        } => {
            let session = match open_session(&registry, &source) {
                Ok(s) => s,
                Err(e) => return fail(e),
            };

            match export(&session, format.into(), dpi, &out) {
                Ok(output) => {
                    emit(&output);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    emit(&json!({ "success": false, "error": e }));
                    ExitCode::from(2) // Export failure
                }
            }
        }
    }
}
