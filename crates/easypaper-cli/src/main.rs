use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use easypaper_core::config_file;
use easypaper_core::{Orchestrator, PdfBackend, ProviderAdapter, ProviderKind, SourceFile};
use easypaper_pdf_mupdf::MupdfBackend;
use easypaper_reporting::{ExportFormat, export_batch, export_single, write_artifact};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod output;
mod settings;

use output::ColorMode;

/// EasyPaper - Structured AI summaries of academic PDFs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one or more PDFs and export the summaries
    Analyze {
        /// PDF files to analyze, processed in the order given
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// AI provider: gemini, deepseek, qwen or doubao
        #[arg(long)]
        provider: Option<ProviderKind>,

        /// API key for the selected provider
        #[arg(long)]
        api_key: Option<String>,

        /// Model / endpoint id (required for doubao)
        #[arg(long)]
        endpoint_id: Option<String>,

        /// Override the provider's base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Directory the exports are written to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Export formats for each completed file (md, pdf, xlsx)
        #[arg(long = "format", value_delimiter = ',')]
        formats: Vec<ExportFormat>,

        /// Also write one spreadsheet with every completed file
        #[arg(long)]
        batch_excel: bool,

        /// Skip the pause before each file is analyzed
        #[arg(long)]
        no_delay: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Print the page-marked text extracted from a PDF
    Extract {
        /// Path to the PDF file
        file_path: PathBuf,
    },

    /// Show or update the saved configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List the supported AI providers
    Providers {
        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print where the configuration file lives
    Path,

    /// Store settings in the platform configuration file
    Save {
        /// Default AI provider
        #[arg(long)]
        provider: Option<ProviderKind>,

        /// API key, stored for --provider
        #[arg(long)]
        api_key: Option<String>,

        /// Model / endpoint id
        #[arg(long)]
        endpoint_id: Option<String>,

        /// Provider base URL override
        #[arg(long)]
        base_url: Option<String>,

        /// Default export directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Default export formats (md, pdf, xlsx)
        #[arg(long = "format", value_delimiter = ',')]
        formats: Vec<ExportFormat>,

        /// Pause before each file is analyzed, in milliseconds
        #[arg(long)]
        reading_delay_ms: Option<u64>,

        /// Language of the generated summaries
        #[arg(long)]
        response_language: Option<String>,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,easypaper=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Providers { no_color } => {
            let mut out = std::io::stdout();
            output::print_providers(&mut out, ColorMode(!no_color))?;
            Ok(())
        }
        Command::Extract { file_path } => extract(file_path).await,
        Command::Config { action } => match action {
            ConfigAction::Path => {
                let Some(path) = config_file::config_path() else {
                    anyhow::bail!("Could not determine config directory");
                };
                println!("{}", path.display());
                Ok(())
            }
            ConfigAction::Save {
                provider,
                api_key,
                endpoint_id,
                base_url,
                output_dir,
                formats,
                reading_delay_ms,
                response_language,
            } => save_config(settings::SaveFlags {
                provider,
                api_key,
                endpoint_id,
                base_url,
                output_dir,
                formats,
                reading_delay_ms,
                response_language,
            }),
        },
        Command::Analyze {
            files,
            provider,
            api_key,
            endpoint_id,
            base_url,
            output_dir,
            formats,
            batch_excel,
            no_delay,
            no_color,
        } => {
            let flags = settings::Flags {
                provider,
                api_key,
                endpoint_id,
                base_url,
                output_dir,
                formats,
                no_delay,
            };
            analyze(files, flags, batch_excel, no_color).await
        }
    }
}

fn save_config(flags: settings::SaveFlags) -> anyhow::Result<()> {
    let overlay = settings::config_overlay(flags)?;
    let saved = config_file::config_path()
        .and_then(|path| config_file::load_from_path(&path))
        .unwrap_or_default();
    let path = config_file::save_config(&config_file::merge(saved, overlay))
        .map_err(anyhow::Error::msg)?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}

async fn extract(file_path: PathBuf) -> anyhow::Result<()> {
    if !file_path.exists() {
        anyhow::bail!("File not found: {}", file_path.display());
    }
    let bytes = std::fs::read(&file_path)?;
    let text = tokio::task::spawn_blocking(move || {
        easypaper_core::extract_text(&MupdfBackend::new(), &bytes)
    })
    .await??;

    let mut out = std::io::stdout();
    writeln!(out, "{}", text)?;
    Ok(())
}

async fn analyze(
    files: Vec<PathBuf>,
    flags: settings::Flags,
    batch_excel: bool,
    no_color: bool,
) -> anyhow::Result<()> {
    let color = ColorMode(!no_color);
    let mut out = std::io::stdout();

    // Resolve configuration: CLI flags > env vars > config file > defaults
    let config = settings::resolve(flags, config_file::load_config(), |key| {
        std::env::var(key).ok()
    })?;

    let mut sources = Vec::with_capacity(files.len());
    for path in &files {
        if !path.exists() {
            anyhow::bail!("File not found: {}", path.display());
        }
        sources.push(SourceFile::from_path(path)?);
    }

    // Configuration problems surface here, before any file is touched.
    let backend: Arc<dyn PdfBackend> = Arc::new(MupdfBackend::new());
    let adapter = ProviderAdapter::new(&config.provider, &config.pipeline, backend)?;
    let mut orchestrator = Orchestrator::new(Arc::new(adapter), config.pipeline.clone());

    let report = orchestrator.add_files(sources);
    output::print_intake(&mut out, &report, &config.provider, color)?;
    if report.added.is_empty() {
        anyhow::bail!("No PDF files to analyze");
    }

    let cancel = CancellationToken::new();

    // Set up Ctrl+C handler
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, finishing the current file");
            cancel_clone.cancel();
        }
    });

    let summary = orchestrator
        .start_batch(cancel, |event, batch| {
            let mut progress = std::io::stdout();
            let _ = output::print_progress(&mut progress, event, batch, color);
            let _ = progress.flush();
        })
        .await?;

    let batch = orchestrator.batch();
    if batch.completed().next().is_some() {
        writeln!(out)?;
        writeln!(out, "Exports ({}):", config.output_dir.display())?;
    }
    for (source, analysis) in batch.completed() {
        for &format in &config.formats {
            let written = export_single(analysis, &source.name, format)
                .and_then(|artifact| write_artifact(&config.output_dir, &artifact));
            match written {
                Ok(path) => output::print_export(&mut out, format, &path, color)?,
                Err(e) => {
                    tracing::warn!(file = %source.name, format = format.label(), error = %e, "export failed");
                    output::print_export_error(&mut out, &source.name, format, &e, color)?;
                }
            }
        }
    }

    if batch_excel {
        match export_batch(&orchestrator.completed_results())? {
            Some(artifact) => {
                let path = write_artifact(&config.output_dir, &artifact)?;
                output::print_export(&mut out, ExportFormat::Excel, &path, color)?;
            }
            None => writeln!(out, "No completed files, batch spreadsheet skipped.")?,
        }
    }

    output::print_summary(&mut out, &summary, batch, color)?;
    Ok(())
}
