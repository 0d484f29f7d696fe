use std::io::Write;
use std::path::Path;

use easypaper_core::{
    Batch, BatchEvent, BatchSummary, FileId, FileStatus, IntakeReport, ProviderFamily,
    ProviderKind, ProviderSettings,
};
use easypaper_reporting::{ExportError, ExportFormat};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

const TITLE_DISPLAY_CHARS: usize = 50;

fn shorten(text: &str) -> String {
    if text.chars().count() > TITLE_DISPLAY_CHARS {
        let head: String = text.chars().take(TITLE_DISPLAY_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Print which inputs were queued and which were skipped.
pub fn print_intake(
    w: &mut dyn Write,
    report: &IntakeReport,
    settings: &ProviderSettings,
    color: ColorMode,
) -> std::io::Result<()> {
    let config = settings.kind.model_config();
    writeln!(
        w,
        "Analyzing {} file(s) with {} ({})",
        report.added.len(),
        config.display_name,
        settings.effective_model()
    )?;
    for name in &report.rejected {
        let msg = format!("(Skipped {}: not a PDF)", name);
        if color.enabled() {
            writeln!(w, "{}", msg.dimmed())?;
        } else {
            writeln!(w, "{}", msg)?;
        }
    }
    writeln!(w)?;
    Ok(())
}

fn position(batch: &Batch, id: FileId) -> Option<(usize, &str)> {
    batch
        .files()
        .iter()
        .position(|f| f.id == id)
        .map(|i| (i + 1, batch.files()[i].source.name.as_str()))
}

/// Print one batch event, using the batch snapshot for file names.
pub fn print_progress(
    w: &mut dyn Write,
    event: &BatchEvent,
    batch: &Batch,
    color: ColorMode,
) -> std::io::Result<()> {
    let total = batch.len();
    match event {
        BatchEvent::Reading { id } => {
            if let Some((idx, name)) = position(batch, *id) {
                writeln!(w, "[{}/{}] Reading: {}", idx, total, name)?;
            }
        }
        BatchEvent::Analyzing { id } => {
            if let Some((idx, name)) = position(batch, *id) {
                writeln!(w, "[{}/{}] Analyzing: {}", idx, total, name)?;
            }
        }
        BatchEvent::Completed { id, result } => {
            if let Some((idx, _)) = position(batch, *id) {
                let title = shorten(&result.basic_info.title);
                if color.enabled() {
                    writeln!(
                        w,
                        "[{}/{}] -> {} \"{}\"",
                        idx,
                        total,
                        "COMPLETED".green(),
                        title
                    )?;
                } else {
                    writeln!(w, "[{}/{}] -> COMPLETED \"{}\"", idx, total, title)?;
                }
            }
        }
        BatchEvent::Failed { id, error } => {
            if let Some((idx, _)) = position(batch, *id) {
                if color.enabled() {
                    writeln!(w, "[{}/{}] -> {} {}", idx, total, "ERROR".red(), error)?;
                } else {
                    writeln!(w, "[{}/{}] -> ERROR {}", idx, total, error)?;
                }
            }
        }
        BatchEvent::BatchComplete(_) => {
            // Reported by print_summary
        }
    }
    Ok(())
}

pub fn print_export(
    w: &mut dyn Write,
    format: ExportFormat,
    path: &Path,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "  {} {}", format!("{}:", format.label()).bold(), path.display())
    } else {
        writeln!(w, "  {}: {}", format.label(), path.display())
    }
}

pub fn print_export_error(
    w: &mut dyn Write,
    source_name: &str,
    format: ExportFormat,
    error: &ExportError,
    color: ColorMode,
) -> std::io::Result<()> {
    let msg = format!("{} export of {} failed: {}", format.label(), source_name, error);
    if color.enabled() {
        writeln!(w, "  {} {}", "WARNING:".yellow(), msg)
    } else {
        writeln!(w, "  WARNING: {}", msg)
    }
}

/// Print final counts, then the error of every failed file.
pub fn print_summary(
    w: &mut dyn Write,
    summary: &BatchSummary,
    batch: &Batch,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", "SUMMARY".bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "SUMMARY")?;
        writeln!(w, "{}", sep)?;
    }

    writeln!(w, "  Files in batch: {}", batch.len())?;
    if color.enabled() {
        writeln!(w, "  {} {}", "Completed:".green(), summary.completed)?;
        writeln!(w, "  {} {}", "Failed:".red(), summary.failed)?;
    } else {
        writeln!(w, "  Completed: {}", summary.completed)?;
        writeln!(w, "  Failed: {}", summary.failed)?;
    }
    if summary.cancelled > 0 {
        let msg = format!("Cancelled before start: {}", summary.cancelled);
        if color.enabled() {
            writeln!(w, "  {}", msg.dimmed())?;
        } else {
            writeln!(w, "  {}", msg)?;
        }
    }

    let failed = batch
        .files()
        .iter()
        .filter(|f| f.status == FileStatus::Error);
    for file in failed {
        let error = file.error.as_deref().unwrap_or("unknown error");
        if color.enabled() {
            writeln!(w, "  {} {}", format!("{}:", file.source.name).red(), error)?;
        } else {
            writeln!(w, "  {}: {}", file.source.name, error)?;
        }
    }
    writeln!(w)?;
    Ok(())
}

fn family_label(family: ProviderFamily) -> &'static str {
    match family {
        ProviderFamily::NativeMultimodal => "native PDF",
        ProviderFamily::OpenAiCompatible => "extracted text",
    }
}

/// Print the supported providers and how each one is configured.
pub fn print_providers(w: &mut dyn Write, color: ColorMode) -> std::io::Result<()> {
    for kind in ProviderKind::ALL {
        let config = kind.model_config();
        let model = if config.needs_endpoint {
            "(endpoint id required)"
        } else {
            config.default_model
        };
        if color.enabled() {
            writeln!(w, "{} {}", format!("{:<10}", kind.id()).bold(), config.display_name)?;
        } else {
            writeln!(w, "{:<10} {}", kind.id(), config.display_name)?;
        }
        writeln!(w, "           input:   {}", family_label(config.family))?;
        writeln!(w, "           model:   {}", model)?;
        writeln!(w, "           api key: {}", config.api_key_env)?;
    }
    Ok(())
}
