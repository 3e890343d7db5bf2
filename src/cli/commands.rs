use std::time::Duration;

use chrono::{Local, NaiveDate};
use tracing::info;

use crate::cli::config::{AppConfig, BackendSettings};
use crate::error::FormError;
use crate::fill::fill_model::{FillReport, TokenUsage};
use crate::fill::filler::{FormFiller, batches_to_json, chunk_fields};
use crate::fill::guess::guess_answers;
use crate::fill::inference::{OllamaBackend, OpenAiBackend, TextInference};
use crate::form::config::ExtractConfig;
use crate::form::extractor::extract_from_html;
use crate::form::field_model::FieldDescriptor;
use crate::trace::logger::TraceLogger;

fn read_file(path: &str) -> Result<String, FormError> {
    std::fs::read_to_string(path).map_err(|source| FormError::Io {
        context: format!("reading {}", path),
        source,
    })
}

fn write_output(output: Option<&str>, content: &str) -> Result<(), FormError> {
    match output {
        Some(path) => {
            std::fs::write(path, content).map_err(|source| FormError::Io {
                context: format!("writing {}", path),
                source,
            })?;
            eprintln!("Written to {}", path);
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn to_pretty_json<T: serde::Serialize + ?Sized>(value: &T, context: &str) -> Result<String, FormError> {
    serde_json::to_string_pretty(value).map_err(|source| FormError::JsonSerialize {
        context: context.to_string(),
        source,
    })
}

fn extract_file(html_path: &str, scope: Option<&str>, config: &ExtractConfig) -> Result<Vec<FieldDescriptor>, FormError> {
    let source = read_file(html_path)?;
    let fields = extract_from_html(&source, scope, config)?;
    info!(path = html_path, fields = fields.len(), "extracted fields");
    Ok(fields)
}

// ============================================================================
// extract subcommand
// ============================================================================

pub fn cmd_extract(
    html_path: &str,
    scope: Option<&str>,
    visible_only: bool,
    output: Option<&str>,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut extract_config = config.extract.to_extract_config()?;
    if visible_only {
        extract_config = extract_config.with_visible_only(true);
    }

    let fields = extract_file(html_path, scope, &extract_config)?;
    write_output(output, &to_pretty_json(&fields, "field descriptors")?)?;
    Ok(())
}

// ============================================================================
// chunk subcommand
// ============================================================================

pub fn cmd_chunk(
    html_path: &str,
    scope: Option<&str>,
    chunk_size: Option<usize>,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let extract_config = config.extract.to_extract_config()?;
    let fields = extract_file(html_path, scope, &extract_config)?;

    let batches = chunk_fields(&fields, chunk_size.unwrap_or(config.fill.chunk_size));
    for (i, payload) in batches_to_json(&batches)?.iter().enumerate() {
        eprintln!("--- batch {} ({} fields) ---", i, batches[i].len());
        println!("{}", payload);
    }
    Ok(())
}

// ============================================================================
// fill subcommand
// ============================================================================

/// Build the model backend named in `settings`. `guess` has no backend.
pub fn build_backend(settings: &BackendSettings) -> Result<Option<Box<dyn TextInference>>, FormError> {
    let timeout = Duration::from_secs(settings.timeout_secs);
    match settings.backend.as_str() {
        "ollama" => Ok(Some(Box::new(OllamaBackend::new(
            &settings.ollama_endpoint,
            &settings.ollama_model,
            timeout,
        )?))),
        "openai" => Ok(Some(Box::new(OpenAiBackend::from_env(
            &settings.openai_base_url,
            &settings.openai_model,
            timeout,
        )?))),
        "guess" => Ok(None),
        other => Err(FormError::Config(format!(
            "Unknown backend: '{}'. Use 'ollama', 'openai' or 'guess'.",
            other
        ))),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_fill(
    html_path: &str,
    resume_path: &str,
    scope: Option<&str>,
    chunk_size: Option<usize>,
    date: Option<NaiveDate>,
    usage_log: Option<&str>,
    output: Option<&str>,
    settings: &BackendSettings,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let extract_config = config.extract.to_extract_config()?;
    let fields = extract_file(html_path, scope, &extract_config)?;
    let resume = read_file(resume_path)?;
    let reference_date = date.unwrap_or_else(|| Local::now().date_naive());

    let report = match build_backend(settings)? {
        Some(backend) => {
            let mut filler = FormFiller::new(backend)
                .with_chunk_size(chunk_size.unwrap_or(config.fill.chunk_size))
                .with_max_concurrency(config.fill.max_concurrency)
                .with_pricing(config.fill.pricing());
            if let Some(path) = usage_log.or(config.fill.usage_log.as_deref()) {
                filler = filler.with_tracer(TraceLogger::new(path));
            }
            filler.fill(&fields, &resume, reference_date)?
        }
        None => FillReport {
            answers: guess_answers(&fields, reference_date),
            usage: TokenUsage::default(),
            cost_usd: 0.0,
            batches: Vec::new(),
        },
    };

    write_output(output, &to_pretty_json(&report.answers, "fill answers")?)?;
    eprintln!("{}", format_usage_summary(&report, fields.len()));
    Ok(())
}

/// One-line summary of what a fill cost.
pub fn format_usage_summary(report: &FillReport, field_count: usize) -> String {
    let mut summary = format!(
        "Answered {}/{} fields in {} batches | tokens: {} prompt + {} completion | est. cost ${:.4}",
        report.answers.len(),
        field_count,
        report.batches.len(),
        report.usage.prompt_tokens,
        report.usage.completion_tokens,
        report.cost_usd,
    );
    let failed = report.failed_batches();
    if failed > 0 {
        summary.push_str(&format!(" | {} batches failed", failed));
    }
    summary
}
