use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::error::FormError;
use crate::fill::fill_model::ModelPricing;
use crate::fill::filler::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CONCURRENCY};
use crate::fill::inference::{
    DEFAULT_OLLAMA_ENDPOINT, DEFAULT_OLLAMA_MODEL, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL,
};
use crate::form::config::{ExtractConfig, TypePattern};
use crate::form::field_model::FieldType;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "form-detection",
    version,
    about = "Extract form fields from HTML and fill them from a resume"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Ollama API endpoint
    #[arg(long, global = true)]
    pub ollama_endpoint: Option<String>,

    /// Ollama model name
    #[arg(long, global = true)]
    pub ollama_model: Option<String>,

    /// OpenAI-compatible model name
    #[arg(long, global = true)]
    pub openai_model: Option<String>,

    /// Path to config file (default: form-detection.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract form field descriptors from an HTML file
    Extract {
        /// HTML file to scan
        #[arg(long)]
        html: String,

        /// Only scan inside the first element matching this selector
        #[arg(long)]
        scope: Option<String>,

        /// Skip controls that are not rendered
        #[arg(long)]
        visible_only: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Print the field batches that would be sent for filling
    Chunk {
        /// HTML file to scan
        #[arg(long)]
        html: String,

        /// Only scan inside the first element matching this selector
        #[arg(long)]
        scope: Option<String>,

        /// Maximum fields per batch
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Extract fields and fill them from a resume
    Fill {
        /// HTML file to scan
        #[arg(long)]
        html: String,

        /// Plain-text resume
        #[arg(long)]
        resume: String,

        /// Only scan inside the first element matching this selector
        #[arg(long)]
        scope: Option<String>,

        /// Fill backend: ollama, openai or guess
        #[arg(long)]
        backend: Option<String>,

        /// Maximum fields per batch
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Reference date for the prompt (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Append per-batch token usage to this JSONL file
        #[arg(long)]
        usage_log: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `form-detection.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub extract: ExtractSection,
    #[serde(default)]
    pub fill: FillSection,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
}

/// Overrides for `ExtractConfig`; anything left out keeps the built-in default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractSection {
    pub control_selectors: Option<Vec<String>>,
    pub field_wrapper_selectors: Option<Vec<String>>,
    pub label_selector: Option<String>,
    pub date_part_selector: Option<String>,
    pub required_marker: Option<String>,
    pub option_sentinels: Option<Vec<String>>,
    #[serde(default)]
    pub visible_only: bool,
    #[serde(default = "default_true")]
    pub generate_fallback_ids: bool,
    #[serde(default)]
    pub drop_unlabeled: bool,
    pub type_patterns: Option<Vec<TypePatternEntry>>,
}

/// One `(pattern, type)` row of the label heuristic table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypePatternEntry {
    pub pattern: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillSection {
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub input_price_per_million: f64,

    #[serde(default)]
    pub output_price_per_million: f64,

    pub usage_log: Option<String>,
}

impl Default for FillSection {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout_secs: default_timeout_secs(),
            input_price_per_million: 0.0,
            output_price_per_million: 0.0,
            usage_log: None,
        }
    }
}

impl FillSection {
    pub fn pricing(&self) -> ModelPricing {
        ModelPricing::new(self.input_price_per_million, self.output_price_per_million)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OllamaConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenAiConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
}

// Serde default helpers
fn default_true() -> bool { true }
fn default_backend() -> String { "ollama".to_string() }
fn default_chunk_size() -> usize { DEFAULT_CHUNK_SIZE }
fn default_max_concurrency() -> usize { DEFAULT_MAX_CONCURRENCY }
fn default_timeout_secs() -> u64 { 120 }

impl Default for ExtractSection {
    fn default() -> Self {
        Self {
            control_selectors: None,
            field_wrapper_selectors: None,
            label_selector: None,
            date_part_selector: None,
            required_marker: None,
            option_sentinels: None,
            visible_only: false,
            generate_fallback_ids: true,
            drop_unlabeled: false,
            type_patterns: None,
        }
    }
}

impl ExtractSection {
    /// Apply the overrides to the default `ExtractConfig`, compiling the
    /// pattern table.
    pub fn to_extract_config(&self) -> Result<ExtractConfig, FormError> {
        let mut config = ExtractConfig::default()
            .with_visible_only(self.visible_only)
            .with_fallback_ids(self.generate_fallback_ids)
            .with_drop_unlabeled(self.drop_unlabeled);

        if let Some(selectors) = &self.control_selectors {
            config.control_selectors = selectors.clone();
        }
        if let Some(selectors) = &self.field_wrapper_selectors {
            config = config.with_field_wrappers(selectors.iter().cloned());
        }
        if let Some(selector) = &self.label_selector {
            config.label_selector = selector.clone();
        }
        if let Some(selector) = &self.date_part_selector {
            config.date_part_selector = selector.clone();
        }
        if let Some(marker) = &self.required_marker {
            config = config.with_required_marker(marker.clone());
        }
        if let Some(sentinels) = &self.option_sentinels {
            config = config.with_option_sentinels(sentinels.iter().cloned());
        }
        if let Some(entries) = &self.type_patterns {
            let patterns = entries
                .iter()
                .map(|e| TypePattern::new(&e.pattern, e.field_type))
                .collect::<Result<Vec<_>, _>>()?;
            config = config.with_type_patterns(patterns);
        }

        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("form-detection.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = config_path, error = %e, "malformed config, using defaults");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

/// Backend settings after merging CLI flags over the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSettings {
    pub backend: String,
    pub ollama_endpoint: String,
    pub ollama_model: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub timeout_secs: u64,
}

/// Resolve backend settings: CLI > config > defaults.
pub fn resolve_backend(cli: &Cli, config: &AppConfig, backend: Option<&str>) -> BackendSettings {
    BackendSettings {
        backend: backend.unwrap_or(&config.fill.backend).to_string(),
        ollama_endpoint: cli
            .ollama_endpoint
            .clone()
            .or_else(|| config.ollama.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_OLLAMA_ENDPOINT.to_string()),
        ollama_model: cli
            .ollama_model
            .clone()
            .or_else(|| config.ollama.model.clone())
            .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
        openai_base_url: config
            .openai
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
        openai_model: cli
            .openai_model
            .clone()
            .or_else(|| config.openai.model.clone())
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        timeout_secs: config.fill.timeout_secs,
    }
}
