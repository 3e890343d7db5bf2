use std::ops::AddAssign;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ============================================================================
// Answers returned by the completion service
// ============================================================================

/// One generated value for one field.
///
/// Serializes as `{Identifier, Type, Value}`. Parsing is lenient about key
/// case and about non-string values, since the text comes from a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillAnswer {
    #[serde(rename = "Identifier", alias = "identifier", alias = "id")]
    pub identifier: String,

    #[serde(rename = "Type", alias = "type", default)]
    pub field_type: String,

    #[serde(rename = "Value", alias = "value", default, deserialize_with = "lenient_value")]
    pub value: String,
}

impl FillAnswer {
    pub fn new(identifier: impl Into<String>, field_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            field_type: field_type.into(),
            value: value.into(),
        }
    }
}

/// Accept strings, numbers, booleans, null, lists, and `{optionId, optionText}`
/// objects, flattening each to the text a form would receive.
fn lenient_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_text(&value))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(", "),
        Value::Object(map) => ["optionText", "text", "value", "optionId"]
            .iter()
            .find_map(|key| map.get(*key))
            .map(value_text)
            .unwrap_or_default(),
    }
}

// ============================================================================
// Token accounting
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens += rhs.prompt_tokens;
        self.completion_tokens += rhs.completion_tokens;
    }
}

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPricing {
    pub const FREE: ModelPricing = ModelPricing {
        input_per_million: 0.0,
        output_per_million: 0.0,
    };

    pub fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        (usage.prompt_tokens as f64 * self.input_per_million
            + usage.completion_tokens as f64 * self.output_per_million)
            / 1_000_000.0
    }
}

impl Default for ModelPricing {
    fn default() -> Self {
        Self::FREE
    }
}

// ============================================================================
// Fill results
// ============================================================================

/// What happened to one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub index: usize,
    pub fields: usize,
    pub answers: usize,
    pub usage: TokenUsage,
    pub used_fallback: bool,
    pub error: Option<String>,
}

/// Combined result of filling one form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillReport {
    pub answers: Vec<FillAnswer>,
    pub usage: TokenUsage,
    pub cost_usd: f64,
    pub batches: Vec<BatchSummary>,
}

impl FillReport {
    pub fn answer_for(&self, identifier: &str) -> Option<&FillAnswer> {
        self.answers.iter().find(|a| a.identifier == identifier)
    }

    pub fn failed_batches(&self) -> usize {
        self.batches.iter().filter(|b| b.error.is_some()).count()
    }
}
