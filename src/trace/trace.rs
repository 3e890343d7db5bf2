use chrono::Utc;
use serde::Serialize;

use crate::fill::fill_model::BatchSummary;

/// One line of the fill usage log.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: i64,
    pub batch: usize,

    pub fields: usize,
    pub answers: usize,

    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,

    pub used_fallback: bool,
    pub error: Option<String>,
}

impl TraceEvent {
    pub fn now(batch: usize) -> Self {
        Self {
            timestamp_ms: Utc::now().timestamp_millis(),
            batch,
            fields: 0,
            answers: 0,
            prompt_tokens: 0,
            completion_tokens: 0,
            cost_usd: 0.0,
            used_fallback: false,
            error: None,
        }
    }

    pub fn for_batch(summary: &BatchSummary, cost_usd: f64) -> Self {
        let event = Self::now(summary.index)
            .with_counts(summary.fields, summary.answers)
            .with_usage(summary.usage.prompt_tokens, summary.usage.completion_tokens, cost_usd)
            .with_fallback(summary.used_fallback);
        match &summary.error {
            Some(e) => event.with_error(e),
            None => event,
        }
    }

    pub fn with_counts(mut self, fields: usize, answers: usize) -> Self {
        self.fields = fields;
        self.answers = answers;
        self
    }

    pub fn with_usage(mut self, prompt_tokens: u64, completion_tokens: u64, cost_usd: f64) -> Self {
        self.prompt_tokens = prompt_tokens;
        self.completion_tokens = completion_tokens;
        self.cost_usd = cost_usd;
        self
    }

    pub fn with_fallback(mut self, used_fallback: bool) -> Self {
        self.used_fallback = used_fallback;
        self
    }

    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}
