use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::FormError;
use crate::fill::fill_model::{BatchSummary, FillAnswer, FillReport, ModelPricing, TokenUsage};
use crate::fill::inference::TextInference;
use crate::form::field_model::FieldDescriptor;
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;

pub const DEFAULT_CHUNK_SIZE: usize = 25;

/// Batches in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

lazy_static! {
    // ```json ... ``` or bare ``` ... ```
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").unwrap();

    // Outermost bracketed span, greedy so nested objects stay inside
    static ref JSON_ARRAY: Regex = Regex::new(r"(?s)\[.*\]").unwrap();

    // Objects naming an identifier; values may nest one object deep
    static ref ANSWER_OBJECT: Regex = Regex::new(
        r#"(?s)\{(?:[^{}]|\{[^{}]*\})*?"(?:Identifier|identifier)"\s*:(?:[^{}]|\{[^{}]*\})*\}"#
    )
    .unwrap();
}

// ============================================================================
// Chunking
// ============================================================================

/// Split `fields` into batches of at most `chunk_size` (0 means one batch).
pub fn chunk_fields(fields: &[FieldDescriptor], chunk_size: usize) -> Vec<Vec<FieldDescriptor>> {
    if fields.is_empty() {
        return Vec::new();
    }
    let size = if chunk_size == 0 { fields.len() } else { chunk_size };
    fields.chunks(size).map(|c| c.to_vec()).collect()
}

/// Each batch as a standalone JSON array.
pub fn batches_to_json(batches: &[Vec<FieldDescriptor>]) -> Result<Vec<String>, FormError> {
    batches
        .iter()
        .enumerate()
        .map(|(i, batch)| {
            serde_json::to_string(batch).map_err(|source| FormError::JsonSerialize {
                context: format!("field batch {}", i),
                source,
            })
        })
        .collect()
}

// ============================================================================
// Prompt
// ============================================================================

pub fn build_fill_prompt(batch_json: &str, context: &str, reference_date: NaiveDate) -> String {
    format!(
        r##"Fill in the job application form fields below using the candidate's resume.

TODAY'S DATE: {date}

RESUME:
{context}

FORM FIELDS (JSON):
{fields}

RULES:
- Answer every field you can support from the resume; skip fields you cannot.
- For fields with "options", answer with the optionText of exactly one option.
- Dates use YYYY-MM-DD. Compute ages and durations relative to today's date.
- Keep "Identifier" and "Type" exactly as given.

Return ONLY valid JSON matching this exact schema:
{{
  "answers": [
    {{"Identifier": "field identifier", "Type": "field type", "Value": "answer text"}}
  ]
}}

Respond with ONLY valid JSON, no explanation."##,
        date = reference_date.format("%Y-%m-%d"),
        context = context.trim(),
        fields = batch_json,
    )
}

// ============================================================================
// Response parsing
// ============================================================================

/// Answers recovered from one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAnswers {
    pub answers: Vec<FillAnswer>,
    pub used_fallback: bool,
}

fn answers_from_value(value: &Value) -> Vec<FillAnswer> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        Value::Object(map) if map.contains_key("Identifier") || map.contains_key("identifier") => {
            serde_json::from_value(value.clone()).map(|a| vec![a]).unwrap_or_default()
        }
        Value::Object(map) => map
            .values()
            .find(|v| v.is_array())
            .map(answers_from_value)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn parse_value(text: &str) -> Option<Vec<FillAnswer>> {
    serde_json::from_str::<Value>(text.trim())
        .ok()
        .map(|v| answers_from_value(&v))
}

/// Read answers from a model response.
///
/// Valid JSON is taken as is. Otherwise one fallback pass looks for a fenced
/// block, then a bracketed array, then individual answer objects. If nothing
/// is recovered the result is empty.
pub fn parse_answers(raw: &str) -> ParsedAnswers {
    if let Some(answers) = parse_value(raw) {
        return ParsedAnswers {
            answers,
            used_fallback: false,
        };
    }

    debug!(len = raw.len(), "response is not JSON, trying pattern recovery");

    let recovered = CODE_FENCE
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_value(m.as_str()))
        .filter(|a| !a.is_empty())
        .or_else(|| {
            JSON_ARRAY
                .find(raw)
                .and_then(|m| parse_value(m.as_str()))
                .filter(|a| !a.is_empty())
        })
        .unwrap_or_else(|| {
            ANSWER_OBJECT
                .find_iter(raw)
                .filter_map(|m| serde_json::from_str::<FillAnswer>(m.as_str()).ok())
                .collect()
        });

    ParsedAnswers {
        answers: recovered,
        used_fallback: true,
    }
}

/// Combine per-batch answers. A repeated identifier keeps its first position
/// and takes the later value.
pub fn merge_answers<I>(batches: I) -> Vec<FillAnswer>
where
    I: IntoIterator<Item = Vec<FillAnswer>>,
{
    let mut merged: Vec<FillAnswer> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for answer in batches.into_iter().flatten() {
        match positions.get(&answer.identifier) {
            Some(&at) => {
                debug!(identifier = %answer.identifier, "duplicate answer across batches, keeping later");
                merged[at] = answer;
            }
            None => {
                positions.insert(answer.identifier.clone(), merged.len());
                merged.push(answer);
            }
        }
    }

    merged
}

// ============================================================================
// FormFiller
// ============================================================================

struct BatchOutcome {
    answers: Vec<FillAnswer>,
    summary: BatchSummary,
}

/// Sends chunked field batches to a `TextInference` backend and combines the
/// answers.
pub struct FormFiller {
    backend: Box<dyn TextInference>,
    chunk_size: usize,
    max_concurrency: usize,
    pricing: ModelPricing,
    tracer: Option<TraceLogger>,
}

impl FormFiller {
    pub fn new(backend: Box<dyn TextInference>) -> Self {
        Self {
            backend,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            pricing: ModelPricing::FREE,
            tracer: None,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Upper bound on concurrent backend calls (at least 1).
    pub fn with_max_concurrency(mut self, workers: usize) -> Self {
        self.max_concurrency = workers.max(1);
        self
    }

    pub fn with_pricing(mut self, pricing: ModelPricing) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Fill `fields` from `context`. Batches run on at most `max_concurrency`
    /// workers; a batch that fails or cannot be parsed contributes no answers.
    pub fn fill(
        &self,
        fields: &[FieldDescriptor],
        context: &str,
        reference_date: NaiveDate,
    ) -> Result<FillReport, FormError> {
        let batches = chunk_fields(fields, self.chunk_size);
        let payloads = batches_to_json(&batches)?;

        info!(
            fields = fields.len(),
            batches = batches.len(),
            workers = self.max_concurrency,
            "filling form"
        );

        let workers = self.max_concurrency.clamp(1, batches.len().max(1));
        let cursor = AtomicUsize::new(0);
        let (next, batches_ref, payloads_ref) = (&cursor, &batches, &payloads);

        // Workers pull batch indices until none are left.
        let slots: Vec<Option<BatchOutcome>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        loop {
                            let index = next.fetch_add(1, Ordering::Relaxed);
                            let (Some(batch), Some(payload)) = (batches_ref.get(index), payloads_ref.get(index)) else {
                                break;
                            };
                            done.push((index, self.run_batch(index, batch, payload, context, reference_date)));
                        }
                        done
                    })
                })
                .collect();

            let mut slots: Vec<Option<BatchOutcome>> = batches.iter().map(|_| None).collect();
            for handle in handles {
                match handle.join() {
                    Ok(done) => {
                        for (index, outcome) in done {
                            slots[index] = Some(outcome);
                        }
                    }
                    Err(_) => warn!("batch worker panicked"),
                }
            }
            slots
        });

        // A panicked worker loses every batch it had taken.
        let outcomes: Vec<BatchOutcome> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| BatchOutcome {
                    answers: Vec::new(),
                    summary: BatchSummary {
                        index,
                        fields: batches[index].len(),
                        answers: 0,
                        usage: TokenUsage::default(),
                        used_fallback: false,
                        error: Some("worker panicked".into()),
                    },
                })
            })
            .collect();

        let mut usage = TokenUsage::default();
        let mut summaries = Vec::with_capacity(outcomes.len());
        let mut per_batch = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            usage += outcome.summary.usage;
            summaries.push(outcome.summary);
            per_batch.push(outcome.answers);
        }

        let answers = merge_answers(per_batch);
        let cost_usd = self.pricing.cost(&usage);

        info!(
            answers = answers.len(),
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            cost_usd,
            "form filled"
        );

        Ok(FillReport {
            answers,
            usage,
            cost_usd,
            batches: summaries,
        })
    }

    fn run_batch(
        &self,
        index: usize,
        batch: &[FieldDescriptor],
        payload: &str,
        context: &str,
        reference_date: NaiveDate,
    ) -> BatchOutcome {
        let prompt = build_fill_prompt(payload, context, reference_date);

        let (answers, usage, used_fallback, error) = match self.backend.complete(&prompt) {
            Ok(completion) => {
                let parsed = parse_answers(&completion.text);
                let known: Vec<FillAnswer> = parsed
                    .answers
                    .into_iter()
                    .filter(|a| {
                        let known = batch.iter().any(|f| f.identifier == a.identifier);
                        if !known {
                            debug!(batch = index, identifier = %a.identifier, "answer for unknown field dropped");
                        }
                        known
                    })
                    .collect();
                if known.is_empty() {
                    warn!(batch = index, "no answers recovered for batch");
                }
                (known, completion.usage.unwrap_or_default(), parsed.used_fallback, None)
            }
            Err(e) => {
                warn!(batch = index, error = %e, "batch request failed");
                (Vec::new(), TokenUsage::default(), false, Some(e.to_string()))
            }
        };

        let summary = BatchSummary {
            index,
            fields: batch.len(),
            answers: answers.len(),
            usage,
            used_fallback,
            error,
        };

        if let Some(tracer) = &self.tracer {
            tracer.log(&TraceEvent::for_batch(&summary, self.pricing.cost(&usage)));
        }

        BatchOutcome { answers, summary }
    }
}
