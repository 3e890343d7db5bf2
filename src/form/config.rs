use regex::Regex;

use crate::dom::html::parse_selector;
use crate::error::FormError;
use crate::form::field_model::FieldType;

// ============================================================================
// Label-to-type heuristic table
// ============================================================================

/// One row of the label heuristic: a label matching `pattern` is typed
/// `field_type` when the control itself only resolved to plain text.
#[derive(Debug, Clone)]
pub struct TypePattern {
    pub pattern: Regex,
    pub field_type: FieldType,
}

impl TypePattern {
    pub fn new(pattern: &str, field_type: FieldType) -> Result<Self, FormError> {
        let pattern = Regex::new(pattern).map_err(|source| FormError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { pattern, field_type })
    }

    pub fn matches(&self, label: &str) -> bool {
        self.pattern.is_match(label)
    }
}

/// The built-in table, checked in order.
pub const DEFAULT_TYPE_PATTERNS: &[(&str, FieldType)] = &[
    (r"(?i)\be-?mail\b", FieldType::Email),
    (r"(?i)\b(phone|mobile|telephone|cell)\b", FieldType::Tel),
    (r"(?i)\b(url|website|linkedin|github|portfolio)\b", FieldType::Url),
    (r"(?i)\b(date|dob|birthday)\b", FieldType::Date),
    (r"(?i)\b(years of experience|salary|zip|postal code|gpa)\b", FieldType::Number),
];

pub fn default_type_patterns() -> Vec<TypePattern> {
    DEFAULT_TYPE_PATTERNS
        .iter()
        .filter_map(|(pattern, ty)| TypePattern::new(pattern, *ty).ok())
        .collect()
}

// ============================================================================
// Extraction configuration
// ============================================================================

pub const DEFAULT_CONTROL_SELECTORS: &[&str] = &[
    "input:not([type=hidden]):not([type=submit]):not([type=reset]):not([type=image]):not([type=button])",
    "select",
    "textarea",
    "[role=spinbutton]",
];

pub const DEFAULT_FIELD_WRAPPER_SELECTORS: &[&str] = &[
    ".field",
    ".form-group",
    ".form-field",
    ".application-question",
    "[role=group]",
    "fieldset",
];

/// Everything that steers one extraction pass.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Selectors a control must match to be discovered
    pub control_selectors: Vec<String>,

    /// Containers searched for a label when no `label[for]` exists
    pub field_wrapper_selectors: Vec<String>,

    /// Elements treated as labels inside a wrapper
    pub label_selector: String,

    /// Sub-controls of composite date pickers
    pub date_part_selector: String,

    /// Glyph marking a label as required
    pub required_marker: String,

    /// Option values excluded from option lists, matched exactly
    pub option_sentinels: Vec<String>,

    /// Skip controls that do not render
    pub visible_only: bool,

    /// Synthesize identifiers instead of dropping controls without one
    pub generate_fallback_ids: bool,

    /// Drop controls with no discoverable label
    pub drop_unlabeled: bool,

    pub type_patterns: Vec<TypePattern>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            control_selectors: DEFAULT_CONTROL_SELECTORS.iter().map(|s| s.to_string()).collect(),
            field_wrapper_selectors: DEFAULT_FIELD_WRAPPER_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            label_selector: "label, legend".to_string(),
            date_part_selector: "[role=spinbutton]".to_string(),
            required_marker: "*".to_string(),
            option_sentinels: vec!["none".to_string()],
            visible_only: false,
            generate_fallback_ids: true,
            drop_unlabeled: false,
            type_patterns: default_type_patterns(),
        }
    }
}

impl ExtractConfig {
    pub fn with_visible_only(mut self, visible_only: bool) -> Self {
        self.visible_only = visible_only;
        self
    }

    pub fn with_fallback_ids(mut self, generate: bool) -> Self {
        self.generate_fallback_ids = generate;
        self
    }

    pub fn with_drop_unlabeled(mut self, drop: bool) -> Self {
        self.drop_unlabeled = drop;
        self
    }

    pub fn with_required_marker(mut self, marker: impl Into<String>) -> Self {
        self.required_marker = marker.into();
        self
    }

    pub fn with_field_wrappers<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field_wrapper_selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_type_patterns(mut self, patterns: Vec<TypePattern>) -> Self {
        self.type_patterns = patterns;
        self
    }

    pub fn with_option_sentinels<I, S>(mut self, sentinels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.option_sentinels = sentinels.into_iter().map(Into::into).collect();
        self
    }

    /// All control selectors as one selector group, so matches come back in
    /// document order.
    pub fn control_selector_group(&self) -> String {
        self.control_selectors.join(", ")
    }

    pub fn wrapper_selector_group(&self) -> String {
        self.field_wrapper_selectors.join(", ")
    }

    pub fn is_sentinel(&self, value: &str) -> bool {
        self.option_sentinels.iter().any(|s| s == value)
    }

    /// First heuristic row whose pattern matches `label`.
    pub fn type_for_label(&self, label: &str) -> Option<FieldType> {
        if label.is_empty() {
            return None;
        }
        self.type_patterns
            .iter()
            .find(|p| p.matches(label))
            .map(|p| p.field_type)
    }

    /// Parse every configured selector once so bad configuration fails before
    /// any page is scanned.
    pub fn validate(&self) -> Result<(), FormError> {
        if self.control_selectors.is_empty() {
            return Err(FormError::Config("no control selectors configured".into()));
        }
        for selector in self
            .control_selectors
            .iter()
            .chain(self.field_wrapper_selectors.iter())
            .chain([&self.label_selector, &self.date_part_selector])
        {
            parse_selector(selector)?;
        }
        Ok(())
    }
}
