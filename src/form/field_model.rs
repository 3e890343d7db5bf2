use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Structured description of one discovered form control
// ============================================================================

/// Resolved type of a form control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Number,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Date,
    File,
    Button,
    Tel,
    Url,
    Password,
}

impl FieldType {
    /// Map a native `type` attribute to a field type.
    /// Returns `None` for values this crate does not recognize.
    pub fn from_input_type(raw: &str) -> Option<Self> {
        let ty = match raw.trim().to_ascii_lowercase().as_str() {
            "text" | "search" => FieldType::Text,
            "email" => FieldType::Email,
            "number" | "range" => FieldType::Number,
            "date" | "datetime-local" | "month" | "week" => FieldType::Date,
            "file" => FieldType::File,
            "radio" => FieldType::Radio,
            "checkbox" => FieldType::Checkbox,
            "button" | "submit" | "reset" => FieldType::Button,
            "tel" => FieldType::Tel,
            "url" => FieldType::Url,
            "password" => FieldType::Password,
            "select" | "select-one" | "select-multiple" => FieldType::Select,
            "textarea" => FieldType::Textarea,
            _ => return None,
        };
        Some(ty)
    }

    /// Whether descriptors of this type carry an option list.
    pub fn has_options(self) -> bool {
        matches!(self, FieldType::Select | FieldType::Radio | FieldType::Checkbox)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Number => "number",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::File => "file",
            FieldType::Button => "button",
            FieldType::Tel => "tel",
            FieldType::Url => "url",
            FieldType::Password => "password",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One selectable choice of a select, radio group or checkbox group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    #[serde(rename = "optionId")]
    pub option_id: String,
    #[serde(rename = "optionText")]
    pub option_text: String,
}

/// Sub-identifiers of a composite date picker, assigned positionally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DateComponents {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl DateComponents {
    /// Fill Day, Month, Year in order from the given sub-identifiers.
    /// Anything past the third is ignored; missing slots stay absent.
    pub fn from_positional<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_slots(ids.into_iter().map(|id| Some(id.into())))
    }

    /// Like `from_positional`, but a `None` slot keeps its position empty
    /// instead of shifting later parts down.
    pub fn from_slots<I>(slots: I) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let mut it = slots.into_iter();
        Self {
            day: it.next().flatten(),
            month: it.next().flatten(),
            year: it.next().flatten(),
        }
    }

    pub fn len(&self) -> usize {
        [&self.day, &self.month, &self.year]
            .iter()
            .filter(|c| c.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single form control as recovered by one extraction pass.
///
/// Serializes to `{Label, Required: "yes"|"no", Type, Identifier, options?,
/// components?}`. `options` is present only for select, radio, checkbox and
/// composite date descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(rename = "Label")]
    pub label: String,

    #[serde(rename = "Required", with = "yes_no")]
    pub required: bool,

    #[serde(rename = "Type")]
    pub field_type: FieldType,

    #[serde(rename = "Identifier")]
    pub identifier: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<DateComponents>,
}

impl FieldDescriptor {
    pub fn option_ids(&self) -> Vec<&str> {
        self.options
            .iter()
            .flatten()
            .map(|o| o.option_id.as_str())
            .collect()
    }
}

/// `true`/`false` on the wire as `"yes"`/`"no"`.
mod yes_no {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "yes" } else { "no" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.to_ascii_lowercase().as_str() {
            "yes" | "true" => Ok(true),
            "no" | "false" => Ok(false),
            other => Err(D::Error::custom(format!("expected \"yes\" or \"no\", got \"{}\"", other))),
        }
    }
}
