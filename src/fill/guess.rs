use chrono::NaiveDate;

use crate::fill::fill_model::FillAnswer;
use crate::form::field_model::{FieldDescriptor, FieldType};

/// Derive a plausible fill value from a field's label and type.
pub fn guess_value(label: &str, field_type: FieldType, reference_date: NaiveDate) -> String {
    let l = label.to_lowercase();

    // Label-based heuristics (checked in order)
    if l.contains("email") {
        return "user@example.com".into();
    }
    if l.contains("phone") || l.contains("mobile") {
        return "555-0100".into();
    }
    if l.contains("linkedin") {
        return "https://www.linkedin.com/in/example".into();
    }
    if l.contains("url") || l.contains("website") || l.contains("portfolio") {
        return "https://example.com".into();
    }
    if l.contains("zip") || l.contains("postal") {
        return "90210".into();
    }
    if l.contains("first name") {
        return "Jane".into();
    }
    if l.contains("last name") || l.contains("surname") {
        return "Doe".into();
    }
    if l.contains("name") {
        return "Jane Doe".into();
    }
    if l.contains("date") {
        return reference_date.format("%Y-%m-%d").to_string();
    }
    if l.contains("years") || l.contains("number") {
        return "3".into();
    }

    // Fallback to field type
    match field_type {
        FieldType::Email => "user@example.com".into(),
        FieldType::Tel => "555-0100".into(),
        FieldType::Url => "https://example.com".into(),
        FieldType::Number => "3".into(),
        FieldType::Date => reference_date.format("%Y-%m-%d").to_string(),
        FieldType::Password => "TestPass123!".into(),
        _ => "test".into(),
    }
}

/// Offline answers without a model: the first option for option-bearing
/// fields, a label/type guess for the rest. File inputs and buttons get no
/// answer.
pub fn guess_answers(fields: &[FieldDescriptor], reference_date: NaiveDate) -> Vec<FillAnswer> {
    fields
        .iter()
        .filter_map(|field| {
            let value = match field.field_type {
                FieldType::File | FieldType::Button => return None,
                FieldType::Select | FieldType::Radio | FieldType::Checkbox => field
                    .options
                    .as_ref()
                    .and_then(|opts| opts.first())
                    .map(|o| o.option_text.clone())?,
                ty => guess_value(&field.label, ty, reference_date),
            };
            Some(FillAnswer::new(field.identifier.clone(), field.field_type.as_str(), value))
        })
        .collect()
}
