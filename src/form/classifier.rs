use crate::dom::document::DocumentTree;
use crate::form::config::ExtractConfig;
use crate::form::field_model::FieldType;

/// Type of a control from its markup alone.
///
/// `select`, `textarea` and `button` are decided by tag; inputs by their
/// `type` attribute. Anything absent or unknown is plain text.
pub fn classify_control<D: DocumentTree>(doc: &D, control: &D::Node) -> FieldType {
    match doc.tag(control).as_str() {
        "select" => FieldType::Select,
        "textarea" => FieldType::Textarea,
        "button" => FieldType::Button,
        "input" => doc
            .attr(control, "type")
            .and_then(|t| FieldType::from_input_type(&t))
            .unwrap_or(FieldType::Text),
        _ => match doc.attr(control, "role").as_deref().map(str::trim) {
            Some("combobox") | Some("listbox") => FieldType::Select,
            Some("spinbutton") => FieldType::Number,
            Some("checkbox") | Some("switch") => FieldType::Checkbox,
            Some("radio") => FieldType::Radio,
            _ => FieldType::Text,
        },
    }
}

/// Let the label heuristic table decide, but only for controls that resolved
/// to plain text.
pub fn refine_with_label(resolved: FieldType, label: &str, config: &ExtractConfig) -> FieldType {
    if resolved != FieldType::Text {
        return resolved;
    }
    config.type_for_label(label).unwrap_or(FieldType::Text)
}

/// Whether the control is one member of a radio/checkbox group.
pub fn is_choice(field_type: FieldType) -> bool {
    matches!(field_type, FieldType::Radio | FieldType::Checkbox)
}
