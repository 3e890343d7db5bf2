use tracing::debug;

use crate::dom::document::DocumentTree;
use crate::dom::html::HtmlDocument;
use crate::error::FormError;
use crate::form::classifier::{classify_control, is_choice, refine_with_label};
use crate::form::config::ExtractConfig;
use crate::form::field_model::{DateComponents, FieldDescriptor, FieldOption, FieldType};
use crate::form::identity::{IdentifierRegistry, fallback_identifier};
use crate::form::label::{
    LabelIndex, LabelSource, RawLabel, associate_label, collapse_whitespace, has_required_attr, normalize_label,
    wrapper_label,
};

// ============================================================================
// Slots: discovered controls grouped into future descriptors
// ============================================================================

/// Controls that will become one descriptor.
enum Slot<N> {
    Single(N),
    /// Radio or checkbox inputs sharing a `name`
    Choice {
        name: String,
        kind: FieldType,
        members: Vec<N>,
    },
    /// Spin-button parts sharing a container
    DateParts { container: Option<N>, parts: Vec<N> },
}

/// A descriptor before its identifier has been settled.
struct Draft {
    tag: String,
    label: String,
    required: bool,
    field_type: FieldType,
    identifier: Option<String>,
    options: Option<Vec<FieldOption>>,
    components: Option<DateComponents>,
}

// ============================================================================
// Entry points
// ============================================================================

/// Parse `source` and extract its fields, optionally scoped to the first
/// element matching `scope_selector`.
pub fn extract_from_html(
    source: &str,
    scope_selector: Option<&str>,
    config: &ExtractConfig,
) -> Result<Vec<FieldDescriptor>, FormError> {
    let page = HtmlDocument::parse(source);
    let tree = page.tree();

    match scope_selector {
        Some(selector) => {
            let scope = tree
                .select(None, selector)?
                .into_iter()
                .next()
                .ok_or_else(|| FormError::ScopeNotFound(selector.to_string()))?;
            extract_fields(&tree, Some(&scope), config)
        }
        None => extract_fields(&tree, None, config),
    }
}

/// One extraction pass: every recognized control under `scope` (or the whole
/// document) becomes at most one descriptor, in document order.
///
/// Radio and checkbox inputs sharing a `name` collapse into one descriptor, as
/// do spin-button parts sharing a container. Controls that end up without an
/// identifier are dropped unless fallback identifiers are enabled.
pub fn extract_fields<D: DocumentTree>(
    doc: &D,
    scope: Option<&D::Node>,
    config: &ExtractConfig,
) -> Result<Vec<FieldDescriptor>, FormError> {
    config.validate()?;

    let index = LabelIndex::build(doc)?;
    let controls = doc.select(scope, &config.control_selector_group())?;
    let date_parts = doc.select(scope, &config.date_part_selector)?;

    let slots = group_controls(doc, controls, &date_parts, config)?;

    let mut drafts = Vec::with_capacity(slots.len());
    for slot in &slots {
        let draft = match slot {
            Slot::Single(control) => single_draft(doc, control, &index, config)?,
            Slot::Choice { name, kind, members } => choice_draft(doc, name, *kind, members, &index, config)?,
            Slot::DateParts { container, parts } => date_draft(doc, container.as_ref(), parts, &index, config)?,
        };
        drafts.push(draft);
    }

    let discovered = drafts.len();
    let fields = settle_identifiers(drafts, config);
    debug!(discovered, emitted = fields.len(), "extraction pass complete");

    Ok(fields)
}

// ============================================================================
// Grouping
// ============================================================================

fn group_controls<D: DocumentTree>(
    doc: &D,
    controls: Vec<D::Node>,
    date_parts: &[D::Node],
    config: &ExtractConfig,
) -> Result<Vec<Slot<D::Node>>, FormError> {
    let mut slots: Vec<Slot<D::Node>> = Vec::new();

    for control in controls {
        if config.visible_only && !doc.is_visible(&control) {
            debug!(tag = %doc.tag(&control), "skipping invisible control");
            continue;
        }

        if date_parts.contains(&control) {
            let container = match doc.closest(&control, &config.wrapper_selector_group())? {
                Some(wrapper) => Some(wrapper),
                None => doc.closest(&control, "*")?,
            };
            let existing = slots.iter_mut().find_map(|slot| match slot {
                Slot::DateParts { container: Some(c), parts } if Some(&*c) == container.as_ref() => Some(parts),
                _ => None,
            });
            match existing {
                Some(parts) => parts.push(control),
                None => slots.push(Slot::DateParts {
                    container,
                    parts: vec![control],
                }),
            }
            continue;
        }

        let kind = classify_control(doc, &control);
        let name = doc
            .attr(&control, "name")
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        if let (true, Some(name)) = (is_choice(kind), name) {
            let existing = slots.iter_mut().find_map(|slot| match slot {
                Slot::Choice {
                    name: n,
                    kind: k,
                    members,
                } if *n == name && *k == kind => Some(members),
                _ => None,
            });
            match existing {
                Some(members) => members.push(control),
                None => slots.push(Slot::Choice {
                    name,
                    kind,
                    members: vec![control],
                }),
            }
            continue;
        }

        slots.push(Slot::Single(control));
    }

    Ok(slots)
}

// ============================================================================
// Drafts
// ============================================================================

fn own_identifier<D: DocumentTree>(doc: &D, control: &D::Node) -> Option<String> {
    ["id", "name"]
        .iter()
        .filter_map(|attr| doc.attr(control, attr))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn single_draft<D: DocumentTree>(
    doc: &D,
    control: &D::Node,
    index: &LabelIndex,
    config: &ExtractConfig,
) -> Result<Draft, FormError> {
    let raw = associate_label(doc, control, index, config)?;
    let label = raw.normalized(&config.required_marker);
    let field_type = refine_with_label(classify_control(doc, control), &label, config);
    let required = has_required_attr(doc, control) || raw.has_marker(&config.required_marker);

    let options = match field_type {
        FieldType::Select => Some(select_options(doc, control, config)?),
        FieldType::Radio | FieldType::Checkbox => {
            Some(choice_option(doc, control, index, config)?.into_iter().collect())
        }
        _ => None,
    };

    Ok(Draft {
        tag: doc.tag(control),
        label,
        required,
        field_type,
        identifier: own_identifier(doc, control),
        options,
        components: None,
    })
}

fn choice_draft<D: DocumentTree>(
    doc: &D,
    name: &str,
    kind: FieldType,
    members: &[D::Node],
    index: &LabelIndex,
    config: &ExtractConfig,
) -> Result<Draft, FormError> {
    let first = &members[0];
    let raw = match wrapper_label(doc, first, config)? {
        Some(text) => RawLabel {
            text,
            source: LabelSource::Wrapper,
        },
        None => associate_label(doc, first, index, config)?,
    };

    let required = members.iter().any(|m| has_required_attr(doc, m)) || raw.has_marker(&config.required_marker);

    let mut options = Vec::with_capacity(members.len());
    for member in members {
        if let Some(option) = choice_option(doc, member, index, config)? {
            options.push(option);
        }
    }

    Ok(Draft {
        tag: doc.tag(first),
        label: raw.normalized(&config.required_marker),
        required,
        field_type: kind,
        identifier: Some(name.to_string()),
        options: Some(options),
        components: None,
    })
}

fn date_draft<D: DocumentTree>(
    doc: &D,
    container: Option<&D::Node>,
    parts: &[D::Node],
    index: &LabelIndex,
    config: &ExtractConfig,
) -> Result<Draft, FormError> {
    let first = &parts[0];

    let container_label = match container {
        Some(c) => doc
            .select(Some(c), &config.label_selector)?
            .iter()
            .map(|l| doc.text(l))
            .find(|t| !t.trim().is_empty()),
        None => None,
    };
    let raw = match container_label {
        Some(text) => RawLabel {
            text,
            source: LabelSource::Wrapper,
        },
        None => associate_label(doc, first, index, config)?,
    };
    let label = raw.normalized(&config.required_marker);

    let mut slots: Vec<Option<String>> = Vec::with_capacity(3);
    for (position, part) in parts.iter().take(3).enumerate() {
        let id = match own_identifier(doc, part) {
            Some(id) => Some(id),
            None if config.generate_fallback_ids => {
                Some(fallback_identifier(&doc.tag(part), FieldType::Date, &label, position))
            }
            None => {
                debug!(position, "date part without identifier left empty");
                None
            }
        };
        slots.push(id);
    }
    if parts.len() > 3 {
        debug!(parts = parts.len(), "extra date parts ignored");
    }

    let required = parts.iter().any(|p| has_required_attr(doc, p)) || raw.has_marker(&config.required_marker);
    let identifier = container
        .and_then(|c| doc.attr(c, "id"))
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .or_else(|| slots.iter().flatten().next().cloned());

    Ok(Draft {
        tag: doc.tag(first),
        label,
        required,
        field_type: FieldType::Date,
        identifier,
        options: Some(Vec::new()),
        components: Some(DateComponents::from_slots(slots)),
    })
}

// ============================================================================
// Options
// ============================================================================

/// Options of a `select`, in document order, without placeholders.
pub fn select_options<D: DocumentTree>(
    doc: &D,
    select: &D::Node,
    config: &ExtractConfig,
) -> Result<Vec<FieldOption>, FormError> {
    Ok(doc
        .select(Some(select), "option")?
        .iter()
        .filter_map(|option| {
            let text = collapse_whitespace(&doc.text(option));
            let value = doc
                .attr(option, "value")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| text.clone());

            if value.is_empty() || config.is_sentinel(&value) {
                return None;
            }
            Some(FieldOption {
                option_id: value,
                option_text: text,
            })
        })
        .collect())
}

/// The option one radio/checkbox input contributes to its group.
fn choice_option<D: DocumentTree>(
    doc: &D,
    member: &D::Node,
    index: &LabelIndex,
    config: &ExtractConfig,
) -> Result<Option<FieldOption>, FormError> {
    let Some(option_id) = ["value", "id"]
        .iter()
        .filter_map(|attr| doc.attr(member, attr))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
    else {
        return Ok(None);
    };

    if config.is_sentinel(&option_id) {
        return Ok(None);
    }

    let text = member_label(doc, member, index)?
        .map(|t| normalize_label(&t, &config.required_marker))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| option_id.clone());

    Ok(Some(FieldOption {
        option_id,
        option_text: text,
    }))
}

/// A group member's own caption: `label[for]`, an enclosing label, or
/// `aria-label`. The wrapper label belongs to the group, not the member.
fn member_label<D: DocumentTree>(doc: &D, member: &D::Node, index: &LabelIndex) -> Result<Option<String>, FormError> {
    if let Some(text) = doc
        .attr(member, "id")
        .and_then(|id| index.for_id(id.trim()).map(str::to_string))
    {
        return Ok(Some(text));
    }
    if let Some(label) = doc.closest(member, "label")? {
        return Ok(Some(doc.text(&label)));
    }
    Ok(doc.attr(member, "aria-label"))
}

// ============================================================================
// Identifiers
// ============================================================================

fn settle_identifiers(drafts: Vec<Draft>, config: &ExtractConfig) -> Vec<FieldDescriptor> {
    let mut registry = IdentifierRegistry::default();
    let mut fields = Vec::with_capacity(drafts.len());

    for (position, draft) in drafts.into_iter().enumerate() {
        if config.drop_unlabeled && draft.label.is_empty() {
            debug!(position, tag = %draft.tag, "dropping unlabeled control");
            continue;
        }

        let base = match draft.identifier {
            Some(id) => id,
            None if config.generate_fallback_ids => {
                fallback_identifier(&draft.tag, draft.field_type, &draft.label, position)
            }
            None => {
                debug!(position, label = %draft.label, "dropping control without identifier");
                continue;
            }
        };

        let Some(identifier) = registry.claim(&base, config.generate_fallback_ids) else {
            debug!(identifier = %base, "dropping control with duplicate identifier");
            continue;
        };

        fields.push(FieldDescriptor {
            label: draft.label,
            required: draft.required,
            field_type: draft.field_type,
            identifier,
            options: draft.options,
            components: draft.components,
        });
    }

    fields
}
