mod common;

use std::collections::HashSet;

use common::utils::{extract, extract_with, field, fixture, ids};
use form_detection::form::config::TypePattern;
use form_detection::{
    DateComponents, ExtractConfig, FieldOption, FieldType, FormError, HtmlDocument, extract_fields,
    extract_from_html,
};

fn option(id: &str, text: &str) -> FieldOption {
    FieldOption {
        option_id: id.into(),
        option_text: text.into(),
    }
}

// =========================================================================
// Full application fixture
// =========================================================================

#[test]
fn application_fixture_yields_fields_in_document_order() {
    let fields = extract(&fixture("application.html"));
    let identifiers = ids(&fields);

    assert_eq!(identifiers.len(), 12, "got {:?}", identifiers);
    assert_eq!(
        &identifiers[..10],
        &[
            "first_name",
            "last_name",
            "contact",
            "phone",
            "resume",
            "country",
            "sponsorship",
            "start_date",
            "cover_letter",
            "referrer",
        ]
    );
    assert!(identifiers[10].starts_with("field-"), "unnamed control gets a generated id");
    assert_eq!(identifiers[11], "consent");
}

#[test]
fn application_fixture_skips_hidden_inputs_and_buttons() {
    let fields = extract(&fixture("application.html"));
    assert!(fields.iter().all(|f| f.identifier != "csrf_token"), "hidden input skipped");
    assert!(fields.iter().all(|f| f.field_type != FieldType::Button), "submit button skipped");
}

#[test]
fn application_fixture_resolves_labels_types_and_required() {
    let fields = extract(&fixture("application.html"));

    let first = field(&fields, "first_name");
    assert_eq!(first.label, "First Name");
    assert!(first.required, "asterisk marks required");
    assert_eq!(first.field_type, FieldType::Text);

    let last = field(&fields, "last_name");
    assert!(last.required, "native required attribute");

    let contact = field(&fields, "contact");
    assert_eq!(contact.label, "Email address", "label found in wrapper");
    assert_eq!(contact.field_type, FieldType::Email, "label heuristic refines plain text");
    assert!(contact.required, "aria-required");

    let phone = field(&fields, "phone");
    assert_eq!(phone.field_type, FieldType::Tel);
    assert!(!phone.required);

    let resume = field(&fields, "resume");
    assert_eq!(resume.field_type, FieldType::File);
    assert_eq!(resume.label, "Resume/CV");

    let cover = field(&fields, "cover_letter");
    assert_eq!(cover.field_type, FieldType::Textarea);
    assert_eq!(cover.options, None);
}

#[test]
fn application_fixture_filters_select_placeholders() {
    let fields = extract(&fixture("application.html"));
    let country = field(&fields, "country");

    assert_eq!(country.field_type, FieldType::Select);
    assert!(country.required);
    assert_eq!(
        country.options,
        Some(vec![option("US", "USA"), option("CA", "Canada")]),
        "empty and 'none' values dropped, text trimmed"
    );
}

#[test]
fn application_fixture_groups_radio_buttons() {
    let fields = extract(&fixture("application.html"));
    let sponsorship = field(&fields, "sponsorship");

    assert_eq!(sponsorship.field_type, FieldType::Radio);
    assert_eq!(
        sponsorship.label,
        "Will you now or in the future require sponsorship?"
    );
    assert!(sponsorship.required, "legend carries the marker");
    assert_eq!(
        sponsorship.options,
        Some(vec![option("yes", "Yes"), option("no", "No")])
    );
    assert_eq!(
        fields.iter().filter(|f| f.identifier.starts_with("sponsorship")).count(),
        1,
        "one descriptor per group"
    );
}

#[test]
fn application_fixture_single_checkbox_is_a_group_of_one() {
    let fields = extract(&fixture("application.html"));
    let consent = field(&fields, "consent");

    assert_eq!(consent.field_type, FieldType::Checkbox);
    assert!(consent.required);
    assert_eq!(consent.label, "I agree to the privacy policy");
    assert_eq!(
        consent.options,
        Some(vec![option("agreed", "I agree to the privacy policy")])
    );
}

#[test]
fn application_fixture_collapses_date_picker() {
    let fields = extract(&fixture("application.html"));
    let start = field(&fields, "start_date");

    assert_eq!(start.field_type, FieldType::Date);
    assert_eq!(start.label, "Earliest start date");
    assert!(start.required, "any part marked aria-required");
    assert_eq!(start.options, Some(vec![]));
    assert_eq!(
        start.components,
        Some(DateComponents {
            day: Some("day1".into()),
            month: Some("month1".into()),
            year: Some("year1".into()),
        })
    );
    assert!(
        fields.iter().all(|f| !["day1", "month1", "year1"].contains(&f.identifier.as_str())),
        "parts do not appear as separate fields"
    );
}

#[test]
fn visible_only_drops_hidden_wrapper() {
    let html = fixture("application.html");
    let all = extract(&html);
    let visible = extract_with(&html, &ExtractConfig::default().with_visible_only(true));

    assert_eq!(visible.len(), all.len() - 1);
    assert!(visible.iter().all(|f| f.identifier != "referrer"));
}

// =========================================================================
// Labels and identifiers
// =========================================================================

#[test]
fn every_label_is_normalized() {
    let fields = extract(&fixture("application.html"));
    for f in &fields {
        assert_eq!(f.label, f.label.trim(), "no surrounding whitespace in {:?}", f.label);
        assert!(!f.label.contains("  "), "no double spaces in {:?}", f.label);
        assert!(!f.label.contains('*'), "no marker glyph in {:?}", f.label);
        assert!(!f.label.contains('\n'), "no newlines in {:?}", f.label);
    }
}

#[test]
fn identifiers_are_non_empty_and_unique() {
    let html = r#"
        <form>
          <input id="email" type="email">
          <input id="email" type="email">
          <input name="email">
          <input>
          <input>
        </form>"#;
    let fields = extract(html);

    let unique: HashSet<_> = fields.iter().map(|f| f.identifier.as_str()).collect();
    assert_eq!(unique.len(), fields.len(), "ids: {:?}", ids(&fields));
    assert!(fields.iter().all(|f| !f.identifier.is_empty()));
    assert_eq!(&ids(&fields)[..3], &["email", "email-2", "email-3"]);
    assert_eq!(fields.len(), 5);
}

#[test]
fn without_fallback_ids_duplicates_and_anonymous_controls_are_dropped() {
    let html = r#"
        <input id="email" type="email">
        <input id="email" type="email">
        <input type="text">
        <input name="city">"#;
    let fields = extract_with(html, &ExtractConfig::default().with_fallback_ids(false));
    assert_eq!(ids(&fields), vec!["email", "city"]);
}

#[test]
fn drop_unlabeled_removes_controls_without_labels() {
    let html = r#"
        <label for="a">Name</label><input id="a">
        <input id="b">"#;
    let kept = extract(html);
    let dropped = extract_with(html, &ExtractConfig::default().with_drop_unlabeled(true));

    assert_eq!(ids(&kept), vec!["a", "b"]);
    assert_eq!(field(&kept, "b").label, "");
    assert_eq!(ids(&dropped), vec!["a"]);
}

#[test]
fn label_for_attribute_wins_over_wrapper_and_aria() {
    let html = r#"
        <div class="field">
          <label>Wrapper text</label>
          <label for="x">Explicit text</label>
          <input id="x" aria-label="Aria text">
        </div>"#;
    assert_eq!(extract(html)[0].label, "Explicit text");
}

#[test]
fn wrapper_label_wins_over_enclosing_and_aria() {
    let html = r#"
        <div class="form-group">
          <span><label>Wrapper text</label></span>
          <input id="x" aria-label="Aria text">
        </div>"#;
    assert_eq!(extract(html)[0].label, "Wrapper text");
}

#[test]
fn enclosing_label_and_aria_label_are_last_resorts() {
    let html = r#"
        <label>City <input id="city"></label>
        <input id="zip" aria-label="Postal code">
        <input id="bare">"#;
    let fields = extract(html);
    assert_eq!(field(&fields, "city").label, "City");
    assert_eq!(field(&fields, "zip").label, "Postal code");
    assert_eq!(field(&fields, "bare").label, "");
}

#[test]
fn custom_marker_glyph_is_stripped() {
    let html = r#"<label for="a">Name (required)</label><input id="a">"#;
    let config = ExtractConfig::default().with_required_marker("(required)");
    let fields = extract_with(html, &config);
    assert_eq!(fields[0].label, "Name");
    assert!(fields[0].required);
}

// =========================================================================
// Required detection: any one signal is enough
// =========================================================================

#[test]
fn required_is_the_or_of_three_signals() {
    let cases = [
        (r#"<label for="f">Name</label><input id="f">"#, false),
        (r#"<label for="f">Name</label><input id="f" required>"#, true),
        (r#"<label for="f">Name</label><input id="f" aria-required="true">"#, true),
        (r#"<label for="f">Name</label><input id="f" aria-required="TRUE">"#, true),
        (r#"<label for="f">Name</label><input id="f" aria-required="false">"#, false),
        (r#"<label for="f">Name *</label><input id="f">"#, true),
        (r#"<label for="f">Name *</label><input id="f" required aria-required="true">"#, true),
        (r#"<label for="f">Name</label><input id="f" required aria-required="false">"#, true),
        (r#"<label for="f">Name *</label><input id="f" aria-required="false">"#, true),
    ];

    for (html, expected) in cases {
        let fields = extract(html);
        assert_eq!(fields[0].required, expected, "for markup {}", html);
    }
}

#[test]
fn unlabeled_control_is_required_only_by_attributes() {
    assert!(!extract(r#"<input id="f">"#)[0].required);
    assert!(extract(r#"<input id="f" required>"#)[0].required);
}

// =========================================================================
// Options
// =========================================================================

#[test]
fn select_sentinels_leave_only_real_options() {
    let html = r#"
        <select id="country">
          <option value="">Choose</option>
          <option value="none">N/A</option>
          <option value="US">USA</option>
        </select>"#;
    let fields = extract(html);
    assert_eq!(fields[0].options, Some(vec![option("US", "USA")]));
}

#[test]
fn sentinel_match_is_exact() {
    let html = r#"
        <select id="s">
          <option value="None">None of these</option>
          <option value="none">N/A</option>
        </select>"#;
    let fields = extract(html);
    assert_eq!(fields[0].option_ids(), vec!["None"], "case differs, so kept");
}

#[test]
fn configured_sentinels_replace_defaults() {
    let html = r#"
        <select id="s">
          <option value="select">-- Select --</option>
          <option value="none">None</option>
        </select>"#;
    let config = ExtractConfig::default().with_option_sentinels(["select"]);
    let fields = extract_with(html, &config);
    assert_eq!(fields[0].option_ids(), vec!["none"]);
}

#[test]
fn option_without_value_uses_its_text() {
    let html = r#"<select id="s"><option>  Remote  </option></select>"#;
    let fields = extract(html);
    assert_eq!(fields[0].options, Some(vec![option("Remote", "Remote")]));
}

#[test]
fn checkbox_group_members_use_their_own_labels() {
    let html = r#"
        <div class="field">
          <label>Languages *</label>
          <input type="checkbox" name="lang" id="lang_rust" value="rust"><label for="lang_rust">Rust</label>
          <input type="checkbox" name="lang" id="lang_go" value="go"><label for="lang_go">Go</label>
          <input type="checkbox" name="lang" id="lang_none" value="none"><label for="lang_none">None</label>
        </div>"#;
    let fields = extract(html);

    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].identifier, "lang");
    assert_eq!(fields[0].label, "Languages");
    assert!(fields[0].required);
    assert_eq!(
        fields[0].options,
        Some(vec![option("rust", "Rust"), option("go", "Go")])
    );
}

// =========================================================================
// Composite dates
// =========================================================================

#[test]
fn three_spinbuttons_become_one_date() {
    let html = r#"
        <div class="field">
          <label>Date of availability</label>
          <div role="spinbutton" id="day1"></div>
          <div role="spinbutton" id="month1"></div>
          <div role="spinbutton" id="year1"></div>
        </div>"#;
    let fields = extract(html);

    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].field_type, FieldType::Date);
    assert_eq!(fields[0].identifier, "day1", "wrapper has no id, first part used");

    let json = serde_json::to_value(&fields[0]).unwrap();
    assert_eq!(
        json["components"],
        serde_json::json!({"Day": "day1", "Month": "month1", "Year": "year1"})
    );
}

#[test]
fn missing_date_parts_are_absent() {
    let html = r#"
        <div class="field" id="dob">
          <label>Birth</label>
          <div role="spinbutton" id="d"></div>
          <div role="spinbutton" id="m"></div>
        </div>"#;
    let fields = extract(html);
    let components = fields[0].components.clone().unwrap();

    assert_eq!(components.len(), 2);
    assert_eq!(components.year, None);

    let json = serde_json::to_value(&fields[0]).unwrap();
    assert!(json["components"].get("Year").is_none(), "no placeholder for missing year");
}

#[test]
fn anonymous_date_part_keeps_its_slot_empty() {
    let html = r#"
        <div class="field" id="dob">
          <label>Date of birth</label>
          <div role="spinbutton"></div>
          <div role="spinbutton" id="m"></div>
          <div role="spinbutton" id="y"></div>
        </div>"#;
    let fields = extract_with(html, &ExtractConfig::default().with_fallback_ids(false));

    assert_eq!(ids(&fields), vec!["dob"]);
    assert_eq!(
        fields[0].components,
        Some(DateComponents {
            day: None,
            month: Some("m".into()),
            year: Some("y".into()),
        }),
        "later parts stay in their own positions"
    );
}

#[test]
fn anonymous_date_part_gets_generated_id_when_enabled() {
    let html = r#"
        <div class="field" id="dob">
          <label>Date of birth</label>
          <div role="spinbutton"></div>
          <div role="spinbutton" id="m"></div>
        </div>"#;
    let fields = extract(html);
    let components = fields[0].components.clone().unwrap();

    assert!(components.day.unwrap().starts_with("field-"));
    assert_eq!(components.month.as_deref(), Some("m"));
    assert_eq!(components.year, None);
}

#[test]
fn separate_containers_give_separate_dates() {
    let html = r#"
        <div class="field" id="from"><label>From</label>
          <div role="spinbutton" id="fd"></div><div role="spinbutton" id="fm"></div><div role="spinbutton" id="fy"></div>
        </div>
        <div class="field" id="to"><label>To</label>
          <div role="spinbutton" id="td"></div><div role="spinbutton" id="tm"></div><div role="spinbutton" id="ty"></div>
        </div>"#;
    let fields = extract(html);
    assert_eq!(ids(&fields), vec!["from", "to"]);
    assert_eq!(fields[1].components.as_ref().unwrap().day.as_deref(), Some("td"));
}

// =========================================================================
// Type heuristics
// =========================================================================

#[test]
fn heuristic_table_is_configurable_and_never_drops_controls() {
    let html = r#"
        <label for="a">Expected salary</label><input id="a">
        <label for="b">Favourite colour</label><input id="b">
        <label for="c">Salary band</label><select id="c"><option value="1">1</option></select>"#;

    let config = ExtractConfig::default()
        .with_type_patterns(vec![TypePattern::new("(?i)salary", FieldType::Number).unwrap()]);
    let fields = extract_with(html, &config);

    assert_eq!(fields.len(), 3);
    assert_eq!(field(&fields, "a").field_type, FieldType::Number);
    assert_eq!(field(&fields, "b").field_type, FieldType::Text);
    assert_eq!(field(&fields, "c").field_type, FieldType::Select, "select is never relabeled");
}

#[test]
fn unknown_input_type_defaults_to_text() {
    let fields = extract(r#"<label for="c">Shade</label><input id="c" type="color">"#);
    assert_eq!(fields[0].field_type, FieldType::Text);
}

// =========================================================================
// Visibility
// =========================================================================

#[test]
fn visibility_checks_element_and_ancestors() {
    let html = r#"
        <input id="shown">
        <input id="hidden_attr" hidden>
        <div style="visibility: hidden"><input id="invisible_parent"></div>
        <div style="opacity:0"><span><input id="transparent"></span></div>
        <div style="display:block"><input id="block"></div>"#;
    let fields = extract_with(html, &ExtractConfig::default().with_visible_only(true));
    assert_eq!(ids(&fields), vec!["shown", "block"]);
}

// =========================================================================
// Scope and output shape
// =========================================================================

#[test]
fn scope_limits_extraction_to_a_container() {
    let html = r#"
        <section id="a"><input id="one"></section>
        <section id="b"><input id="two"><input id="three"></section>"#;
    let fields = extract_from_html(html, Some("#b"), &ExtractConfig::default()).unwrap();
    assert_eq!(ids(&fields), vec!["two", "three"]);
}

#[test]
fn missing_scope_is_an_error() {
    let err = extract_from_html("<p></p>", Some("#nope"), &ExtractConfig::default()).unwrap_err();
    assert!(matches!(err, FormError::ScopeNotFound(ref s) if s == "#nope"));
}

#[test]
fn extract_fields_runs_over_a_borrowed_tree() {
    let page = HtmlDocument::parse(r#"<form id="f"><label for="q">Query</label><input id="q"></form>"#);
    let tree = page.tree();
    let fields = extract_fields(&tree, None, &ExtractConfig::default()).unwrap();
    assert_eq!(fields[0].label, "Query");
}

#[test]
fn descriptor_json_matches_wire_shape() {
    let fields = extract(&fixture("application.html"));

    let country = serde_json::to_value(field(&fields, "country")).unwrap();
    assert_eq!(
        country,
        serde_json::json!({
            "Label": "Country",
            "Required": "yes",
            "Type": "select",
            "Identifier": "country",
            "options": [
                {"optionId": "US", "optionText": "USA"},
                {"optionId": "CA", "optionText": "Canada"}
            ]
        })
    );

    let phone = serde_json::to_value(field(&fields, "phone")).unwrap();
    assert_eq!(
        phone,
        serde_json::json!({"Label": "Phone", "Required": "no", "Type": "tel", "Identifier": "phone"}),
        "no options key for plain inputs"
    );
}

#[test]
fn invalid_configured_selector_fails_the_pass() {
    let config = ExtractConfig::default().with_field_wrappers(["div["]);
    let err = extract_from_html("<input id='a'>", None, &config).unwrap_err();
    assert!(matches!(err, FormError::InvalidSelector { .. }));
}
