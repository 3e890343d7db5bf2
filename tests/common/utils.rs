#![allow(dead_code)]

use form_detection::{ExtractConfig, FieldDescriptor, extract_from_html};

pub fn fixture(name: &str) -> String {
    let base = std::env::current_dir().unwrap();
    let path = base.join("tests").join("fixtures").join(name);

    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("missing fixture {}: {}", path.display(), e))
}

pub fn extract(html: &str) -> Vec<FieldDescriptor> {
    extract_from_html(html, None, &ExtractConfig::default()).unwrap()
}

pub fn extract_with(html: &str, config: &ExtractConfig) -> Vec<FieldDescriptor> {
    extract_from_html(html, None, config).unwrap()
}

pub fn field<'a>(fields: &'a [FieldDescriptor], identifier: &str) -> &'a FieldDescriptor {
    fields
        .iter()
        .find(|f| f.identifier == identifier)
        .unwrap_or_else(|| panic!("no field '{}' in {:?}", identifier, ids(fields)))
}

pub fn ids(fields: &[FieldDescriptor]) -> Vec<&str> {
    fields.iter().map(|f| f.identifier.as_str()).collect()
}
