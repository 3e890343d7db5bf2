//! Form field extraction and resume-driven form filling.
//!
//! [`form::extractor::extract_fields`] turns a document tree into an ordered
//! list of [`FieldDescriptor`]s: label, required flag, type, identifier, and
//! option or date-component details. [`fill::filler::FormFiller`] sends those
//! descriptors in batches to a text-completion backend and collects
//! [`FillAnswer`]s keyed by identifier.

pub mod cli;
pub mod dom;
pub mod error;
pub mod fill;
pub mod form;
pub mod trace;

pub use dom::document::DocumentTree;
pub use dom::html::HtmlDocument;
pub use dom::live::LiveDocument;
pub use error::FormError;
pub use fill::fill_model::FillAnswer;
pub use form::config::ExtractConfig;
pub use form::extractor::{extract_fields, extract_from_html};
pub use form::field_model::{DateComponents, FieldDescriptor, FieldOption, FieldType};
