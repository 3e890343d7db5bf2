pub mod classifier;
pub mod config;
pub mod extractor;
pub mod field_model;
pub mod identity;
pub mod label;
