pub mod filler;
pub mod fill_model;
pub mod guess;
pub mod inference;
