pub mod error;
pub mod structure;
