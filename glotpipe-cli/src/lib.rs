//! CLI library for testing purposes

pub mod report;
pub mod variant;

pub use variant::VariantArg;
