//! Error functions comparing network predictions with targets, looked up by name.

pub mod functions;

pub use functions::ErrorFunction;
