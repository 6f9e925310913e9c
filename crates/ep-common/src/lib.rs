//! epiphase common types and errors.
//!
//! This crate provides foundational types shared across the engine crates:
//! - Observed daily records and the validated record set
//! - Ordinal phase labels and phase selectors
//! - Common error types
//! - Output format specifications

pub mod error;
pub mod ordinal;
pub mod output;
pub mod record;

pub use error::{format_error_human, Error, ErrorCategory, Result, StructuredError};
pub use ordinal::{int_to_ordinal, PhaseSelector};
pub use output::OutputFormat;
pub use record::{Record, RecordSet, RecordSupply};
