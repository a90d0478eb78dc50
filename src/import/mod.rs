//! Import standardization
//!
//! Turns a pre-parsed table plus the user's column mapping into canonical,
//! time-ordered test records with a structured validation report.

pub mod validator;

pub use validator::{Standardized, Validator};
