//! Reading Validation
//!
//! Enforces the form's widget bounds on submissions that did not come
//! through the form.

mod error;
mod validator;

pub use error::ValidationError;
pub use validator::{Bounds, ValidationConfig, ValidationResult, Validator};
