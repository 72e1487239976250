//! Installation and model file validation.

mod validate;

pub use validate::validate_model;
