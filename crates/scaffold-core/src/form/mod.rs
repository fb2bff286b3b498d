pub mod builder;
pub mod input;
pub mod validate;

pub use builder::{assemble_form, compile_form, generate_filters, Form, FormElement};
pub use input::{compile_input, ContentNode, InputDescriptor};
pub use validate::{Rule, RuleViolation, ValidationResult, Validator};
