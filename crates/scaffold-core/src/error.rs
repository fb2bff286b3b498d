use thiserror::Error;

use crate::grid::transform::Action;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScaffoldError {
    #[error("another field or fieldset already exists with identifier '{0}'")]
    DuplicateIdentifier(String),

    #[error("model '{0}' is not registered")]
    UnknownModel(String),

    #[error("{model} with id {id} not found")]
    NotFound { model: String, id: String },

    #[error("not authorized to {action} {resource}")]
    CapabilityDenied { resource: String, action: Action },
}

impl ScaffoldError {
    /// Programmer errors in the declarations; the request must abort.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::DuplicateIdentifier(_) | Self::UnknownModel(_))
    }
}

pub type ScaffoldResult<T> = Result<T, ScaffoldError>;
