use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown {entity} `{value}`")]
    Unknown { entity: &'static str, value: String },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn unknown(entity: &'static str, value: impl Into<String>) -> Self {
        Self::Unknown {
            entity,
            value: value.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
