use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    config::LoadError,
    domain::{components::ComponentKind, error::DomainError, ids::ComponentId},
    infra::{dom::DomError, error::InfraError, html::ExportError},
};

/// Every way an engine operation can be refused. A call that returns one
/// of these has not written to the document and has not synchronized.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("no component is registered as `{id}`")]
    UnknownComponent { id: ComponentId },
    #[error("component `{id}` is no longer attached to the editable root")]
    Detached { id: ComponentId },
    #[error("{kind} components cannot be patched")]
    Unpatchable { kind: ComponentKind },
    #[error("invalid {kind} properties: {message}")]
    InvalidProperties {
        kind: ComponentKind,
        message: String,
    },
    #[error("component `{id}` has no image element")]
    MissingImage { id: ComponentId },
    #[error("node is not an image element")]
    NotAnImage,
    #[error("node is not inside the editable root")]
    OutsideRoot,
    #[error("the editable root is not attached to the document")]
    RootDetached,
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl EditorError {
    pub fn unknown(id: &ComponentId) -> Self {
        Self::UnknownComponent { id: id.clone() }
    }

    pub fn detached(id: &ComponentId) -> Self {
        Self::Detached { id: id.clone() }
    }

    pub fn invalid(kind: ComponentKind, message: impl ToString) -> Self {
        Self::InvalidProperties {
            kind,
            message: message.to_string(),
        }
    }

    /// Unknown and detached targets are the same condition to callers.
    pub fn is_missing_target(&self) -> bool {
        matches!(
            self,
            EditorError::UnknownComponent { .. } | EditorError::Detached { .. }
        )
    }
}

/// Top-level failure of the `quire` binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error("failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),
}

impl AppError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) => 78,
            AppError::Infra(InfraError::Read { .. }) => 66,
            AppError::Infra(InfraError::Telemetry(_)) => 70,
            AppError::Domain(_) | AppError::Editor(_) => 65,
            AppError::Output(_) => 74,
        }
    }
}

/// Message chain of an error, outermost first.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut messages = self.messages.iter();
        if let Some(first) = messages.next() {
            f.write_str(first)?;
        }
        for message in messages {
            write!(f, "\n  caused by: {message}")?;
        }
        Ok(())
    }
}
