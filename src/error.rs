use serde::Serialize;
use std::fmt;

/// User-facing message for every inference failure.
pub const INFERENCE_FAILURE_MESSAGE: &str = "Não foi possível analisar a imagem. Tente novamente.";

/// User-facing message for every profile validation failure.
pub const VALIDATION_FAILURE_MESSAGE: &str = "Por favor, insira valores válidos para todos os campos.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The image could not be read or transcoded.
    Encoding,
    /// Network error, timeout or non-success status from the service.
    Transport,
    /// The response did not match the declared schema.
    Decoding,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Encoding => "encoding",
            FailureKind::Transport => "transport",
            FailureKind::Decoding => "decoding",
        };
        write!(f, "{}", s)
    }
}

/// Normalized failure of one inference call. The underlying cause is logged
/// where it happens and never carried past this type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct InferenceFailure {
    kind: FailureKind,
    message: String,
}

impl InferenceFailure {
    pub fn new(kind: FailureKind) -> Self {
        Self {
            kind,
            message: INFERENCE_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationFailure {
    message: String,
}

impl ValidationFailure {
    pub fn new() -> Self {
        Self {
            message: VALIDATION_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Default for ValidationFailure {
    fn default() -> Self {
        Self::new()
    }
}
