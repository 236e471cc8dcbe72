//! Structured error types shared across the cut-flow crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`AnaError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (stage names, indices, run numbers).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the operator fix the job configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the analysis engine.
///
/// The variants follow the failure taxonomy of a batch analysis job: usage
/// and configuration problems are fatal before any event is read, source
/// problems end the event loop, and stage failures abort the run after the
/// finalize sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum AnaError {
    /// Bad or missing command line arguments, unknown cut-variation tokens.
    #[error("usage error: {0}")]
    Usage(ErrorInfo),
    /// Inconsistent job configuration (cut tables, data-origin mismatch).
    #[error("configuration error: {0}")]
    Config(ErrorInfo),
    /// Event source failures that cannot be treated as a clean end of stream.
    #[error("source error: {0}")]
    Source(ErrorInfo),
    /// Failures raised by a stage while processing or finalizing.
    #[error("stage error: {0}")]
    Stage(ErrorInfo),
    /// Filesystem errors while writing logs or artefacts.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl AnaError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            AnaError::Usage(info)
            | AnaError::Config(info)
            | AnaError::Source(info)
            | AnaError::Stage(info)
            | AnaError::Io(info)
            | AnaError::Serde(info) => info,
        }
    }

    /// Adds a context entry unless the key is already present.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let info = match &mut self {
            AnaError::Usage(info)
            | AnaError::Config(info)
            | AnaError::Source(info)
            | AnaError::Stage(info)
            | AnaError::Io(info)
            | AnaError::Serde(info) => info,
        };
        info.context
            .entry(key.into())
            .or_insert_with(|| value.to_string());
        self
    }

    /// Shorthand for a stage failure with the given code and message.
    pub fn stage(code: impl Into<String>, message: impl Into<String>) -> Self {
        AnaError::Stage(ErrorInfo::new(code, message))
    }

    /// Shorthand for a configuration failure with the given code and message.
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        AnaError::Config(ErrorInfo::new(code, message))
    }

    /// Wraps an I/O style failure, keeping its display text as the message.
    pub fn io(code: impl Into<String>, err: impl ToString) -> Self {
        AnaError::Io(ErrorInfo::new(code, err.to_string()))
    }
}
