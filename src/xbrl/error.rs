use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::bundle::DocumentRole;

/// Failures raised while resolving tags and decoding contexts.
///
/// Every variant except `Xml` is scoped to a single tag, request or fact
/// occurrence. The extractor turns them into [`Diagnostic`]s and keeps going.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{0} document is missing")]
    MissingRole(DocumentRole),

    #[error("unresolvable tag {tag}: {reason}")]
    UnresolvableTag { tag: String, reason: String },

    #[error("ambiguous schema for {tag}: {count} matching declarations")]
    AmbiguousSchema { tag: String, count: usize },

    #[error("context {context_id}: {reason}")]
    ContextConsistency { context_id: String, reason: String },

    #[error("malformed request {request:?}: {reason}")]
    MalformedRequest { request: String, reason: String },

    #[error("failed to fetch schema {location}: {reason}")]
    Fetch { location: String, reason: String },

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),
}

impl ExtractError {
    pub fn context(context_id: &str, reason: impl Into<String>) -> Self {
        ExtractError::ContextConsistency {
            context_id: context_id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(request: &str, reason: impl Into<String>) -> Self {
        ExtractError::MalformedRequest {
            request: request.to_string(),
            reason: reason.into(),
        }
    }

    /// Short machine-friendly name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::MissingRole(_) => "missing-role",
            ExtractError::UnresolvableTag { .. } => "unresolvable-tag",
            ExtractError::AmbiguousSchema { .. } => "ambiguous-schema",
            ExtractError::ContextConsistency { .. } => "context-consistency",
            ExtractError::MalformedRequest { .. } => "malformed-request",
            ExtractError::Fetch { .. } => "fetch",
            ExtractError::Xml(_) => "xml",
        }
    }
}

/// A reported, non-fatal failure. Partial results stay usable.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Diagnostic {
    pub kind: &'static str,
    pub tag: String,
    pub context_id: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn for_tag(tag: &str, err: &ExtractError) -> Self {
        Diagnostic {
            kind: err.kind(),
            tag: tag.to_string(),
            context_id: None,
            message: err.to_string(),
        }
    }

    pub fn for_occurrence(tag: &str, context_id: &str, err: &ExtractError) -> Self {
        Diagnostic {
            kind: err.kind(),
            tag: tag.to_string(),
            context_id: Some(context_id.to_string()),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context_id {
            Some(ctx) => write!(f, "[{}] {} ({}): {}", self.kind, self.tag, ctx, self.message),
            None => write!(f, "[{}] {}: {}", self.kind, self.tag, self.message),
        }
    }
}
