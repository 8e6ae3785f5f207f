use common::TemplateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("field `{0}` is required")]
    Missing(&'static str),
    #[error("field `max_tokens` must be greater than or equal to 1, got {0}")]
    MaxTokens(i64),
    #[error("field `{field}` must be between 0.0-1.0, got {value}")]
    OutOfRange { field: &'static str, value: f32 },
    #[error("static credentials require `{0}` to be set")]
    IncompleteCredentials(&'static str),
    #[error("`role_external_id` requires `role` to be set")]
    ExternalIdWithoutRole,
    #[error("failed to parse `{field}`: {source}")]
    Template {
        field: &'static str,
        #[source]
        source: TemplateError,
    },
}

/// Failure of a single message. Each variant aborts that message only.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("message payload contained invalid UTF8")]
    InvalidUtf8,
    #[error("unable to interpolate `{field}`: {source}")]
    Interpolation {
        field: &'static str,
        #[source]
        source: TemplateError,
    },
    #[error(transparent)]
    Client(#[from] anyhow::Error),
    #[error("unexpected output: {0}")]
    UnexpectedOutput(&'static str),
    #[error("unexpected number of response content: {0}")]
    UnexpectedContentCount(usize),
    #[error("unsupported response content type: {0}")]
    UnsupportedContentType(&'static str),
}

impl ProcessorError {
    /// True when the failure was caused by the inbound message rather than
    /// the model or the transport.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidUtf8 | Self::Interpolation { .. })
    }
}
