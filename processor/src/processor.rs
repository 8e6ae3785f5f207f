use async_trait::async_trait;
use aws_sdk_bedrockruntime::Client;
use aws_sdk_bedrockruntime::types::{ContentBlock, ConverseOutput, TokenUsage};
use common::{InterpolatedString, Message, MessageBatch};
use std::sync::Arc;
use tracing::{debug, info};

use crate::bedrock::BedrockChatCompletion;
use crate::client::{ConverseClient, ConverseReply};
use crate::config::{FIELD_PROMPT, FIELD_SYSTEM_PROMPT, ProcessorConfig, SessionConfig};
use crate::error::{ConfigError, ProcessorError};

/// A message transform stage driven by a processor host.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, message: &Message) -> Result<MessageBatch, ProcessorError>;

    async fn close(&self) -> Result<(), ProcessorError>;
}

/// Sends each message to a Bedrock model through the Converse API and replaces
/// its payload with the generated text.
pub struct BedrockChatProcessor {
    client: Arc<dyn ConverseClient>,
    config: ProcessorConfig,
    user_prompt: Option<InterpolatedString>,
    system_prompt: Option<InterpolatedString>,
}

impl BedrockChatProcessor {
    pub fn new(
        config: ProcessorConfig,
        client: Arc<dyn ConverseClient>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let user_prompt = parse_template(FIELD_PROMPT, config.prompt.as_deref())?;
        let system_prompt = parse_template(FIELD_SYSTEM_PROMPT, config.system_prompt.as_deref())?;

        info!("Configured Bedrock chat processor for model: {}", config.model);

        Ok(Self {
            client,
            config,
            user_prompt,
            system_prompt,
        })
    }

    /// Loads the AWS session and builds a processor backed by the Bedrock
    /// runtime client.
    pub async fn from_session(
        config: ProcessorConfig,
        session: &SessionConfig,
    ) -> Result<Self, ConfigError> {
        let sdk_config = session.load().await?;
        Self::new(config, Arc::new(Client::new(&sdk_config)))
    }

    /// The prompt for `message`: the rendered template if one is configured,
    /// otherwise the payload, which must be valid UTF-8.
    pub fn compute_prompt(&self, message: &Message) -> Result<String, ProcessorError> {
        if let Some(template) = &self.user_prompt {
            return template
                .try_string(message)
                .map_err(|source| ProcessorError::Interpolation {
                    field: FIELD_PROMPT,
                    source,
                });
        }

        message
            .as_str()
            .map(str::to_string)
            .map_err(|_| ProcessorError::InvalidUtf8)
    }

    fn compute_system_prompt(&self, message: &Message) -> Result<Option<String>, ProcessorError> {
        self.system_prompt
            .as_ref()
            .map(|template| {
                template
                    .try_string(message)
                    .map_err(|source| ProcessorError::Interpolation {
                        field: FIELD_SYSTEM_PROMPT,
                        source,
                    })
            })
            .transpose()
    }
}

fn parse_template(
    field: &'static str,
    template: Option<&str>,
) -> Result<Option<InterpolatedString>, ConfigError> {
    template
        .map(|t| {
            InterpolatedString::parse(t).map_err(|source| ConfigError::Template { field, source })
        })
        .transpose()
}

/// Pulls the single text block out of a Converse reply.
pub fn extract_text(reply: ConverseReply) -> Result<String, ProcessorError> {
    let message = match reply.output {
        Some(ConverseOutput::Message(message)) => message,
        Some(_) => return Err(ProcessorError::UnexpectedOutput("unknown")),
        None => return Err(ProcessorError::UnexpectedOutput("none")),
    };

    let mut content = message.content;
    if content.len() != 1 {
        return Err(ProcessorError::UnexpectedContentCount(content.len()));
    }

    match content.remove(0) {
        ContentBlock::Text(text) => Ok(text),
        other => Err(ProcessorError::UnsupportedContentType(content_block_kind(&other))),
    }
}

fn content_block_kind(block: &ContentBlock) -> &'static str {
    match block {
        ContentBlock::Text(_) => "text",
        ContentBlock::Image(_) => "image",
        ContentBlock::Document(_) => "document",
        ContentBlock::ToolUse(_) => "tool_use",
        ContentBlock::ToolResult(_) => "tool_result",
        ContentBlock::GuardContent(_) => "guard_content",
        ContentBlock::CachePoint(_) => "cache_point",
        ContentBlock::ReasoningContent(_) => "reasoning_content",
        _ => "unknown",
    }
}

fn log_usage(usage: &TokenUsage) {
    debug!(
        "Usage: input_tokens: {}, output_tokens: {}, total_tokens: {}",
        usage.input_tokens, usage.output_tokens, usage.total_tokens
    );
}

#[async_trait]
impl Processor for BedrockChatProcessor {
    async fn process(&self, message: &Message) -> Result<MessageBatch, ProcessorError> {
        let prompt = self.compute_prompt(message)?;
        let system_prompt = self.compute_system_prompt(message)?;

        let completion = BedrockChatCompletion::new(&self.config, prompt, system_prompt)?;
        let reply = self.client.converse(completion).await?;

        debug!("Converse stop_reason: {:?}", reply.stop_reason);
        if let Some(usage) = &reply.usage {
            log_usage(usage);
        }

        let text = extract_text(reply)?;

        let mut out = message.clone();
        out.set_payload(text);
        Ok(vec![out])
    }

    async fn close(&self) -> Result<(), ProcessorError> {
        Ok(())
    }
}
