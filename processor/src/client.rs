use async_trait::async_trait;
use aws_sdk_bedrockruntime::Client;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::types::{ConverseOutput, StopReason, TokenUsage};
use tracing::{debug, error};

use crate::bedrock::BedrockChatCompletion;

/// The parts of a Converse response the processor looks at.
#[derive(Clone, Debug)]
pub struct ConverseReply {
    pub output: Option<ConverseOutput>,
    pub stop_reason: StopReason,
    pub usage: Option<TokenUsage>,
}

/// Issues one Converse call. Implementations must be safe to share across
/// concurrent `process` invocations.
#[async_trait]
pub trait ConverseClient: Send + Sync {
    async fn converse(&self, completion: BedrockChatCompletion) -> anyhow::Result<ConverseReply>;
}

#[async_trait]
impl ConverseClient for Client {
    async fn converse(&self, completion: BedrockChatCompletion) -> anyhow::Result<ConverseReply> {
        debug!(
            "Sending Converse request to Bedrock API for model: {}",
            completion.model_id
        );

        let result = self
            .converse()
            .model_id(&completion.model_id)
            .set_messages(Some(completion.messages))
            .set_system(completion.system_content_blocks)
            .set_inference_config(Some(completion.inference_config))
            .send()
            .await;

        match result {
            Ok(response) => Ok(ConverseReply {
                output: response.output,
                stop_reason: response.stop_reason,
                usage: response.usage,
            }),
            Err(e) => {
                error!("Bedrock API error: {:?}", e);
                Err(anyhow::anyhow!(
                    "Bedrock API error: {}",
                    DisplayErrorContext(&e)
                ))
            }
        }
    }
}
