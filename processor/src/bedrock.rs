use anyhow::Result;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, InferenceConfiguration, Message, SystemContentBlock,
};

use crate::config::ProcessorConfig;

/// A single-turn Converse request, ready to hand to a [`crate::ConverseClient`].
#[derive(Clone, Debug)]
pub struct BedrockChatCompletion {
    pub model_id: String,
    pub messages: Vec<Message>,
    pub system_content_blocks: Option<Vec<SystemContentBlock>>,
    pub inference_config: InferenceConfiguration,
}

impl BedrockChatCompletion {
    pub fn new(
        config: &ProcessorConfig,
        prompt: String,
        system_prompt: Option<String>,
    ) -> Result<Self> {
        let message = Message::builder()
            .role(ConversationRole::User)
            .content(ContentBlock::Text(prompt))
            .build()?;

        let inference_config = InferenceConfiguration::builder()
            .set_max_tokens(config.max_tokens_i32())
            .set_stop_sequences(config.stop.clone())
            .set_temperature(config.temperature)
            .set_top_p(config.top_p)
            .build();

        Ok(Self {
            model_id: config.model.clone(),
            messages: vec![message],
            system_content_blocks: system_prompt.map(|s| vec![SystemContentBlock::Text(s)]),
            inference_config,
        })
    }
}
