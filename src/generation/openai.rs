//! OpenAI chat completions turn generator.

use super::{GenerationContext, PromptBuilder, TurnGenerator};
use crate::config::{Prompts, Settings};
use crate::error::{PodweaveError, Result};
use crate::openai::create_client_with_config;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Generates dialogue fragments with an OpenAI-compatible chat model.
pub struct OpenAIGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    max_output_tokens: u32,
    prompts: PromptBuilder,
}

impl OpenAIGenerator {
    pub fn new(client: Client<OpenAIConfig>, model: &str, prompts: Prompts) -> Self {
        Self {
            client,
            model: model.to_string(),
            max_output_tokens: 8192,
            prompts: PromptBuilder::new(prompts),
        }
    }

    pub fn from_settings(settings: &Settings, prompts: Prompts) -> Result<Self> {
        let mut config = OpenAIConfig::default();
        if let Some(base) = &settings.llm.api_base {
            config = config.with_api_base(base);
        }
        let client = create_client_with_config(
            config,
            Duration::from_secs(settings.longform.request_timeout_secs),
        )?;

        Ok(Self::new(client, &settings.llm.model, prompts)
            .with_max_output_tokens(settings.llm.max_output_tokens))
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

#[async_trait]
impl TurnGenerator for OpenAIGenerator {
    #[instrument(skip(self, chunk_text, context), fields(part = context.chunk_index + 1, total = context.total_chunks))]
    async fn generate(&self, chunk_text: &str, context: &GenerationContext) -> Result<String> {
        let prompt = self.prompts.build(chunk_text, context);

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(prompt.system)
                .build()
                .map_err(|e| PodweaveError::OpenAI(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.user)
                .build()
                .map_err(|e| PodweaveError::OpenAI(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(context.conversation.creativity)
            .max_completion_tokens(self.max_output_tokens)
            .build()
            .map_err(|e| PodweaveError::OpenAI(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            PodweaveError::OpenAI(format!("Failed to generate dialogue: {}", e))
        })?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| PodweaveError::OpenAI("Empty response from model".to_string()))?;

        debug!("Received {} characters of dialogue", content.len());
        Ok(content)
    }

    fn name(&self) -> &str {
        "openai"
    }
}
