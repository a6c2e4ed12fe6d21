//! OpenAI chat completions provider.
//!
//! Also serves OpenAI-compatible endpoints (Ollama, vLLM, LM Studio) when
//! `base_url` points at them.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
        ResponseFormat as OpenAIResponseFormat,
    },
    Client,
};
use async_trait::async_trait;

use grimoire_core::error::{GrimoireError, GrimoireResult};
use grimoire_core::traits::{
    GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat, TokenUsage,
};
use grimoire_core::types::{Message, MessageRole};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI LLM provider.
pub struct OpenAILlm {
    client: Client<OpenAIConfig>,
    config: LlmConfig,
    base_url: String,
}

impl OpenAILlm {
    /// Create a new OpenAI provider.
    ///
    /// The key falls back to `OPENAI_API_KEY`. A custom `base_url` may run
    /// without a key, since local compatible servers rarely require one.
    pub fn new(config: LlmConfig) -> GrimoireResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok());

        if api_key.is_none() && config.base_url.is_none() {
            return Err(GrimoireError::Configuration(
                "OpenAI API key not found. Set OPENAI_API_KEY environment variable or provide api_key in config.".to_string(),
            ));
        }

        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(OPENAI_API_URL)
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base_url)
            .map_err(|e| GrimoireError::Configuration(format!("Invalid OpenAI base URL: {}", e)))?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key.unwrap_or_default())
            .with_api_base(&base_url);

        let mut config = config;
        if config.model.is_empty() {
            config.model = DEFAULT_MODEL.to_string();
        }

        Ok(Self {
            client: Client::with_config(openai_config),
            config,
            base_url,
        })
    }

    fn message_to_openai(msg: &Message) -> ChatCompletionRequestMessage {
        match msg.role {
            MessageRole::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            MessageRole::User => {
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            MessageRole::Assistant => {
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                        msg.content.clone(),
                    )),
                    ..Default::default()
                })
            }
        }
    }

    fn build_request(
        &self,
        messages: &[Message],
        options: GenerationOptions,
    ) -> CreateChatCompletionRequest {
        CreateChatCompletionRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(Self::message_to_openai).collect(),
            temperature: Some(options.temperature.unwrap_or(self.config.temperature)),
            max_tokens: Some(options.max_tokens.unwrap_or(self.config.max_tokens)),
            response_format: match options.response_format {
                Some(ResponseFormat::Json) => Some(OpenAIResponseFormat::JsonObject),
                _ => None,
            },
            ..Default::default()
        }
    }
}

#[async_trait]
impl Llm for OpenAILlm {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> GrimoireResult<LlmResponse> {
        let request = self.build_request(messages, options.unwrap_or_default());

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| GrimoireError::llm(format!("OpenAI API error: {}", e)))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content);

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(LlmResponse { content, usage })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_base_url_without_key() {
        let llm = OpenAILlm::new(LlmConfig {
            base_url: Some("http://localhost:11434/v1/".to_string()),
            model: "llama3.2".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(llm.model_name(), "llama3.2");
        assert_eq!(llm.base_url, "http://localhost:11434/v1");
        assert!(llm.supports_json_mode());
    }

    #[test]
    fn test_default_model() {
        let llm = OpenAILlm::new(LlmConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(llm.model_name(), DEFAULT_MODEL);
        assert_eq!(llm.base_url, OPENAI_API_URL);
    }

    #[test]
    fn test_invalid_base_url() {
        let result = OpenAILlm::new(LlmConfig {
            api_key: Some("sk-test".to_string()),
            base_url: Some("not a url".to_string()),
            ..Default::default()
        });

        assert!(result.is_err());
    }

    #[test]
    fn test_json_mode_request() {
        let llm = OpenAILlm::new(LlmConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        })
        .unwrap();

        let request = llm.build_request(
            &[Message::system("extract"), Message::user("hello")],
            GenerationOptions {
                temperature: Some(0.1),
                max_tokens: Some(100),
                response_format: Some(ResponseFormat::Json),
            },
        );

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["max_tokens"], 100);
    }

    #[test]
    fn test_text_request_has_no_response_format() {
        let llm = OpenAILlm::new(LlmConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        })
        .unwrap();

        let request = llm.build_request(&[Message::user("hello")], GenerationOptions::default());
        assert!(request.response_format.is_none());
    }
}
