//! # Model clients
//!
//! Thin bindings to the OpenAI-compatible HTTP endpoint: chat completion for
//! generation and `/embeddings` for the document index. Transport and model
//! failures surface as [`AssistantError::GenerationUnavailable`] and
//! [`AssistantError::RetrievalUnavailable`] respectively, which the
//! orchestrator's fallback chain then absorbs or escalates.

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::AssistantConfig;
use crate::error::AssistantError;
use crate::orchestrator::Generator;

/// Chat-completion generation with the configured temperature and token cap.
pub struct LanguageModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LanguageModel {
    pub fn new(config: &AssistantConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key.clone())
            .with_api_base(config.api_base.clone());
        Self {
            client: Client::with_config(openai_config),
            model: config.generation_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl Generator for LanguageModel {
    async fn generate(&self, prompt: &str) -> Result<String, AssistantError> {
        let message = ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
            name: None,
        });

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .messages(vec![message])
            .build()
            .map_err(|e| AssistantError::GenerationUnavailable(e.to_string()))?;

        debug!(model = %self.model, "sending chat completion request");
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AssistantError::GenerationUnavailable(e.to_string()))?;

        let mut text = String::new();
        for choice in &response.choices {
            if let Some(content) = &choice.message.content {
                text.push_str(content);
            }
        }
        Ok(text)
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Query and chunk embeddings over the `/embeddings` endpoint.
pub struct EmbeddingClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl EmbeddingClient {
    pub fn new(config: &AssistantConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.embedding_model.clone(),
        }
    }

    /// Embed one text into a vector.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, AssistantError> {
        let url = format!("{}/embeddings", self.api_base);
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::RetrievalUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AssistantError::RetrievalUnavailable(format!(
                "embedding endpoint returned {}",
                response.status()
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::RetrievalUnavailable(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                AssistantError::RetrievalUnavailable("empty embedding response".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn config_for(base: &str) -> AssistantConfig {
        AssistantConfig {
            api_base: base.to_string(),
            api_key: "test-key".to_string(),
            generation_model: "gen".to_string(),
            embedding_model: "embed".to_string(),
            db_url: ":memory:".to_string(),
            cache_dir: "./cache".to_string(),
            top_k: 2,
            temperature: 0.6,
            max_tokens: 400,
            cache_similarity_threshold: 0.8,
            session_timeout_secs: 3600,
            num_suggestions: 2,
        }
    }

    #[tokio::test]
    async fn test_embed_parses_vector() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(200).json_body(serde_json::json!({
                    "data": [{"embedding": [0.25, -0.5, 1.0]}]
                }));
            })
            .await;

        let client = EmbeddingClient::new(&config_for(&server.base_url()));
        let vector = client.embed("hello").await.unwrap();
        assert_eq!(vector, vec![0.25, -0.5, 1.0]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_server_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(500);
            })
            .await;

        let client = EmbeddingClient::new(&config_for(&server.base_url()));
        let err = client.embed("hello").await.unwrap_err();
        assert!(matches!(err, AssistantError::RetrievalUnavailable(_)));
    }

    #[tokio::test]
    async fn test_embed_empty_data() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(200).json_body(serde_json::json!({"data": []}));
            })
            .await;

        let client = EmbeddingClient::new(&config_for(&server.base_url()));
        assert!(client.embed("hello").await.is_err());
    }

    #[tokio::test]
    async fn test_generate_maps_transport_failure() {
        // Nothing is listening on this port.
        let model = LanguageModel::new(&config_for("http://127.0.0.1:1/v1"));
        let err = model.generate("prompt").await.unwrap_err();
        assert!(matches!(err, AssistantError::GenerationUnavailable(_)));
    }
}
