use crate::error::AIError;
use crate::message::{Role, Turn};
use crate::settings::ModelBackend;
use async_openai::{
    Client,
    config::{AzureConfig, Config, OpenAIConfig},
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::{Duration, timeout};

pub const DEFAULT_MAX_TOKENS: u32 = 800;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// A chat-completion service that turns the conversation so far into the
/// next story beat.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, turns: &[Turn], params: &GenerationParams)
    -> Result<String, AIError>;
}

#[derive(Debug, Clone)]
pub struct GameAI<C: Config> {
    client: Client<C>,
    model: String,
}

impl<C: Config> GameAI<C> {
    pub fn new(client: Client<C>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

impl GameAI<AzureConfig> {
    pub fn azure(endpoint: &str, api_key: &str, deployment: &str, api_version: &str) -> Self {
        let config = AzureConfig::new()
            .with_api_base(endpoint)
            .with_api_key(api_key)
            .with_deployment_id(deployment)
            .with_api_version(api_version);
        Self::new(Client::with_config(config), deployment)
    }
}

impl GameAI<OpenAIConfig> {
    pub fn openai(api_key: &str, model: &str) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self::new(Client::with_config(config), model)
    }
}

pub fn provider_from_backend(backend: &ModelBackend) -> Arc<dyn CompletionProvider> {
    match backend {
        ModelBackend::Azure {
            endpoint,
            api_key,
            deployment,
            api_version,
        } => {
            log::info!("Using Azure OpenAI deployment {deployment} at {endpoint}");
            Arc::new(GameAI::azure(endpoint, api_key, deployment, api_version))
        }
        ModelBackend::OpenAI { api_key, model } => {
            log::info!("Using OpenAI model {model}");
            Arc::new(GameAI::openai(api_key, model))
        }
    }
}

fn to_request_message(turn: &Turn) -> Result<ChatCompletionRequestMessage, AIError> {
    let content = turn.content().to_string();
    let message = match turn.role() {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()?
            .into(),
    };
    Ok(message)
}

#[async_trait]
impl<C: Config + Send + Sync> CompletionProvider for GameAI<C> {
    #[allow(deprecated)]
    async fn complete(
        &self,
        turns: &[Turn],
        params: &GenerationParams,
    ) -> Result<String, AIError> {
        let messages = turns
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>, _>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(params.max_tokens)
            .temperature(params.temperature)
            .build()?;

        log::debug!(
            "Sending {} turns to {} (max_tokens {}, temperature {})",
            turns.len(),
            self.model,
            params.max_tokens,
            params.temperature
        );

        let response = timeout(REQUEST_TIMEOUT, self.client.chat().create(request))
            .await
            .map_err(|_| AIError::Timeout)??;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(AIError::EmptyCompletion)
    }
}
