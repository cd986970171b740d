//! Perplexity chat-completion client.

use contract_tag_eval::retry::RetryPolicy;
use contract_tag_eval::template;
use contract_tag_eval::RecordLine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::chain::{chain_name, explorer_blocklist};
use crate::error::PredictError;
use crate::response::parse_prediction;

pub const DEFAULT_ENDPOINT: &str = "https://api.perplexity.ai/chat/completions";
pub const DEFAULT_MODEL: &str = "sonar";

const SYSTEM_PROMPT: &str = "You are a blockchain information expert. Provide accurate, concise information about the contracts.";
const MAX_TOKENS: u32 = 250;
const TEMPERATURE: f32 = 0.1;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
    search_domain_filter: Vec<String>,
    return_related_questions: bool,
    return_images: bool,
}

impl<'a> ChatRequest<'a> {
    pub fn for_contract(model: &'a str, address: &str) -> Self {
        Self {
            model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user",
                    content: user_prompt(address),
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            search_domain_filter: explorer_blocklist(address),
            return_related_questions: false,
            return_images: false,
        }
    }
}

fn user_prompt(address: &str) -> String {
    format!(
        "Given this smart contract address on {chain}: {address}\n\
         Please return information about this smart contract in this exact JSON format:\n\
         {template}\n\
         Be concise in the description. If you're not certain about any field, make a best guess. \
         All fields with no found information must be left as an empty string.\n\
         Return just the JSON and nothing else.",
        chain = chain_name(address),
        template = template::record_template_json().trim(),
    )
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct PerplexityClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

impl PerplexityClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        retry: RetryPolicy,
    ) -> Result<Self, PredictError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            retry,
        })
    }

    /// Asks for the metadata of one contract and validates the answer.
    ///
    /// Rate-limit and server errors are retried with the policy's backoff;
    /// every other failure is returned immediately.
    pub async fn predict(&self, address: &str) -> Result<RecordLine, PredictError> {
        let request = ChatRequest::for_contract(&self.model, address);
        let content = self
            .retry
            .run_async(
                "chat completion",
                || self.complete(&request),
                PredictError::is_retryable,
                tokio::time::sleep,
            )
            .await?;
        tracing::debug!(address, %content, "received completion");
        parse_prediction(address, &content)
    }

    async fn complete(&self, request: &ChatRequest<'_>) -> Result<String, PredictError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PredictError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: ChatResponse = response.json().await?;
        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(PredictError::EmptyResponse)
    }
}
