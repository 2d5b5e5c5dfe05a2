//! Client for the OpenRouter chat-completions API.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::constants::integrations::OPENROUTER_URL;

#[derive(Clone)]
pub struct OpenRouterClient {
    inner: Arc<OpenRouterClientInner>,
}

struct OpenRouterClientInner {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Sampling knobs for a single completion.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatResponse {
    fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_owned())
            .filter(|content| !content.is_empty())
    }
}

impl OpenRouterClient {
    pub fn new(http: reqwest::Client, api_key: Option<String>, model: &str) -> Self {
        Self {
            inner: Arc::new(OpenRouterClientInner {
                http,
                api_key,
                model: model.to_owned(),
            }),
        }
    }

    /// The model completions are requested from.
    pub fn model(&self) -> &str {
        &self.inner.model
    }

    /// Run one system + user exchange and return the trimmed reply text.
    #[instrument(skip_all, fields(model = %self.inner.model), err)]
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        options: CompletionOptions,
    ) -> Result<String, errors::OpenRouterError> {
        let api_key = self
            .inner
            .api_key
            .as_deref()
            .ok_or(errors::OpenRouterError::NotConfigured)?;
        let request = ChatRequest {
            model: &self.inner.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };
        let response: ChatResponse = self
            .inner
            .http
            .post(OPENROUTER_URL)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response
            .into_content()
            .ok_or(errors::OpenRouterError::EmptyResponse)
    }
}

pub mod errors {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum OpenRouterError {
        #[error("OPENROUTER_API_KEY is not configured")]
        NotConfigured,
        #[error("The model returned an empty response")]
        EmptyResponse,
        #[error(transparent)]
        Http(#[from] reqwest::Error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_unset_options() {
        let request = ChatRequest {
            model: "openai/gpt-4o-mini",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "creta 2019",
                },
            ],
            temperature: None,
            max_tokens: Some(300),
        };
        let json = serde_json::to_value(&request).expect("serializes");
        assert!(json.get("temperature").is_none());
        assert_eq!(json["max_tokens"], 300);
        assert_eq!(json["messages"][1]["content"], "creta 2019");
    }

    #[test]
    fn first_non_empty_choice_is_returned() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  [\"185/65R15\"]\n"}}]}"#,
        )
        .expect("parses");
        assert_eq!(response.into_content().as_deref(), Some("[\"185/65R15\"]"));
        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).expect("parses");
        assert_eq!(empty.into_content(), None);
    }
}
