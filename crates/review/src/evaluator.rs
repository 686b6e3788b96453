use std::time::Duration;

use {
    async_trait::async_trait,
    folio_common::Mode,
    folio_config::EvaluatorConfig,
    secrecy::{ExposeSecret, Secret},
    serde::Serialize,
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    image::ImageRef,
    prompts,
};

/// Scores a set of images and returns free-form feedback.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, mode: Mode, images: &[ImageRef]) -> Result<String>;
}

/// Content block of an OpenAI chat message.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
struct ImageUrl {
    url: String,
}

/// Evaluator backed by an OpenAI-compatible `/chat/completions` endpoint
/// with vision support.
pub struct OpenAiEvaluator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<Secret<String>>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiEvaluator {
    pub fn from_config(config: &EvaluatorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    async fn request_body(&self, mode: Mode, images: &[ImageRef]) -> Result<serde_json::Value> {
        let mut content = vec![ContentPart::Text {
            text: prompts::user_prompt(images.len()),
        }];
        for image in images {
            content.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_uri().await?,
                },
            });
        }

        Ok(serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [
                { "role": "system", "content": prompts::system_prompt(mode) },
                { "role": "user", "content": content },
            ],
        }))
    }
}

#[async_trait]
impl Evaluator for OpenAiEvaluator {
    async fn evaluate(&self, mode: Mode, images: &[ImageRef]) -> Result<String> {
        let Some(api_key) = &self.api_key else {
            return Err(Error::NotConfigured("missing API key".into()));
        };
        let body = self.request_body(mode, images).await?;

        debug!(model = %self.model, %mode, images = images.len(), "evaluation request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key.expose_secret()))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, model = %self.model, body = %body, "evaluator API error");
            return Err(Error::Remote {
                status: status.as_u16(),
                body,
            });
        }

        let payload = response.json::<serde_json::Value>().await?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .ok_or(Error::EmptyFeedback)
    }
}
