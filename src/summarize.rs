use async_trait::async_trait;
use eyre::bail;
use log::{debug, warn};
use serde_json::Value;

use crate::config::Config;
use crate::{Captions, GenerationError, Result};

const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Summary lengths above this many words get the in-depth phrasing
pub const LONG_SUMMARY_THRESHOLD: u32 = 500;

/// Sampling parameters sent with every generation request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub max_output_tokens: u32,
    pub candidate_count: u32,
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_output_tokens: 1500,
            candidate_count: 1,
            temperature: 0.5,
        }
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> std::result::Result<String, GenerationError>;
}

/// Everything needed to ask for one summary
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub captions: Captions,
    pub summary_length: u32,
    pub video_url: String,
    pub video_title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    ShortNoCaptions,
    LongNoCaptions,
    ShortWithCaptions,
    LongWithCaptions,
}

impl Template {
    pub fn select(captions: &Captions, summary_length: u32) -> Self {
        let long = summary_length > LONG_SUMMARY_THRESHOLD;
        match (captions.is_absent(), long) {
            (true, false) => Template::ShortNoCaptions,
            (true, true) => Template::LongNoCaptions,
            (false, false) => Template::ShortWithCaptions,
            (false, true) => Template::LongWithCaptions,
        }
    }

    pub fn uses_captions(self) -> bool {
        matches!(self, Template::ShortWithCaptions | Template::LongWithCaptions)
    }

    pub fn without_captions(self) -> Self {
        match self {
            Template::ShortWithCaptions | Template::ShortNoCaptions => Template::ShortNoCaptions,
            Template::LongWithCaptions | Template::LongNoCaptions => Template::LongNoCaptions,
        }
    }
}

/// Render the prompt text for a template
pub fn build_prompt(template: Template, request: &SummaryRequest) -> String {
    let SummaryRequest {
        captions,
        summary_length,
        video_url: url,
        video_title: title,
    } = request;
    let captions = captions.as_text().unwrap_or_default();

    match template {
        Template::ShortNoCaptions => format!(
            "Can you write a summary about this video {url} in approximately {summary_length} words. \
             The title of the video is {title}?"
        ),
        Template::LongNoCaptions => format!(
            "Can you write a very long and in-depth summary about this video {url}? The title of the video is {title}."
        ),
        Template::ShortWithCaptions => format!(
            "Can you provide a summary on this YouTube video based on the closed captions provided here:\n\n {captions}\n\n\
             Please keep it to approximately {summary_length} words.\n\n\
             Here is the video link: {url} along with its title: {title}"
        ),
        Template::LongWithCaptions => format!(
            "Can you provide a very long and in-depth summary on this YouTube video based on the closed captions provided here:\n\n {captions}\n\n\
             Here is the video link: {url} along with its title: {title}"
        ),
    }
}

/// Pick a template, ask the generator, and fall back to the captions-less
/// prompt once if the captions make the request too large
pub async fn build_and_dispatch(request: &SummaryRequest, generator: &dyn TextGenerator) -> Result<String> {
    let options = GenerationOptions::default();
    let template = Template::select(&request.captions, request.summary_length);
    debug!("Summarizing {} with {template:?} template", request.video_url);

    match generator.generate(&build_prompt(template, request), &options).await {
        Ok(text) => Ok(text.trim().to_string()),
        Err(GenerationError::RequestTooLarge) if template.uses_captions() => {
            let fallback = template.without_captions();
            warn!("Captions too large for {}, retrying with {fallback:?}", request.video_url);
            let text = generator.generate(&build_prompt(fallback, request), &options).await?;
            Ok(text.trim().to_string())
        }
        Err(e) => Err(e.into()),
    }
}

/// Build the generator matching the configured model
pub fn generator_for(config: &Config) -> eyre::Result<Box<dyn TextGenerator>> {
    let model = config.model();
    if is_anthropic_model(model) {
        Ok(Box::new(AnthropicGenerator::from_config(config)?))
    } else {
        Ok(Box::new(OpenAiGenerator::from_config(config)?))
    }
}

fn is_anthropic_model(model: &str) -> bool {
    model.starts_with("claude")
}

pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiGenerator {
    pub fn from_config(config: &Config) -> eyre::Result<Self> {
        let Some(api_key) = config.openai_api_key.clone().filter(|k| !k.trim().is_empty()) else {
            bail!("OpenAI API key is missing (set openai_api_key in config or OPENAI_API_KEY)");
        };
        Ok(Self {
            http: config.http_client()?,
            api_key,
            model: config.model().to_string(),
            endpoint: endpoint_or(config.openai_base_url.as_deref(), DEFAULT_OPENAI_ENDPOINT),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> std::result::Result<String, GenerationError> {
        debug!("Generating via OpenAI API with model {}", self.model);

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "max_tokens": options.max_output_tokens,
            "n": options.candidate_count,
            "temperature": options.temperature
        });

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let json: Value = resp.json().await?;
        extract_openai_text(&json)
    }
}

pub struct AnthropicGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl AnthropicGenerator {
    pub fn from_config(config: &Config) -> eyre::Result<Self> {
        let Some(api_key) = config.anthropic_api_key.clone().filter(|k| !k.trim().is_empty()) else {
            bail!("Anthropic API key is missing (set anthropic_api_key in config or ANTHROPIC_API_KEY)");
        };
        Ok(Self {
            http: config.http_client()?,
            api_key,
            model: config.model().to_string(),
            endpoint: endpoint_or(config.anthropic_base_url.as_deref(), DEFAULT_ANTHROPIC_ENDPOINT),
        })
    }
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> std::result::Result<String, GenerationError> {
        debug!("Generating via Anthropic API with model {}", self.model);

        // The messages API always returns a single candidate
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": options.max_output_tokens,
            "temperature": options.temperature,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let resp = self
            .http
            .post(format!("{}/messages", self.endpoint))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let json: Value = resp.json().await?;
        extract_anthropic_text(&json)
    }
}

fn endpoint_or(configured: Option<&str>, default: &str) -> String {
    configured
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

/// Map a non-success provider response onto a generation error
fn classify_failure(status: u16, body: &str) -> GenerationError {
    let json: Value = serde_json::from_str(body).unwrap_or_default();
    let error = &json["error"];
    let message = error["message"].as_str().unwrap_or(body).to_string();

    let too_large = status == 413
        || (status == 400
            && (error["code"].as_str() == Some("context_length_exceeded")
                || error["type"].as_str() == Some("request_too_large")
                || mentions_input_limit(&message)));

    if too_large {
        GenerationError::RequestTooLarge
    } else {
        GenerationError::Api { status, message }
    }
}

fn mentions_input_limit(message: &str) -> bool {
    let message = message.to_lowercase();
    ["maximum context length", "prompt is too long", "too many tokens"]
        .iter()
        .any(|needle| message.contains(needle))
}

fn extract_anthropic_text(json: &Value) -> std::result::Result<String, GenerationError> {
    if let Some(content) = json.get("content").and_then(|c| c.as_array()) {
        let text: String = content
            .iter()
            .filter_map(|block| {
                if block.get("type")?.as_str()? == "text" {
                    block.get("text")?.as_str().map(|s| s.to_string())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");
        if !text.is_empty() {
            return Ok(text);
        }
    }
    Err(GenerationError::MalformedResponse("no text content in Anthropic response".to_string()))
}

fn extract_openai_text(json: &Value) -> std::result::Result<String, GenerationError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|text| text.to_string())
        .ok_or_else(|| GenerationError::MalformedResponse("no message content in OpenAI response".to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::Error;

    struct ScriptedGenerator {
        replies: Mutex<VecDeque<std::result::Result<String, GenerationError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<std::result::Result<String, GenerationError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            prompt: &str,
            options: &GenerationOptions,
        ) -> std::result::Result<String, GenerationError> {
            assert_eq!(*options, GenerationOptions::default());
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("generator called more often than scripted")
        }
    }

    fn request(captions: Captions, summary_length: u32) -> SummaryRequest {
        SummaryRequest {
            captions,
            summary_length,
            video_url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            video_title: "Never Gonna Give You Up".to_string(),
        }
    }

    fn captions() -> Captions {
        Captions::Present("we're no strangers to love".to_string())
    }

    #[test]
    fn test_template_selection_table() {
        assert_eq!(Template::select(&Captions::Absent, 100), Template::ShortNoCaptions);
        assert_eq!(Template::select(&Captions::Absent, 500), Template::ShortNoCaptions);
        assert_eq!(Template::select(&Captions::Absent, 501), Template::LongNoCaptions);
        assert_eq!(Template::select(&captions(), 500), Template::ShortWithCaptions);
        assert_eq!(Template::select(&captions(), 1000), Template::LongWithCaptions);
    }

    #[test]
    fn test_without_captions_keeps_length_variant() {
        assert_eq!(Template::ShortWithCaptions.without_captions(), Template::ShortNoCaptions);
        assert_eq!(Template::LongWithCaptions.without_captions(), Template::LongNoCaptions);
        assert!(!Template::LongNoCaptions.uses_captions());
    }

    #[test]
    fn test_short_prompts_ask_for_word_count() {
        let with = build_prompt(Template::ShortWithCaptions, &request(captions(), 250));
        assert!(with.contains("we're no strangers to love"));
        assert!(with.contains("approximately 250 words"));
        assert!(with.contains("https://youtu.be/dQw4w9WgXcQ"));
        assert!(with.contains("Never Gonna Give You Up"));

        let without = build_prompt(Template::ShortNoCaptions, &request(Captions::Absent, 250));
        assert!(without.contains("approximately 250 words"));
        assert!(!without.contains("closed captions"));
    }

    #[test]
    fn test_long_prompts_omit_word_count() {
        let with = build_prompt(Template::LongWithCaptions, &request(captions(), 1000));
        assert!(with.contains("in-depth"));
        assert!(with.contains("we're no strangers to love"));
        assert!(!with.contains("words"));

        let without = build_prompt(Template::LongNoCaptions, &request(Captions::Absent, 1000));
        assert!(without.contains("in-depth"));
        assert!(!without.contains("1000"));
    }

    #[tokio::test]
    async fn test_no_captions_uses_short_template_once() {
        let generator = ScriptedGenerator::new(vec![Ok("  A short summary.\n".to_string())]);
        let req = request(Captions::Absent, 100);

        let summary = build_and_dispatch(&req, &generator).await.unwrap();

        assert_eq!(summary, "A short summary.");
        assert_eq!(generator.prompts(), vec![build_prompt(Template::ShortNoCaptions, &req)]);
    }

    #[tokio::test]
    async fn test_captions_present_uses_captions_template() {
        let generator = ScriptedGenerator::new(vec![Ok("Long summary".to_string())]);
        let req = request(captions(), 800);

        assert_eq!(build_and_dispatch(&req, &generator).await.unwrap(), "Long summary");
        assert_eq!(generator.prompts(), vec![build_prompt(Template::LongWithCaptions, &req)]);
    }

    #[tokio::test]
    async fn test_too_large_falls_back_once() {
        let generator = ScriptedGenerator::new(vec![
            Err(GenerationError::RequestTooLarge),
            Ok(" fallback summary ".to_string()),
        ]);
        let req = request(captions(), 300);

        assert_eq!(build_and_dispatch(&req, &generator).await.unwrap(), "fallback summary");
        assert_eq!(
            generator.prompts(),
            vec![
                build_prompt(Template::ShortWithCaptions, &req),
                build_prompt(Template::ShortNoCaptions, &req),
            ]
        );
    }

    #[tokio::test]
    async fn test_fallback_failure_propagates() {
        let generator = ScriptedGenerator::new(vec![
            Err(GenerationError::RequestTooLarge),
            Err(GenerationError::Api {
                status: 429,
                message: "quota exceeded".to_string(),
            }),
        ]);
        let req = request(captions(), 300);

        let err = build_and_dispatch(&req, &generator).await.unwrap_err();
        assert!(matches!(
            err,
            Error::SummaryGenerationFailed(GenerationError::Api { status: 429, .. })
        ));
        assert_eq!(generator.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_fallback_too_large_again_propagates() {
        let generator = ScriptedGenerator::new(vec![
            Err(GenerationError::RequestTooLarge),
            Err(GenerationError::RequestTooLarge),
        ]);
        let req = request(captions(), 300);

        let err = build_and_dispatch(&req, &generator).await.unwrap_err();
        assert!(matches!(err, Error::SummaryGenerationFailed(GenerationError::RequestTooLarge)));

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("closed captions"));
        assert!(!prompts[1].contains("closed captions"));
    }

    #[tokio::test]
    async fn test_too_large_without_captions_propagates() {
        let generator = ScriptedGenerator::new(vec![Err(GenerationError::RequestTooLarge)]);
        let err = build_and_dispatch(&request(Captions::Absent, 100), &generator)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SummaryGenerationFailed(GenerationError::RequestTooLarge)));
        assert_eq!(generator.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        let generator = ScriptedGenerator::new(vec![Err(GenerationError::Transport("connection reset".to_string()))]);
        let err = build_and_dispatch(&request(captions(), 100), &generator)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SummaryGenerationFailed(GenerationError::Transport(_))));
        assert_eq!(generator.prompts().len(), 1);
    }

    #[test]
    fn test_is_anthropic_model() {
        assert!(is_anthropic_model("claude-sonnet-4-6"));
        assert!(is_anthropic_model("claude-3-opus-20240229"));
        assert!(!is_anthropic_model("gpt-4o"));
        assert!(!is_anthropic_model("gpt-4o-mini"));
    }

    #[test]
    fn test_classify_openai_context_length() {
        let body = r#"{"error":{"message":"This model's maximum context length is 4097 tokens.","type":"invalid_request_error","code":"context_length_exceeded"}}"#;
        assert!(matches!(classify_failure(400, body), GenerationError::RequestTooLarge));
    }

    #[test]
    fn test_classify_anthropic_prompt_too_long() {
        let body = r#"{"type":"error","error":{"type":"invalid_request_error","message":"prompt is too long: 250000 tokens > 200000 maximum"}}"#;
        assert!(matches!(classify_failure(400, body), GenerationError::RequestTooLarge));
        assert!(matches!(classify_failure(413, "payload too large"), GenerationError::RequestTooLarge));
    }

    #[test]
    fn test_classify_other_failures() {
        let body = r#"{"error":{"message":"Rate limit reached","type":"requests","code":"rate_limit_exceeded"}}"#;
        match classify_failure(429, body) {
            GenerationError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Rate limit reached");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            classify_failure(400, "bad request"),
            GenerationError::Api { status: 400, .. }
        ));
    }

    #[test]
    fn test_endpoint_or() {
        assert_eq!(endpoint_or(None, DEFAULT_OPENAI_ENDPOINT), "https://api.openai.com/v1");
        assert_eq!(endpoint_or(Some("http://localhost:9000/v1/"), DEFAULT_OPENAI_ENDPOINT), "http://localhost:9000/v1");
        assert_eq!(endpoint_or(Some("  "), DEFAULT_ANTHROPIC_ENDPOINT), "https://api.anthropic.com/v1");
    }

    #[test]
    fn test_extract_anthropic_text() {
        let json = serde_json::json!({
            "content": [
                {
                    "type": "text",
                    "text": "Here is the summary."
                }
            ]
        });
        assert_eq!(extract_anthropic_text(&json).unwrap(), "Here is the summary.");
    }

    #[test]
    fn test_extract_anthropic_text_empty() {
        let json = serde_json::json!({"content": []});
        assert!(matches!(
            extract_anthropic_text(&json),
            Err(GenerationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_extract_openai_text() {
        let json = serde_json::json!({
            "choices": [
                {
                    "message": {
                        "role": "assistant",
                        "content": "Summary of the video."
                    }
                }
            ]
        });
        assert_eq!(extract_openai_text(&json).unwrap(), "Summary of the video.");
    }

    #[test]
    fn test_extract_openai_text_empty() {
        let json = serde_json::json!({"choices": []});
        assert!(extract_openai_text(&json).is_err());
    }

    #[test]
    fn test_generator_for_requires_key() {
        let config = Config::default();
        let err = match generator_for(&config) {
            Ok(_) => panic!("expected missing key error"),
            Err(e) => e.to_string(),
        };
        assert!(err.contains("OpenAI API key is missing"));

        let config = Config {
            model: Some("claude-sonnet-4-6".to_string()),
            ..Config::default()
        };
        let err = match generator_for(&config) {
            Ok(_) => panic!("expected missing key error"),
            Err(e) => e.to_string(),
        };
        assert!(err.contains("Anthropic API key is missing"));
    }
}
