use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::Settings;
use crate::core::metrics;
use crate::db::types::QuestionKind;
use crate::schemas::exam::GenerationRequest;
use crate::schemas::question::{GeneratedQuestion, GroupedQuestions};

const MAX_ATTEMPTS: u32 = 4;

const GENERATION_SYSTEM_PROMPT: &str = r#"You are an experienced teacher who writes exam questions.
Write exactly the requested number of questions of each kind, in the language of the subject.

Question kinds:
- multiple_choice: "options" holds 2 to 5 answer strings, "correct_option_index" is the 0-based index of the right one
- true_false: "correct_answer" is true or false
- open_analysis: an open question asking the student to analyse or explain; "expected_answer" sketches a good answer
- open_exercise: an open exercise to solve; "expected_answer" holds the worked result

Response format (strict JSON):
{
  "questions": [
    {
      "kind": "multiple_choice | true_false | open_analysis | open_exercise",
      "text": "question text",
      "options": ["..."],
      "correct_option_index": 0,
      "correct_answer": true,
      "expected_answer": "..."
    }
  ]
}
"#;

#[derive(Debug, Error)]
pub(crate) enum GenerationError {
    #[error("Question generation is not configured")]
    NotConfigured,
    #[error("Question generation failed: {0}")]
    Upstream(String),
    #[error("Question generation returned an unexpected payload: {0}")]
    Malformed(String),
}

/// External collaborator that writes questions for a generation request.
#[async_trait]
pub(crate) trait QuestionGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<GeneratedQuestion>, GenerationError>;
}

/// Buckets a flat list by kind, keeping the relative order inside each bucket.
pub(crate) fn group_by_kind(questions: Vec<GeneratedQuestion>) -> GroupedQuestions {
    let mut grouped = GroupedQuestions::default();
    for question in questions {
        grouped.bucket_mut(question.kind).push(question);
    }
    grouped
}

#[derive(Debug, Clone)]
pub(crate) struct OpenAiQuestionGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl OpenAiQuestionGenerator {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(settings.ai().ai_request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.ai().openai_api_key.clone(),
            base_url: settings.ai().openai_base_url.trim_end_matches('/').to_string(),
            model: settings.ai().ai_model.clone(),
            max_tokens: settings.ai().ai_max_tokens,
            temperature: settings.ai().ai_temperature,
        })
    }

    async fn call(&self, payload: &Value) -> Result<Value, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error = String::new();

        for attempt in 0..MAX_ATTEMPTS {
            let response =
                self.client.post(&url).bearer_auth(&self.api_key).json(payload).send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let body: Value = resp.json().await.unwrap_or(Value::Null);
                    if status.is_success() {
                        return Ok(body);
                    }
                    last_error = format!("upstream status {status}: {body}");
                    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
                        break;
                    }
                }
                Err(err) => {
                    last_error = err.to_string();
                }
            }

            if attempt + 1 < MAX_ATTEMPTS {
                tracing::warn!(attempt, error = %last_error, "Retrying question generation");
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt))).await;
            }
        }

        Err(GenerationError::Upstream(last_error))
    }
}

#[async_trait]
impl QuestionGenerator for OpenAiQuestionGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<GeneratedQuestion>, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::NotConfigured);
        }

        let timer = Instant::now();
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": GENERATION_SYSTEM_PROMPT},
                {"role": "user", "content": build_prompt(request)}
            ],
            "max_completion_tokens": self.max_tokens,
            "temperature": self.temperature,
            "response_format": {"type": "json_object"}
        });

        tracing::info!(
            subject = %request.subject,
            total_questions = request.total_questions,
            "Sending question generation request"
        );

        let body = match self.call(&payload).await {
            Ok(body) => body,
            Err(err) => {
                metrics::record_generation_failure();
                return Err(err);
            }
        };

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|value| value.as_str())
            .ok_or_else(|| {
                metrics::record_generation_failure();
                GenerationError::Malformed("missing message content".to_string())
            })?;

        let questions = parse_questions(content).inspect_err(|_| {
            metrics::record_generation_failure();
        })?;

        let tokens_used = body
            .get("usage")
            .and_then(|usage| usage.get("total_tokens"))
            .and_then(|value| value.as_u64());
        tracing::info!(
            duration_seconds = timer.elapsed().as_secs_f64(),
            tokens_used = tokens_used,
            generated = questions.len(),
            "Question generation completed"
        );

        Ok(questions)
    }
}

fn build_prompt(request: &GenerationRequest) -> String {
    let counts = QuestionKind::ALL
        .iter()
        .map(|kind| format!("- {}: {}", kind.as_str(), request.distribution.count(*kind)))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!(
        "Subject: {}\nDifficulty: {}\nTotal questions: {}\nQuestions per kind:\n{}\n",
        request.subject,
        request.difficulty.as_str(),
        request.total_questions,
        counts
    );

    if let Some(reference) = request.reference.as_deref().filter(|value| !value.trim().is_empty())
    {
        prompt.push_str("\nReference material to base the questions on:\n");
        prompt.push_str(reference.trim());
        prompt.push('\n');
    }

    prompt
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GeneratedEnvelope {
    Wrapped { questions: Vec<GeneratedQuestion> },
    Bare(Vec<GeneratedQuestion>),
}

fn parse_questions(content: &str) -> Result<Vec<GeneratedQuestion>, GenerationError> {
    match serde_json::from_str::<GeneratedEnvelope>(content) {
        Ok(GeneratedEnvelope::Wrapped { questions }) | Ok(GeneratedEnvelope::Bare(questions)) => {
            Ok(questions)
        }
        Err(err) => Err(GenerationError::Malformed(err.to_string())),
    }
}
