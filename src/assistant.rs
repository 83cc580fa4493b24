use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AssistantConfig;
use crate::progress::{self, Kind};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("could not create a conversation thread: {0}")]
    ThreadCreation(String),
    #[error("could not post the question: {0}")]
    MessagePost(String),
    #[error("could not start the assistant run: {0}")]
    RunStart(String),
    #[error("unexpected run status response: {0}")]
    PollProtocol(String),
    #[error("assistant run ended as {status}: {detail}")]
    RunFailed { status: String, detail: String },
    #[error("run did not finish within {0} seconds")]
    PollTimeout(u64),
    #[error("the assistant returned no answer")]
    EmptyResponse,
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    assistant_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ObjectId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RunState {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    last_error: Option<RunError>,
}

#[derive(Debug, Deserialize)]
struct RunError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    role: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<TextContent>,
}

#[derive(Debug, Deserialize)]
struct TextContent {
    value: String,
}

pub struct AssistantClient {
    base_url: String,
    api_key: String,
    assistant_id: String,
    poll_interval: Duration,
    poll_timeout: Duration,
    client: reqwest::Client,
}

impl AssistantClient {
    pub fn new(config: &AssistantConfig, api_key: String) -> Self {
        AssistantClient {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            assistant_id: config.assistant_id.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
            client: reqwest::Client::new(),
        }
    }

    /// Ask the assistant one question and wait for the finished answer.
    ///
    /// Runs the whole remote workflow in order: create a fresh thread, post
    /// the question, start a run, poll the run to a terminal status, then pull
    /// the assistant's reply off the thread. Any failing step ends the query;
    /// nothing is retried.
    pub async fn submit_query(&self, user_text: &str) -> Result<String, QueryError> {
        let thread_id = self.create_thread().await?;
        self.post_message(&thread_id, user_text).await?;
        let run_id = self.start_run(&thread_id).await?;
        self.wait_for_run(&thread_id, &run_id).await?;
        self.fetch_answer(&thread_id).await
    }

    async fn create_thread(&self) -> Result<String, QueryError> {
        progress::log_with(Kind::Thread, "Creating conversation thread");
        let response = self
            .post("/threads")
            .json(&serde_json::json!({}))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(QueryError::ThreadCreation(error_body(response).await));
        }
        let thread: ObjectId = response.json().await?;
        Ok(thread.id)
    }

    async fn post_message(&self, thread_id: &str, user_text: &str) -> Result<(), QueryError> {
        progress::log_with(Kind::Message, "Posting question to the thread");
        let request = MessageRequest {
            role: "user",
            content: user_text,
        };
        let response = self
            .post(&format!("/threads/{}/messages", thread_id))
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(QueryError::MessagePost(error_body(response).await));
        }
        Ok(())
    }

    async fn start_run(&self, thread_id: &str) -> Result<String, QueryError> {
        progress::log_with(Kind::Run, "Starting assistant run");
        let request = RunRequest {
            assistant_id: &self.assistant_id,
        };
        let response = self
            .post(&format!("/threads/{}/runs", thread_id))
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(QueryError::RunStart(error_body(response).await));
        }
        let run: ObjectId = response.json().await?;
        Ok(run.id)
    }

    async fn wait_for_run(&self, thread_id: &str, run_id: &str) -> Result<(), QueryError> {
        let started = Instant::now();
        loop {
            let response = self
                .get(&format!("/threads/{}/runs/{}", thread_id, run_id))
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(QueryError::PollProtocol(error_body(response).await));
            }
            let run: RunState = response.json().await?;

            let status = match run.status {
                Some(status) if !status.is_empty() => status,
                _ => return Err(QueryError::PollProtocol("status field missing".to_string())),
            };

            match status.as_str() {
                "completed" => {
                    progress::log_with(Kind::Poll, "Run completed");
                    return Ok(());
                }
                "failed" | "cancelled" | "expired" => {
                    let detail = run
                        .last_error
                        .map(|e| e.message)
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| "no detail from service".to_string());
                    return Err(QueryError::RunFailed { status, detail });
                }
                // Everything else (queued, in_progress, and whatever states
                // the service adds later) keeps the poll going.
                other => {
                    progress::log_with(
                        Kind::Poll,
                        format!("Run {} ({}s elapsed)", other, started.elapsed().as_secs()),
                    );
                }
            }

            if started.elapsed() >= self.poll_timeout {
                return Err(QueryError::PollTimeout(self.poll_timeout.as_secs()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn fetch_answer(&self, thread_id: &str) -> Result<String, QueryError> {
        progress::log_with(Kind::Fetch, "Fetching the assistant's answer");
        let response = self
            .get(&format!("/threads/{}/messages", thread_id))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(QueryError::EmptyResponse);
        }
        let list: MessageList = response.json().await?;

        list.data
            .iter()
            .find(|message| message.role == "assistant")
            .and_then(|message| message.content.iter().find(|part| part.kind == "text"))
            .and_then(|part| part.text.as_ref())
            .map(|text| text.value.clone())
            .filter(|value| !value.is_empty())
            .ok_or(QueryError::EmptyResponse)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }
}

async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("{} {}", status, body)
}
