use std::path::PathBuf;

use reqwest::{multipart, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::state::{ChatTurn, ClassificationResult, ClassifyRequest, SelectedFile};

#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-2xx answer; `message` is the response body, or a generic text when it was empty.
    #[error("{message}")]
    Status { status: StatusCode, message: String },
    #[error("falha de conexão com o servidor: {0}")]
    Network(#[from] reqwest::Error),
    #[error("resposta inesperada do servidor: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("não foi possível ler {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    fn status(status: StatusCode, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("Erro na requisição ({})", status)
        } else {
            body.to_string()
        };
        ClientError::Status { status, message }
    }
}

#[derive(Serialize)]
struct ProcessTextRequest<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    history: &'a [ChatTurn],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    history: Option<Vec<ChatTurn>>,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn classify(&self, request: &ClassifyRequest) -> Result<ClassificationResult, ClientError> {
        match request {
            ClassifyRequest::Text(text) => self.process_text(text).await,
            ClassifyRequest::File(file) => self.upload_file(file).await,
        }
    }

    pub async fn process_text(&self, text: &str) -> Result<ClassificationResult, ClientError> {
        let url = format!("{}/process_text", self.base_url);
        info!(%url, chars = text.chars().count(), "submitting text for classification");

        let response = self
            .client
            .post(&url)
            .json(&ProcessTextRequest { text })
            .send()
            .await?;

        read_json(response).await
    }

    pub async fn upload_file(&self, file: &SelectedFile) -> Result<ClassificationResult, ClientError> {
        let url = format!("{}/upload_file", self.base_url);

        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|source| ClientError::File {
                path: file.path.clone(),
                source,
            })?;
        info!(%url, file = %file.name, bytes = bytes.len(), "uploading file for classification");

        let part = multipart::Part::bytes(bytes)
            .file_name(file.name.clone())
            .mime_str(file.mime_type())?;
        let form = multipart::Form::new().part("file", part);

        let response = self.client.post(&url).multipart(form).send().await?;

        read_json(response).await
    }

    /// Sends one chat turn. Returns the server's `history` field, `None` when absent.
    pub async fn chat(&self, message: &str, history: &[ChatTurn]) -> Result<Option<Vec<ChatTurn>>, ClientError> {
        let url = format!("{}/chat", self.base_url);
        info!(%url, turns = history.len(), "sending chat turn");

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message, history })
            .send()
            .await?;

        let chat_response: ChatResponse = read_json(response).await?;
        Ok(chat_response.history)
    }

    pub async fn health(&self) -> Result<String, ClientError> {
        let url = format!("{}/health", self.base_url);

        let response = self.client.get(&url).send().await?;

        let health: HealthResponse = read_json(response).await?;
        Ok(health.status)
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    debug!(%status, bytes = body.len(), "backend responded");

    if !status.is_success() {
        return Err(ClientError::status(status, &body));
    }

    Ok(serde_json::from_str(&body)?)
}
