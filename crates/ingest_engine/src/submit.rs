use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use crate::wire::{ErrorBody, IngestResponse};
use crate::{FailureKind, IngestPayload, SubmitError, SubmitSuccess};

#[derive(Debug, Clone)]
pub struct SubmitSettings {
    pub base_url: String,
    pub upload_path: String,
    pub connect_timeout: Duration,
    /// Transcription of long media is slow; keep this generous.
    pub request_timeout: Duration,
    pub max_response_bytes: u64,
}

impl Default for SubmitSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            upload_path: "/documents/upload".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(600),
            max_response_bytes: 4 * 1024 * 1024,
        }
    }
}

#[async_trait::async_trait]
pub trait Submitter: Send + Sync {
    /// Uploads `payload` and waits for the terminal response.
    ///
    /// Resolves to [`FailureKind::Aborted`] as soon as `token` is cancelled.
    async fn submit(
        &self,
        payload: &IngestPayload,
        token: &CancellationToken,
    ) -> Result<SubmitSuccess, SubmitError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestSubmitter {
    settings: SubmitSettings,
}

impl ReqwestSubmitter {
    pub fn new(settings: SubmitSettings) -> Self {
        Self { settings }
    }

    fn endpoint(&self) -> Result<reqwest::Url, SubmitError> {
        let base = reqwest::Url::parse(&self.settings.base_url)
            .map_err(|err| SubmitError::new(FailureKind::InvalidUrl, err.to_string()))?;
        base.join(&self.settings.upload_path)
            .map_err(|err| SubmitError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    fn build_client(&self) -> Result<reqwest::Client, SubmitError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| SubmitError::new(FailureKind::Network, err.to_string()))
    }

    async fn send(&self, payload: &IngestPayload) -> Result<SubmitSuccess, SubmitError> {
        let url = self.endpoint()?;
        let (form, payload_bytes) = build_form(payload).await?;
        let client = self.build_client()?;

        engine_debug!("POST {} ({} bytes)", url, payload_bytes);
        let response = client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = read_body(response, self.settings.max_response_bytes).await?;

        if !status.is_success() {
            let raw = serde_json::from_slice::<Value>(&body).ok();
            let detail = raw
                .clone()
                .and_then(|value| serde_json::from_value::<ErrorBody>(value).ok())
                .map(|error| error.message())
                .unwrap_or_else(|| status.to_string());
            engine_warn!("ingestion rejected with {}: {}", status, detail);
            return Err(SubmitError::new(
                FailureKind::Backend {
                    status: status.as_u16(),
                },
                detail,
            )
            .with_raw(raw));
        }

        let raw: Value = serde_json::from_slice(&body)
            .map_err(|err| SubmitError::new(FailureKind::MalformedResponse, err.to_string()))?;
        let parsed: IngestResponse = serde_json::from_value(raw.clone()).map_err(|err| {
            SubmitError::new(FailureKind::MalformedResponse, err.to_string())
                .with_raw(Some(raw.clone()))
        })?;

        Ok(SubmitSuccess {
            body: parsed,
            raw,
            payload_bytes,
        })
    }
}

#[async_trait::async_trait]
impl Submitter for ReqwestSubmitter {
    async fn submit(
        &self,
        payload: &IngestPayload,
        token: &CancellationToken,
    ) -> Result<SubmitSuccess, SubmitError> {
        if token.is_cancelled() {
            return Err(SubmitError::aborted());
        }
        // Dropping the request future on cancellation closes the connection.
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                engine_info!("upload of {:?} aborted", payload.file);
                Err(SubmitError::aborted())
            }
            result = self.send(payload) => result,
        }
    }
}

/// Streams the file from disk instead of buffering it.
async fn build_form(payload: &IngestPayload) -> Result<(Form, u64), SubmitError> {
    let unreadable = |err: std::io::Error| {
        SubmitError::new(
            FailureKind::UnreadableFile,
            format!("{}: {}", payload.file.display(), err),
        )
    };
    let file = tokio::fs::File::open(&payload.file)
        .await
        .map_err(unreadable)?;
    let metadata = file.metadata().await.map_err(unreadable)?;
    if !metadata.is_file() {
        return Err(SubmitError::new(
            FailureKind::UnreadableFile,
            format!("{} is not a regular file", payload.file.display()),
        ));
    }
    let length = metadata.len();

    let file_name = payload
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
    let part = Part::stream_with_length(body, length).file_name(file_name);

    let mut form = Form::new().part("file", part);
    if let Some(title) = &payload.title {
        form = form.text("title", title.clone());
    }
    if !payload.tags.is_empty() {
        form = form.text("tags", payload.tags.join(","));
    }
    if let Some(language) = &payload.language {
        form = form.text("language", language.clone());
    }
    Ok((form, length))
}

async fn read_body(response: reqwest::Response, max_bytes: u64) -> Result<Vec<u8>, SubmitError> {
    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        let next_len = bytes.len() as u64 + chunk.len() as u64;
        if next_len > max_bytes {
            return Err(SubmitError::new(
                FailureKind::MalformedResponse,
                format!("response exceeded {max_bytes} bytes"),
            ));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

fn map_reqwest_error(err: reqwest::Error) -> SubmitError {
    if err.is_timeout() {
        return SubmitError::new(FailureKind::Timeout, err.to_string());
    }
    SubmitError::new(FailureKind::Network, err.to_string())
}
