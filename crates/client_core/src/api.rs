use std::{collections::HashMap, io, sync::Arc};

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{
        ComplaintPayload, OtpResponse, OtpSendRequest, OtpVerifyRequest, SubmitResponse,
        ATTACHMENTS_PART, DATA_PART, OTP_SEND_ROUTE, OTP_VERIFY_ROUTE, SUBMIT_ROUTE,
    },
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    files::{Attachment, AttachmentSource},
    identifiers::{self, EntropyError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuedBy {
    Server,
    Local,
}

/// Identifier and secret handed back for a filed complaint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub complaint_id: String,
    pub secret: String,
    pub issued_by: IssuedBy,
}

#[derive(Debug, Error)]
pub enum ApiFailure {
    #[error("{0}")]
    Rejected(String),
    #[error("network error: {0}")]
    Transport(String),
    #[error("server accepted the request but did not return {0}")]
    Incomplete(&'static str),
    #[error("failed to read attachment '{name}': {source}")]
    Attachment { name: String, source: io::Error },
    #[error("complaint service is unavailable")]
    Unavailable,
    #[error("could not issue local identifiers: {0}")]
    LocalIssue(#[from] EntropyError),
}

impl ApiFailure {
    pub fn to_api_error(&self) -> ApiError {
        let code = match self {
            ApiFailure::Rejected(_) => ErrorCode::Rejected,
            ApiFailure::Attachment { .. } => ErrorCode::FilePolicy,
            ApiFailure::Transport(_) | ApiFailure::Unavailable => ErrorCode::Transport,
            ApiFailure::Incomplete(_) | ApiFailure::LocalIssue(_) => ErrorCode::Internal,
        };
        ApiError::new(code, self.to_string())
    }
}

impl From<reqwest::Error> for ApiFailure {
    fn from(err: reqwest::Error) -> Self {
        ApiFailure::Transport(err.to_string())
    }
}

/// Remote side of the portal: complaint intake and phone verification.
#[async_trait]
pub trait ComplaintApi: Send + Sync {
    async fn submit(
        &self,
        payload: &ComplaintPayload,
        attachments: &[Attachment],
    ) -> Result<SubmissionResult, ApiFailure>;
    async fn send_otp(&self, phone: &str) -> Result<(), ApiFailure>;
    async fn verify_otp(&self, phone: &str, otp: &str) -> Result<(), ApiFailure>;
}

pub struct MissingComplaintApi;

#[async_trait]
impl ComplaintApi for MissingComplaintApi {
    async fn submit(
        &self,
        _payload: &ComplaintPayload,
        _attachments: &[Attachment],
    ) -> Result<SubmissionResult, ApiFailure> {
        Err(ApiFailure::Unavailable)
    }

    async fn send_otp(&self, _phone: &str) -> Result<(), ApiFailure> {
        Err(ApiFailure::Unavailable)
    }

    async fn verify_otp(&self, _phone: &str, _otp: &str) -> Result<(), ApiFailure> {
        Err(ApiFailure::Unavailable)
    }
}

pub struct HttpComplaintApi {
    http: Client,
    settings: Arc<Settings>,
}

impl HttpComplaintApi {
    pub fn new(settings: Arc<Settings>) -> Result<Self, ApiFailure> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self { http, settings })
    }

    async fn attachment_part(attachment: &Attachment) -> Result<Part, ApiFailure> {
        let bytes = match &attachment.source {
            AttachmentSource::Memory(bytes) => bytes.clone(),
            AttachmentSource::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|source| ApiFailure::Attachment {
                        name: attachment.name().to_string(),
                        source,
                    })?
            }
        };
        let part = Part::bytes(bytes)
            .file_name(attachment.name().to_string())
            .mime_str(&attachment.descriptor.mime_type)?;
        Ok(part)
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiFailure> {
    let status = response.status();
    match response.json::<T>().await {
        Ok(body) => Ok(body),
        Err(_) if !status.is_success() => {
            Err(ApiFailure::Transport(format!("server returned {status}")))
        }
        Err(err) => Err(ApiFailure::Transport(format!(
            "invalid response body: {err}"
        ))),
    }
}

#[async_trait]
impl ComplaintApi for HttpComplaintApi {
    async fn submit(
        &self,
        payload: &ComplaintPayload,
        attachments: &[Attachment],
    ) -> Result<SubmissionResult, ApiFailure> {
        let data = serde_json::to_string(payload)
            .map_err(|err| ApiFailure::Transport(format!("failed to encode complaint: {err}")))?;
        let mut form = Form::new().text(DATA_PART, data);
        for attachment in attachments {
            form = form.part(ATTACHMENTS_PART, Self::attachment_part(attachment).await?);
        }

        let url = self.settings.endpoint(SUBMIT_ROUTE);
        info!(%url, attachments = attachments.len(), "submitting complaint");
        let response = self.http.post(&url).multipart(form).send().await?;
        let body: SubmitResponse = read_json(response).await?;

        if !body.success {
            let message = body
                .message
                .unwrap_or_else(|| "Failed to submit complaint".to_string());
            warn!(%message, "complaint rejected by server");
            return Err(ApiFailure::Rejected(message));
        }

        let complaint_id = body.complaint_id.ok_or(ApiFailure::Incomplete("a complaint id"))?;
        let secret = body.pin.ok_or(ApiFailure::Incomplete("a pin"))?;
        info!(%complaint_id, "complaint accepted");
        Ok(SubmissionResult {
            complaint_id,
            secret,
            issued_by: IssuedBy::Server,
        })
    }

    async fn send_otp(&self, phone: &str) -> Result<(), ApiFailure> {
        let response = self
            .http
            .post(self.settings.endpoint(OTP_SEND_ROUTE))
            .json(&OtpSendRequest {
                phone: phone.to_string(),
            })
            .send()
            .await?;
        let body: OtpResponse = read_json(response).await?;
        if body.success {
            debug!("otp sent");
            Ok(())
        } else {
            Err(ApiFailure::Rejected(
                body.message
                    .unwrap_or_else(|| "Failed to send OTP".to_string()),
            ))
        }
    }

    async fn verify_otp(&self, phone: &str, otp: &str) -> Result<(), ApiFailure> {
        let response = self
            .http
            .post(self.settings.endpoint(OTP_VERIFY_ROUTE))
            .json(&OtpVerifyRequest {
                phone: phone.to_string(),
                otp: otp.to_string(),
            })
            .send()
            .await?;
        let body: OtpResponse = read_json(response).await?;
        if body.success {
            Ok(())
        } else {
            Err(ApiFailure::Rejected(
                body.message.unwrap_or_else(|| "Invalid OTP".to_string()),
            ))
        }
    }
}

/// Shape of the secret handed out with a locally issued complaint ID.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocalSecret {
    /// Six-digit PIN.
    #[default]
    Pin,
    /// `XXXX-XXXX-XXXX` access key.
    AccessKey,
}

/// Stand-in used when no complaint service is reachable.
///
/// Identifiers are issued locally and OTP "delivery" only goes to the log. Nothing produced
/// here may be trusted for anything security-relevant.
#[derive(Default)]
pub struct OfflineComplaintApi {
    secret: LocalSecret,
    issued_otps: Mutex<HashMap<String, String>>,
}

impl OfflineComplaintApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(secret: LocalSecret) -> Self {
        Self {
            secret,
            ..Self::default()
        }
    }

    /// Code most recently "sent" to `phone`.
    pub async fn pending_otp(&self, phone: &str) -> Option<String> {
        self.issued_otps.lock().await.get(phone).cloned()
    }
}

#[async_trait]
impl ComplaintApi for OfflineComplaintApi {
    async fn submit(
        &self,
        _payload: &ComplaintPayload,
        attachments: &[Attachment],
    ) -> Result<SubmissionResult, ApiFailure> {
        let result = SubmissionResult {
            complaint_id: identifiers::local_complaint_id()?,
            secret: match self.secret {
                LocalSecret::Pin => identifiers::local_pin()?,
                LocalSecret::AccessKey => identifiers::local_access_key()?,
            },
            issued_by: IssuedBy::Local,
        };
        warn!(
            complaint_id = %result.complaint_id,
            attachments = attachments.len(),
            "offline mode: complaint identifiers issued locally"
        );
        Ok(result)
    }

    async fn send_otp(&self, phone: &str) -> Result<(), ApiFailure> {
        let code = identifiers::local_pin()?;
        info!(%phone, %code, "offline mode: simulated SMS verification code");
        self.issued_otps
            .lock()
            .await
            .insert(phone.to_string(), code);
        Ok(())
    }

    async fn verify_otp(&self, phone: &str, otp: &str) -> Result<(), ApiFailure> {
        let mut issued = self.issued_otps.lock().await;
        match issued.get(phone) {
            Some(code) if code == otp => {
                issued.remove(phone);
                Ok(())
            }
            Some(_) => Err(ApiFailure::Rejected("Invalid OTP".to_string())),
            None => Err(ApiFailure::Rejected(
                "No OTP has been sent to this number".to_string(),
            )),
        }
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
