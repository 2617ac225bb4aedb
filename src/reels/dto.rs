use axum::extract::Multipart;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    reels::repo::Reel,
    uploads::UploadedFile,
};

/// Raw fields of the multipart reel form, before validation.
#[derive(Debug, Default)]
pub struct ReelForm {
    pub description: String,
    pub file: Option<UploadedFile>,
}

/// Validated reel input: a non-empty description plus the video file.
#[derive(Debug)]
pub struct ReelRequest {
    pub description: String,
    pub file: UploadedFile,
}

impl ReelForm {
    /// Drains the multipart stream; only the first file field is honored.
    pub async fn from_multipart(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = ReelForm::default();
        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = field.name().map(|s| s.to_string());
            match name.as_deref() {
                Some("des") => form.description = field.text().await.map_err(malformed)?,
                Some("file") if form.file.is_none() => {
                    let file_name = field.file_name().map(|s| s.to_string()).unwrap_or_default();
                    let body = field.bytes().await.map_err(malformed)?;
                    if !body.is_empty() {
                        form.file = Some(UploadedFile { file_name, body });
                    }
                }
                _ => {}
            }
        }
        Ok(form)
    }

    pub fn validate(mut self) -> ApiResult<ReelRequest> {
        self.description = self.description.trim().to_string();
        match self.file.take() {
            Some(file) if !self.description.is_empty() => Ok(ReelRequest {
                description: self.description,
                file,
            }),
            _ => Err(ApiError::Validation("Missing file or description".into())),
        }
    }
}

/// One reel on the wire.
#[derive(Debug, Serialize)]
pub struct ReelResponse {
    pub id: Uuid,
    #[serde(rename = "des")]
    pub description: String,
    #[serde(rename = "file")]
    pub file_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Reel> for ReelResponse {
    fn from(reel: Reel) -> Self {
        Self {
            id: reel.id,
            description: reel.description,
            file_name: reel.file_name,
            created_at: reel.created_at,
        }
    }
}

/// Response returned after posting a reel.
#[derive(Debug, Serialize)]
pub struct ReelCreated {
    pub message: String,
    pub reel: ReelResponse,
}

fn malformed(_: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::Validation("Invalid form data".into())
}
