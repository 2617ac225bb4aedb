use axum::extract::Multipart;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::repo::User,
    error::{ApiError, ApiResult},
    uploads::UploadedFile,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Raw fields of the multipart signup form, before validation.
#[derive(Debug, Default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<UploadedFile>,
}

/// Validated signup input.
#[derive(Debug)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<UploadedFile>,
}

impl SignupForm {
    /// Drains the multipart stream into the known fields; unknown fields are
    /// skipped, and only the first avatar file is honored.
    pub async fn from_multipart(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = SignupForm::default();
        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = field.name().map(|s| s.to_string());
            match name.as_deref() {
                Some("name") => form.name = field.text().await.map_err(malformed)?,
                Some("email") => form.email = field.text().await.map_err(malformed)?,
                Some("password") => form.password = field.text().await.map_err(malformed)?,
                Some("img") if form.avatar.is_none() => {
                    let file_name = field.file_name().map(|s| s.to_string()).unwrap_or_default();
                    let body = field.bytes().await.map_err(malformed)?;
                    // Browsers send an empty part when no file was picked.
                    if !body.is_empty() {
                        form.avatar = Some(UploadedFile { file_name, body });
                    }
                }
                _ => {}
            }
        }
        Ok(form)
    }

    /// Normalizes the text fields and checks them, yielding the typed request.
    pub fn validate(mut self) -> ApiResult<SignupRequest> {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        if self.name.is_empty() || self.email.is_empty() || self.password.is_empty() {
            return Err(ApiError::Validation(
                "Missing name, email or password".into(),
            ));
        }
        if !is_valid_email(&self.email) {
            return Err(ApiError::Validation("Invalid email".into()));
        }
        Ok(SignupRequest {
            name: self.name,
            email: self.email,
            password: self.password,
            avatar: self.avatar,
        })
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&mut self) -> ApiResult<()> {
        self.email = self.email.trim().to_lowercase();
        if self.email.is_empty() || self.password.is_empty() {
            return Err(ApiError::Validation("Missing email or password".into()));
        }
        if !is_valid_email(&self.email) {
            return Err(ApiError::Validation("Invalid email".into()));
        }
        Ok(())
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(rename = "img")]
    pub avatar: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            avatar: user.avatar,
        }
    }
}

/// Response returned after signup or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: PublicUser,
}

fn malformed(_: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::Validation("Invalid form data".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::FromRequest,
        http::{header, Request},
    };
    use time::OffsetDateTime;

    const BOUNDARY: &str = "test-boundary";

    fn form_body(parts: &[(&str, Option<&str>, &str)]) -> String {
        let mut body = String::new();
        for (name, filename, value) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match filename {
                Some(f) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    async fn multipart_from(parts: &[(&str, Option<&str>, &str)]) -> Multipart {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(form_body(parts)))
            .expect("request");
        Multipart::from_request(request, &())
            .await
            .expect("multipart")
    }

    #[tokio::test]
    async fn signup_form_collects_the_known_fields() {
        let multipart = multipart_from(&[
            ("name", None, "Ada"),
            ("email", None, "ada@example.com"),
            ("password", None, "pw123"),
            ("img", Some("selfie.png"), "pngbytes"),
            ("extra", None, "ignored"),
        ])
        .await;

        let request = SignupForm::from_multipart(multipart)
            .await
            .expect("parse")
            .validate()
            .expect("validate");

        assert_eq!(request.name, "Ada");
        assert_eq!(request.email, "ada@example.com");
        assert_eq!(request.password, "pw123");
        let avatar = request.avatar.expect("avatar");
        assert_eq!(avatar.file_name, "selfie.png");
        assert_eq!(avatar.body.as_ref(), b"pngbytes");
    }

    #[tokio::test]
    async fn signup_form_ignores_an_empty_avatar_part() {
        let multipart = multipart_from(&[
            ("name", None, "Ada"),
            ("email", None, "ada@example.com"),
            ("password", None, "pw123"),
            ("img", Some(""), ""),
        ])
        .await;

        let form = SignupForm::from_multipart(multipart).await.expect("parse");
        assert!(form.avatar.is_none());
    }

    #[tokio::test]
    async fn signup_form_honors_only_the_first_avatar() {
        let multipart = multipart_from(&[
            ("name", None, "Ada"),
            ("email", None, "ada@example.com"),
            ("password", None, "pw123"),
            ("img", Some("first.png"), "one"),
            ("img", Some("second.png"), "two"),
        ])
        .await;

        let form = SignupForm::from_multipart(multipart).await.expect("parse");
        assert_eq!(form.avatar.expect("avatar").file_name, "first.png");
    }

    #[test]
    fn signup_validation_requires_all_text_fields() {
        let form = SignupForm {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: String::new(),
            avatar: None,
        };
        let err = form.validate().unwrap_err();
        assert_eq!(err.to_string(), "Missing name, email or password");
    }

    #[test]
    fn signup_validation_normalizes_the_email() {
        let form = SignupForm {
            name: "  Ada  ".into(),
            email: "  Ada@EXAMPLE.com  ".into(),
            password: "pw123".into(),
            avatar: None,
        };
        let request = form.validate().expect("validate");
        assert_eq!(request.name, "Ada");
        assert_eq!(request.email, "ada@example.com");
    }

    #[test]
    fn signup_validation_rejects_a_malformed_email() {
        let form = SignupForm {
            name: "Ada".into(),
            email: "not-an-email".into(),
            password: "pw123".into(),
            avatar: None,
        };
        let err = form.validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid email");
    }

    #[test]
    fn login_validation_requires_both_fields() {
        let mut payload = LoginRequest {
            email: "ada@example.com".into(),
            password: String::new(),
        };
        let err = payload.validate().unwrap_err();
        assert_eq!(err.to_string(), "Missing email or password");
    }

    #[test]
    fn login_validation_normalizes_the_email() {
        let mut payload = LoginRequest {
            email: " Ada@Example.COM ".into(),
            password: "pw123".into(),
        };
        payload.validate().expect("validate");
        assert_eq!(payload.email, "ada@example.com");
    }

    #[test]
    fn public_user_uses_the_wire_field_names() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            avatar: "1716000000000-42.png".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(PublicUser::from(user)).expect("serialize");
        assert_eq!(json["img"], "1716000000000-42.png");
        assert!(json.get("avatar").is_none());
        assert!(json.get("password_hash").is_none());
    }
}
