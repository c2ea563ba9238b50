//! HTTP client for the remote face registration/recognition service.
//!
//! Both endpoints take a multipart body and answer JSON on success or a
//! non-2xx status on failure. Every error is folded into a failed
//! [`FacialAuthResponse`]; nothing is retried.

use crate::image_ref::ImageRef;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use rostro_core::FacialAuthResponse;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

pub const REGISTER_ENDPOINT: &str = "register";
pub const RECOGNIZE_ENDPOINT: &str = "recognize";

const IMAGE_FIELD: &str = "image";
const IMAGE_FILE_NAME: &str = "face.jpg";
const IMAGE_MIME: &str = "image/jpeg";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid image reference: {0}")]
    InvalidImageRef(String),
    #[error("failed to read image {}: {source}", .path.display())]
    ImageRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid base URL: {0}")]
    BaseUrl(String),
    /// Non-2xx answer, shown as `Error <code>: <reason>`, or `Error <code>`
    /// when the code has no standard reason phrase.
    #[error("Error {status}{}", .reason.map(|r| format!(": {r}")).unwrap_or_default())]
    Status {
        status: u16,
        reason: Option<&'static str>,
    },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct FacialAuthClient {
    http: reqwest::Client,
    base: Url,
}

impl FacialAuthClient {
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(http: reqwest::Client, base: Url) -> Self {
        Self { http, base }
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve `{base}/{name}`, keeping any path prefix on the base URL.
    pub fn endpoint(&self, name: &str) -> Result<Url, AuthError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| AuthError::BaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }

    /// Register the face in `image` under the given CUIL.
    pub async fn register_with_face(&self, cuil: &str, image: &ImageRef) -> FacialAuthResponse {
        normalize("register", self.try_register(cuil, image).await)
    }

    /// Identify the face in `image`.
    pub async fn login_with_face(&self, image: &ImageRef) -> FacialAuthResponse {
        normalize("recognize", self.try_login(image).await)
    }

    async fn try_register(&self, cuil: &str, image: &ImageRef) -> Result<FacialAuthResponse, AuthError> {
        let form = Form::new()
            .text("cuil", cuil.to_string())
            .part(IMAGE_FIELD, image_part(image).await?);
        self.submit(REGISTER_ENDPOINT, form).await
    }

    async fn try_login(&self, image: &ImageRef) -> Result<FacialAuthResponse, AuthError> {
        let form = Form::new().part(IMAGE_FIELD, image_part(image).await?);
        self.submit(RECOGNIZE_ENDPOINT, form).await
    }

    async fn submit(&self, endpoint: &str, form: Form) -> Result<FacialAuthResponse, AuthError> {
        let url = self.endpoint(endpoint)?;
        tracing::info!(url = %url, "uploading face image");

        let response = self
            .http
            .post(url)
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason(),
            });
        }

        let body = response.bytes().await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        Ok(FacialAuthResponse::from_success_body(value)?)
    }
}

async fn image_part(image: &ImageRef) -> Result<Part, AuthError> {
    let bytes = image.read().await?;
    Ok(Part::bytes(bytes)
        .file_name(IMAGE_FILE_NAME)
        .mime_str(IMAGE_MIME)?)
}

fn normalize(op: &'static str, result: Result<FacialAuthResponse, AuthError>) -> FacialAuthResponse {
    match result {
        Ok(response) => {
            tracing::info!(op, success = response.success, "facial auth completed");
            response
        }
        Err(e) => {
            tracing::error!(op, error = %e, "facial auth failed");
            FacialAuthResponse::failure(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const JPEG: [u8; 6] = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

    fn photo(dir: &tempfile::TempDir) -> ImageRef {
        let path = dir.path().join("face.jpg");
        std::fs::write(&path, JPEG).unwrap();
        ImageRef::from(path)
    }

    fn client(server: &MockServer) -> FacialAuthClient {
        FacialAuthClient::new(Url::parse(&server.base_url()).unwrap())
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let c = FacialAuthClient::new(Url::parse("http://faces.local/api/v1/").unwrap());
        assert_eq!(
            c.endpoint(REGISTER_ENDPOINT).unwrap().as_str(),
            "http://faces.local/api/v1/register"
        );

        let c = FacialAuthClient::new(Url::parse("http://faces.local/api").unwrap());
        assert_eq!(
            c.endpoint(RECOGNIZE_ENDPOINT).unwrap().as_str(),
            "http://faces.local/api/recognize"
        );
    }

    #[test]
    fn test_endpoint_rejects_non_base_url() {
        let c = FacialAuthClient::new(Url::parse("mailto:faces@example.com").unwrap());
        assert!(matches!(c.endpoint(REGISTER_ENDPOINT), Err(AuthError::BaseUrl(_))));
    }

    #[tokio::test]
    async fn test_register_success_merges_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/register").header_exists("content-type");
                then.status(200)
                    .json_body(json!({"cuil": "20-12345678-3", "message": "registered"}));
            })
            .await;
        let dir = tempfile::tempdir().unwrap();

        let resp = client(&server)
            .register_with_face("20-12345678-3", &photo(&dir))
            .await;

        mock.assert_async().await;
        assert!(resp.success);
        assert_eq!(resp.cuil.as_deref(), Some("20-12345678-3"));
        assert_eq!(resp.message.as_deref(), Some("registered"));
    }

    #[tokio::test]
    async fn test_register_server_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/register");
                then.status(500);
            })
            .await;
        let dir = tempfile::tempdir().unwrap();

        let resp = client(&server)
            .register_with_face("20-12345678-3", &photo(&dir))
            .await;

        assert_eq!(resp, FacialAuthResponse::failure("Error 500: Internal Server Error"));
    }

    #[tokio::test]
    async fn test_nonstandard_status_has_no_reason_suffix() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/recognize");
                then.status(599);
            })
            .await;
        let dir = tempfile::tempdir().unwrap();

        let resp = client(&server).login_with_face(&photo(&dir)).await;
        assert_eq!(resp, FacialAuthResponse::failure("Error 599"));
    }

    #[tokio::test]
    async fn test_login_success_returns_subject() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/recognize");
                then.status(200).json_body(json!({"cuil": "27-87654321-4"}));
            })
            .await;
        let dir = tempfile::tempdir().unwrap();

        let resp = client(&server).login_with_face(&photo(&dir)).await;

        mock.assert_async().await;
        assert!(resp.success);
        assert_eq!(resp.cuil.as_deref(), Some("27-87654321-4"));
    }

    #[tokio::test]
    async fn test_login_unauthorized() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/recognize");
                then.status(401);
            })
            .await;
        let dir = tempfile::tempdir().unwrap();

        let resp = client(&server).login_with_face(&photo(&dir)).await;
        assert!(!resp.success);
        assert_eq!(resp.message.as_deref(), Some("Error 401: Unauthorized"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/recognize");
                then.status(200).body("<html>ok</html>");
            })
            .await;
        let dir = tempfile::tempdir().unwrap();

        let resp = client(&server).login_with_face(&photo(&dir)).await;
        assert!(!resp.success);
        assert!(resp
            .message
            .unwrap()
            .starts_with("invalid response body"));
    }

    #[tokio::test]
    async fn test_missing_image_is_a_failure() {
        let server = MockServer::start_async().await;
        let image = ImageRef::parse("/nonexistent/rostro/face.jpg").unwrap();

        let resp = client(&server).login_with_face(&image).await;
        assert!(!resp.success);
        assert!(resp.message.unwrap().starts_with("failed to read image"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let c = FacialAuthClient::new(Url::parse("http://127.0.0.1:1").unwrap());

        let resp = c.register_with_face("20-12345678-3", &photo(&dir)).await;
        assert!(!resp.success);
        assert!(resp.message.unwrap().starts_with("request failed"));
    }
}
