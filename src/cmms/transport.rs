//! HTTP transport seam.
//!
//! `CmmsClient` talks to the backend through the `Transport` trait so that
//! request building, error mapping and retries can be exercised against an
//! in-memory backend in tests.

use std::future::Future;

use color_eyre::{eyre::eyre, Result};
use reqwest::multipart::{Form, Part};
use url::Url;

use super::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
  Put,
  Delete,
}

impl Method {
  /// Safe to repeat without side effects
  pub fn is_idempotent_read(&self) -> bool {
    matches!(self, Method::Get)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
    }
  }
}

/// A local file being sent as a multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
  pub file_name: String,
  pub content_type: String,
  pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
  Empty,
  Json(serde_json::Value),
  Multipart(FileUpload),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  /// Path relative to the API origin, e.g. `/api/assets/42`
  pub path: String,
  pub body: RequestBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

impl ApiResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Sends a single request. Implementations must not retry.
pub trait Transport: Clone + Send + Sync + 'static {
  fn send(&self, request: ApiRequest) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send;
}

/// Multipart form field carrying the uploaded file
pub const UPLOAD_FIELD: &str = "file";

/// reqwest-backed transport with a cookie jar holding the session.
///
/// `base_url` is an origin: request paths are absolute, so joining replaces
/// any path the base URL carries. `Config::validate` rejects such URLs.
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
  base_url: Url,
}

impl HttpTransport {
  pub fn new(base_url: &str) -> Result<Self> {
    let base_url =
      Url::parse(base_url).map_err(|e| eyre!("Invalid API base URL '{}': {}", base_url, e))?;

    let client = reqwest::Client::builder()
      .cookie_store(true)
      .user_agent(concat!("m9s/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  fn url_for(&self, path: &str) -> Result<Url, ApiError> {
    self
      .base_url
      .join(path)
      .map_err(|e| ApiError::Transport(format!("invalid request path {}: {}", path, e)))
  }
}

impl Transport for HttpTransport {
  fn send(&self, request: ApiRequest) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send {
    let client = self.client.clone();
    let url = self.url_for(&request.path);

    async move {
      let url = url?;
      let builder = match request.method {
        Method::Get => client.get(url),
        Method::Post => client.post(url),
        Method::Put => client.put(url),
        Method::Delete => client.delete(url),
      };

      let builder = match request.body {
        RequestBody::Empty => builder,
        RequestBody::Json(value) => builder.json(&value),
        RequestBody::Multipart(upload) => {
          let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)
            .map_err(|e| ApiError::Transport(format!("invalid content type: {}", e)))?;
          builder.multipart(Form::new().part(UPLOAD_FIELD, part))
        }
      };

      let response = builder
        .send()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;

      let status = response.status().as_u16();
      let body = response
        .bytes()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;

      Ok(ApiResponse {
        status,
        body: body.to_vec(),
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_url_join_keeps_origin() {
    let transport = HttpTransport::new("http://cmms.local:5000").unwrap();
    assert_eq!(
      transport.url_for("/api/assets/42/details").unwrap().as_str(),
      "http://cmms.local:5000/api/assets/42/details"
    );
  }

  #[test]
  fn test_invalid_base_url() {
    assert!(HttpTransport::new("not a url").is_err());
  }

  #[test]
  fn test_only_get_is_idempotent_read() {
    assert!(Method::Get.is_idempotent_read());
    assert!(!Method::Put.is_idempotent_read());
    assert!(!Method::Delete.is_idempotent_read());
  }
}
