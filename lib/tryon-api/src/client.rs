use crate::{ApiError, Result};
use derivative::Derivative;
use derive_setters::Setters;
use reqwest::{
    Client, StatusCode,
    header::{HeaderMap, HeaderValue},
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub const API_KEY_HEADER: &str = "x-rapidapi-key";
pub const API_HOST_HEADER: &str = "x-rapidapi-host";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[serde(default)]
#[non_exhaustive]
pub struct ApiConfig {
    /// Sent as `X-RapidAPI-Host` and used to build the default endpoint
    #[derivative(Default(value = "\"try-on-diffusion.p.rapidapi.com\".to_string()"))]
    pub host: String,

    #[derivative(Default(value = "\"/try-on-file\".to_string()"))]
    pub path: String,

    /// Full URL overriding `https://{host}{path}`
    #[setters(strip_option)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[derivative(Default(value = "60"))]
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(url) => url.clone(),
            None => format!("https://{}{}", self.host, self.path),
        }
    }
}

/// Files uploaded for one synthesis call.
#[derive(Debug, Clone)]
pub struct TryOnRequest {
    pub clothing: PathBuf,
    pub avatar: PathBuf,
    pub background: Option<PathBuf>,
}

impl TryOnRequest {
    pub fn new(clothing: impl Into<PathBuf>, avatar: impl Into<PathBuf>) -> Self {
        Self {
            clothing: clothing.into(),
            avatar: avatar.into(),
            background: None,
        }
    }

    pub fn with_background(mut self, background: impl Into<PathBuf>) -> Self {
        self.background = Some(background.into());
        self
    }
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct TryOnApi {
    client: Client,
    url: String,
    timeout_secs: u64,
}

impl TryOnApi {
    pub fn new(config: &ApiConfig, api_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();

        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| ApiError::InvalidHeader(API_KEY_HEADER))?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);
        headers.insert(
            API_HOST_HEADER,
            HeaderValue::from_str(&config.host)
                .map_err(|_| ApiError::InvalidHeader(API_HOST_HEADER))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            client,
            url: config.endpoint_url(),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Upload the request images and return the synthesized image bytes.
    ///
    /// Uploads are read into memory up front, no file handle stays open
    /// across the network call.
    pub async fn try_on(&self, request: &TryOnRequest) -> Result<Vec<u8>> {
        let mut form = Form::new()
            .part("clothing_image", file_part(&request.clothing).await?)
            .part("avatar_image", file_part(&request.avatar).await?);

        if let Some(background) = &request.background {
            form = form.part("background_image", file_part(background).await?);
        }

        log::info!(
            "POST {} clothing={} avatar={}",
            self.url,
            request.clothing.display(),
            request.avatar.display()
        );

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            log::warn!("{} answered {}: {}", self.url, status, body);
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;
        log::info!("Received {} bytes from {}", bytes.len(), self.url);

        Ok(bytes.to_vec())
    }

    fn transport_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout {
                url: self.url.clone(),
                secs: self.timeout_secs,
            }
        } else {
            ApiError::Transport {
                error,
                url: self.url.clone(),
            }
        }
    }
}

async fn file_part(path: &Path) -> Result<Part> {
    let data = tokio::fs::read(path).await.map_err(|e| ApiError::Upload {
        error: e,
        path: path.display().to_string(),
    })?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());

    Part::bytes(data)
        .file_name(file_name)
        .mime_str(mime_type(path))
        .map_err(ApiError::Client)
}

/// Image MIME type guessed from the file extension.
pub fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "image/jpeg",
    }
}
