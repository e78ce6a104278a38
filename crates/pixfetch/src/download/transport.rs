//! HTTP transport seam.
//!
//! The downloader talks to the network through [`HttpTransport`] so tests
//! can substitute a scripted implementation; [`ReqwestTransport`] is the
//! production one.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;

use crate::errors::{ImageError, ImageResult};

/// A single GET request as the downloader issues it.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    /// Extra headers, applied verbatim.
    pub headers: HashMap<String, String>,
    /// Deadline covering the full response body.
    pub timeout: Duration,
}

/// Response head plus the body as an incremental byte stream.
pub struct TransportResponse {
    pub status: u16,
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, ImageResult<Bytes>>,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn fetch(&self, request: TransportRequest) -> ImageResult<TransportResponse>;
}

/// Production transport over a shared `reqwest` client.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str) -> ImageResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()
            .map_err(|err| ImageError::network(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn fetch(&self, request: TransportRequest) -> ImageResult<TransportResponse> {
        let mut builder = self.client.get(&request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                ImageError::network(format!("request timed out: {err}"))
            } else {
                ImageError::network(err)
            }
        })?;

        let status = response.status().as_u16();
        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map_err(|err| {
                if err.is_timeout() {
                    ImageError::network(format!("body read timed out: {err}"))
                } else {
                    ImageError::network(err)
                }
            })
            .boxed();

        Ok(TransportResponse { status, content_length, body })
    }
}
