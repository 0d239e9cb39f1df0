//! Network access for cache misses and priming.
//!
//! `Fetcher` is the seam between the cache manager and the network.
//! `HttpFetcher` is the real implementation over `reqwest`; every HTTP
//! status comes back as a response and only transport failures are errors.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::CacheResult;
use crate::request::Request;
use crate::response::CachedResponse;

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> CacheResult<CachedResponse>;
}

/// Fetcher backed by `reqwest`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Without a timeout a request waits as long as the server takes.
    pub fn new(timeout: Option<Duration>) -> CacheResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> CacheResult<CachedResponse> {
        let mut builder = self.client.request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;

        let url = response.url().to_string();
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        debug!(
            method = %request.method,
            url = %url,
            status,
            bytes = body.len(),
            "Network response received"
        );

        Ok(CachedResponse {
            url,
            status,
            headers,
            body,
        })
    }
}
