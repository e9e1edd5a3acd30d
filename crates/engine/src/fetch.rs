//! Network retrieval collaborator and adapters.
//!
//! The `fetch` action delegates to a [`Fetcher`]. The provided adapters are
//! [`HttpFetcher`], a blocking bridge over `reqwest`, and [`NoopFetcher`],
//! which echoes the request without touching the network and serves as the
//! default for tests and previews.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context as _, Result, anyhow};
use reqwest::{Method, header};
use serde_json::Value;
use tracing::debug;
use trawl_util::block_on;

/// How a fetch response body is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// Parse the body as JSON.
    #[default]
    Json,
    /// Return the body as a plain string.
    Text,
    /// Markup documents are fetched as raw text; turning them into a
    /// queryable document is an adapter concern.
    Markup,
}

impl ResponseFormat {
    /// Parse a configured `responseType` name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "json" => Self::Json,
            "text" => Self::Text,
            "markup" => Self::Markup,
            _ => return None,
        })
    }
}

/// Network retrieval as seen by the `fetch` action.
///
/// Implementations signal failure through `Err`; the action converts that
/// into a `NetworkFailure` diagnostic and a null result, so fetch failures
/// never abort a run.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str, method: &str, body: Option<&Value>, format: ResponseFormat) -> Result<Value>;
}

/// Echoes the request as a JSON object without touching the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFetcher;

impl Fetcher for NoopFetcher {
    fn fetch(&self, url: &str, method: &str, body: Option<&Value>, _format: ResponseFormat) -> Result<Value> {
        let mut echo = serde_json::Map::new();
        echo.insert("url".into(), Value::String(url.to_string()));
        echo.insert("method".into(), Value::String(method.to_string()));
        if let Some(body) = body {
            echo.insert("body".into(), body.clone());
        }
        Ok(Value::Object(echo))
    }
}

/// Blocking HTTP adapter over a shared `reqwest` client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher with a 30 second request timeout and a JSON content
    /// type default.
    pub fn new() -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;

        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, method: &str, body: Option<&Value>, format: ResponseFormat) -> Result<Value> {
        let method = Method::from_str(&method.to_uppercase()).map_err(|error| anyhow!("invalid method '{method}': {error}"))?;
        debug!(%url, %method, "dispatching fetch");

        let mut request = self.client.request(method.clone(), url);
        if method != Method::GET
            && let Some(body) = body
        {
            request = request.json(body);
        }

        block_on(async move {
            let response = request.send().await.with_context(|| format!("request to {url}"))?;
            let status = response.status();
            if !status.is_success() {
                return Err(anyhow!("unexpected status {status}"));
            }
            let text = response.text().await.context("read response body")?;
            Ok(match format {
                ResponseFormat::Json => serde_json::from_str(&text).context("decode json response")?,
                ResponseFormat::Text | ResponseFormat::Markup => Value::String(text),
            })
        })
    }
}
