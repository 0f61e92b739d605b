// src/static_map.rs
use crate::config::StaticMapConfig;
use crate::viewport::Viewport;
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, warn};
use reqwest::Url;
use std::time::Duration;

pub const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

/// A static-map download pinned to a solved viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticMapRequest {
    pub center_lat: f64,
    pub center_lng: f64,
    pub zoom: u32,
    pub width: u32,
    pub height: u32,
    pub map_type: String,
    base_url: String,
    api_key: Option<String>,
}

impl StaticMapRequest {
    /// The request always mirrors the viewport, so overlay pixels line up with the base map.
    pub fn from_viewport(viewport: &Viewport, cfg: &StaticMapConfig) -> Self {
        Self {
            center_lat: viewport.center_lat,
            center_lng: viewport.center_lng,
            zoom: viewport.zoom,
            width: viewport.canvas_width,
            height: viewport.canvas_height,
            map_type: cfg.map_type.clone(),
            base_url: cfg.base_url.clone(),
            api_key: cfg.api_key.clone(),
        }
    }

    pub fn url(&self) -> Result<Url> {
        let mut params = vec![
            ("center", format!("{:.6},{:.6}", self.center_lat, self.center_lng)),
            ("zoom", self.zoom.to_string()),
            ("size", format!("{}x{}", self.width, self.height)),
            ("maptype", self.map_type.clone()),
            ("format", "png".to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }
        Url::parse_with_params(&self.base_url, &params)
            .with_context(|| format!("invalid static map base url {:?}", self.base_url))
    }
}

pub fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(PNG_SIGNATURE)
}

pub struct StaticMapClient {
    http: reqwest::Client,
    max_retries: usize,
}

impl StaticMapClient {
    pub fn new(cfg: &StaticMapConfig) -> Result<Self> {
        if cfg.api_key.is_none() {
            warn!("GOOGLE_MAPS_API_KEY is not set; static map requests will likely be refused");
        }
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .context("build static map http client")?;
        Ok(Self::with_http_client(http, cfg.max_retries))
    }

    pub fn with_http_client(http: reqwest::Client, max_retries: usize) -> Self {
        Self {
            http,
            max_retries: max_retries.max(1),
        }
    }

    /// Download the base map PNG, retrying transient failures with a short backoff.
    pub async fn fetch(&self, request: &StaticMapRequest) -> Result<Vec<u8>> {
        let url = request.url()?;
        let mut last_err: Option<anyhow::Error> = None;

        for attempt in 0..self.max_retries {
            match self.fetch_once(url.clone()).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    warn!(
                        "static map fetch failed (attempt {}/{}): {e:#}",
                        attempt + 1,
                        self.max_retries
                    );
                    last_err = Some(e);
                    if attempt + 1 < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1))).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("static map fetch never ran")))
    }

    async fn fetch_once(&self, url: Url) -> Result<Vec<u8>> {
        let resp = self.http.get(url).send().await.context("send static map request")?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("static map HTTP {}: {}", status, text.chars().take(200).collect::<String>());
        }

        let bytes = resp.bytes().await.context("read static map body")?;
        if !is_png(&bytes) {
            bail!("static map response is not a PNG ({} bytes)", bytes.len());
        }
        debug!("fetched static map ({} bytes)", bytes.len());
        Ok(bytes.to_vec())
    }
}
