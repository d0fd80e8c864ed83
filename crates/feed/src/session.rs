use circuit_core::market::error::MarketError;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 错误信息中保留的响应体预览长度
const PREVIEW_LEN: usize = 200;

const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// # Summary
/// 模拟浏览器会话的 HTTP 客户端，专门应对要求“先访问首页再调用接口”的数据源。
///
/// # Invariants
/// - 内部客户端开启 Cookie 存储，同一会话的所有请求共享 Cookie。
/// - 首页访问失败视为会话建立失败；行情页预热失败则退回首页作为 Referer。
pub struct BrowserSession {
    /// 保持 Cookie 的 HTTP 客户端
    client: Client,
    /// 首页地址，会话的第一站
    landing_url: String,
    /// 预热访问的行情页面，按顺序尝试
    warmup_urls: Vec<String>,
    /// 两次导航之间的停顿
    pause: Duration,
}

impl BrowserSession {
    /// # Summary
    /// 创建浏览器会话。
    ///
    /// # Logic
    /// 1. 设置 Chrome 风格的默认请求头。
    /// 2. 开启 Cookie 存储与单次请求超时。
    ///
    /// # Arguments
    /// * `landing_url` - 首页地址。
    /// * `warmup_urls` - 预热页面列表。
    /// * `pause` - 导航停顿。
    /// * `timeout` - 单次请求超时。
    ///
    /// # Returns
    /// 客户端构建失败时返回 `MarketError::Config`。
    pub fn new(
        landing_url: impl Into<String>,
        warmup_urls: Vec<String>,
        pause: Duration,
        timeout: Duration,
    ) -> Result<Self, MarketError> {
        let client = Client::builder()
            .default_headers(browser_headers())
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| MarketError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            landing_url: landing_url.into(),
            warmup_urls,
            pause,
        })
    }

    /// # Summary
    /// 以浏览器身份请求 JSON 接口。
    ///
    /// # Logic
    /// 1. 访问首页获取 Cookie。
    /// 2. 依次尝试行情页面，第一个 200 的页面作为 Referer。
    /// 3. 带 Referer 与 `X-Requested-With` 请求接口并解码 JSON。
    ///
    /// # Arguments
    /// * `api_url` - 目标接口完整地址。
    ///
    /// # Returns
    /// 解码后的响应体；401 返回 `Blocked`，其他非 2xx 返回 `Network`。
    pub async fn get_json<T: DeserializeOwned>(&self, api_url: &str) -> Result<T, MarketError> {
        let referer = self.warm_up().await?;
        tokio::time::sleep(self.pause).await;

        let response = self
            .client
            .get(api_url)
            .header(header::REFERER, referer.as_str())
            .header(
                HeaderName::from_static("x-requested-with"),
                HeaderValue::from_static("XMLHttpRequest"),
            )
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        let status = response.status();
        info!("API {} responded with {}", api_url, status);

        if status == StatusCode::UNAUTHORIZED {
            return Err(MarketError::Blocked(format!(
                "{} returned 401, the session was not accepted",
                api_url
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketError::Network(format!(
                "HTTP {}: {}",
                status,
                truncate(&body, PREVIEW_LEN)
            )));
        }

        let content_type = header_text(response.headers(), header::CONTENT_TYPE);
        let content_encoding = header_text(response.headers(), header::CONTENT_ENCODING);
        let body = response
            .bytes()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        decode_json(&body).inspect_err(|e| {
            debug!(
                "Undecodable body: {} bytes, content-type {}, content-encoding {}: {}",
                body.len(),
                content_type,
                content_encoding,
                e
            );
        })
    }

    /// 走完首页与行情页导航，返回接口请求应携带的 Referer。
    async fn warm_up(&self) -> Result<String, MarketError> {
        let landing = self
            .client
            .get(&self.landing_url)
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        if landing.status() != StatusCode::OK {
            return Err(MarketError::Network(format!(
                "Landing page {} returned {}",
                self.landing_url,
                landing.status()
            )));
        }
        debug!("Landing page loaded: {}", self.landing_url);
        tokio::time::sleep(self.pause).await;

        for url in &self.warmup_urls {
            let result = self
                .client
                .get(url)
                .header(header::REFERER, self.landing_url.as_str())
                .send()
                .await;

            match result {
                Ok(resp) if resp.status() == StatusCode::OK => {
                    debug!("Warm-up page accepted: {}", url);
                    return Ok(url.clone());
                }
                Ok(resp) => debug!("Warm-up page {} returned {}", url, resp.status()),
                Err(e) => debug!("Warm-up page {} failed: {}", url, e),
            }
        }

        warn!("No warm-up page accepted, using landing page as referer");
        Ok(self.landing_url.clone())
    }
}

/// Chrome on Windows 的默认请求头。
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(CHROME_USER_AGENT));
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));

    let fetch_metadata = [
        ("sec-fetch-dest", "empty"),
        ("sec-fetch-mode", "cors"),
        ("sec-fetch-site", "same-origin"),
        (
            "sec-ch-ua",
            "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\"",
        ),
        ("sec-ch-ua-mobile", "?0"),
        ("sec-ch-ua-platform", "\"Windows\""),
    ];
    for (name, value) in fetch_metadata {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    headers
}

/// # Summary
/// 将响应体解码为 JSON。
///
/// # Logic
/// 1. 直接按 UTF-8 JSON 解析。
/// 2. 失败时按宽松 UTF-8 解码、去掉 BOM 与空白后重试。
/// 3. 仍失败则返回带预览的 `Parse` 错误。
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, MarketError> {
    match serde_json::from_slice(body) {
        Ok(value) => Ok(value),
        Err(first) => {
            let text = String::from_utf8_lossy(body);
            let cleaned = text.trim_start_matches('\u{feff}').trim();
            serde_json::from_str(cleaned).map_err(|_| {
                MarketError::Parse(format!(
                    "{} (body starts with {:?})",
                    first,
                    truncate(&text, PREVIEW_LEN)
                ))
            })
        }
    }
}

fn header_text(headers: &HeaderMap, name: HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none")
        .to_string()
}

/// 按字符截断，避免切断多字节字符。
fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
