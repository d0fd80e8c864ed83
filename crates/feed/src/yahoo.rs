use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use circuit_core::common::Stock;
use circuit_core::config::FeedConfig;
use circuit_core::market::entity::{Candle, StockProfile};
use circuit_core::market::error::MarketError;
use circuit_core::market::port::{MarketDataProvider, ProfileProvider};
use reqwest::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

/// 种下会话 Cookie 的地址，通常返回 404，但响应会携带 Cookie
const COOKIE_URL: &str = "https://fc.yahoo.com";

/// # Summary
/// Yahoo Finance 行情与证券资料提供者。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯，开启 Cookie 存储。
/// - crumb 在进程内只获取一次。
pub struct YahooProvider {
    /// 内部使用的 HTTP 客户端
    client: Client,
    /// API 根地址
    base_url: String,
    /// quote 接口需要的 crumb
    crumb: OnceCell<String>,
}

impl YahooProvider {
    /// # Summary
    /// 创建一个新的 YahooProvider 实例。
    ///
    /// # Logic
    /// 1. 使用配置中的超时。
    /// 2. 设置伪装浏览器 Header (User-Agent) 以减少被拦截风险。
    /// 3. 初始化 reqwest 客户端。
    ///
    /// # Arguments
    /// * `config` - 行情数据源配置。
    ///
    /// # Returns
    /// 返回初始化后的 YahooProvider，客户端构建失败返回 `MarketError::Config`。
    pub fn new(config: &FeedConfig) -> Result<Self, MarketError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            ),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .map_err(|e| MarketError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.yahoo_base_url.trim_end_matches('/').to_string(),
            crumb: OnceCell::new(),
        })
    }

    /// # Summary
    /// 获取 quote 接口所需的 crumb。
    ///
    /// # Logic
    /// 1. 访问 `COOKIE_URL` 取得会话 Cookie（状态码忽略）。
    /// 2. 请求 `/v1/test/getcrumb`，响应体即 crumb。
    /// 3. 结果缓存在 `OnceCell` 中；失败不缓存，下次调用重试。
    async fn crumb(&self) -> Result<&str, MarketError> {
        self.crumb
            .get_or_try_init(|| async {
                if let Err(e) = self.client.get(COOKIE_URL).send().await {
                    debug!("Yahoo cookie bootstrap failed: {}", e);
                }

                let resp = self
                    .client
                    .get(format!("{}/v1/test/getcrumb", self.base_url))
                    .send()
                    .await
                    .map_err(|e| MarketError::Network(e.to_string()))?;

                if !resp.status().is_success() {
                    return Err(MarketError::Network(format!(
                        "crumb request returned HTTP {}",
                        resp.status()
                    )));
                }

                let crumb = resp
                    .text()
                    .await
                    .map_err(|e| MarketError::Network(e.to_string()))?
                    .trim()
                    .to_string();

                if crumb.is_empty() || crumb.contains('<') {
                    return Err(MarketError::Parse("invalid crumb response".to_string()));
                }
                Ok(crumb)
            })
            .await
            .map(String::as_str)
    }

    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, MarketError> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketError::NotFound);
        }
        if !resp.status().is_success() {
            return Err(MarketError::Network(format!("HTTP {}", resp.status())));
        }

        resp.text()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))
    }
}

/// 交易所代码映射为 Yahoo 代码后缀。
pub fn yahoo_ticker(stock: &Stock) -> String {
    match stock.exchange.as_deref() {
        Some("NSE") => format!("{}.NS", stock.symbol),
        Some("BSE") => format!("{}.BO", stock.symbol),
        _ => stock.symbol.clone(),
    }
}

/// # Summary
/// Yahoo API 响应顶层结构。
///
/// # Invariants
/// - 映射自 Yahoo v8 chart 接口。
#[derive(Deserialize, Debug)]
struct YahooResponse {
    chart: YahooChart,
}

/// # Summary
/// Yahoo API 图表数据部分。
#[derive(Deserialize, Debug)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

/// # Summary
/// Yahoo API 错误详情。
#[derive(Deserialize, Debug)]
struct YahooError {
    #[serde(default)]
    code: Option<String>,
    description: String,
}

/// # Summary
/// Yahoo API 单个时间序列结果。
#[derive(Deserialize, Debug)]
struct YahooResult {
    // 无成交的新上市证券会缺失该字段
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

/// # Summary
/// Yahoo API 指标容器。
#[derive(Deserialize, Debug)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
    // 调整后的价格数据
    adjclose: Option<Vec<YahooAdjClose>>,
}

/// # Summary
/// Yahoo API 调整后价格结构。
#[derive(Deserialize, Debug)]
struct YahooAdjClose {
    // 调整后的收盘价列表
    adjclose: Vec<Option<f64>>,
}

/// # Summary
/// Yahoo API 原始报价数据。
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct YahooQuote {
    /// 开盘价列表
    open: Vec<Option<f64>>,
    /// 最高价列表
    high: Vec<Option<f64>>,
    /// 最低价列表
    low: Vec<Option<f64>>,
    /// 收盘价列表
    close: Vec<Option<f64>>,
    /// 成交量列表
    volume: Vec<Option<f64>>,
}

/// # Summary
/// 解析 v8 chart 接口的响应体。
///
/// # Logic
/// 1. 接口声明的错误：`Not Found` 映射为 `NotFound`，其他映射为 `Unknown`。
/// 2. 按时间戳逐行组装 K 线；OHLC 全部缺失的占位行丢弃。
/// 3. 部分缺失的价格记为 `0.0`，交由下游按缺失处理。
/// 4. 合并 adjclose 列。
///
/// # Returns
/// 按时间升序的 K 线列表。
pub fn parse_chart(body: &str) -> Result<Vec<Candle>, MarketError> {
    let json: YahooResponse =
        serde_json::from_str(body).map_err(|e| MarketError::Parse(e.to_string()))?;

    if let Some(err) = json.chart.error {
        return Err(match err.code.as_deref() {
            Some("Not Found") => MarketError::NotFound,
            _ => MarketError::Unknown(err.description),
        });
    }

    let result = json
        .chart
        .result
        .ok_or(MarketError::NotFound)?
        .pop()
        .ok_or(MarketError::NotFound)?;

    let quote = result
        .indicators
        .quote
        .first()
        .ok_or(MarketError::Parse("No quote data".into()))?;

    let adj_close_list = result
        .indicators
        .adjclose
        .as_ref()
        .and_then(|v| v.first())
        .map(|v| &v.adjclose);

    let value_at = |list: &Vec<Option<f64>>, i: usize| list.get(i).copied().flatten();

    let mut candles = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let Some(time) = Utc.timestamp_opt(ts, 0).single() else {
            debug!("Dropping candle with invalid timestamp {}", ts);
            continue;
        };

        let open = value_at(&quote.open, i);
        let high = value_at(&quote.high, i);
        let low = value_at(&quote.low, i);
        let close = value_at(&quote.close, i);
        // 休市日或开盘前的占位行，不是交易日
        if open.is_none() && high.is_none() && low.is_none() && close.is_none() {
            debug!("Dropping placeholder row at {}", time);
            continue;
        }

        candles.push(Candle {
            time,
            open: open.unwrap_or(0.0),
            high: high.unwrap_or(0.0),
            low: low.unwrap_or(0.0),
            close: close.unwrap_or(0.0),
            adj_close: adj_close_list.and_then(|list| value_at(list, i)),
            volume: value_at(&quote.volume, i).unwrap_or(0.0),
        });
    }

    candles.sort_by_key(|c| c.time);
    Ok(candles)
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct QuoteEnvelope {
    quote_response: QuoteResponse,
}

#[derive(Deserialize, Debug)]
struct QuoteResponse {
    #[serde(default)]
    result: Vec<QuoteResult>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct QuoteResult {
    long_name: Option<String>,
    short_name: Option<String>,
    market_cap: Option<f64>,
}

/// # Summary
/// 解析 v7 quote 接口的响应体。
///
/// # Returns
/// * 结果为空返回 `Ok(None)`。
/// * 名称优先取 `longName`，缺失时取 `shortName`。
pub fn parse_quote(body: &str) -> Result<Option<StockProfile>, MarketError> {
    let json: QuoteEnvelope =
        serde_json::from_str(body).map_err(|e| MarketError::Parse(e.to_string()))?;

    if let Some(err) = json.quote_response.error.filter(|e| !e.is_null()) {
        return Err(MarketError::Unknown(err.to_string()));
    }

    Ok(json.quote_response.result.into_iter().next().map(|q| StockProfile {
        name: q.long_name.or(q.short_name).filter(|n| !n.trim().is_empty()),
        market_cap: q.market_cap.filter(|cap| *cap > 0.0),
    }))
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    /// # Summary
    /// 从 Yahoo Finance 抓取日 K 线历史数据。
    ///
    /// # Logic
    /// 1. 交易所代码映射为 Yahoo 后缀。
    /// 2. 构建包含 period1, period2 的 API URL。
    /// 3. 发起异步请求并解析嵌套的 JSON 数据。
    async fn fetch_daily_candles(
        &self,
        stock: &Stock,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, MarketError> {
        let ticker = yahoo_ticker(stock);
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        let period1 = start.timestamp().to_string();
        let period2 = end.timestamp().to_string();

        let body = self
            .get_text(
                &url,
                &[
                    ("period1", period1.as_str()),
                    ("period2", period2.as_str()),
                    ("interval", "1d"),
                    ("events", "div,split"),
                ],
            )
            .await?;

        let candles = parse_chart(&body)?;
        debug!("Fetched {} daily candles for {}", candles.len(), ticker);
        Ok(candles)
    }
}

#[async_trait]
impl ProfileProvider for YahooProvider {
    /// # Summary
    /// 查询证券名称与市值。
    ///
    /// # Logic
    /// 1. 获取（或复用）crumb。
    /// 2. 请求 v7 quote 接口并解析。
    async fn fetch_profile(&self, stock: &Stock) -> Result<Option<StockProfile>, MarketError> {
        let crumb = self.crumb().await?;
        let ticker = yahoo_ticker(stock);
        let url = format!("{}/v7/finance/quote", self.base_url);

        let body = self
            .get_text(&url, &[("symbols", ticker.as_str()), ("crumb", crumb)])
            .await?;
        parse_quote(&body)
    }
}
