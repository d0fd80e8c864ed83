use crate::session::BrowserSession;
use async_trait::async_trait;
use circuit_core::config::FeedConfig;
use circuit_core::market::entity::CandidateHit;
use circuit_core::market::error::MarketError;
use circuit_core::market::port::BandHitSource;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 价格带触及接口中“上涨”部分的分类，按此顺序合并。
pub const UPPER_CATEGORIES: [&str; 3] = ["AllSec", "SecGtr20", "SecLwr20"];

/// # Summary
/// NSE 价格带触及 (price band hitter) 数据源。
///
/// # Invariants
/// - 所有请求都经过 `BrowserSession`，Cookie 预热只在这里发生。
pub struct NseBandHitSource {
    session: BrowserSession,
    api_url: String,
}

impl NseBandHitSource {
    /// # Summary
    /// 根据行情配置创建数据源。
    ///
    /// # Logic
    /// 1. 以 `nse_base_url` 为首页，拼接预热页面与接口地址。
    /// 2. 构建浏览器会话。
    pub fn new(config: &FeedConfig) -> Result<Self, MarketError> {
        let base = config.nse_base_url.trim_end_matches('/');
        let warmup_urls = config
            .warmup_paths
            .iter()
            .map(|path| format!("{}{}", base, path))
            .collect();

        let session = BrowserSession::new(
            base,
            warmup_urls,
            Duration::from_millis(config.warmup_pause_ms),
            Duration::from_secs(config.request_timeout_secs),
        )?;

        Ok(Self {
            session,
            api_url: format!("{}{}", base, config.band_hitter_path),
        })
    }
}

#[async_trait]
impl BandHitSource for NseBandHitSource {
    async fn fetch_band_hits(&self) -> Result<Vec<CandidateHit>, MarketError> {
        info!("Fetching price band hitters from {}", self.api_url);
        let payload: Value = self.session.get_json(&self.api_url).await?;
        parse_upper_hits(&payload)
    }
}

/// 接口原始记录，数值字段可能是字符串也可能是数字。
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawBandHit {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    p_change: Option<Value>,
    #[serde(default)]
    price_band: Option<Value>,
    #[serde(default)]
    ltp: Option<Value>,
    #[serde(default)]
    high_price: Option<Value>,
    #[serde(default)]
    low_price: Option<Value>,
    #[serde(default)]
    total_traded_vol: Option<Value>,
}

/// # Summary
/// 从价格带触及响应中提取上涨候选。
///
/// # Logic
/// 1. 要求存在对象类型的 `upper` 字段。
/// 2. 依 `UPPER_CATEGORIES` 顺序合并各分类的 `data` 数组。
/// 3. 按代码去重，先出现者优先，空代码丢弃；去重发生在解析之前。
/// 4. 逐条解析；无法解析的记录记录警告后跳过，该代码的后续重复记录同样丢弃。
///
/// # Returns
/// 去重后的候选列表，未做接近度过滤。
pub fn parse_upper_hits(payload: &Value) -> Result<Vec<CandidateHit>, MarketError> {
    let upper = payload
        .get("upper")
        .ok_or_else(|| MarketError::Parse("'upper' key not in response".to_string()))?;
    if !upper.is_object() {
        return Err(MarketError::Parse("'upper' is not an object".to_string()));
    }

    let mut records: Vec<&Value> = Vec::new();
    for category in UPPER_CATEGORIES {
        if let Some(data) = upper
            .get(category)
            .and_then(|c| c.get("data"))
            .and_then(Value::as_array)
        {
            debug!("Found {} records in '{}'", data.len(), category);
            records.extend(data.iter());
        }
    }

    let total = records.len();
    let mut seen = HashSet::new();
    let mut hits = Vec::new();
    for record in records {
        let symbol = match record.get("symbol").and_then(Value::as_str).map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => continue,
        };
        // 首次出现即占位，解析失败也不让后续重复记录顶替
        if !seen.insert(symbol.to_string()) {
            continue;
        }
        match parse_record(record) {
            Ok(Some(hit)) => hits.push(hit),
            Ok(None) => {}
            Err(e) => warn!("Skipping unparsable band hit record: {}", e),
        }
    }

    info!("Band hitters: {} records, {} unique symbols", total, hits.len());
    Ok(hits)
}

/// 单条记录转换；没有代码的记录返回 `Ok(None)`。
fn parse_record(record: &Value) -> Result<Option<CandidateHit>, String> {
    let raw: RawBandHit = serde_json::from_value(record.clone()).map_err(|e| e.to_string())?;

    let symbol = match raw.symbol.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => return Ok(None),
    };

    let field = |name: &str, value: &Option<Value>| {
        decimal_field(value.as_ref()).map_err(|e| format!("{} {}: {}", symbol, name, e))
    };

    Ok(Some(CandidateHit {
        percent_change: field("pChange", &raw.p_change)?.unwrap_or(Decimal::ZERO),
        limit_percent: field("priceBand", &raw.price_band)?.unwrap_or(Decimal::TEN),
        last_price: field("ltp", &raw.ltp)?.unwrap_or(Decimal::ZERO),
        day_high: field("highPrice", &raw.high_price)?.unwrap_or(Decimal::ZERO),
        day_low: field("lowPrice", &raw.low_price)?.unwrap_or(Decimal::ZERO),
        volume: field("totalTradedVol", &raw.total_traded_vol)?.unwrap_or(Decimal::ZERO),
        symbol,
    }))
}

/// # Summary
/// 将字符串或数字形式的 JSON 值解析为十进制数。
///
/// # Returns
/// * 缺失、`null`、空串或 `-` 返回 `Ok(None)`。
/// * 非数值内容返回 `Err`。
pub fn decimal_field(value: Option<&Value>) -> Result<Option<Decimal>, String> {
    let text = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s.trim().replace(',', ""),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => return Err(format!("unexpected value {}", other)),
    };

    if text.is_empty() || text == "-" {
        return Ok(None);
    }

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Some)
        .map_err(|e| format!("'{}' is not a number: {}", text, e))
}
