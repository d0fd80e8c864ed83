use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// 单根日 K 线数据实体，记录一个交易时段内的行情波动。
///
/// # Invariants
/// - 数据源缺失的价格以 `0.0` 表示，消费方必须将非正数视为缺失。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    // K 线开始时间
    pub time: DateTime<Utc>,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 调整后收盘价 (用于处理分红、拆股等复权情况)
    pub adj_close: Option<f64>,
    // 成交量
    pub volume: f64,
}

impl Candle {
    /// # Summary
    /// 返回按复权因子整体缩放后的 K 线。
    ///
    /// # Logic
    /// 1. 复权因子 = `adj_close / close`。
    /// 2. 当 `adj_close` 缺失或收盘价非正时原样返回。
    /// 3. 成交量不做调整。
    pub fn adjusted(&self) -> Candle {
        let factor = match self.adj_close {
            Some(adj) if self.close > 0.0 && adj > 0.0 => adj / self.close,
            _ => return self.clone(),
        };

        Candle {
            time: self.time,
            open: self.open * factor,
            high: self.high * factor,
            low: self.low * factor,
            close: self.close * factor,
            adj_close: self.adj_close,
            volume: self.volume,
        }
    }
}

/// # Summary
/// 当日触及（或接近）涨跌停价格带的证券。
///
/// # Invariants
/// - 一次扫描内 `symbol` 唯一。
/// - 百分比字段使用精确十进制，阈值比较不受二进制浮点误差影响。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateHit {
    // 股票代码
    pub symbol: String,
    // 当日涨跌幅 (%)，带符号
    pub percent_change: Decimal,
    // 价格带宽度 (%)，例如 5 / 10 / 20
    pub limit_percent: Decimal,
    // 最新成交价
    pub last_price: Decimal,
    // 当日最高价
    pub day_high: Decimal,
    // 当日最低价
    pub day_low: Decimal,
    // 成交量
    pub volume: Decimal,
}

impl CandidateHit {
    /// 当日涨幅距价格带上限的相对距离 `(limit - pct) / limit`；`limit` 为 0 时返回 `None`。
    pub fn closeness(&self) -> Option<Decimal> {
        if self.limit_percent.is_zero() {
            return None;
        }
        Some((self.limit_percent - self.percent_change) / self.limit_percent)
    }
}

/// # Summary
/// 证券描述信息（公司名、市值）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockProfile {
    // 公司全称，缺失时为简称
    pub name: Option<String>,
    // 市值，数据源原始货币单位
    pub market_cap: Option<f64>,
}
